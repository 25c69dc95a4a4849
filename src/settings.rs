// Planet Evo - Grid Particle Artificial Life Sandbox
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// What happens to a particle that moves above the top row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkyBoundary {
    /// Reflect off the top edge.
    Bounce,
    /// Leave the world for good.
    Escape,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldSettings {
    pub width: usize,
    pub height: usize,
    pub seed: u64,
    pub sky_boundary: SkyBoundary,
    pub light_per_tick: u32,
    pub cell_energy_decay: f64,
    pub division_energy_margin: f64,
    /// `None` retries a starved, blocking division forever.
    pub division_retry_limit: Option<u32>,
    pub mutation_chance_min: f64,
    pub mutation_chance_max: f64,
    pub placement_budget: usize,
    pub low_velocity_threshold: f64,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            seed: 1234,
            sky_boundary: SkyBoundary::Bounce,
            light_per_tick: 1,
            cell_energy_decay: 0.001,
            division_energy_margin: 1.0,
            division_retry_limit: None,
            mutation_chance_min: 0.0001,
            mutation_chance_max: 0.05,
            placement_budget: 1000,
            low_velocity_threshold: 0.000001,
        }
    }
}

/// Reads any settings struct from a JSON file.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

/// Writes `value` as pretty JSON, creating parent directories.
pub fn save_json<T: Serialize>(value: &T, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

impl WorldSettings {
    pub fn load_from_disk(path: &Path) -> anyhow::Result<Self> {
        let mut settings: Self = load_json(path)?;
        settings.sanitize();
        Ok(settings)
    }

    pub fn save_to_disk(&self, path: &Path) -> anyhow::Result<()> {
        save_json(self, path)
    }

    pub fn sanitize(&mut self) {
        self.width = self.width.clamp(1, 4096);
        self.height = self.height.clamp(1, 4096);
        self.light_per_tick = self.light_per_tick.min(self.width as u32);
        if !self.cell_energy_decay.is_finite() {
            self.cell_energy_decay = 0.001;
        }
        self.cell_energy_decay = self.cell_energy_decay.clamp(0.0, 1.0);
        if !self.division_energy_margin.is_finite() {
            self.division_energy_margin = 1.0;
        }
        self.division_energy_margin = self.division_energy_margin.clamp(0.0, 100.0);
        self.mutation_chance_min = self.mutation_chance_min.clamp(0.0, 1.0);
        self.mutation_chance_max = self.mutation_chance_max.clamp(0.0, 1.0);
        if self.mutation_chance_min > self.mutation_chance_max {
            std::mem::swap(&mut self.mutation_chance_min, &mut self.mutation_chance_max);
        }
        self.placement_budget = self.placement_budget.clamp(16, 1_000_000);
        self.low_velocity_threshold = self.low_velocity_threshold.clamp(0.0, 0.01);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let settings: WorldSettings =
            serde_json::from_str(r#"{ "width": 32, "sky_boundary": "escape" }"#).unwrap();
        assert_eq!(settings.width, 32);
        assert_eq!(settings.height, 480);
        assert_eq!(settings.sky_boundary, SkyBoundary::Escape);
        assert_eq!(settings.division_retry_limit, None);
    }

    #[test]
    fn sanitize_clamps_out_of_range_values() {
        let mut settings = WorldSettings {
            width: 0,
            height: 100_000,
            light_per_tick: 50,
            cell_energy_decay: f64::NAN,
            mutation_chance_min: 0.5,
            mutation_chance_max: 0.1,
            placement_budget: 0,
            ..WorldSettings::default()
        };
        settings.sanitize();
        assert_eq!(settings.width, 1);
        assert_eq!(settings.height, 4096);
        assert_eq!(settings.light_per_tick, 1);
        assert_eq!(settings.cell_energy_decay, 0.001);
        assert_eq!(settings.mutation_chance_min, 0.1);
        assert_eq!(settings.mutation_chance_max, 0.5);
        assert_eq!(settings.placement_budget, 16);
    }

    #[test]
    fn settings_survive_a_trip_through_disk() {
        let dir = std::env::temp_dir().join(format!("planet-evo-settings-{}", std::process::id()));
        let path = dir.join("world.json");
        let settings = WorldSettings {
            width: 64,
            division_retry_limit: Some(4),
            ..WorldSettings::default()
        };
        settings.save_to_disk(&path).unwrap();
        let loaded = WorldSettings::load_from_disk(&path).unwrap();
        assert_eq!(loaded, settings);
        let _ = fs::remove_dir_all(&dir);
    }
}
