// Planet Evo - Grid Particle Artificial Life Sandbox
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

use planet_evo::settings;
use planet_evo::{Particle, ParticleType, Program, Vec2, World, WorldSettings};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

const SETTINGS_FILE_NAME: &str = "planet_evo_settings.json";
const SETTINGS_ENV_VAR: &str = "PLANET_EVO_SETTINGS";

// ============================================================================
// RUN SETTINGS
// ============================================================================

/// A creature placed before the first tick. Without a genome it runs the
/// single-celled plant.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CreatureSpawn {
    x: usize,
    y: usize,
    #[serde(default)]
    genome: Option<String>, // hex, two digits per instruction
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct RunSettings {
    world: WorldSettings,
    ticks: u64,
    stats_interval: u64,
    frame_interval: u64, // 0 disables frame export
    frame_dir: PathBuf,
    // seeding layers, as fractions of the world height
    water_top: f64,
    dirt_top: f64,
    carbon_density: f64, // carbon particles per cell above the water
    creatures: Vec<CreatureSpawn>,
}

impl Default for RunSettings {
    fn default() -> Self {
        let world = WorldSettings::default();
        let creatures = vec![CreatureSpawn {
            x: world.width / 2,
            y: world.height / 4,
            genome: None,
        }];
        Self {
            world,
            ticks: 10_000,
            stats_interval: 500,
            frame_interval: 0,
            frame_dir: PathBuf::from("frames"),
            water_top: 0.5,
            dirt_top: 0.9,
            carbon_density: 0.02,
            creatures,
        }
    }
}

impl RunSettings {
    fn default_path() -> PathBuf {
        if let Some(arg) = std::env::args().nth(1) {
            return PathBuf::from(arg);
        }
        if let Ok(path) = std::env::var(SETTINGS_ENV_VAR) {
            return PathBuf::from(path);
        }
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(SETTINGS_FILE_NAME)
    }

    fn load_from_disk(path: &Path) -> anyhow::Result<Self> {
        let mut run: Self = settings::load_json(path)?;
        run.sanitize();
        Ok(run)
    }

    fn save_to_disk(&self, path: &Path) -> anyhow::Result<()> {
        settings::save_json(self, path)
    }

    fn sanitize(&mut self) {
        self.world.sanitize();
        self.stats_interval = self.stats_interval.max(1);
        self.water_top = self.water_top.clamp(0.0, 1.0);
        self.dirt_top = self.dirt_top.clamp(self.water_top, 1.0);
        self.carbon_density = self.carbon_density.clamp(0.0, 1.0);
    }
}

// ============================================================================
// SEEDING
// ============================================================================

/// Carbon drifting in the air, a band of water, dirt at the bottom.
fn seed_layers(world: &mut World, run: &RunSettings) -> anyhow::Result<()> {
    let width = world.width();
    let height = world.height();
    let water_top = (height as f64 * run.water_top) as usize;
    let dirt_top = (height as f64 * run.dirt_top) as usize;

    let carbon_count = (water_top as f64 * width as f64 * run.carbon_density) as usize;
    if water_top > 0 {
        for _ in 0..carbon_count {
            let rng = world.rng();
            let x = rng.gen_range(0..width);
            let y = rng.gen_range(0..water_top);
            let vx = 0.2 - rng.gen::<f64>() * 0.4;
            let vy = 0.2 - rng.gen::<f64>() * 0.4;
            world.insert(
                Particle::new(ParticleType::Carbon, Vec2::from_cell(x, y)).with_velocity(Vec2::new(vx, vy)),
            )?;
        }
    }

    for y in water_top..dirt_top {
        for x in 0..width {
            world.insert(Particle::new(ParticleType::Water, Vec2::from_cell(x, y)))?;
        }
    }
    for y in dirt_top..height {
        for x in 0..width {
            world.insert(Particle::new(ParticleType::Dirt, Vec2::from_cell(x, y)))?;
        }
    }
    Ok(())
}

fn spawn_creatures(world: &mut World, run: &RunSettings) -> anyhow::Result<()> {
    for spawn in &run.creatures {
        let program = match &spawn.genome {
            Some(hex) => Program::from_hex(hex)?,
            None => Program::single_celled_plant(),
        };
        log::info!(
            "creature at ({}, {}), genome {}:\n{}",
            spawn.x,
            spawn.y,
            program.to_hex(),
            program
        );
        world.spawn_creature(spawn.x, spawn.y, program)?;
    }
    Ok(())
}

// ============================================================================
// FRAMES
// ============================================================================

fn argb_to_rgba(color: u32) -> [u8; 4] {
    [
        (color >> 16) as u8,
        (color >> 8) as u8,
        color as u8,
        (color >> 24) as u8,
    ]
}

fn save_frame(world: &World, dir: &Path) -> anyhow::Result<PathBuf> {
    let width = world.width();
    let height = world.height();
    let pixels: Vec<[u8; 4]> = (0..height)
        .flat_map(|y| (0..width).map(move |x| argb_to_rgba(world.color_at(x, y))))
        .collect();
    let bytes: &[u8] = bytemuck::cast_slice(&pixels);
    let image = image::RgbaImage::from_raw(width as u32, height as u32, bytes.to_vec())
        .ok_or_else(|| anyhow::anyhow!("Frame buffer does not match {}x{}", width, height))?;

    fs::create_dir_all(dir)?;
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("frame_{:08}_{}.png", world.time(), timestamp));
    image.save(&path)?;
    Ok(path)
}

fn print_census(world: &World) {
    let census = world.census();
    let counts: Vec<String> = ParticleType::ALL
        .iter()
        .skip(1)
        .map(|kind| format!("{}={}", kind.class().name, census.count(*kind)))
        .collect();
    println!(
        "tick {:>8} | living {:>6} | energy {:>10.2} | longest dna {:>4} | {}",
        world.time(),
        census.living_cells,
        census.total_cell_energy,
        census.longest_program,
        counts.join(" ")
    );
}

fn main() -> anyhow::Result<()> {
    use env_logger::Env;
    env_logger::Builder::from_env(Env::default().default_filter_or("warn"))
        .init();

    let settings_path = RunSettings::default_path();
    let run = if settings_path.exists() {
        match RunSettings::load_from_disk(&settings_path) {
            Ok(run) => run,
            Err(err) => {
                log::error!("Failed to load {}: {err:?}", settings_path.display());
                RunSettings::default()
            }
        }
    } else {
        let run = RunSettings::default();
        if let Err(err) = run.save_to_disk(&settings_path) {
            log::warn!("Could not write default settings to {}: {err:?}", settings_path.display());
        } else {
            println!("Wrote default settings to {}", settings_path.display());
        }
        run
    };

    let mut world = World::new(run.world.clone());
    seed_layers(&mut world, &run)?;
    spawn_creatures(&mut world, &run)?;
    println!(
        "Planet Evo {}x{} seed {} for {} ticks",
        world.width(),
        world.height(),
        world.settings().seed,
        run.ticks
    );

    print_census(&world);
    for _ in 0..run.ticks {
        world.step();
        if world.time() % run.stats_interval == 0 {
            print_census(&world);
        }
        if run.frame_interval > 0 && world.time() % run.frame_interval == 0 {
            let path = save_frame(&world, &run.frame_dir)?;
            println!("Saved frame {}", path.display());
        }
    }
    Ok(())
}
