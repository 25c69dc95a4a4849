// Planet Evo - Grid Particle Artificial Life Sandbox
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

use serde::{Deserialize, Serialize};

use crate::dna::{default_param_values, Program, PARAMETER_OP_CODE_COUNT};
use crate::vec2::Vec2;

// ============================================================================
// PARTICLE TYPES & CLASS TABLE
// ============================================================================

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum ParticleType {
    // non-organic particles
    #[default]
    Null,
    Carbon,
    Oxygen,
    Dirt,
    Water,
    Light,

    // organic particles
    Chloro,
    Fiber,
    Zygote,
}

pub const PARTICLE_COUNT: usize = 9;
pub const FIRST_ORGANIC_PARTICLE: usize = ParticleType::Chloro as usize;
pub const ORGANIC_PARTICLE_COUNT: usize = PARTICLE_COUNT - FIRST_ORGANIC_PARTICLE;

impl ParticleType {
    pub const ALL: [ParticleType; PARTICLE_COUNT] = [
        ParticleType::Null,
        ParticleType::Carbon,
        ParticleType::Oxygen,
        ParticleType::Dirt,
        ParticleType::Water,
        ParticleType::Light,
        ParticleType::Chloro,
        ParticleType::Fiber,
        ParticleType::Zygote,
    ];

    pub fn id(self) -> i32 {
        self as i32
    }

    pub fn is_organic(self) -> bool {
        self as usize >= FIRST_ORGANIC_PARTICLE
    }

    pub fn class(self) -> &'static ParticleClass {
        &PARTICLE_CLASSES[self as usize]
    }

    /// Maps a NewCellType parameter value to a concrete organic type.
    /// Zero means "no cell".
    pub fn from_new_cell_param(value: i32) -> Option<ParticleType> {
        let value = value.rem_euclid(ORGANIC_PARTICLE_COUNT as i32 + 1) as usize;
        if value == 0 {
            None
        } else {
            Some(Self::ALL[FIRST_ORGANIC_PARTICLE + value - 1])
        }
    }
}

/// Static physical properties, one row per particle type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleClass {
    pub name: &'static str,
    pub mass: f64,
    pub density: f64,
    pub blocks_sunlight: bool,
    pub blocks_air: bool,
    pub color: u32, // 0xAARRGGBB
    pub max_energy: f64,
    pub elasticity: f64,
    pub friction: f64,
    pub dead_type: ParticleType,
    pub light_energy: f64, // energy gained per absorbed light particle
}

const fn class(
    name: &'static str,
    mass: f64,
    density: f64,
    blocks_sunlight: bool,
    blocks_air: bool,
    color: u32,
    max_energy: f64,
    elasticity: f64,
    friction: f64,
    dead_type: ParticleType,
    light_energy: f64,
) -> ParticleClass {
    ParticleClass {
        name,
        mass,
        density,
        blocks_sunlight,
        blocks_air,
        color,
        max_energy,
        elasticity,
        friction,
        dead_type,
        light_energy,
    }
}

pub const PARTICLE_CLASSES: [ParticleClass; PARTICLE_COUNT] = [
    // non-organic particles
    class("Null", 0.0, 0.0, false, false, 0xff000000, 0.0, 0.0, 0.0, ParticleType::Null, 0.0),
    class("Carbon", 1.0, 0.2, false, true, 0xff374b65, 0.0, 0.99, 0.0, ParticleType::Null, 0.0),
    class("Oxygen", 1.0, 0.1, false, true, 0xff94b4dd, 0.0, 0.99, 0.0, ParticleType::Null, 0.0),
    class("Dirt", 10.0, 4.0, true, true, 0xff6b3000, 0.0, 0.1, 0.001, ParticleType::Null, 0.0),
    class("Water", 10.0, 1.0, false, true, 0xff21009d, 0.0, 0.7, 0.0001, ParticleType::Null, 0.0),
    class("Light", 0.0, 0.0, false, false, 0xfffff433, 0.0, 0.0, 0.0, ParticleType::Null, 0.0),
    // organic particles
    class("Chloro", 4.0, 0.9, true, true, 0xff0a7a00, 5.0, 0.1, 0.001, ParticleType::Dirt, 1.0),
    class("Fiber", 6.0, 0.8, true, true, 0xffb75900, 2.0, 0.5, 0.002, ParticleType::Dirt, 0.0),
    class("Zygote", 5.0, 2.0, true, true, 0xffefefef, 10.0, 0.7, 0.0005, ParticleType::Dirt, 0.0),
];

// ============================================================================
// PARTICLES
// ============================================================================

/// Genome-carrying state of an organic particle.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub alive: bool,
    pub energy: f64,
    pub age: u32,
    pub organism_age: u32, // shared across a lineage
    pub intact_dna: Program, // original DNA
    pub executing_dna: Program, // starts as a copy of intact_dna
    pub param_values: [i32; PARAMETER_OP_CODE_COUNT],
    pub register_x: i32,
    pub register_y: i32,
    pub waiting: u32, // until this many steps are done, do nothing
    pub blocked_divisions: u32, // consecutive retried divisions
}

impl Cell {
    pub fn new(intact_dna: Program, executing_dna: Program, energy: f64) -> Self {
        Self {
            alive: true,
            energy,
            age: 0,
            organism_age: 0,
            intact_dna,
            executing_dna,
            param_values: default_param_values(),
            register_x: 0,
            register_y: 0,
            waiting: 0,
            blocked_divisions: 0,
        }
    }

    pub fn die(&mut self) {
        self.energy = 0.0;
        self.alive = false;
    }

    pub fn gain_energy(&mut self, amount: f64, max_energy: f64) {
        self.energy = (self.energy + amount).clamp(0.0, max_energy);
    }

    /// Removes energy; a cell drained to zero dies.
    pub fn spend_energy(&mut self, amount: f64) {
        self.energy -= amount;
        if self.energy <= 0.0 {
            self.die();
        }
    }
}

/// One grid occupant. `cell` is present exactly when `kind` is organic.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Particle {
    pub kind: ParticleType,
    pub position: Vec2,
    pub velocity: Vec2,
    pub cell: Option<Box<Cell>>,
}

impl Particle {
    pub fn new(kind: ParticleType, position: Vec2) -> Self {
        Self {
            kind,
            position,
            velocity: Vec2::ZERO,
            cell: None,
        }
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    /// A fresh organic particle with full energy.
    pub fn creature(kind: ParticleType, position: Vec2, program: Program) -> Self {
        let energy = kind.class().max_energy;
        let executing = program.clone();
        Self {
            kind,
            position,
            velocity: Vec2::ZERO,
            cell: Some(Box::new(Cell::new(program, executing, energy))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.kind == ParticleType::Null
    }

    pub fn is_organic(&self) -> bool {
        self.kind.is_organic()
    }

    pub fn is_alive(&self) -> bool {
        self.cell.as_ref().map_or(false, |c| c.alive)
    }

    pub fn class(&self) -> &'static ParticleClass {
        self.kind.class()
    }

    pub fn color(&self) -> u32 {
        self.class().color
    }

    pub fn mass(&self) -> f64 {
        self.class().mass
    }

    /// Light hitting this particle. Only living organic cells keep the energy.
    pub fn absorb_light(&mut self) {
        let class = self.kind.class();
        if let Some(cell) = self.cell.as_mut() {
            if cell.alive && class.light_energy > 0.0 {
                cell.gain_energy(class.light_energy, class.max_energy);
                log::debug!(
                    "{} at {} +{} energy, now {:.3}",
                    class.name,
                    self.position,
                    class.light_energy,
                    cell.energy
                );
            }
        }
    }

    /// Dead organic matter turns into its class's debris type.
    pub fn decay_into_debris(&mut self) {
        if self.cell.as_ref().map_or(false, |c| !c.alive) {
            self.kind = self.kind.class().dead_type;
            self.cell = None;
        }
    }

    /// Advances position by velocity, then applies per-axis friction.
    pub fn apply_motion(&mut self, low_velocity_threshold: f64) {
        self.position += self.velocity;

        let friction = self.class().friction;
        if friction >= self.velocity.x.abs() {
            self.velocity.x = 0.0;
        } else {
            self.velocity.x -= self.velocity.x.signum() * friction;
        }
        if friction >= self.velocity.y.abs() {
            self.velocity.y = 0.0;
        } else {
            self.velocity.y -= self.velocity.y.signum() * friction;
        }

        if self.velocity.length_sqrd() < low_velocity_threshold {
            self.velocity.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn organic_threshold() {
        assert!(!ParticleType::Light.is_organic());
        assert!(ParticleType::Chloro.is_organic());
        assert!(ParticleType::Zygote.is_organic());
        assert_eq!(ORGANIC_PARTICLE_COUNT, 3);
    }

    #[test]
    fn new_cell_param_maps_onto_organic_types() {
        assert_eq!(ParticleType::from_new_cell_param(0), None);
        assert_eq!(ParticleType::from_new_cell_param(1), Some(ParticleType::Chloro));
        assert_eq!(ParticleType::from_new_cell_param(3), Some(ParticleType::Zygote));
        assert_eq!(ParticleType::from_new_cell_param(4), None);
        assert_eq!(ParticleType::from_new_cell_param(5), Some(ParticleType::Chloro));
    }

    #[test]
    fn creature_starts_with_full_energy() {
        let p = Particle::creature(ParticleType::Zygote, Vec2::new(1.0, 1.0), Program::single_celled_plant());
        let cell = p.cell.as_ref().unwrap();
        assert_eq!(cell.energy, 10.0);
        assert!(cell.alive);
        assert_eq!(cell.intact_dna, cell.executing_dna);
    }

    #[test]
    fn energy_is_clamped_and_zero_means_dead() {
        let mut cell = Cell::new(Program::default(), Program::default(), 1.0);
        cell.gain_energy(100.0, 5.0);
        assert_eq!(cell.energy, 5.0);
        cell.spend_energy(5.0);
        assert_eq!(cell.energy, 0.0);
        assert!(!cell.alive);
    }

    #[test]
    fn only_chloro_photosynthesizes() {
        let mut chloro = Particle::creature(ParticleType::Chloro, Vec2::ZERO, Program::default());
        chloro.cell.as_mut().unwrap().energy = 1.0;
        chloro.absorb_light();
        assert_eq!(chloro.cell.as_ref().unwrap().energy, 2.0);

        let mut fiber = Particle::creature(ParticleType::Fiber, Vec2::ZERO, Program::default());
        fiber.cell.as_mut().unwrap().energy = 1.0;
        fiber.absorb_light();
        assert_eq!(fiber.cell.as_ref().unwrap().energy, 1.0);
    }

    #[test]
    fn dead_cells_become_dirt() {
        let mut p = Particle::creature(ParticleType::Fiber, Vec2::ZERO, Program::default());
        p.decay_into_debris();
        assert_eq!(p.kind, ParticleType::Fiber);
        p.cell.as_mut().unwrap().die();
        p.decay_into_debris();
        assert_eq!(p.kind, ParticleType::Dirt);
        assert!(p.cell.is_none());
    }

    #[test]
    fn friction_slows_each_axis_independently() {
        let mut p = Particle::new(ParticleType::Dirt, Vec2::new(5.0, 5.0))
            .with_velocity(Vec2::new(0.5, -0.0005));
        p.apply_motion(1e-6);
        assert_eq!(p.position.x, 5.5);
        assert!((p.position.y - 4.9995).abs() < 1e-12);
        assert!((p.velocity.x - 0.499).abs() < 1e-12);
        assert_eq!(p.velocity.y, 0.0);
    }

    #[test]
    fn tiny_velocities_are_cleared() {
        let mut p = Particle::new(ParticleType::Carbon, Vec2::ZERO).with_velocity(Vec2::new(0.0005, 0.0));
        p.apply_motion(1e-6);
        assert!(p.velocity.is_zero());
    }
}
