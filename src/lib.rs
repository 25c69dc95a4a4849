// Planet Evo - Grid Particle Artificial Life Sandbox
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

//! A falling-particle sandbox on a 2-D grid where organic particles carry
//! genetic programs, divide, mutate and die.

pub mod dna;
pub mod interpreter;
pub mod mutation;
pub mod particle;
pub mod settings;
pub mod vec2;
pub mod world;

pub use dna::{DnaOp, Instruction, Program};
pub use particle::{Particle, ParticleType};
pub use settings::{SkyBoundary, WorldSettings};
pub use vec2::Vec2;
pub use world::{Census, World};
