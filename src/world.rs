// Planet Evo - Grid Particle Artificial Life Sandbox
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;
use serde::Serialize;
use std::collections::VecDeque;

use crate::dna::Program;
use crate::interpreter::{DivisionRequest, Host, Surroundings};
use crate::mutation::mutated_clone;
use crate::particle::{Cell, Particle, ParticleType, PARTICLE_COUNT};
use crate::settings::{SkyBoundary, WorldSettings};
use crate::vec2::Vec2;

/// Organic type given to externally spawned creatures.
pub const CREATURE_TYPE: ParticleType = ParticleType::Zygote;

/// Extra distance travelled past a cell border so a particle really leaves its cell.
const EXIT_EPSILON: f64 = 1e-6;

/// Row where sunlight enters the world.
const LIGHT_ENTRY_ROW: usize = 1;

// ============================================================================
// DOUBLE-BUFFERED GRID
// ============================================================================

/// Two `width * height` halves in one allocation. The active half is read
/// during a tick, the inactive half receives every placement.
#[derive(Debug, Clone)]
struct Grid {
    width: usize,
    height: usize,
    particles: Vec<Particle>,
    alt_offset: usize,
}

impl Grid {
    fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            particles: vec![Particle::default(); width * height * 2],
            alt_offset: 0,
        }
    }

    fn next_alt_offset(&self) -> usize {
        if self.alt_offset == 0 {
            self.width * self.height
        } else {
            0
        }
    }

    fn index(&self, x: usize, y: usize) -> usize {
        self.alt_offset + y * self.width + x
    }

    fn alt_index(&self, x: usize, y: usize) -> usize {
        self.next_alt_offset() + y * self.width + x
    }

    /// Inactive-half slot for a position already confined to the grid.
    fn alt_index_of(&self, position: &Vec2) -> usize {
        let x = (position.x as usize).min(self.width - 1);
        let y = (position.y as usize).min(self.height - 1);
        self.alt_index(x, y)
    }

    fn wrap_x(&self, x: i64) -> usize {
        x.rem_euclid(self.width as i64) as usize
    }

    fn clear_alt(&mut self) {
        let start = self.next_alt_offset();
        let end = start + self.width * self.height;
        for slot in &mut self.particles[start..end] {
            *slot = Particle::default();
        }
    }

    fn flip(&mut self) {
        self.alt_offset = self.next_alt_offset();
    }

    fn active(&self, x: usize, y: usize) -> &Particle {
        &self.particles[self.index(x, y)]
    }
}

impl Surroundings for Grid {
    fn particle_type_at(&self, x: i64, y: i64) -> ParticleType {
        if y < 0 || y >= self.height as i64 {
            return ParticleType::Null;
        }
        self.active(self.wrap_x(x), y as usize).kind
    }
}

// ============================================================================
// PLACEMENT RULES
// ============================================================================

/// Outcome of a particle arriving in an occupied cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// The occupant takes the mover's energy; the mover is consumed.
    OccupantAbsorbs,
    /// The mover takes the occupant (light) and its cell.
    MoverAbsorbs,
    /// The mover takes the cell, the occupant is pushed back along the
    /// mover's velocity. A resting mover lets the occupant pass through
    /// along its own velocity instead. An occupant pushed above the top row
    /// settles nearby.
    DisplaceOccupant,
    Collide,
}

pub fn placement_rule(mover: ParticleType, occupant: ParticleType) -> Placement {
    let m = mover.class();
    let o = occupant.class();
    match (mover, occupant) {
        (ParticleType::Light, _) if o.blocks_sunlight => Placement::OccupantAbsorbs,
        (ParticleType::Light, _) => Placement::DisplaceOccupant,
        (_, ParticleType::Light) if m.blocks_sunlight => Placement::MoverAbsorbs,
        (_, ParticleType::Light) => Placement::DisplaceOccupant,
        _ => Placement::Collide,
    }
}

/// Post-collision velocities: per-axis elastic exchange weighted by mass,
/// each result scaled by that particle's own elasticity.
pub fn collision_velocities(a: &Particle, b: &Particle) -> (Vec2, Vec2) {
    let (m1, m2) = (a.mass(), b.mass());
    let (v1, v2) = (a.velocity, b.velocity);
    let total = m1 + m2;
    let (u1, u2) = if total > 0.0 {
        (
            Vec2::new(
                (v1.x * (m1 - m2) + 2.0 * m2 * v2.x) / total,
                (v1.y * (m1 - m2) + 2.0 * m2 * v2.y) / total,
            ),
            Vec2::new(
                (v2.x * (m2 - m1) + 2.0 * m1 * v1.x) / total,
                (v2.y * (m2 - m1) + 2.0 * m1 * v1.y) / total,
            ),
        )
    } else {
        (v2, v1)
    };
    (u1 * a.class().elasticity, u2 * b.class().elasticity)
}

/// Time for a particle to leave its current cell along its velocity.
pub fn exit_time(p: &Particle) -> f64 {
    fn axis(pos: f64, vel: f64) -> f64 {
        if vel == 0.0 {
            return f64::INFINITY;
        }
        // position within the cell, then distance to the border ahead
        let frac = pos - pos.floor();
        let dist = if vel > 0.0 { 1.0 - frac } else { frac };
        (dist + EXIT_EPSILON) / vel.abs()
    }
    axis(p.position.x, p.velocity.x).min(axis(p.position.y, p.velocity.y))
}

struct Pending {
    particle: Particle,
    approach: Vec2,
}

// ============================================================================
// WORLD
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Census {
    pub counts: [usize; PARTICLE_COUNT],
    pub living_cells: usize,
    pub total_cell_energy: f64,
    pub longest_program: usize,
}

impl Census {
    pub fn count(&self, kind: ParticleType) -> usize {
        self.counts[kind as usize]
    }
}

pub struct World {
    settings: WorldSettings,
    grid: Grid,
    rng: ChaCha12Rng,
    time: u64,
    queue: VecDeque<Pending>,
}

impl World {
    pub fn new(mut settings: WorldSettings) -> Self {
        settings.sanitize();
        let grid = Grid::new(settings.width, settings.height);
        let rng = ChaCha12Rng::seed_from_u64(settings.seed);
        Self {
            settings,
            grid,
            rng,
            time: 0,
            queue: VecDeque::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.grid.width
    }

    pub fn height(&self) -> usize {
        self.grid.height
    }

    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn settings(&self) -> &WorldSettings {
        &self.settings
    }

    /// World-owned generator, for seeding code that must stay reproducible.
    pub fn rng(&mut self) -> &mut ChaCha12Rng {
        &mut self.rng
    }

    pub fn particle_at(&self, x: usize, y: usize) -> Option<&Particle> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let p = self.grid.active(x, y);
        (!p.is_empty()).then_some(p)
    }

    /// Occupied cells of the active buffer, row-major.
    pub fn particles(&self) -> impl Iterator<Item = &Particle> + '_ {
        let start = self.grid.alt_offset;
        let end = start + self.width() * self.height();
        self.grid.particles[start..end].iter().filter(|p| !p.is_empty())
    }

    /// Display color of cell `(x, y)`; empty and out-of-range cells show sky.
    pub fn color_at(&self, x: usize, y: usize) -> u32 {
        match self.particle_at(x, y) {
            Some(p) => p.color(),
            None => ParticleType::Null.class().color,
        }
    }

    /// Puts `particle` into the active buffer at its position, replacing the occupant.
    pub fn insert(&mut self, particle: Particle) -> anyhow::Result<()> {
        let (x, y) = particle.position.cell();
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            anyhow::bail!(
                "Position {} is outside the {}x{} world",
                particle.position,
                self.width(),
                self.height()
            );
        }
        let index = self.grid.index(x as usize, y as usize);
        self.grid.particles[index] = particle;
        Ok(())
    }

    /// Places a new full-energy creature running `program` at `(x, y)`.
    pub fn spawn_creature(&mut self, x: usize, y: usize, program: Program) -> anyhow::Result<()> {
        self.insert(Particle::creature(CREATURE_TYPE, Vec2::from_cell(x, y), program))?;
        log::debug!("spawned creature at ({}, {})", x, y);
        Ok(())
    }

    /// Advances the simulation by one tick.
    pub fn step(&mut self) {
        self.grid.clear_alt();

        for y in 0..self.height() {
            for x in 0..self.width() {
                let index = self.grid.index(x, y);
                let kind = self.grid.particles[index].kind;
                if kind == ParticleType::Null {
                    continue;
                }
                // leave the type behind so neighbor sensing still sees the tick-start world
                let particle = std::mem::replace(
                    &mut self.grid.particles[index],
                    Particle::new(kind, Vec2::ZERO),
                );
                self.step_particle(particle);
            }
        }

        // send light down
        let width = self.width();
        let entry_row = LIGHT_ENTRY_ROW.min(self.height() - 1);
        for _ in 0..self.settings.light_per_tick {
            let x = self.rng.gen_range(0..width);
            let light = Particle::new(ParticleType::Light, Vec2::from_cell(x, entry_row))
                .with_velocity(Vec2::new(0.0, 1.0));
            self.place(light);
        }

        self.time += 1;
        self.grid.flip();
    }

    fn step_particle(&mut self, mut particle: Particle) {
        let mut request = None;
        if let Some(cell) = particle.cell.as_mut() {
            if cell.alive {
                let host = Host {
                    kind: particle.kind,
                    position: particle.position,
                };
                request = cell.step_dna(&host, &self.grid, &mut self.rng, &self.settings);
                cell.age = cell.age.saturating_add(1);
                cell.organism_age = cell.organism_age.saturating_add(1);
                cell.spend_energy(self.settings.cell_energy_decay);
                if !cell.alive {
                    log::debug!("{} at {} died", particle.kind.class().name, particle.position);
                }
            }
        }

        let offspring = request.and_then(|request| self.offspring(&particle, request));
        particle.decay_into_debris();
        particle.apply_motion(self.settings.low_velocity_threshold);
        self.place(particle);

        if let Some((child, approach)) = offspring {
            self.place_with_approach(child, approach);
        }
    }

    /// Builds the offspring described by `request`. Its position is the
    /// parent's tick-start position plus the division direction.
    fn offspring(&mut self, parent: &Particle, request: DivisionRequest) -> Option<(Particle, Vec2)> {
        let cell = parent.cell.as_ref()?;
        let chance = cell.mutation_chance(
            self.settings.mutation_chance_min,
            self.settings.mutation_chance_max,
        );
        let intact = mutated_clone(&cell.intact_dna, chance, &mut self.rng);
        let mut executing = mutated_clone(&cell.executing_dna, chance, &mut self.rng);
        executing.jump_to(request.pc);

        let class = request.new_cell_type.class();
        let mut baby = Cell::new(intact, executing, request.energy.min(class.max_energy));
        baby.organism_age = cell.organism_age;
        if baby.energy <= 0.0 {
            baby.die();
        }

        let (dx, dy) = request.direction.offset();
        let approach = Vec2::new(dx as f64, dy as f64);
        let mut child = Particle {
            kind: request.new_cell_type,
            position: parent.position + approach,
            velocity: Vec2::ZERO,
            cell: Some(Box::new(baby)),
        };
        child.decay_into_debris();
        log::debug!(
            "{} at {} divided into {} at {} ({} instructions)",
            parent.kind.class().name,
            parent.position,
            class.name,
            child.position,
            child.cell.as_ref().map_or(0, |c| c.intact_dna.len())
        );
        Some((child, approach))
    }

    fn place(&mut self, particle: Particle) {
        let approach = particle.velocity;
        self.place_with_approach(particle, approach);
    }

    /// Resolves `particle` and everything it pushes around into the inactive
    /// buffer. Work is bounded by `placement_budget`; leftovers settle in the
    /// nearest free cell.
    fn place_with_approach(&mut self, particle: Particle, approach: Vec2) {
        self.queue.push_back(Pending { particle, approach });
        let mut budget = self.settings.placement_budget;
        while let Some(pending) = self.queue.pop_front() {
            if budget == 0 {
                log::warn!("placement budget exhausted at {}", pending.particle.position);
                self.settle_nearby(pending.particle);
                continue;
            }
            budget -= 1;
            self.resolve(pending);
        }
    }

    /// Wraps columns and applies the sky/floor policy. `None` when the
    /// particle leaves the world.
    fn confine(&self, mut p: Particle) -> Option<Particle> {
        if !p.position.is_finite() || !p.velocity.is_finite() {
            log::warn!("discarding {} with non-finite motion", p.kind.class().name);
            return None;
        }
        let width = self.width() as f64;
        let height = self.height() as f64;

        p.position.x = p.position.x.rem_euclid(width);
        if p.position.x >= width {
            p.position.x = 0.0;
        }

        if p.position.y < 0.0 {
            match self.settings.sky_boundary {
                SkyBoundary::Bounce => {
                    p.position.y = 0.0;
                    p.velocity.y = p.velocity.y.abs();
                }
                SkyBoundary::Escape => {
                    log::debug!("{} escaped at {}", p.kind.class().name, p.position);
                    return None;
                }
            }
        }
        if p.position.y >= height {
            if p.kind == ParticleType::Light {
                // absorbed by the ground
                return None;
            }
            p.position.y = height - 1.0;
            p.velocity.y = -p.velocity.y.abs();
        }
        Some(p)
    }

    fn resolve(&mut self, pending: Pending) {
        let Some(mover) = self.confine(pending.particle) else {
            return;
        };
        let dest = self.grid.alt_index_of(&mover.position);
        let occupant_kind = self.grid.particles[dest].kind;

        // no particle in destination point; simply place the particle there.
        if occupant_kind == ParticleType::Null {
            self.grid.particles[dest] = mover;
            return;
        }

        match placement_rule(mover.kind, occupant_kind) {
            Placement::OccupantAbsorbs => self.grid.particles[dest].absorb_light(),
            Placement::MoverAbsorbs => {
                let mut mover = mover;
                mover.absorb_light();
                self.grid.particles[dest] = mover;
            }
            Placement::DisplaceOccupant => {
                let push = mover.velocity;
                let mut occupant = std::mem::replace(&mut self.grid.particles[dest], mover);
                let shift = if push.is_zero() { occupant.velocity } else { -push };
                // a push never carries the occupant out through the sky
                if shift.is_zero() || occupant.position.y + shift.y < 0.0 {
                    self.settle_nearby(occupant);
                } else {
                    occupant.position += shift;
                    self.queue.push_back(Pending {
                        particle: occupant,
                        approach: shift,
                    });
                }
            }
            Placement::Collide => {
                let occupant = std::mem::take(&mut self.grid.particles[dest]);
                self.collide(mover, pending.approach, occupant, dest);
            }
        }
    }

    fn collide(&mut self, mut mover: Particle, approach: Vec2, mut occupant: Particle, dest: usize) {
        let (u1, u2) = collision_velocities(&mover, &occupant);
        mover.velocity = u1;
        occupant.velocity = u2;

        let t = exit_time(&mover).min(exit_time(&occupant));
        if t.is_finite() {
            mover.position += u1 * t;
            occupant.position += u2 * t;
            self.queue.push_back(Pending {
                approach: occupant.velocity,
                particle: occupant,
            });
            self.queue.push_back(Pending {
                particle: mover,
                approach,
            });
            return;
        }

        // both at rest in one cell: the occupant keeps it, the mover backs off
        self.grid.particles[dest] = occupant;
        if approach.is_zero() {
            self.settle_nearby(mover);
        } else {
            mover.position -= approach;
            self.queue.push_back(Pending {
                particle: mover,
                approach,
            });
        }
    }

    /// Drops `p` into the nearest empty cell of the inactive buffer,
    /// searching square rings around its position.
    fn settle_nearby(&mut self, p: Particle) {
        let Some(mut p) = self.confine(p) else {
            return;
        };
        let (cx, cy) = p.position.cell();
        let max_radius = self.width().max(self.height()) as i64;
        for radius in 0..=max_radius {
            for dy in -radius..=radius {
                let y = cy + dy;
                if y < 0 || y >= self.height() as i64 {
                    continue;
                }
                for dx in -radius..=radius {
                    if dx.abs() != radius && dy.abs() != radius {
                        continue;
                    }
                    let x = self.grid.wrap_x(cx + dx);
                    let index = self.grid.alt_index(x, y as usize);
                    if self.grid.particles[index].is_empty() {
                        if radius > 0 {
                            p.position = Vec2::from_cell(x, y as usize);
                            p.velocity.clear();
                        }
                        self.grid.particles[index] = p;
                        return;
                    }
                }
            }
        }
        log::warn!(
            "no room left for {} from {}, dropping it",
            p.kind.class().name,
            p.position
        );
    }

    pub fn census(&self) -> Census {
        let mut census = Census::default();
        for p in self.particles() {
            census.counts[p.kind as usize] += 1;
            if let Some(cell) = p.cell.as_ref() {
                if p.is_alive() {
                    census.living_cells += 1;
                    census.total_cell_energy += cell.energy;
                }
                census.longest_program = census.longest_program.max(cell.intact_dna.len());
            }
        }
        census
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_world(width: usize, height: usize) -> World {
        World::new(WorldSettings {
            width,
            height,
            light_per_tick: 0,
            cell_energy_decay: 0.0,
            ..WorldSettings::default()
        })
    }

    fn kinds(world: &World) -> Vec<(usize, usize, ParticleType)> {
        let mut out = Vec::new();
        for y in 0..world.height() {
            for x in 0..world.width() {
                if let Some(p) = world.particle_at(x, y) {
                    out.push((x, y, p.kind));
                }
            }
        }
        out
    }

    #[test]
    fn rule_table() {
        use ParticleType::*;
        assert_eq!(placement_rule(Light, Dirt), Placement::OccupantAbsorbs);
        assert_eq!(placement_rule(Light, Chloro), Placement::OccupantAbsorbs);
        assert_eq!(placement_rule(Light, Water), Placement::DisplaceOccupant);
        assert_eq!(placement_rule(Light, Light), Placement::DisplaceOccupant);
        assert_eq!(placement_rule(Dirt, Light), Placement::MoverAbsorbs);
        assert_eq!(placement_rule(Water, Light), Placement::DisplaceOccupant);
        assert_eq!(placement_rule(Carbon, Water), Placement::Collide);
        assert_eq!(placement_rule(Zygote, Fiber), Placement::Collide);
    }

    #[test]
    fn equal_mass_collision_swaps_velocities() {
        let a = Particle::new(ParticleType::Carbon, Vec2::ZERO).with_velocity(Vec2::new(1.0, 0.0));
        let b = Particle::new(ParticleType::Carbon, Vec2::ZERO);
        let (u1, u2) = collision_velocities(&a, &b);
        assert!(u1.x.abs() < 1e-12);
        assert!((u2.x - 0.99).abs() < 1e-12);
    }

    #[test]
    fn exit_time_measures_distance_to_the_border_ahead() {
        let p = Particle::new(ParticleType::Carbon, Vec2::new(3.25, 7.5))
            .with_velocity(Vec2::new(0.5, 0.0));
        assert!((exit_time(&p) - (0.75 + EXIT_EPSILON) / 0.5).abs() < 1e-12);
        let q = Particle::new(ParticleType::Carbon, Vec2::new(3.25, 7.5))
            .with_velocity(Vec2::new(-0.25, 0.0));
        assert!((exit_time(&q) - (0.25 + EXIT_EPSILON) / 0.25).abs() < 1e-12);
        let r = Particle::new(ParticleType::Carbon, Vec2::new(3.25, 7.5));
        assert!(exit_time(&r).is_infinite());
    }

    #[test]
    fn moving_particle_wraps_columns() {
        let mut world = quiet_world(8, 4);
        world
            .insert(Particle::new(ParticleType::Carbon, Vec2::new(7.5, 1.0)).with_velocity(Vec2::new(1.0, 0.0)))
            .unwrap();
        world.step();
        assert_eq!(kinds(&world), vec![(0, 1, ParticleType::Carbon)]);
    }

    #[test]
    fn floor_reflects_matter() {
        let mut world = quiet_world(4, 4);
        world
            .insert(Particle::new(ParticleType::Water, Vec2::new(1.0, 3.0)).with_velocity(Vec2::new(0.0, 1.0)))
            .unwrap();
        world.step();
        let p = world.particle_at(1, 3).unwrap();
        assert!(p.velocity.y < 0.0);
    }

    #[test]
    fn sky_policy_bounce_keeps_the_particle() {
        let mut world = quiet_world(4, 4);
        world
            .insert(Particle::new(ParticleType::Carbon, Vec2::new(1.0, 0.0)).with_velocity(Vec2::new(0.0, -1.0)))
            .unwrap();
        world.step();
        let p = world.particle_at(1, 0).unwrap();
        assert!(p.velocity.y > 0.0);
    }

    #[test]
    fn sky_policy_escape_discards_the_particle() {
        let mut world = World::new(WorldSettings {
            width: 4,
            height: 4,
            light_per_tick: 0,
            sky_boundary: SkyBoundary::Escape,
            ..WorldSettings::default()
        });
        world
            .insert(Particle::new(ParticleType::Carbon, Vec2::new(1.0, 0.0)).with_velocity(Vec2::new(0.0, -1.0)))
            .unwrap();
        world.step();
        assert!(kinds(&world).is_empty());
    }

    #[test]
    fn light_passes_resting_water_and_feeds_chloro() {
        let mut world = quiet_world(3, 4);
        world.insert(Particle::new(ParticleType::Water, Vec2::new(1.0, 1.0))).unwrap();
        let mut chloro = Particle::creature(ParticleType::Chloro, Vec2::new(1.0, 3.0), Program::default());
        chloro.cell.as_mut().unwrap().energy = 1.0;
        world.insert(chloro).unwrap();
        world
            .insert(Particle::new(ParticleType::Light, Vec2::new(1.0, 0.0)).with_velocity(Vec2::new(0.0, 1.0)))
            .unwrap();

        world.step();
        assert_eq!(world.particle_at(1, 1).map(|p| p.kind), Some(ParticleType::Water));
        assert_eq!(world.particle_at(1, 2).map(|p| p.kind), Some(ParticleType::Light));

        world.step();
        let chloro = world.particle_at(1, 3).unwrap();
        assert_eq!(chloro.cell.as_ref().unwrap().energy, 2.0);
        assert_eq!(world.census().count(ParticleType::Light), 0);
    }

    #[test]
    fn sunlight_enters_below_the_top_row_moving_down() {
        let mut world = World::new(WorldSettings {
            width: 6,
            height: 5,
            light_per_tick: 2,
            ..WorldSettings::default()
        });
        world.step();
        let lights: Vec<&Particle> = world
            .particles()
            .filter(|p| p.kind == ParticleType::Light)
            .collect();
        assert_eq!(lights.len(), 2);
        for light in lights {
            assert!(light.position.y < 2.0);
            assert_eq!(light.velocity, Vec2::new(0.0, 1.0));
        }
    }

    #[test]
    fn sunlight_never_pushes_matter_off_the_top() {
        for sky_boundary in [SkyBoundary::Bounce, SkyBoundary::Escape] {
            // tall column: light enters under the resting water
            let mut world = World::new(WorldSettings {
                width: 1,
                height: 5,
                sky_boundary,
                light_per_tick: 1,
                ..WorldSettings::default()
            });
            world.insert(Particle::new(ParticleType::Water, Vec2::ZERO)).unwrap();
            world.step();
            assert_eq!(world.census().count(ParticleType::Water), 1);
            assert_eq!(world.census().count(ParticleType::Light), 1);
            assert_eq!(world.particle_at(0, 1).map(|p| p.kind), Some(ParticleType::Light));

            // one-row world: light has to enter the top row itself
            for seed in 0..20 {
                let mut world = World::new(WorldSettings {
                    width: 4,
                    height: 1,
                    seed,
                    sky_boundary,
                    light_per_tick: 1,
                    ..WorldSettings::default()
                });
                world.insert(Particle::new(ParticleType::Water, Vec2::ZERO)).unwrap();
                world.step();
                assert_eq!(world.census().count(ParticleType::Water), 1);
                assert_eq!(world.census().count(ParticleType::Light), 1);
            }
        }
    }

    #[test]
    fn offspring_genomes_come_from_separate_mutation_passes() {
        let request = DivisionRequest {
            new_cell_type: ParticleType::Chloro,
            direction: crate::dna::Direction::N,
            energy: 4.0,
            pc: 6,
        };
        let parent = Particle::creature(
            ParticleType::Zygote,
            Vec2::new(3.0, 3.0),
            Program::single_celled_plant(),
        );

        let mut settings = WorldSettings {
            width: 8,
            height: 8,
            mutation_chance_min: 1.0,
            mutation_chance_max: 1.0,
            ..WorldSettings::default()
        };
        let mut world = World::new(settings.clone());
        let (child, _) = world.offspring(&parent, request).unwrap();
        let cell = child.cell.as_ref().unwrap();
        assert_ne!(cell.intact_dna.instructions, cell.executing_dna.instructions);

        settings.mutation_chance_min = 0.0;
        settings.mutation_chance_max = 0.0;
        let mut world = World::new(settings);
        let (child, approach) = world.offspring(&parent, request).unwrap();
        let cell = child.cell.as_ref().unwrap();
        assert_eq!(cell.intact_dna.instructions, cell.executing_dna.instructions);
        assert_eq!(cell.intact_dna, Program::single_celled_plant());
        assert_eq!(cell.executing_dna.pc, Some(6));
        assert_eq!(approach, Vec2::new(0.0, -1.0));
        assert_eq!(child.position, Vec2::new(3.0, 2.0));
    }

    #[test]
    fn light_reaching_the_floor_is_absorbed() {
        let mut world = quiet_world(2, 2);
        world
            .insert(Particle::new(ParticleType::Light, Vec2::new(0.0, 1.0)).with_velocity(Vec2::new(0.0, 1.0)))
            .unwrap();
        world.step();
        assert!(kinds(&world).is_empty());
    }

    #[test]
    fn head_on_collision_keeps_both_particles() {
        let mut world = quiet_world(8, 3);
        world
            .insert(Particle::new(ParticleType::Carbon, Vec2::new(2.5, 1.5)).with_velocity(Vec2::new(1.0, 0.0)))
            .unwrap();
        world.insert(Particle::new(ParticleType::Carbon, Vec2::new(3.5, 1.5))).unwrap();
        for _ in 0..5 {
            world.step();
            assert_eq!(world.census().count(ParticleType::Carbon), 2);
        }
        // momentum went into the resting particle
        let right_mover = world
            .particles()
            .any(|p| p.velocity.x > 0.5 && p.position.x > 3.5);
        assert!(right_mover);
    }

    #[test]
    fn resting_collision_moves_the_newcomer_aside() {
        use ParticleType::Dirt;
        let mut world = quiet_world(5, 5);
        world.grid.clear_alt();
        world.place(Particle::new(Dirt, Vec2::new(2.0, 2.0)));
        // backs off along its approach
        world.place_with_approach(Particle::new(Dirt, Vec2::new(2.0, 2.0)), Vec2::new(0.0, 1.0));
        // nothing to back off along, so it settles in the nearest free cell
        world.place(Particle::new(Dirt, Vec2::new(2.0, 2.0)));
        world.grid.flip();
        assert_eq!(kinds(&world), vec![(1, 1, Dirt), (2, 1, Dirt), (2, 2, Dirt)]);
    }

    #[test]
    fn crowded_grid_settles_every_particle() {
        let mut world = quiet_world(6, 6);
        for y in 0..6 {
            for x in 0..5 {
                world
                    .insert(
                        Particle::new(ParticleType::Water, Vec2::new(x as f64 + 0.5, y as f64 + 0.5))
                            .with_velocity(Vec2::new(0.3 * (x as f64 - 2.0), 0.2 * (y as f64 - 2.5))),
                    )
                    .unwrap();
            }
        }
        for _ in 0..20 {
            world.step();
            assert_eq!(world.census().count(ParticleType::Water), 30);
        }
    }

    #[test]
    fn spawn_rejects_positions_outside_the_grid() {
        let mut world = quiet_world(4, 4);
        assert!(world.spawn_creature(4, 0, Program::single_celled_plant()).is_err());
        assert!(world.spawn_creature(3, 3, Program::single_celled_plant()).is_ok());
        assert_eq!(world.color_at(3, 3), ParticleType::Zygote.class().color);
        assert_eq!(world.color_at(0, 0), ParticleType::Null.class().color);
        assert_eq!(world.color_at(99, 99), ParticleType::Null.class().color);
    }

    #[test]
    fn starving_cells_turn_to_dirt() {
        let mut world = World::new(WorldSettings {
            width: 3,
            height: 3,
            light_per_tick: 0,
            cell_energy_decay: 0.6,
            ..WorldSettings::default()
        });
        let mut fiber = Particle::creature(ParticleType::Fiber, Vec2::new(1.0, 1.0), Program::default());
        fiber.cell.as_mut().unwrap().energy = 1.0;
        world.insert(fiber).unwrap();
        world.step();
        assert_eq!(world.particle_at(1, 1).map(|p| p.kind), Some(ParticleType::Fiber));
        world.step();
        assert_eq!(world.particle_at(1, 1).map(|p| p.kind), Some(ParticleType::Dirt));
        assert!(world.particle_at(1, 1).unwrap().cell.is_none());
    }
}
