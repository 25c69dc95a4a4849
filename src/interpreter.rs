// Planet Evo - Grid Particle Artificial Life Sandbox
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

//! Genetic program interpreter. Each tick a living cell executes exactly one
//! instruction of its executing DNA (or burns one tick of a wait).

use rand::Rng;

use crate::dna::{
    BlockOrContinue, Comparison, Direction, DnaOp, Operation, ParameterType, Register,
    ValueSource, PARAMETER_INFOS,
};
use crate::particle::{Cell, ParticleType};
use crate::settings::WorldSettings;
use crate::vec2::Vec2;

/// Read access to the world as it was at the start of the tick.
pub trait Surroundings {
    /// Type of the particle occupying cell `(x, y)`. Columns wrap; rows
    /// outside the grid read as `Null`.
    fn particle_type_at(&self, x: i64, y: i64) -> ParticleType;
}

/// The cell that is executing, as seen by its program.
#[derive(Debug, Clone, Copy)]
pub struct Host {
    pub kind: ParticleType,
    pub position: Vec2,
}

/// A successful division, handed to the world for placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DivisionRequest {
    pub new_cell_type: ParticleType,
    pub direction: Direction,
    pub energy: f64,
    /// Start address for the offspring's executing DNA (not yet folded
    /// into the offspring program's length).
    pub pc: usize,
}

enum DivisionAttempt {
    Divided(DivisionRequest),
    Abandoned,
    Starved,
}

impl Cell {
    /// Current value of a parameter slot, always folded into its type's range.
    pub fn param(&self, op: DnaOp) -> i32 {
        match op.param_index() {
            Some(index) => PARAMETER_INFOS[index].ty.fold(self.param_values[index]),
            None => 0,
        }
    }

    /// Per-instruction mutation probability for this cell's offspring.
    pub fn mutation_chance(&self, min: f64, max: f64) -> f64 {
        let percent = self.param(DnaOp::MutationChance) as f64 / 255.0;
        min + percent * (max - min)
    }

    fn set_param(&mut self, op: DnaOp, operand: u8, addr: usize) {
        let Some(index) = op.param_index() else {
            return;
        };
        let ty = PARAMETER_INFOS[index].ty;
        let mut value = ty.fold(operand as i32);
        if ty == ParameterType::CodeLabel {
            // labels are stored as absolute addresses
            value += addr as i32;
        }
        self.param_values[index] = value;
    }

    fn value_source<S, R>(&self, op: DnaOp, host: &Host, senses: &S, rng: &mut R) -> i32
    where
        S: Surroundings + ?Sized,
        R: Rng + ?Sized,
    {
        match ValueSource::from_param(self.param(op)) {
            ValueSource::RegisterX => self.register_x,
            ValueSource::RegisterY => self.register_y,
            ValueSource::CellAge => self.age as i32,
            ValueSource::CellType => host.kind.id(),
            ValueSource::CellEnergy => self.energy.floor() as i32,
            ValueSource::OrganismAge => self.organism_age as i32,
            ValueSource::Zero => 0,
            ValueSource::One => 1,
            ValueSource::Two => 2,
            ValueSource::Three => 3,
            ValueSource::Four => 4,
            ValueSource::Five => 5,
            ValueSource::NeighborParticleType => self.neighbor(host, senses).id(),
            ValueSource::NeighborIsSameCellType => (self.neighbor(host, senses) == host.kind) as i32,
            ValueSource::Number => self.param(DnaOp::ValueSourceNumber),
            ValueSource::Label => self.param(DnaOp::ValueSourceLabel),
            ValueSource::Random => rng.gen_range(0..256),
        }
    }

    fn neighbor<S: Surroundings + ?Sized>(&self, host: &Host, senses: &S) -> ParticleType {
        let (dx, dy) = Direction::from_param(self.param(DnaOp::ValueSourceDirection)).offset();
        let (x, y) = host.position.cell();
        senses.particle_type_at(x + dx, y + dy)
    }

    fn save_to_register(&mut self, op: DnaOp, value: i32) {
        match Register::from_param(self.param(op)) {
            Register::None => {}
            Register::X => self.register_x = value,
            Register::Y => self.register_y = value,
        }
    }

    fn try_divide<S, R>(
        &mut self,
        next_pc: usize,
        host: &Host,
        senses: &S,
        rng: &mut R,
        settings: &WorldSettings,
    ) -> DivisionAttempt
    where
        S: Surroundings + ?Sized,
        R: Rng + ?Sized,
    {
        let cost = self
            .value_source(DnaOp::CellDivisionEnergyForNewCell, host, senses, rng)
            .max(0) as f64;
        if self.energy < cost + settings.division_energy_margin {
            return DivisionAttempt::Starved;
        }
        let Some(new_cell_type) =
            ParticleType::from_new_cell_param(self.param(DnaOp::CellDivisionNewCellType))
        else {
            return DivisionAttempt::Abandoned;
        };
        self.spend_energy(cost);
        let direction = Direction::from_param(self.param(DnaOp::CellDivisionDirection));
        let pc = if self.param(DnaOp::CellDivisionDoWeFork) == 1 {
            self.param(DnaOp::CellDivisionForkLabel) as usize
        } else {
            next_pc
        };
        DivisionAttempt::Divided(DivisionRequest {
            new_cell_type,
            direction,
            energy: cost,
            pc,
        })
    }

    /// Executes one tick of the program. Returns a division request when the
    /// executed instruction produced offspring.
    pub fn step_dna<S, R>(
        &mut self,
        host: &Host,
        senses: &S,
        rng: &mut R,
        settings: &WorldSettings,
    ) -> Option<DivisionRequest>
    where
        S: Surroundings + ?Sized,
        R: Rng + ?Sized,
    {
        // DNA program is permanently halted
        let pc = self.executing_dna.pc?;
        if self.waiting > 0 {
            self.waiting -= 1;
            return None;
        }
        let len = self.executing_dna.len();
        if len == 0 {
            self.executing_dna.pc = None;
            return None;
        }

        let addr = pc % len;
        let instr = self.executing_dna.instructions[addr];
        let mut next = addr + 1;
        let mut division = None;

        match instr.op() {
            DnaOp::NoOp => {}
            DnaOp::CellDivision => match self.try_divide(next, host, senses, rng, settings) {
                DivisionAttempt::Divided(request) => {
                    self.blocked_divisions = 0;
                    division = Some(request);
                }
                DivisionAttempt::Abandoned => {}
                DivisionAttempt::Starved => {
                    match BlockOrContinue::from_param(self.param(DnaOp::CellDivisionContingencyPlan)) {
                        BlockOrContinue::Block => {
                            let retry = settings
                                .division_retry_limit
                                .map_or(true, |limit| self.blocked_divisions < limit);
                            if retry {
                                self.blocked_divisions += 1;
                                next = addr;
                            } else {
                                self.blocked_divisions = 0;
                            }
                        }
                        BlockOrContinue::Continue => {}
                    }
                }
            },
            DnaOp::CellDeath => self.die(),
            DnaOp::Jump => {
                let left = self.value_source(DnaOp::JumpOperandLeft, host, senses, rng);
                let right = self.value_source(DnaOp::JumpOperandRight, host, senses, rng);
                let comparison = Comparison::from_param(self.param(DnaOp::JumpComparison));
                if comparison.evaluate(left, right) {
                    next = self.param(DnaOp::JumpLabel) as usize;
                }
            }
            DnaOp::Wait => {
                let ticks = self.value_source(DnaOp::WaitSource, host, senses, rng);
                self.waiting = ticks.rem_euclid(16) as u32;
            }
            DnaOp::UpdateRegister => {
                let value = self.value_source(DnaOp::UpdateRegisterSource, host, senses, rng);
                self.save_to_register(DnaOp::UpdateRegisterDest, value);
            }
            DnaOp::Calc => {
                let left = self.value_source(DnaOp::CalcOperandLeft, host, senses, rng);
                let right = self.value_source(DnaOp::CalcOperandRight, host, senses, rng);
                let value = Operation::from_param(self.param(DnaOp::CalcOperation)).apply(left, right);
                self.save_to_register(DnaOp::CalcDest, value);
            }
            DnaOp::ModifyDna => {
                let target = self.param(DnaOp::ModifyDnaLabel) as usize % len;
                let value = self.value_source(DnaOp::ModifyDnaSource, host, senses, rng);
                self.executing_dna.instructions[target].value = value.rem_euclid(256) as u8;
            }
            op => self.set_param(op, instr.value, addr),
        }

        self.executing_dna.pc = if next >= len {
            match BlockOrContinue::from_param(self.param(DnaOp::ProgramEndBehavior)) {
                BlockOrContinue::Block => None,
                BlockOrContinue::Continue => Some(0),
            }
        } else {
            Some(next)
        };
        division
    }
}
