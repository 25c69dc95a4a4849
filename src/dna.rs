// Planet Evo - Grid Particle Artificial Life Sandbox
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::particle::ORGANIC_PARTICLE_COUNT;

// ============================================================================
// INSTRUCTIONS & PROGRAMS
// ============================================================================

/// One genetic instruction: an opcode byte plus an operand byte. Any byte
/// pair is a valid instruction, the opcode is folded into range on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Instruction {
    pub op_code: u8,
    pub value: u8,
}

impl Instruction {
    pub const fn new(op: DnaOp, value: u8) -> Self {
        Self {
            op_code: op as u8,
            value,
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            op_code: rng.gen(),
            value: rng.gen(),
        }
    }

    pub fn op(&self) -> DnaOp {
        DnaOp::decode(self.op_code)
    }

    /// Parameter info when this instruction sets a parameter.
    pub fn parameter(&self) -> Option<&'static ParameterInfo> {
        self.op().param_index().map(|i| &PARAMETER_INFOS[i])
    }

    /// True for instructions whose operand is a relative code label.
    pub fn sets_label(&self) -> bool {
        matches!(self.parameter(), Some(info) if info.ty == ParameterType::CodeLabel)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = self.op();
        match self.parameter() {
            None => write!(f, "{}", op.mnemonic()),
            Some(info) => {
                let folded = info.ty.fold(self.value as i32);
                match info.ty {
                    ParameterType::CodeLabel => write!(f, "set {} +{}", op.mnemonic(), folded),
                    ParameterType::ValueSource => {
                        write!(f, "set {} {:?}", op.mnemonic(), ValueSource::from_param(folded))
                    }
                    ParameterType::Register => {
                        write!(f, "set {} {:?}", op.mnemonic(), Register::from_param(folded))
                    }
                    ParameterType::Comparison => {
                        write!(f, "set {} {:?}", op.mnemonic(), Comparison::from_param(folded))
                    }
                    ParameterType::Operation => {
                        write!(f, "set {} {:?}", op.mnemonic(), Operation::from_param(folded))
                    }
                    ParameterType::Direction => {
                        write!(f, "set {} {:?}", op.mnemonic(), Direction::from_param(folded))
                    }
                    ParameterType::BlockOrContinue => write!(
                        f,
                        "set {} {:?}",
                        op.mnemonic(),
                        BlockOrContinue::from_param(folded)
                    ),
                    _ => write!(f, "set {} {}", op.mnemonic(), folded),
                }
            }
        }
    }
}

/// A genome: an ordered, mutable instruction buffer and its program counter.
/// `pc` is `None` once the program has permanently halted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Program {
    pub instructions: Vec<Instruction>,
    pub pc: Option<usize>,
}

impl Program {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        let pc = if instructions.is_empty() { None } else { Some(0) };
        Self { instructions, pc }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn is_halted(&self) -> bool {
        self.pc.is_none()
    }

    /// Points the program counter at `addr`, folded into the program.
    pub fn jump_to(&mut self, addr: usize) {
        self.pc = if self.instructions.is_empty() {
            None
        } else {
            Some(addr % self.instructions.len())
        };
    }

    /// The seed creature: divides north into a chloro cell, then south,
    /// then keeps dividing whenever energy allows.
    pub fn single_celled_plant() -> Self {
        Self::new(vec![
            Instruction::new(DnaOp::ProgramEndBehavior, BlockOrContinue::Continue as u8),
            Instruction::new(DnaOp::CellDivisionContingencyPlan, BlockOrContinue::Block as u8),
            Instruction::new(DnaOp::CellDivisionEnergyForNewCell, ValueSource::Four as u8),
            Instruction::new(DnaOp::CellDivisionDirection, Direction::N as u8),
            Instruction::new(DnaOp::CellDivisionNewCellType, 1),
            Instruction::new(DnaOp::CellDivision, 0),
            Instruction::new(DnaOp::CellDivisionEnergyForNewCell, ValueSource::One as u8),
            Instruction::new(DnaOp::CellDivisionDirection, Direction::S as u8),
            Instruction::new(DnaOp::CellDivision, 0),
            Instruction::new(DnaOp::CellDivision, 0),
            Instruction::new(DnaOp::CellDivision, 0),
        ])
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R, len: usize) -> Self {
        Self::new((0..len).map(|_| Instruction::random(rng)).collect())
    }

    /// Hex text form, two bytes per instruction (`"1601..."`).
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(self.instructions.len() * 4);
        for instr in &self.instructions {
            out.push_str(&format!("{:02x}{:02x}", instr.op_code, instr.value));
        }
        out
    }

    pub fn from_hex(text: &str) -> anyhow::Result<Self> {
        let digits: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
        if digits.len() % 4 != 0 {
            anyhow::bail!(
                "Program hex must contain 4 digits per instruction, got {} digits",
                digits.len()
            );
        }
        let mut bytes = Vec::with_capacity(digits.len() / 2);
        for pair in digits.chunks_exact(2) {
            let s: String = pair.iter().collect();
            let byte = u8::from_str_radix(&s, 16)
                .map_err(|e| anyhow::anyhow!("Invalid hex byte {:?}: {}", s, e))?;
            bytes.push(byte);
        }
        let instructions = bytes
            .chunks_exact(2)
            .map(|b| Instruction {
                op_code: b[0],
                value: b[1],
            })
            .collect();
        Ok(Self::new(instructions))
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (addr, instr) in self.instructions.iter().enumerate() {
            let marker = if self.pc == Some(addr) { '>' } else { ' ' };
            writeln!(f, "{}{:4}: {}", marker, addr, instr)?;
        }
        Ok(())
    }
}

// ============================================================================
// OPCODES
// ============================================================================

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DnaOp {
    // core instructions
    NoOp,
    CellDivision,
    CellDeath,
    Jump,
    Wait,
    UpdateRegister,
    Calc,
    ModifyDna,

    // parameter setting
    CellDivisionEnergyForNewCell,
    CellDivisionDirection,
    CellDivisionNewCellType,
    CellDivisionForkLabel,
    CellDivisionDoWeFork,
    CellDivisionContingencyPlan,
    JumpOperandLeft,
    JumpOperandRight,
    JumpComparison,
    JumpLabel,
    WaitSource,
    UpdateRegisterSource,
    UpdateRegisterDest,
    CalcOperandLeft,
    CalcOperandRight,
    CalcOperation,
    CalcDest,
    ModifyDnaLabel,
    ModifyDnaSource,
    ValueSourceDirection,
    ValueSourceNumber,
    ValueSourceLabel,
    ProgramEndBehavior,
    MutationChance,
}

pub const DNA_OP_COUNT: usize = 32;
pub const PARAMETER_OP_CODE_START: usize = DnaOp::CellDivisionEnergyForNewCell as usize;
pub const PARAMETER_OP_CODE_COUNT: usize = DNA_OP_COUNT - PARAMETER_OP_CODE_START;

impl DnaOp {
    pub const ALL: [DnaOp; DNA_OP_COUNT] = [
        DnaOp::NoOp,
        DnaOp::CellDivision,
        DnaOp::CellDeath,
        DnaOp::Jump,
        DnaOp::Wait,
        DnaOp::UpdateRegister,
        DnaOp::Calc,
        DnaOp::ModifyDna,
        DnaOp::CellDivisionEnergyForNewCell,
        DnaOp::CellDivisionDirection,
        DnaOp::CellDivisionNewCellType,
        DnaOp::CellDivisionForkLabel,
        DnaOp::CellDivisionDoWeFork,
        DnaOp::CellDivisionContingencyPlan,
        DnaOp::JumpOperandLeft,
        DnaOp::JumpOperandRight,
        DnaOp::JumpComparison,
        DnaOp::JumpLabel,
        DnaOp::WaitSource,
        DnaOp::UpdateRegisterSource,
        DnaOp::UpdateRegisterDest,
        DnaOp::CalcOperandLeft,
        DnaOp::CalcOperandRight,
        DnaOp::CalcOperation,
        DnaOp::CalcDest,
        DnaOp::ModifyDnaLabel,
        DnaOp::ModifyDnaSource,
        DnaOp::ValueSourceDirection,
        DnaOp::ValueSourceNumber,
        DnaOp::ValueSourceLabel,
        DnaOp::ProgramEndBehavior,
        DnaOp::MutationChance,
    ];

    /// Every byte decodes to an opcode.
    pub fn decode(byte: u8) -> DnaOp {
        Self::ALL[byte as usize % DNA_OP_COUNT]
    }

    /// Slot in the parameter table, `None` for core instructions.
    pub fn param_index(self) -> Option<usize> {
        (self as usize).checked_sub(PARAMETER_OP_CODE_START)
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            DnaOp::NoOp => "nop",
            DnaOp::CellDivision => "divide",
            DnaOp::CellDeath => "die",
            DnaOp::Jump => "jump",
            DnaOp::Wait => "wait",
            DnaOp::UpdateRegister => "update-register",
            DnaOp::Calc => "calc",
            DnaOp::ModifyDna => "modify-dna",
            DnaOp::CellDivisionEnergyForNewCell => "divide.energy",
            DnaOp::CellDivisionDirection => "divide.direction",
            DnaOp::CellDivisionNewCellType => "divide.cell-type",
            DnaOp::CellDivisionForkLabel => "divide.fork-label",
            DnaOp::CellDivisionDoWeFork => "divide.fork",
            DnaOp::CellDivisionContingencyPlan => "divide.contingency",
            DnaOp::JumpOperandLeft => "jump.left",
            DnaOp::JumpOperandRight => "jump.right",
            DnaOp::JumpComparison => "jump.comparison",
            DnaOp::JumpLabel => "jump.label",
            DnaOp::WaitSource => "wait.source",
            DnaOp::UpdateRegisterSource => "update-register.source",
            DnaOp::UpdateRegisterDest => "update-register.dest",
            DnaOp::CalcOperandLeft => "calc.left",
            DnaOp::CalcOperandRight => "calc.right",
            DnaOp::CalcOperation => "calc.operation",
            DnaOp::CalcDest => "calc.dest",
            DnaOp::ModifyDnaLabel => "modify-dna.label",
            DnaOp::ModifyDnaSource => "modify-dna.source",
            DnaOp::ValueSourceDirection => "source.direction",
            DnaOp::ValueSourceNumber => "source.number",
            DnaOp::ValueSourceLabel => "source.label",
            DnaOp::ProgramEndBehavior => "end-behavior",
            DnaOp::MutationChance => "mutation-chance",
        }
    }
}

// ============================================================================
// PARAMETER MODEL
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterType {
    ValueSource,
    Register,
    Comparison,
    Operation,
    CodeLabel,
    Direction,
    NewCellType,
    BlockOrContinue,
    Number,
    Boolean,
    MutationChance,
}

impl ParameterType {
    /// Exclusive upper bound of a stored value of this type.
    pub const fn cap(self) -> i32 {
        match self {
            ParameterType::ValueSource => VALUE_SOURCE_COUNT as i32,
            ParameterType::Register => 3,
            ParameterType::Comparison => 12,
            ParameterType::Operation => 22,
            ParameterType::CodeLabel => 65535,
            ParameterType::Direction => 8,
            ParameterType::NewCellType => ORGANIC_PARTICLE_COUNT as i32 + 1,
            ParameterType::BlockOrContinue => 2,
            ParameterType::Number => 256,
            ParameterType::Boolean => 2,
            ParameterType::MutationChance => 256,
        }
    }

    /// Fold any raw value into `[0, cap)`.
    pub fn fold(self, raw: i32) -> i32 {
        raw.rem_euclid(self.cap())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterInfo {
    pub ty: ParameterType,
    pub default_value: i32,
}

const fn info(ty: ParameterType, default_value: i32) -> ParameterInfo {
    ParameterInfo { ty, default_value }
}

/// One entry per parameter-setting opcode, in opcode order.
pub const PARAMETER_INFOS: [ParameterInfo; PARAMETER_OP_CODE_COUNT] = [
    info(ParameterType::ValueSource, ValueSource::Five as i32), // CellDivisionEnergyForNewCell
    info(ParameterType::Direction, Direction::N as i32),
    info(ParameterType::NewCellType, 0),
    info(ParameterType::CodeLabel, 0),
    info(ParameterType::Boolean, 0), // CellDivisionDoWeFork
    info(ParameterType::BlockOrContinue, BlockOrContinue::Block as i32),
    info(ParameterType::ValueSource, ValueSource::RegisterX as i32), // JumpOperandLeft
    info(ParameterType::ValueSource, ValueSource::RegisterX as i32),
    info(ParameterType::Comparison, Comparison::LeftNonZero as i32),
    info(ParameterType::CodeLabel, 0),
    info(ParameterType::ValueSource, ValueSource::Two as i32), // WaitSource
    info(ParameterType::ValueSource, ValueSource::RegisterX as i32),
    info(ParameterType::Register, Register::None as i32),
    info(ParameterType::ValueSource, ValueSource::RegisterX as i32), // CalcOperandLeft
    info(ParameterType::ValueSource, ValueSource::RegisterX as i32),
    info(ParameterType::Operation, Operation::Left as i32),
    info(ParameterType::Register, Register::None as i32),
    info(ParameterType::CodeLabel, 1), // ModifyDnaLabel
    info(ParameterType::ValueSource, ValueSource::RegisterX as i32),
    info(ParameterType::Direction, Direction::N as i32), // ValueSourceDirection
    info(ParameterType::Number, 0),
    info(ParameterType::CodeLabel, 1),
    info(ParameterType::BlockOrContinue, BlockOrContinue::Continue as i32),
    info(ParameterType::MutationChance, 52),
];

/// Fresh parameter slots for a newly created cell.
pub fn default_param_values() -> [i32; PARAMETER_OP_CODE_COUNT] {
    let mut values = [0; PARAMETER_OP_CODE_COUNT];
    for (slot, info) in values.iter_mut().zip(PARAMETER_INFOS.iter()) {
        *slot = info.default_value;
    }
    values
}

// ============================================================================
// PARAMETER VALUE TABLES
// ============================================================================

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    RegisterX,
    RegisterY,
    CellAge,
    CellType,
    CellEnergy,
    OrganismAge,
    Zero,
    One,
    Two,
    Three,
    Four,
    Five,
    NeighborParticleType,
    NeighborIsSameCellType,
    Number,
    Label,
    Random,
}

pub const VALUE_SOURCE_COUNT: usize = 17;

impl ValueSource {
    const ALL: [ValueSource; VALUE_SOURCE_COUNT] = [
        ValueSource::RegisterX,
        ValueSource::RegisterY,
        ValueSource::CellAge,
        ValueSource::CellType,
        ValueSource::CellEnergy,
        ValueSource::OrganismAge,
        ValueSource::Zero,
        ValueSource::One,
        ValueSource::Two,
        ValueSource::Three,
        ValueSource::Four,
        ValueSource::Five,
        ValueSource::NeighborParticleType,
        ValueSource::NeighborIsSameCellType,
        ValueSource::Number,
        ValueSource::Label,
        ValueSource::Random,
    ];

    pub fn from_param(value: i32) -> Self {
        Self::ALL[value.rem_euclid(VALUE_SOURCE_COUNT as i32) as usize]
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    None,
    X,
    Y,
}

impl Register {
    pub fn from_param(value: i32) -> Self {
        match value.rem_euclid(3) {
            1 => Register::X,
            2 => Register::Y,
            _ => Register::None,
        }
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Never,
    Always,
    LeftZero,
    LeftNonZero,
    RightZero,
    RightNonZero,
    LeftGtRight,
    LeftLtRight,
    LeftEqRight,
    LeftNeRight,
    LeftGeRight,
    LeftLeRight,
}

impl Comparison {
    const ALL: [Comparison; 12] = [
        Comparison::Never,
        Comparison::Always,
        Comparison::LeftZero,
        Comparison::LeftNonZero,
        Comparison::RightZero,
        Comparison::RightNonZero,
        Comparison::LeftGtRight,
        Comparison::LeftLtRight,
        Comparison::LeftEqRight,
        Comparison::LeftNeRight,
        Comparison::LeftGeRight,
        Comparison::LeftLeRight,
    ];

    pub fn from_param(value: i32) -> Self {
        Self::ALL[value.rem_euclid(Self::ALL.len() as i32) as usize]
    }

    pub fn evaluate(self, left: i32, right: i32) -> bool {
        match self {
            Comparison::Never => false,
            Comparison::Always => true,
            Comparison::LeftZero => left == 0,
            Comparison::LeftNonZero => left != 0,
            Comparison::RightZero => right == 0,
            Comparison::RightNonZero => right != 0,
            Comparison::LeftGtRight => left > right,
            Comparison::LeftLtRight => left < right,
            Comparison::LeftEqRight => left == right,
            Comparison::LeftNeRight => left != right,
            Comparison::LeftGeRight => left >= right,
            Comparison::LeftLeRight => left <= right,
        }
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Left,
    Zero,
    One,
    Two,
    LeftPlus1,
    LeftPlus2,
    Right,
    RightPlus1,
    RightPlus2,
    LeftPlusRight,
    LeftMinusRight,
    RightMinusLeft,
    NegLeftNegRight,
    LeftDivRight,
    RightDivLeft,
    LeftMult2,
    RightMult2,
    LeftModRight,
    RightModLeft,
    Min,
    Max,
    LeftMultRight,
}

impl Operation {
    const ALL: [Operation; 22] = [
        Operation::Left,
        Operation::Zero,
        Operation::One,
        Operation::Two,
        Operation::LeftPlus1,
        Operation::LeftPlus2,
        Operation::Right,
        Operation::RightPlus1,
        Operation::RightPlus2,
        Operation::LeftPlusRight,
        Operation::LeftMinusRight,
        Operation::RightMinusLeft,
        Operation::NegLeftNegRight,
        Operation::LeftDivRight,
        Operation::RightDivLeft,
        Operation::LeftMult2,
        Operation::RightMult2,
        Operation::LeftModRight,
        Operation::RightModLeft,
        Operation::Min,
        Operation::Max,
        Operation::LeftMultRight,
    ];

    pub fn from_param(value: i32) -> Self {
        Self::ALL[value.rem_euclid(Self::ALL.len() as i32) as usize]
    }

    /// Registers wrap on overflow; division and remainder by zero give 0.
    pub fn apply(self, left: i32, right: i32) -> i32 {
        match self {
            Operation::Left => left,
            Operation::Zero => 0,
            Operation::One => 1,
            Operation::Two => 2,
            Operation::LeftPlus1 => left.wrapping_add(1),
            Operation::LeftPlus2 => left.wrapping_add(2),
            Operation::Right => right,
            Operation::RightPlus1 => right.wrapping_add(1),
            Operation::RightPlus2 => right.wrapping_add(2),
            Operation::LeftPlusRight => left.wrapping_add(right),
            Operation::LeftMinusRight => left.wrapping_sub(right),
            Operation::RightMinusLeft => right.wrapping_sub(left),
            Operation::NegLeftNegRight => left.wrapping_neg().wrapping_sub(right),
            Operation::LeftDivRight => {
                if right == 0 {
                    0
                } else {
                    left.wrapping_div(right)
                }
            }
            Operation::RightDivLeft => {
                if left == 0 {
                    0
                } else {
                    right.wrapping_div(left)
                }
            }
            Operation::LeftMult2 => left.wrapping_mul(2),
            Operation::RightMult2 => right.wrapping_mul(2),
            Operation::LeftModRight => {
                if right == 0 {
                    0
                } else {
                    left.wrapping_rem(right)
                }
            }
            Operation::RightModLeft => {
                if left == 0 {
                    0
                } else {
                    right.wrapping_rem(left)
                }
            }
            Operation::Min => left.min(right),
            Operation::Max => left.max(right),
            Operation::LeftMultRight => left.wrapping_mul(right),
        }
    }
}

/// Eight-way direction. The diagonal offsets do not follow compass
/// convention (NW is `(-1, 1)`); neighbor sensing and division depend on
/// this exact table.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    N,
    S,
    W,
    E,
    NW,
    NE,
    SW,
    SE,
}

impl Direction {
    const ALL: [Direction; 8] = [
        Direction::N,
        Direction::S,
        Direction::W,
        Direction::E,
        Direction::NW,
        Direction::NE,
        Direction::SW,
        Direction::SE,
    ];

    pub fn from_param(value: i32) -> Self {
        Self::ALL[value.rem_euclid(8) as usize]
    }

    pub fn offset(self) -> (i64, i64) {
        match self {
            Direction::N => (0, -1),
            Direction::S => (0, 1),
            Direction::W => (-1, 0),
            Direction::E => (1, 0),
            Direction::NW => (-1, 1),
            Direction::NE => (1, 1),
            Direction::SW => (-1, -1),
            Direction::SE => (1, -1),
        }
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockOrContinue {
    Block,
    Continue,
}

impl BlockOrContinue {
    pub fn from_param(value: i32) -> Self {
        if value.rem_euclid(2) == 0 {
            BlockOrContinue::Block
        } else {
            BlockOrContinue::Continue
        }
    }
}
