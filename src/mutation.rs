// Planet Evo - Grid Particle Artificial Life Sandbox
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

//! Reproduction: copying a program into an offspring with point mutations
//! (insertions, deletions, substitutions) while keeping code labels pointed
//! at the instructions they referred to in the parent.

use rand::Rng;

use crate::dna::{Instruction, Program};

/// What happens to one source instruction during a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Copy,
    /// A new instruction lands in front of the copied one.
    Insert(Instruction),
    Drop,
    Replace(Instruction),
}

/// A label-setting instruction and the absolute address it encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CodeLabel {
    pc: usize,
    addr: usize,
}

/// Copies `source` with each instruction mutated with probability
/// `mutation_chance`. Insert, drop and replace are equally likely.
pub fn mutated_clone<R: Rng + ?Sized>(source: &Program, mutation_chance: f64, rng: &mut R) -> Program {
    rebuild(source, |_| {
        // roll the dice
        if rng.gen::<f64>() >= mutation_chance {
            return Mutation::Copy;
        }
        match rng.gen_range(0..3) {
            0 => Mutation::Insert(Instruction::random(&mut *rng)),
            1 => Mutation::Drop,
            _ => Mutation::Replace(Instruction::random(&mut *rng)),
        }
    })
}

/// Applies one `Mutation` per source instruction, in order, then re-encodes
/// every surviving code label relative to its new address.
pub fn rebuild<F>(source: &Program, mut plan: F) -> Program
where
    F: FnMut(&Instruction) -> Mutation,
{
    let len = source.len();
    let labels: Vec<CodeLabel> = source
        .instructions
        .iter()
        .enumerate()
        .filter(|(_, instr)| instr.sets_label())
        .map(|(pc, instr)| CodeLabel {
            pc,
            addr: pc + instr.value as usize,
        })
        .collect();

    let mut out = Vec::with_capacity(len + len / 8 + 1);
    // new_index[i]: where source instruction i (or the slot it left behind) now lives
    let mut new_index = vec![0usize; len + 1];
    let mut survives = vec![true; len];

    for (i, instr) in source.instructions.iter().enumerate() {
        match plan(instr) {
            Mutation::Copy => {
                new_index[i] = out.len();
                out.push(*instr);
            }
            Mutation::Insert(extra) => {
                out.push(extra);
                new_index[i] = out.len();
                out.push(*instr);
            }
            Mutation::Drop => {
                new_index[i] = out.len();
                survives[i] = false;
            }
            Mutation::Replace(replacement) => {
                new_index[i] = out.len();
                out.push(replacement);
                survives[i] = false;
            }
        }
    }
    new_index[len] = out.len();

    let new_len = out.len();
    let relocate = |addr: usize| -> usize {
        if addr <= len {
            new_index[addr]
        } else {
            new_len + (addr - len)
        }
    };

    for label in labels.iter().filter(|label| survives[label.pc]) {
        let pc = new_index[label.pc];
        let addr = relocate(label.addr);
        out[pc].value = (addr as i64 - pc as i64).rem_euclid(256) as u8;
    }

    Program::new(out)
}
