//! Unused-label removal.
//!
//! Computes every label referenced anywhere in the function, then drops
//! label definitions outside that set. A dropped label can leave a tail of
//! code with no way in — when the instruction before the dropped label
//! never falls through, everything up to the next label goes with it.
//!
//! The labels of the `func_info` prefix are seeded as used: they are
//! addressable from outside the function and survive even with no local
//! reference.

use std::collections::HashSet;

use super::classify::{is_unreachable_after, labels_of, ExitOracle};
use super::types::OptimizationStats;
use super::JumpOptimizer;
use crate::asm::Instruction;

impl JumpOptimizer {
    /// Remove label definitions nothing references, and any code kept
    /// alive only by them.
    pub fn remove_unused_labels(&mut self, body: Vec<Instruction>) -> Vec<Instruction> {
        remove_unused(body, self.oracle.as_ref(), &mut self.stats)
    }
}

/// The caller-visible labels of the function prefix: every label defined
/// around the `func_info` header, before the first body instruction.
pub(super) fn initial_labels(body: &[Instruction]) -> HashSet<u32> {
    let mut seed = HashSet::new();
    for i in body {
        match i {
            Instruction::Label(l) => {
                seed.insert(*l);
            }
            Instruction::FuncInfo { .. } => {}
            _ => break,
        }
    }
    seed
}

fn remove_unused(
    body: Vec<Instruction>,
    oracle: &dyn ExitOracle,
    stats: &mut OptimizationStats,
) -> Vec<Instruction> {
    let mut used = initial_labels(&body);
    for i in &body {
        for l in labels_of(i) {
            used.insert(l);
        }
    }

    let mut input = body;
    input.reverse();
    let mut acc: Vec<Instruction> = Vec::with_capacity(input.len());

    while let Some(i) = input.pop() {
        if let Instruction::Label(l) = i {
            if !used.contains(&l) {
                stats.unused_labels_removed += 1;
                let dead_tail = acc
                    .last()
                    .is_some_and(|prev| is_unreachable_after(prev, oracle));
                if dead_tail {
                    // The code below was reachable only through this label.
                    while let Some(next) = input.last() {
                        if matches!(next, Instruction::Label(_)) {
                            break;
                        }
                        input.pop();
                        stats.unreachable_dropped += 1;
                    }
                }
                continue;
            }
        }
        acc.push(i);
    }
    acc
}
