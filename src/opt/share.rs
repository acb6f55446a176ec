//! Tail sharing.
//!
//! Two labels whose code ends in the same terminated instruction sequence
//! do not both need a copy: the earlier one can jump into the later one.
//! Before looking for shared tails the pass inserts an explicit jump
//! wherever code would fall through into a label, so rewriting a label's
//! body to a jump can never bypass code that used to run on the way in.

use std::collections::HashMap;

use super::classify::{is_unreachable_after, ExitOracle};
use super::types::OptimizationStats;
use super::JumpOptimizer;
use crate::asm::{Instruction, LabelRef};

impl JumpOptimizer {
    /// Collapse identical instruction tails onto a single label.
    pub fn share(&mut self, body: Vec<Instruction>) -> Vec<Instruction> {
        share_body(body, self.oracle.as_ref(), &mut self.stats)
    }
}

fn share_body(
    body: Vec<Instruction>,
    oracle: &dyn ExitOracle,
    stats: &mut OptimizationStats,
) -> Vec<Instruction> {
    // The walk runs from the function end upward, so the stream is
    // reversed once here and groups are collected bottom-up.
    let rev = eliminate_fallthroughs(body, oracle, stats);

    // Tails are keyed bottom-up: seq[0] is the terminating instruction.
    let mut seen: HashMap<Vec<Instruction>, u32> = HashMap::new();
    let mut seq: Vec<Instruction> = Vec::new();
    let mut groups: Vec<Vec<Instruction>> = Vec::new();
    let mut trailer: Vec<Instruction> = Vec::new();

    let mut it = rev.into_iter();
    while let Some(i) = it.next() {
        match i {
            Instruction::Label(l) => {
                if seq.is_empty() {
                    groups.push(vec![Instruction::Label(l)]);
                } else if let Some(&shared) = seen.get(&seq) {
                    stats.tails_shared += 1;
                    groups.push(vec![
                        Instruction::Label(l),
                        Instruction::Jump(LabelRef(shared)),
                    ]);
                    seq.clear();
                } else {
                    seen.insert(seq.clone(), l);
                    let mut group = Vec::with_capacity(seq.len() + 1);
                    group.push(Instruction::Label(l));
                    group.extend(seq.drain(..).rev());
                    groups.push(group);
                }
            }
            Instruction::FuncInfo { .. } => {
                // Sharing stops at the sentinel; it and everything above it
                // are emitted verbatim. The entry label just above closed
                // the last tail (the layout guarantees it), so nothing is
                // pending here.
                if !seq.is_empty() {
                    groups.push(seq.drain(..).rev().collect());
                }
                trailer.push(i);
                trailer.extend(it);
                trailer.reverse();
                break;
            }
            other => {
                if is_unreachable_after(&other, oracle) {
                    // A fresh candidate tail; whatever was accumulating
                    // below had no label and is unreachable.
                    seq.clear();
                }
                seq.push(other);
            }
        }
    }

    let mut out = trailer;
    out.extend(groups.into_iter().rev().flatten());
    out
}

/// Insert a jump between every instruction that falls through and the
/// label definition after it. Returns the stream in reverse order for the
/// sharing walk.
fn eliminate_fallthroughs(
    body: Vec<Instruction>,
    oracle: &dyn ExitOracle,
    stats: &mut OptimizationStats,
) -> Vec<Instruction> {
    let mut out = Vec::with_capacity(body.len());
    let mut it = body.into_iter().peekable();
    while let Some(i) = it.next() {
        let next_label = match it.peek() {
            Some(Instruction::Label(l)) => Some(*l),
            _ => None,
        };
        let falls_through = next_label.is_some()
            && !matches!(i, Instruction::Label(_))
            && !is_unreachable_after(&i, oracle);
        out.push(i);
        if falls_through {
            if let Some(l) = next_label {
                stats.fallthrough_jumps_inserted += 1;
                out.push(Instruction::Jump(LabelRef(l)));
            }
        }
    }
    out.reverse();
    out
}
