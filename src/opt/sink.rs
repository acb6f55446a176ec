//! Exit sinking.
//!
//! An exit instruction sitting at its own label in the middle of a
//! function fragments the hot path. This pass relocates such stubs — the
//! label, at most one straight-line setup instruction, and the exit — to
//! an append-only region after the last original instruction.
//!
//! Runs after tail sharing, so every label is entered through an explicit
//! branch and lifting a label out of the stream cannot change what the
//! code before it falls into. Pulling a stub out orphans the instruction
//! that sat above its label; that instruction is fed back into the walk,
//! which lets a stack of adjacent stubs relocate one after another.

use super::classify::{is_exit_instruction, ExitOracle};
use super::types::OptimizationStats;
use super::JumpOptimizer;
use crate::asm::Instruction;

impl JumpOptimizer {
    /// Move exit-terminated stubs to the physical end of the function.
    pub fn sink_exits(&mut self, body: Vec<Instruction>) -> Vec<Instruction> {
        sink_body(body, self.oracle.as_ref(), &mut self.stats)
    }
}

fn is_label(i: &Instruction) -> bool {
    matches!(i, Instruction::Label(_))
}

fn is_func_info(i: &Instruction) -> bool {
    matches!(i, Instruction::FuncInfo { .. })
}

fn is_setup(i: &Instruction) -> bool {
    matches!(
        i,
        Instruction::Block(_) | Instruction::BsContextToBinary(_)
    )
}

fn sink_body(
    body: Vec<Instruction>,
    oracle: &dyn ExitOracle,
    stats: &mut OptimizationStats,
) -> Vec<Instruction> {
    // `input` is consumed as a stack so a relocation can push the newly
    // orphaned instruction back for reconsideration.
    let mut input = body;
    input.reverse();

    let mut acc: Vec<Instruction> = Vec::new();
    let mut tail: Vec<Instruction> = Vec::new();

    while let Some(i) = input.pop() {
        if !is_exit_instruction(&i, oracle) {
            acc.push(i);
            continue;
        }

        let n = acc.len();
        if n >= 2 && is_setup(&acc[n - 1]) && is_label(&acc[n - 2]) {
            if n < 3 || is_func_info(&acc[n - 3]) {
                // The stub at the very top of the function stays put.
                acc.push(i);
                continue;
            }
            // acc ends [orphaned, label, setup]; the stub moves, the
            // orphaned instruction goes back on the input.
            let mut stub = acc.split_off(n - 3);
            let orphaned = stub.remove(0);
            tail.extend(stub);
            tail.push(i);
            input.push(orphaned);
            stats.exits_sunk += 1;
        } else if n >= 2 && is_label(&acc[n - 1]) && !is_func_info(&acc[n - 2]) {
            let mut stub = acc.split_off(n - 2);
            let orphaned = stub.remove(0);
            tail.extend(stub);
            tail.push(i);
            input.push(orphaned);
            stats.exits_sunk += 1;
        } else {
            acc.push(i);
        }
    }

    acc.extend(tail);
    acc
}
