//! Peephole rewriting and unreachable-code pruning.
//!
//! The central pass. One forward walk applies, first match wins:
//!
//! 1. A test whose fail label starts right after its jump, with the jump
//!    going to the same place: both are redundant.
//! 2. The same shape with a different jump target: the test inverts and
//!    absorbs the jump.
//! 3. A label sitting directly on a jump merges into the jump's target.
//! 4. A label that is a merge target re-emits every label absorbed into it.
//! 5. A jump to the very next label disappears.
//! 6. Any other jump is kept and everything after it is skipped up to the
//!    next referenced label.
//! 7. The entry label is emitted untouched, always.
//! 8. Everything else records its label references and, when it
//!    terminates, triggers the same unreachable skip.
//!
//! Merging two labels makes previously distinct branch targets equal and
//! an inverted test can land directly on rule 1, so the walk reruns until
//! the stream stops changing. Merges whose target is the function-class
//! label can never be emitted mid-walk (that label is defined at the top,
//! behind the walk by the time the merge is recorded); they are appended
//! after the body instead so the error handler stays addressable.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::trace;

use super::classify::{is_unreachable_after, labels_of, ExitOracle};
use super::cleanup::initial_labels;
use super::describe;
use super::types::OptimizationStats;
use super::JumpOptimizer;
use crate::asm::{Instruction, LabelRef, OptError, OptResult};

impl JumpOptimizer {
    /// Run the peephole/prune walk to a fixpoint.
    ///
    /// `entry` is the caller-visible entry label; it is never moved or
    /// absorbed. The function-class label is read from the body itself.
    pub fn peephole(&mut self, body: Vec<Instruction>, entry: u32) -> OptResult<Vec<Instruction>> {
        peephole_body(body, entry, self.oracle.as_ref(), &mut self.stats)
    }
}

fn peephole_body(
    body: Vec<Instruction>,
    entry: u32,
    oracle: &dyn ExitOracle,
    stats: &mut OptimizationStats,
) -> OptResult<Vec<Instruction>> {
    let fc = match (body.first(), body.get(1)) {
        (Some(Instruction::FuncInfo { .. }), Some(Instruction::Label(l))) => *l,
        (Some(Instruction::FuncInfo { .. }), other) => {
            return Err(OptError::MissingEntryLabel {
                found: describe(other),
            })
        }
        (other, _) => {
            return Err(OptError::MissingFuncInfo {
                found: describe(other),
            })
        }
    };

    let mut is = body;
    loop {
        let next = walk(is.clone(), entry, fc, oracle, stats)?;
        if next == is {
            trace!(len = is.len(), "peephole reached fixpoint");
            return Ok(is);
        }
        stats.fixpoint_iterations += 1;
        is = next;
    }
}

fn walk(
    body: Vec<Instruction>,
    entry: u32,
    fc: u32,
    oracle: &dyn ExitOracle,
    stats: &mut OptimizationStats,
) -> OptResult<Vec<Instruction>> {
    let mut used = initial_labels(&body);
    let mut relocated: HashMap<u32, Vec<u32>> = HashMap::new();

    // Consumed as a stack; rewrites push replacement instructions back for
    // another look.
    let mut input = body;
    input.reverse();
    let mut acc: Vec<Instruction> = Vec::with_capacity(input.len());

    while let Some(i) = input.pop() {
        match i {
            test if branch_fail(&test).is_some()
                && matches!(input.last(), Some(Instruction::Jump(_))) =>
            {
                let fail = match branch_fail(&test) {
                    Some(f) => f,
                    None => {
                        acc.push(test);
                        continue;
                    }
                };
                let target = match input.last() {
                    Some(Instruction::Jump(t)) => *t,
                    _ => LabelRef::NONE,
                };
                let about_to_start = !input.is_empty()
                    && is_label_defined(input[..input.len() - 1].iter().rev(), fail.0);
                if about_to_start {
                    if target == fail {
                        // Both paths of the test reach the label that is
                        // about to start; neither instruction is needed.
                        input.pop();
                        stats.redundant_jumps_removed += 1;
                        continue;
                    }
                    match invert_branch(test, target) {
                        Ok(inverted) => {
                            input.pop();
                            input.push(inverted);
                            stats.tests_inverted += 1;
                            continue;
                        }
                        Err(test) => {
                            mark_used(&mut used, fail);
                            acc.push(test);
                        }
                    }
                } else {
                    mark_used(&mut used, fail);
                    acc.push(test);
                }
            }

            Instruction::Label(l) => {
                if l == entry {
                    acc.push(Instruction::Label(l));
                    continue;
                }
                if l != fc {
                    if let Some(Instruction::Jump(t)) = input.last() {
                        // The label sits directly on a jump: record the
                        // merge and drop the definition here. References
                        // keep working; the label is re-emitted at the
                        // target's definition.
                        relocated.entry(t.0).or_default().push(l);
                        stats.labels_merged += 1;
                        continue;
                    }
                }
                if let Some(absorbed) = relocated.remove(&l) {
                    // Push the whole merge group back through the walk so
                    // nested merges flatten and a following jump can keep
                    // absorbing.
                    input.push(Instruction::Label(l));
                    for m in absorbed.into_iter().rev() {
                        input.push(Instruction::Label(m));
                    }
                    continue;
                }
                acc.push(Instruction::Label(l));
            }

            Instruction::Jump(t) => {
                if matches!(input.last(), Some(Instruction::Label(l)) if *l == t.0) {
                    // Jump to the very next label.
                    stats.redundant_jumps_removed += 1;
                    continue;
                }
                mark_used(&mut used, t);
                acc.push(Instruction::Jump(t));
                skip_unreachable(&mut input, &mut acc, &used, stats);
            }

            other => {
                for l in labels_of(&other) {
                    used.insert(l);
                }
                let terminates = is_unreachable_after(&other, oracle);
                acc.push(other);
                if terminates {
                    skip_unreachable(&mut input, &mut acc, &used, stats);
                }
            }
        }
    }

    // Labels merged into the function-class label are appended behind the
    // body; their insertion point at the top is already behind the walk.
    if let Some(absorbed) = relocated.remove(&fc) {
        let mut work: VecDeque<u32> = absorbed.into();
        while let Some(m) = work.pop_front() {
            acc.push(Instruction::Label(m));
            if let Some(nested) = relocated.remove(&m) {
                for x in nested.into_iter().rev() {
                    work.push_front(x);
                }
            }
        }
    }
    if let Some(&label) = relocated.keys().min() {
        return Err(OptError::DanglingRelocation { label });
    }
    Ok(acc)
}

/// Drop instructions until the next label the walk knows to be referenced.
///
/// When that label is the target of the jump just emitted, the jump spans
/// nothing but deleted code and goes away as well.
fn skip_unreachable(
    input: &mut Vec<Instruction>,
    acc: &mut Vec<Instruction>,
    used: &HashSet<u32>,
    stats: &mut OptimizationStats,
) {
    while let Some(i) = input.pop() {
        match i {
            Instruction::Label(l) => {
                if matches!(acc.last(), Some(Instruction::Jump(t)) if t.0 == l) {
                    acc.pop();
                    stats.redundant_jumps_removed += 1;
                    input.push(Instruction::Label(l));
                    return;
                }
                if used.contains(&l) {
                    input.push(Instruction::Label(l));
                    return;
                }
                stats.unreachable_dropped += 1;
            }
            _ => {
                stats.unreachable_dropped += 1;
            }
        }
    }
}

fn mark_used(used: &mut HashSet<u32>, l: LabelRef) {
    if !l.is_none() {
        used.insert(l.0);
    }
}

fn branch_fail(i: &Instruction) -> Option<LabelRef> {
    match i {
        Instruction::Test { fail, .. } | Instruction::TestDst { fail, .. } => Some(*fail),
        _ => None,
    }
}

/// Rebuild a test with the opposite sense branching to `target`, or give
/// the instruction back unchanged when its opcode has no inversion.
fn invert_branch(i: Instruction, target: LabelRef) -> Result<Instruction, Instruction> {
    match i {
        Instruction::Test { op, fail, args } => match op.invert() {
            Some(op) => Ok(Instruction::Test {
                op,
                fail: target,
                args,
            }),
            None => Err(Instruction::Test { op, fail, args }),
        },
        Instruction::TestDst {
            op,
            fail,
            live,
            args,
            dst,
        } => match op.invert() {
            Some(op) => Ok(Instruction::TestDst {
                op,
                fail: target,
                live,
                args,
                dst,
            }),
            None => Err(Instruction::TestDst {
                op,
                fail,
                live,
                args,
                dst,
            }),
        },
        other => Err(other),
    }
}

/// Whether label `l` is defined among the consecutive label definitions at
/// the head of `rest`. Definitions of other labels are skipped: a merged
/// join point defines several labels at one position and any of them may
/// be the one a test is about to land on.
fn is_label_defined<'a>(rest: impl Iterator<Item = &'a Instruction>, l: u32) -> bool {
    for i in rest {
        match i {
            Instruction::Label(x) if *x == l => return true,
            Instruction::Label(_) => {}
            _ => return false,
        }
    }
    false
}
