//! Instruction classifiers and label extraction.
//!
//! Three questions drive every pass in this module: does an instruction
//! ever fall through to its successor, does it always raise, and which
//! function-local labels does it reference. The answers are pure functions
//! over the instruction shapes; any shape not listed here is in the
//! falls-through / never-raises / carries-no-labels class by construction.

use smallvec::SmallVec;

use crate::asm::{BlockOp, ExtFunc, Instruction, LabelRef};

/// Answers whether calling an external function always raises.
///
/// Implemented by the runtime-knowledge layer of the compiler; the
/// optimizer only consumes it. [`RaisingBifs`] is the shipped default.
pub trait ExitOracle {
    fn always_raises(&self, func: &ExtFunc) -> bool;
}

/// Exit knowledge for the Tern runtime's own error primitives.
#[derive(Debug, Clone, Copy, Default)]
pub struct RaisingBifs;

impl ExitOracle for RaisingBifs {
    fn always_raises(&self, func: &ExtFunc) -> bool {
        if func.module != "tern" {
            return false;
        }
        matches!(
            (func.function.as_str(), func.arity),
            ("error", 1 | 2)
                | ("exit", 1)
                | ("throw", 1)
                | ("raise", 2 | 3)
                | ("nif_error", 1 | 2)
        )
    }
}

/// Whether control flow can never reach the instruction after `i`.
///
/// True for unconditional branches, tail calls, returns, multi-way
/// selects, receive-loop terminators, and everything [`is_exit_instruction`]
/// accepts. `func_info` terminates as well: it falls through only into an
/// error handler that normal control flow never enters.
pub fn is_unreachable_after(i: &Instruction, oracle: &dyn ExitOracle) -> bool {
    match i {
        Instruction::FuncInfo { .. }
        | Instruction::Return
        | Instruction::Jump(_)
        | Instruction::CallLast { .. }
        | Instruction::CallOnly { .. }
        | Instruction::CallExtLast { .. }
        | Instruction::CallExtOnly { .. }
        | Instruction::ApplyLast { .. }
        | Instruction::SelectVal { .. }
        | Instruction::SelectTupleArity { .. }
        | Instruction::LoopRecEnd(_)
        | Instruction::Wait(_) => true,
        other => is_exit_instruction(other, oracle),
    }
}

/// Whether `i` always raises. A strict subset of [`is_unreachable_after`].
pub fn is_exit_instruction(i: &Instruction, oracle: &dyn ExitOracle) -> bool {
    match i {
        Instruction::CaseEnd(_)
        | Instruction::IfEnd
        | Instruction::TryCaseEnd(_)
        | Instruction::Badmatch(_) => true,
        Instruction::CallExt { func, .. } => oracle.always_raises(func),
        _ => false,
    }
}

/// Function-local labels referenced by `i`.
///
/// The sentinel `@0` is filtered out, and so are the entry labels of
/// `call`/`call_last`/`call_only` targets: those name other functions and
/// are not local branch targets. Labels inside `block` are invisible here;
/// [`is_label_used_in`] is the query that sees them.
pub fn labels_of(i: &Instruction) -> SmallVec<[u32; 4]> {
    let mut out = SmallVec::new();
    let mut add = |l: LabelRef| {
        if !l.is_none() {
            out.push(l.0);
        }
    };
    match i {
        Instruction::Test { fail, .. } | Instruction::TestDst { fail, .. } => add(*fail),
        Instruction::SelectVal { fail, cases, .. }
        | Instruction::SelectTupleArity { fail, cases, .. } => {
            add(*fail);
            for (_, l) in cases {
                add(*l);
            }
        }
        Instruction::Try { handler, .. } | Instruction::Catch { handler, .. } => add(*handler),
        Instruction::Jump(l) => add(*l),
        Instruction::LoopRec { done, .. } => add(*done),
        Instruction::LoopRecEnd(l) => add(*l),
        Instruction::Wait(l) => add(*l),
        Instruction::WaitTimeout { resume, .. } => add(*resume),
        Instruction::Bif { fail, .. } => add(*fail),
        Instruction::GcBif { fail, .. } => add(*fail),
        Instruction::BsOp { fail, .. } => add(*fail),
        _ => {}
    }
    out
}

/// Whether label `l` is referenced anywhere in `is`, including inside
/// `block` fragments.
///
/// Exported for other back-end passes that must know whether a label can
/// be retired. Inside blocks, exactly the `bif`, `alloc`+`gc_bif`, and
/// `catch` shapes carry labels.
pub fn is_label_used_in(l: u32, is: &[Instruction]) -> bool {
    is.iter().any(|i| match i {
        Instruction::Block(ops) => ops.iter().any(|op| block_op_uses(op, l)),
        other => labels_of(other).contains(&l),
    })
}

fn block_op_uses(op: &BlockOp, l: u32) -> bool {
    match op {
        BlockOp::Bif { fail, .. }
        | BlockOp::AllocGcBif { fail, .. }
        | BlockOp::Catch { fail, .. } => fail.0 == l,
        BlockOp::Set { .. } => false,
    }
}
