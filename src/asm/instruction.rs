//! Tagged instruction variants for the Tern VM assembler
//!
//! Instructions at this stage are symbolic: branches name labels rather than
//! byte offsets, and operands are registers or immediates. The optimizer
//! inspects a small set of shapes by name and forwards everything else
//! unchanged; `Other` is the catch-all for instructions the back-end never
//! needs to look inside (no labels, falls through, never raises).

use std::fmt;

/// A reference to a function-local label.
///
/// `LabelRef(0)` is the sentinel "no label" and never names a real position;
/// it is filtered out during label extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelRef(pub u32);

impl LabelRef {
    /// The "no failure label" sentinel.
    pub const NONE: LabelRef = LabelRef(0);

    /// Whether this reference is the sentinel rather than a real label.
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for LabelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "@-")
        } else {
            write!(f, "@{}", self.0)
        }
    }
}

/// An external call target: the `{module, function, arity}` triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtFunc {
    pub module: String,
    pub function: String,
    pub arity: u32,
}

impl ExtFunc {
    pub fn new(module: impl Into<String>, function: impl Into<String>, arity: u32) -> Self {
        Self {
            module: module.into(),
            function: function.into(),
            arity,
        }
    }
}

impl fmt::Display for ExtFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.module, self.function, self.arity)
    }
}

/// Register or immediate operand.
///
/// The optimizer never interprets operands; they only participate in
/// equality when identical tails are compared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    /// Argument/scratch register
    X(u32),
    /// Stack slot
    Y(u32),
    /// Small integer immediate
    Int(i64),
    /// Atom immediate
    Atom(String),
    /// The empty list
    Nil,
    /// Index into the module literal pool
    Literal(u32),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::X(n) => write!(f, "x{}", n),
            Operand::Y(n) => write!(f, "y{}", n),
            Operand::Int(i) => write!(f, "{}", i),
            Operand::Atom(a) => write!(f, "'{}'", a),
            Operand::Nil => write!(f, "[]"),
            Operand::Literal(i) => write!(f, "lit#{}", i),
        }
    }
}

/// Conditional-test opcodes.
///
/// A test branches to its fail label when the condition does not hold and
/// falls through otherwise. Exactly the symmetric comparisons are
/// invertible; everything else has no complementary opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestOp {
    IsLt,
    IsGe,
    IsEq,
    IsNe,
    IsEqExact,
    IsNeExact,
    IsInteger,
    IsFloat,
    IsNumber,
    IsAtom,
    IsBoolean,
    IsNil,
    IsList,
    IsNonemptyList,
    IsTuple,
    IsMap,
    IsBinary,
    IsFunction,
    TestArity,
}

impl TestOp {
    /// The complementary test, if one exists.
    ///
    /// Only the three symmetric comparison pairs invert; type tests and
    /// arity checks have no single-opcode negation.
    pub fn invert(self) -> Option<TestOp> {
        match self {
            TestOp::IsGe => Some(TestOp::IsLt),
            TestOp::IsLt => Some(TestOp::IsGe),
            TestOp::IsEq => Some(TestOp::IsNe),
            TestOp::IsNe => Some(TestOp::IsEq),
            TestOp::IsEqExact => Some(TestOp::IsNeExact),
            TestOp::IsNeExact => Some(TestOp::IsEqExact),
            _ => None,
        }
    }

    /// Assembler mnemonic for this test.
    pub fn name(self) -> &'static str {
        match self {
            TestOp::IsLt => "is_lt",
            TestOp::IsGe => "is_ge",
            TestOp::IsEq => "is_eq",
            TestOp::IsNe => "is_ne",
            TestOp::IsEqExact => "is_eq_exact",
            TestOp::IsNeExact => "is_ne_exact",
            TestOp::IsInteger => "is_integer",
            TestOp::IsFloat => "is_float",
            TestOp::IsNumber => "is_number",
            TestOp::IsAtom => "is_atom",
            TestOp::IsBoolean => "is_boolean",
            TestOp::IsNil => "is_nil",
            TestOp::IsList => "is_list",
            TestOp::IsNonemptyList => "is_nonempty_list",
            TestOp::IsTuple => "is_tuple",
            TestOp::IsMap => "is_map",
            TestOp::IsBinary => "is_binary",
            TestOp::IsFunction => "is_function",
            TestOp::TestArity => "test_arity",
        }
    }
}

/// Binary-syntax opcodes that carry a fail label in first position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BsKind {
    Init2,
    InitBits,
    PutInteger,
    PutFloat,
    PutBinary,
    PutUtf8,
    PutUtf16,
    PutUtf32,
    Add,
    Append,
    Utf8Size,
    Utf16Size,
}

impl BsKind {
    /// Assembler mnemonic for this opcode.
    pub fn name(self) -> &'static str {
        match self {
            BsKind::Init2 => "bs_init2",
            BsKind::InitBits => "bs_init_bits",
            BsKind::PutInteger => "bs_put_integer",
            BsKind::PutFloat => "bs_put_float",
            BsKind::PutBinary => "bs_put_binary",
            BsKind::PutUtf8 => "bs_put_utf8",
            BsKind::PutUtf16 => "bs_put_utf16",
            BsKind::PutUtf32 => "bs_put_utf32",
            BsKind::Add => "bs_add",
            BsKind::Append => "bs_append",
            BsKind::Utf8Size => "bs_utf8_size",
            BsKind::Utf16Size => "bs_utf16_size",
        }
    }
}

/// Straight-line operations allowed inside a `block`.
///
/// Blocks are opaque to control flow and cannot define labels, but three
/// shapes carry a fail-label reference that label queries must see.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlockOp {
    /// Register move or term construction; carries no labels
    Set { dst: Operand, srcs: Vec<Operand> },
    /// Built-in call with a failure label
    Bif {
        op: String,
        fail: LabelRef,
        srcs: Vec<Operand>,
        dst: Operand,
    },
    /// Heap allocation fused with a garbage-collecting built-in
    AllocGcBif {
        op: String,
        fail: LabelRef,
        live: u32,
        srcs: Vec<Operand>,
        dst: Operand,
    },
    /// Catch-context setup naming its handler label
    Catch { dst: Operand, fail: LabelRef },
}

/// One symbolic Tern VM instruction.
///
/// The set is deliberately wider than what the optimizer rewrites: any
/// variant not recognized by the classifiers is forwarded unchanged. New
/// instruction shapes either fit `Other` (no labels, falls through, never
/// raises) or must be registered in the classifiers and the label
/// extraction of `opt::classify`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// Defines label `L` at this position
    Label(u32),
    /// Function header; terminates (its fall-through handler is outside
    /// normal control flow)
    FuncInfo {
        module: String,
        function: String,
        arity: u32,
    },
    /// Unconditional branch
    Jump(LabelRef),
    /// Conditional branch to `fail` when the test does not hold
    Test {
        op: TestOp,
        fail: LabelRef,
        args: Vec<Operand>,
    },
    /// Test variant writing a destination register
    TestDst {
        op: TestOp,
        fail: LabelRef,
        live: u32,
        args: Vec<Operand>,
        dst: Operand,
    },
    /// Multi-way branch on a value with a default
    SelectVal {
        src: Operand,
        fail: LabelRef,
        cases: Vec<(Operand, LabelRef)>,
    },
    /// Multi-way branch on tuple arity with a default
    SelectTupleArity {
        src: Operand,
        fail: LabelRef,
        cases: Vec<(Operand, LabelRef)>,
    },
    /// Ordinary local call; `target` is a compilation-unit entry label
    Call { arity: u32, target: LabelRef },
    /// Tail call deallocating the frame
    CallLast {
        arity: u32,
        target: LabelRef,
        dealloc: u32,
    },
    /// Tail call without a frame
    CallOnly { arity: u32, target: LabelRef },
    /// Ordinary external call
    CallExt { arity: u32, func: ExtFunc },
    /// External tail call deallocating the frame
    CallExtLast {
        arity: u32,
        func: ExtFunc,
        dealloc: u32,
    },
    /// External tail call without a frame
    CallExtOnly { arity: u32, func: ExtFunc },
    /// Tail `apply` deallocating the frame
    ApplyLast { arity: u32, dealloc: u32 },
    /// Return to the caller
    Return,
    /// Suspend until a message arrives, then branch to the receive loop
    Wait(LabelRef),
    /// Suspend with a timeout; branch on wake-up
    WaitTimeout { resume: LabelRef, timeout: Operand },
    /// Pick up the next mailbox message or branch when empty
    LoopRec { done: LabelRef, dst: Operand },
    /// Restart the receive loop
    LoopRecEnd(LabelRef),
    /// Install a try-context with its handler label
    Try { reg: Operand, handler: LabelRef },
    /// Install a catch-context with its handler label
    Catch { reg: Operand, handler: LabelRef },
    /// Invalidate a stack slot
    Kill(Operand),
    /// Free stack slots before a tail position
    Deallocate(u32),
    /// Opaque straight-line fragment; cannot define labels
    Block(Vec<BlockOp>),
    /// Built-in call with a failure label
    Bif {
        op: String,
        fail: LabelRef,
        args: Vec<Operand>,
        dst: Operand,
    },
    /// Garbage-collecting built-in call with a failure label
    GcBif {
        op: String,
        fail: LabelRef,
        live: u32,
        args: Vec<Operand>,
        dst: Operand,
    },
    /// Binary-syntax operation; fail label in first position
    BsOp {
        kind: BsKind,
        fail: LabelRef,
        args: Vec<Operand>,
    },
    /// Convert a match context back to a binary
    BsContextToBinary(Operand),
    /// Register-to-register move
    Move { src: Operand, dst: Operand },
    /// Raise a `case_clause` error
    CaseEnd(Operand),
    /// Raise an `if_clause` error
    IfEnd,
    /// Raise a `try_clause` error
    TryCaseEnd(Operand),
    /// Raise a `badmatch` error
    Badmatch(Operand),
    /// Opaque pass-through: no labels, falls through, never raises
    Other { name: String, args: Vec<Operand> },
}

impl Instruction {
    /// Assembler mnemonic for this instruction.
    pub fn mnemonic(&self) -> &str {
        match self {
            Instruction::Label(_) => "label",
            Instruction::FuncInfo { .. } => "func_info",
            Instruction::Jump(_) => "jump",
            Instruction::Test { op, .. } | Instruction::TestDst { op, .. } => op.name(),
            Instruction::SelectVal { .. } => "select_val",
            Instruction::SelectTupleArity { .. } => "select_tuple_arity",
            Instruction::Call { .. } => "call",
            Instruction::CallLast { .. } => "call_last",
            Instruction::CallOnly { .. } => "call_only",
            Instruction::CallExt { .. } => "call_ext",
            Instruction::CallExtLast { .. } => "call_ext_last",
            Instruction::CallExtOnly { .. } => "call_ext_only",
            Instruction::ApplyLast { .. } => "apply_last",
            Instruction::Return => "return",
            Instruction::Wait(_) => "wait",
            Instruction::WaitTimeout { .. } => "wait_timeout",
            Instruction::LoopRec { .. } => "loop_rec",
            Instruction::LoopRecEnd(_) => "loop_rec_end",
            Instruction::Try { .. } => "try",
            Instruction::Catch { .. } => "catch",
            Instruction::Kill(_) => "kill",
            Instruction::Deallocate(_) => "deallocate",
            Instruction::Block(_) => "block",
            Instruction::Bif { .. } => "bif",
            Instruction::GcBif { .. } => "gc_bif",
            Instruction::BsOp { kind, .. } => kind.name(),
            Instruction::BsContextToBinary(_) => "bs_context_to_binary",
            Instruction::Move { .. } => "move",
            Instruction::CaseEnd(_) => "case_end",
            Instruction::IfEnd => "if_end",
            Instruction::TryCaseEnd(_) => "try_case_end",
            Instruction::Badmatch(_) => "badmatch",
            Instruction::Other { name, .. } => name,
        }
    }

    /// The label this instruction defines, if it is a label definition.
    pub fn defined_label(&self) -> Option<u32> {
        match self {
            Instruction::Label(l) => Some(*l),
            _ => None,
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Operand]) -> fmt::Result {
    for (i, a) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        } else {
            write!(f, " ")?;
        }
        write!(f, "{}", a)?;
    }
    Ok(())
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Label(l) => write!(f, "label {}", l),
            Instruction::FuncInfo {
                module,
                function,
                arity,
            } => write!(f, "func_info {}:{}/{}", module, function, arity),
            Instruction::Jump(t) => write!(f, "jump {}", t),
            Instruction::Test { op, fail, args } => {
                write!(f, "{} {}", op.name(), fail)?;
                write_args(f, args)
            }
            Instruction::TestDst {
                op,
                fail,
                live,
                args,
                dst,
            } => {
                write!(f, "{} {} live={}", op.name(), fail, live)?;
                write_args(f, args)?;
                write!(f, " -> {}", dst)
            }
            Instruction::SelectVal { src, fail, cases } => {
                write!(f, "select_val {} {} [{} cases]", src, fail, cases.len())
            }
            Instruction::SelectTupleArity { src, fail, cases } => {
                write!(
                    f,
                    "select_tuple_arity {} {} [{} cases]",
                    src,
                    fail,
                    cases.len()
                )
            }
            Instruction::Call { arity, target } => write!(f, "call/{} {}", arity, target),
            Instruction::CallLast {
                arity,
                target,
                dealloc,
            } => write!(f, "call_last/{} {} d={}", arity, target, dealloc),
            Instruction::CallOnly { arity, target } => {
                write!(f, "call_only/{} {}", arity, target)
            }
            Instruction::CallExt { arity, func } => write!(f, "call_ext/{} {}", arity, func),
            Instruction::CallExtLast {
                arity,
                func,
                dealloc,
            } => write!(f, "call_ext_last/{} {} d={}", arity, func, dealloc),
            Instruction::CallExtOnly { arity, func } => {
                write!(f, "call_ext_only/{} {}", arity, func)
            }
            Instruction::ApplyLast { arity, dealloc } => {
                write!(f, "apply_last/{} d={}", arity, dealloc)
            }
            Instruction::Return => write!(f, "return"),
            Instruction::Wait(t) => write!(f, "wait {}", t),
            Instruction::WaitTimeout { resume, timeout } => {
                write!(f, "wait_timeout {} {}", resume, timeout)
            }
            Instruction::LoopRec { done, dst } => write!(f, "loop_rec {} {}", done, dst),
            Instruction::LoopRecEnd(t) => write!(f, "loop_rec_end {}", t),
            Instruction::Try { reg, handler } => write!(f, "try {} {}", reg, handler),
            Instruction::Catch { reg, handler } => write!(f, "catch {} {}", reg, handler),
            Instruction::Kill(r) => write!(f, "kill {}", r),
            Instruction::Deallocate(n) => write!(f, "deallocate {}", n),
            Instruction::Block(ops) => write!(f, "block [{} ops]", ops.len()),
            Instruction::Bif { op, fail, args, dst } => {
                write!(f, "bif {} {}", op, fail)?;
                write_args(f, args)?;
                write!(f, " -> {}", dst)
            }
            Instruction::GcBif {
                op,
                fail,
                live,
                args,
                dst,
            } => {
                write!(f, "gc_bif {} {} live={}", op, fail, live)?;
                write_args(f, args)?;
                write!(f, " -> {}", dst)
            }
            Instruction::BsOp { kind, fail, args } => {
                write!(f, "{} {}", kind.name(), fail)?;
                write_args(f, args)
            }
            Instruction::BsContextToBinary(r) => write!(f, "bs_context_to_binary {}", r),
            Instruction::Move { src, dst } => write!(f, "move {} -> {}", src, dst),
            Instruction::CaseEnd(r) => write!(f, "case_end {}", r),
            Instruction::IfEnd => write!(f, "if_end"),
            Instruction::TryCaseEnd(r) => write!(f, "try_case_end {}", r),
            Instruction::Badmatch(r) => write!(f, "badmatch {}", r),
            Instruction::Other { name, args } => {
                write!(f, "{}", name)?;
                write_args(f, args)
            }
        }
    }
}
