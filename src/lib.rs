//! Tern assembler representation and back-end optimization passes.
//!
//! This crate provides the symbolic assembler layer of the Tern VM bytecode
//! compiler: the tagged instruction representation produced by code
//! generation, and the jump/unreachable-code optimizer that runs over it
//! before final bytecode emission.
//!
//! # Architecture
//!
//! The crate is split into two modules:
//!
//! 1. **Assembler data model** (`asm` module)
//!    - Tagged instruction variants with symbolic label references
//!    - Function and module records as they flow through the back-end
//!    - Structured errors for malformed input
//!
//! 2. **Jump optimizer** (`opt` module)
//!    - Tail sharing: collapses identical instruction tails
//!    - Exit sinking: moves cold error stubs to the end of the function
//!    - Peephole + prune: inverts tests, drops redundant jumps, deletes
//!      unreachable code, merges labels (run to a fixpoint)
//!    - Label cleanup: removes labels nothing references
//!
//! # Example
//!
//! ```rust
//! use tern_asm::asm::{Function, Instruction, LabelRef, Module};
//! use tern_asm::opt::optimize_module;
//!
//! let body = vec![
//!     Instruction::FuncInfo {
//!         module: "demo".into(),
//!         function: "pick".into(),
//!         arity: 2,
//!     },
//!     Instruction::Label(1),
//!     Instruction::Jump(LabelRef(2)),
//!     Instruction::Label(2),
//!     Instruction::Return,
//! ];
//! let module = Module::new("demo").with_function(Function::new("pick", 2, 1, body));
//!
//! let optimized = optimize_module(module).unwrap();
//! let body = &optimized.functions[0].body;
//!
//! // The jump to the immediately following label is gone, and the label
//! // it referenced is no longer needed either.
//! assert!(!body.contains(&Instruction::Jump(LabelRef(2))));
//! assert!(!body.contains(&Instruction::Label(2)));
//! ```

pub mod asm;
pub mod opt;

pub use asm::{Function, Instruction, LabelRef, Module, OptError, OptResult};
pub use opt::{clean_module, optimize_module, JumpOptimizer};
