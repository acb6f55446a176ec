//! Assembler-level representation of Tern VM code
//!
//! This module defines the symbolic form the back-end works on between code
//! generation and bytecode emission: tagged instructions with label
//! references, and the function/module records that carry them through the
//! pass pipeline.
//!
//! # Module Structure
//!
//! - `instruction`: tagged instruction variants and operand shapes
//! - `module`: function and compilation-unit records
//! - `error`: structured errors for malformed assembler input

pub mod error;
pub mod instruction;
pub mod module;

pub use error::{OptError, OptResult};
pub use instruction::{
    BlockOp, BsKind, ExtFunc, Instruction, LabelRef, Operand, TestOp,
};
pub use module::{Attribute, Export, Function, Module};
