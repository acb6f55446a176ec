//! Function and compilation-unit records
//!
//! These records carry assembler code through the back-end pipeline. The
//! optimizer consumes and produces them without touching anything except
//! each function's body; `literal_count` in particular is forwarded
//! unchanged so later passes can keep indexing the literal pool.

use std::fmt;

use super::instruction::Instruction;

/// An exported `name/arity` with its compilation-unit entry label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub name: String,
    pub arity: u32,
    pub label: u32,
}

/// A module attribute, carried opaquely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// One function's assembler code.
///
/// `entry` is the compilation-unit-wide entry label callers branch to; it
/// must never be deleted or relocated. The body starts with `func_info`
/// followed by the entry label definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub arity: u32,
    pub entry: u32,
    pub body: Vec<Instruction>,
}

impl Function {
    pub fn new(name: impl Into<String>, arity: u32, entry: u32, body: Vec<Instruction>) -> Self {
        Self {
            name: name.into(),
            arity,
            entry,
            body,
        }
    }
}

impl fmt::Display for Function {
    /// Renders an assembler listing, one instruction per line with label
    /// definitions outdented.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, ";; {}/{} entry @{}", self.name, self.arity, self.entry)?;
        for i in &self.body {
            match i {
                Instruction::Label(_) | Instruction::FuncInfo { .. } => writeln!(f, "{}", i)?,
                _ => writeln!(f, "    {}", i)?,
            }
        }
        Ok(())
    }
}

/// A whole compilation unit as the back-end sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub name: String,
    pub exports: Vec<Export>,
    pub attributes: Vec<Attribute>,
    pub functions: Vec<Function>,
    pub literal_count: u32,
}

impl Module {
    /// Create an empty module with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exports: Vec::new(),
            attributes: Vec::new(),
            functions: Vec::new(),
            literal_count: 0,
        }
    }

    /// Builder-style helper appending one function.
    pub fn with_function(mut self, f: Function) -> Self {
        self.functions.push(f);
        self
    }
}
