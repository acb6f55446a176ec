//! Error types for the assembler optimizer.
//!
//! Malformed input is a bug in an upstream pass, not a runtime condition:
//! the optimizer aborts with one of these diagnostics and returns no
//! partial result.

/// Structured diagnostics for assembler input the optimizer cannot accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptError {
    /// The function body does not begin with `func_info`
    MissingFuncInfo { found: String },
    /// `func_info` is not immediately followed by a label definition
    MissingEntryLabel { found: String },
    /// A label number is defined more than once in one function
    DuplicateLabel { label: u32 },
    /// A merged label's insertion point was never reached; the input
    /// contains a backward branch outside the permitted set
    DanglingRelocation { label: u32 },
}

impl std::fmt::Display for OptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingFuncInfo { found } => {
                write!(f, "function body must begin with func_info, found {}", found)
            }
            Self::MissingEntryLabel { found } => {
                write!(
                    f,
                    "func_info must be followed by a label definition, found {}",
                    found
                )
            }
            Self::DuplicateLabel { label } => {
                write!(f, "label {} is defined more than once", label)
            }
            Self::DanglingRelocation { label } => {
                write!(
                    f,
                    "labels merged into {} have no insertion point (illegal backward branch)",
                    label
                )
            }
        }
    }
}

impl std::error::Error for OptError {}

/// Result type for the optimizer.
pub type OptResult<T> = Result<T, OptError>;
