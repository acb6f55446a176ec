//! Jump and unreachable-code optimizer
//!
//! Runs over one function's assembler code at a time and produces a
//! semantically equivalent but tighter stream. Four passes, applied in
//! order:
//!
//! | Pass | Effect |
//! |------|--------|
//! | share | identical terminated tails collapse into one copy |
//! | sink | exit stubs move out of the hot path to the function end |
//! | peephole | tests invert to absorb jumps; redundant jumps and unreachable code go away; labels at one position merge (run to a fixpoint) |
//! | cleanup | label definitions nothing references are removed |
//!
//! The peephole pass interacts with itself — merging two labels makes
//! previously distinct branch targets equal, which exposes more rewrites —
//! so it reruns until the stream stops changing.
//!
//! Branch targets may be referenced from other functions (entry labels) or
//! from behind (the receive-loop instructions), so every transformation
//! here preserves the entry label and the function-class error label
//! unconditionally.

mod classify;
mod cleanup;
mod peephole;
mod share;
mod sink;
mod types;


pub use classify::{
    is_exit_instruction, is_label_used_in, is_unreachable_after, labels_of, ExitOracle,
    RaisingBifs,
};
pub use types::OptimizationStats;

use tracing::{debug, warn};

use crate::asm::{Function, Instruction, Module, OptError, OptResult};

/// The jump optimizer.
///
/// Holds the exit oracle consulted for external calls and accumulates
/// rewrite statistics across every function pushed through it. The
/// individual passes are exposed as methods so other back-end stages (and
/// tests) can run them in isolation.
pub struct JumpOptimizer {
    pub(crate) stats: OptimizationStats,
    pub(crate) oracle: Box<dyn ExitOracle>,
}

impl Default for JumpOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl JumpOptimizer {
    /// Create an optimizer using the runtime's own exit knowledge.
    pub fn new() -> Self {
        Self::with_oracle(Box::new(RaisingBifs))
    }

    /// Create an optimizer with a caller-provided exit oracle.
    pub fn with_oracle(oracle: Box<dyn ExitOracle>) -> Self {
        Self {
            stats: OptimizationStats::new(),
            oracle,
        }
    }

    /// Get rewrite statistics.
    pub fn stats(&self) -> &OptimizationStats {
        &self.stats
    }

    /// Run the full pipeline over one function.
    ///
    /// The four passes are iterated until the body stops changing: a late
    /// rewrite can re-expose an early-pass opportunity (a merged join point
    /// turns a conditional branch into a branch over nothing), and the
    /// result must be a fixpoint of the whole pipeline, not just of the
    /// peephole. Every iteration either shrinks the body or reproduces it,
    /// so the loop terminates.
    pub fn optimize_function(&mut self, f: Function) -> OptResult<Function> {
        validate_layout(&f)?;
        let Function {
            name,
            arity,
            entry,
            body,
        } = f;
        let before = body.len();

        let mut body = body;
        loop {
            let prev = body.clone();
            body = self.share(body);
            body = self.sink_exits(body);
            body = match self.peephole(body, entry) {
                Ok(body) => body,
                Err(err) => {
                    warn!(function = %name, arity, %err, "jump optimization aborted");
                    return Err(err);
                }
            };
            body = self.remove_unused_labels(body);
            if body == prev {
                break;
            }
        }

        debug!(
            function = %name,
            arity,
            before,
            after = body.len(),
            "jump optimization finished"
        );
        Ok(Function {
            name,
            arity,
            entry,
            body,
        })
    }

    /// Run the full pipeline over every function of a module, in order.
    ///
    /// Everything except the function bodies is forwarded verbatim; in
    /// particular the literal count is unchanged.
    pub fn optimize_module(&mut self, m: Module) -> OptResult<Module> {
        let Module {
            name,
            exports,
            attributes,
            functions,
            literal_count,
        } = m;
        let functions = functions
            .into_iter()
            .map(|f| self.optimize_function(f))
            .collect::<OptResult<Vec<_>>>()?;
        Ok(Module {
            name,
            exports,
            attributes,
            functions,
            literal_count,
        })
    }

    /// Apply only the label cleanup pass to every function of a module.
    ///
    /// Used after later back-end passes that may orphan labels without
    /// otherwise disturbing control flow.
    pub fn clean_module(&mut self, m: Module) -> OptResult<Module> {
        let Module {
            name,
            exports,
            attributes,
            functions,
            literal_count,
        } = m;
        let functions = functions
            .into_iter()
            .map(|f| -> OptResult<Function> {
                validate_layout(&f)?;
                let Function {
                    name,
                    arity,
                    entry,
                    body,
                } = f;
                let body = self.remove_unused_labels(body);
                Ok(Function {
                    name,
                    arity,
                    entry,
                    body,
                })
            })
            .collect::<OptResult<Vec<_>>>()?;
        Ok(Module {
            name,
            exports,
            attributes,
            functions,
            literal_count,
        })
    }
}

/// Optimize a whole module with the default exit oracle.
///
/// Convenience wrapper for one-shot use; construct a [`JumpOptimizer`] to
/// keep statistics or substitute the oracle.
pub fn optimize_module(m: Module) -> OptResult<Module> {
    JumpOptimizer::new().optimize_module(m)
}

/// Remove unused labels from every function of a module.
pub fn clean_module(m: Module) -> OptResult<Module> {
    JumpOptimizer::new().clean_module(m)
}

/// Check the layout preconditions the passes rely on.
///
/// The body must begin with `func_info` directly followed by a label
/// definition, and no label number may be defined twice. Labels inside
/// blocks cannot be expressed at the type level, so there is nothing to
/// check for them.
fn validate_layout(f: &Function) -> OptResult<()> {
    match f.body.first() {
        Some(Instruction::FuncInfo { .. }) => {}
        other => {
            return Err(OptError::MissingFuncInfo {
                found: describe(other),
            })
        }
    }
    match f.body.get(1) {
        Some(Instruction::Label(_)) => {}
        other => {
            return Err(OptError::MissingEntryLabel {
                found: describe(other),
            })
        }
    }
    let mut seen = std::collections::HashSet::new();
    for i in &f.body {
        if let Some(l) = i.defined_label() {
            if !seen.insert(l) {
                return Err(OptError::DuplicateLabel { label: l });
            }
        }
    }
    Ok(())
}

pub(crate) fn describe(i: Option<&Instruction>) -> String {
    match i {
        Some(i) => i.to_string(),
        None => "end of body".into(),
    }
}
