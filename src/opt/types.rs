//! Statistics for the jump optimizer.

/// Counters for every rewrite the optimizer performs.
///
/// Accumulated across all functions optimized through one
/// [`JumpOptimizer`](super::JumpOptimizer).
#[derive(Debug, Clone, Default)]
pub struct OptimizationStats {
    /// Jumps inserted so no label is entered by fallthrough
    pub fallthrough_jumps_inserted: usize,
    /// Duplicate tails replaced by a jump to the shared copy
    pub tails_shared: usize,
    /// Exit stubs relocated to the end of their function
    pub exits_sunk: usize,
    /// Tests replaced by their inversion to absorb a jump
    pub tests_inverted: usize,
    /// Jumps dropped as redundant (target starts right after)
    pub redundant_jumps_removed: usize,
    /// Labels absorbed into another label at the same position
    pub labels_merged: usize,
    /// Instructions deleted as unreachable
    pub unreachable_dropped: usize,
    /// Label definitions removed because nothing references them
    pub unused_labels_removed: usize,
    /// Extra peephole walks taken beyond the first before the fixpoint
    pub fixpoint_iterations: usize,
}

impl OptimizationStats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Total rewrites performed (iteration counts excluded).
    pub fn total_optimizations(&self) -> usize {
        self.fallthrough_jumps_inserted
            + self.tails_shared
            + self.exits_sunk
            + self.tests_inverted
            + self.redundant_jumps_removed
            + self.labels_merged
            + self.unreachable_dropped
            + self.unused_labels_removed
    }
}
