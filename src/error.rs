use thiserror::Error;

/// Errors surfaced at the [`crate::schedule_and_run`] boundary.
///
/// Internal invariants that indicate a scheduler bug rather than a bad
/// caller-supplied layer still use `assert!`/`debug_assert!`, matching the
/// source driver's `ASSERT`/`assert` calls.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A tiling configuration cannot be satisfied under the given hardware
    /// constants (a row stripe, output-row plane, or kernel exceeds a
    /// scratchpad). Fatal: the caller gets this back instead of a partial
    /// plan.
    #[error("infeasible tiling for layer {lnum}: {reason}")]
    InfeasibleTiling { lnum: usize, reason: String },

    /// An operand load policy did not match any known variant.
    #[error("unknown data movement load policy for operand {operand}")]
    UnknownLoadPolicy { operand: &'static str },

    /// Plan construction asked for a tile with a degenerate (zero) extent.
    #[error("allocation refused: {0}")]
    Allocation(String),

    /// A debug-only invariant check failed; only reachable in debug builds.
    #[error("scheduler invariant violated: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
