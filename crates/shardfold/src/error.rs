use crate::PartitionId;
use std::sync::{MutexGuard, PoisonError};

/// A result type defaulting to the crate-wide [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All possible errors that `shardfold` can produce.
///
/// Allocator errors (`PoolExhausted`, `HandleNotFound`) are local and
/// returned synchronously to the immediate caller. Aggregation errors
/// (`PartitionUnreachable`) propagate from the failing partition up to the
/// original requester: an aggregation never returns a silently-partial
/// result.
#[derive(Clone, thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Every stable ID in the pool is currently in use.
    ///
    /// Recoverable: the caller should deny the new-worker request rather
    /// than treat the allocator as failed.
    #[error("stable id pool exhausted ({width} ids in use)")]
    PoolExhausted { width: u32 },

    /// No stable ID is associated with the given worker handle.
    ///
    /// Usually a duplicate-release race. Callers that want idempotent
    /// release semantics log and ignore this.
    #[error("no stable id associated with worker handle")]
    HandleNotFound,

    /// A partition's partial result could not be obtained, even after
    /// retries. The aggregation as a whole fails, since omitting the
    /// partition would under-count.
    #[error("partition {partition} unreachable: {reason}")]
    PartitionUnreachable {
        partition: PartitionId,
        reason: String,
    },

    /// A worker process failed to start.
    #[error("worker launch failed: {reason}")]
    Launch { reason: String },

    /// A shared lock was poisoned by a thread that panicked while holding
    /// it.
    #[error("shared state lock poisoned")]
    LockPoisoned,
}

// Convert all poisoned lock errors to a simplified `LockPoisoned`
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
