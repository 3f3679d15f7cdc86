use crate::Result;
use std::num::NonZeroUsize;
use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::thread;

/// The invocation/fan-out seam: runs a task against a set of targets in
/// parallel and collects one result per target.
///
/// An individual target's failure surfaces as an explicit `Err` entry for
/// that target; it is never silently dropped. No ordering of the returned
/// entries is guaranteed.
///
/// In-process callers use [`ThreadInvoker`]; a deployment against a real
/// cluster implements this over its RPC facility instead.
pub trait Invoker {
    /// Executes `task` once per target and returns each target's outcome.
    fn invoke<T, R, F>(&self, targets: Vec<T>, task: F) -> Vec<(T, Result<R>)>
    where
        T: Copy + Send + Sync,
        R: Send,
        F: Fn(T) -> Result<R> + Sync;
}

/// An [`Invoker`] that fans tasks out across scoped threads.
///
/// The degree of parallelism is capped by the target count; a single task
/// is never split across threads.
#[derive(Clone, Debug)]
pub struct ThreadInvoker {
    parallelism: NonZeroUsize,
}

impl ThreadInvoker {
    /// Creates an invoker sized to the host's available parallelism.
    pub fn new() -> Self {
        Self {
            parallelism: thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
        }
    }

    /// Creates an invoker with an explicit thread count.
    pub const fn with_parallelism(parallelism: NonZeroUsize) -> Self {
        Self { parallelism }
    }

    /// The number of threads tasks fan out across.
    pub const fn parallelism(&self) -> NonZeroUsize {
        self.parallelism
    }
}

impl Default for ThreadInvoker {
    fn default() -> Self {
        Self::new()
    }
}

impl Invoker for ThreadInvoker {
    fn invoke<T, R, F>(&self, targets: Vec<T>, task: F) -> Vec<(T, Result<R>)>
    where
        T: Copy + Send + Sync,
        R: Send,
        F: Fn(T) -> Result<R> + Sync,
    {
        if targets.is_empty() {
            return Vec::new();
        }

        let cursor = AtomicUsize::new(0);
        let results = Mutex::new(Vec::with_capacity(targets.len()));
        let workers = self.parallelism.get().min(targets.len());

        thread::scope(|s| {
            for _ in 0..workers {
                s.spawn(|| {
                    loop {
                        let index = cursor.fetch_add(1, Ordering::Relaxed);
                        let Some(&target) = targets.get(index) else {
                            break;
                        };
                        let outcome = task(target);
                        let Ok(mut collected) = results.lock() else {
                            break;
                        };
                        collected.push((target, outcome));
                    }
                });
            }
        });

        results
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
