use crate::{Error, Result};
use core::fmt;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
#[cfg(feature = "tracing")]
use tracing::instrument;

/// Default number of stable IDs in the pool.
pub const DEFAULT_WIDTH: u32 = 8;

/// A small integer handle used to deterministically label dynamically
/// started worker processes.
///
/// Stable IDs are allocated from a fixed-width bit pool by
/// [`StableIdAllocator`] and released for reuse when the worker stops. The
/// parity of an ID drives a deterministic two-way role split via
/// [`role_label`](Self::role_label).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StableId(u8);

impl StableId {
    /// The bit position this ID occupies in the pool.
    pub const fn index(self) -> u8 {
        self.0
    }

    /// Returns `true` for odd IDs.
    pub const fn is_odd(self) -> bool {
        self.0 & 1 == 1
    }

    /// Derives a worker role name by appending `Odd` or `Even` to `base`
    /// depending on this ID's parity.
    ///
    /// Pure: the same `(id, base)` always produces the same label.
    ///
    /// # Example
    ///
    /// ```
    /// use shardfold::StableIdAllocator;
    ///
    /// let allocator: StableIdAllocator<String> = StableIdAllocator::new();
    /// let id = allocator.allocate().unwrap();
    /// assert_eq!(id.role_label("DemoServer"), "DemoServerEven");
    /// ```
    pub fn role_label(self, base: &str) -> String {
        format!("{base}{}", if self.is_odd() { "Odd" } else { "Even" })
    }
}

impl fmt::Display for StableId {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", self.0)
    }
}

#[derive(Debug)]
struct AllocatorState<H> {
    used: u64,
    assignments: HashMap<H, StableId>,
}

/// Hands out small integer IDs from a fixed-size pool, safe under
/// concurrent callers.
///
/// The pool is a bitset of `width` positions (`width <= 64`): an ID is in
/// use iff its bit is set. [`allocate`](Self::allocate) scans positions
/// low-to-high and returns the first free one, so released IDs are reused.
/// Alongside the pool, the allocator keeps a table mapping opaque worker
/// handles (`H`) to their IDs, maintained with
/// [`associate`](Self::associate) and
/// [`lookup_and_release`](Self::lookup_and_release).
///
/// All mutation is serialized by a single mutex: no two concurrent
/// `allocate` calls can observe the same free bit. State is process-local
/// and starts empty; nothing is persisted across restarts.
///
/// # Example
///
/// ```
/// use shardfold::{Error, StableIdAllocator};
///
/// let allocator: StableIdAllocator<String> = StableIdAllocator::new();
///
/// let id = allocator.allocate().unwrap();
/// allocator.associate("member-42".to_owned(), id).unwrap();
///
/// // on worker stop, the mapping is removed and the ID freed atomically
/// let released = allocator.lookup_and_release(&"member-42".to_owned()).unwrap();
/// assert_eq!(released, id);
/// assert!(matches!(
///     allocator.lookup_and_release(&"member-42".to_owned()),
///     Err(Error::HandleNotFound)
/// ));
/// ```
#[derive(Debug)]
pub struct StableIdAllocator<H = String> {
    width: u32,
    state: Mutex<AllocatorState<H>>,
}

impl<H: Eq + Hash> StableIdAllocator<H> {
    /// Creates an allocator with [`DEFAULT_WIDTH`] IDs.
    pub fn new() -> Self {
        Self::with_width(DEFAULT_WIDTH)
    }

    /// Creates an allocator with `width` IDs.
    ///
    /// # Panics
    /// Panics if `width` is zero or greater than 64.
    pub fn with_width(width: u32) -> Self {
        assert!(
            (1..=64).contains(&width),
            "stable id pool width must be in 1..=64, got {width}"
        );
        Self {
            width,
            state: Mutex::new(AllocatorState {
                used: 0,
                assignments: HashMap::new(),
            }),
        }
    }

    /// Allocates the lowest free ID, marking it in use.
    ///
    /// # Errors
    /// Returns [`Error::PoolExhausted`] when every position is in use. The
    /// caller should deny the new-worker request and try again after a
    /// worker stops.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub fn allocate(&self) -> Result<StableId> {
        let mut state = self.state.lock()?;
        for position in 0..self.width {
            if state.used >> position & 1 == 0 {
                state.used |= 1 << position;
                return Ok(StableId(position as u8));
            }
        }
        Err(Error::PoolExhausted { width: self.width })
    }

    /// Clears `id`'s bit, making it eligible for reuse.
    ///
    /// Releasing an already-free ID is a no-op.
    pub fn release(&self, id: StableId) -> Result<()> {
        let mut state = self.state.lock()?;
        state.used &= !(1u64 << id.0);
        Ok(())
    }

    /// Records that `handle` owns `id`.
    ///
    /// Returns the previously associated ID if the handle was already
    /// mapped; the caller decides whether that constitutes a bug.
    pub fn associate(&self, handle: H, id: StableId) -> Result<Option<StableId>> {
        Ok(self.state.lock()?.assignments.insert(handle, id))
    }

    /// Atomically removes `handle`'s mapping and releases the underlying
    /// ID.
    ///
    /// # Errors
    /// Returns [`Error::HandleNotFound`] if the handle has no mapping,
    /// which usually indicates a duplicate release.
    pub fn lookup_and_release(&self, handle: &H) -> Result<StableId> {
        let mut state = self.state.lock()?;
        let id = state
            .assignments
            .remove(handle)
            .ok_or(Error::HandleNotFound)?;
        state.used &= !(1u64 << id.0);
        Ok(id)
    }

    /// Number of IDs currently in use.
    pub fn allocated(&self) -> Result<u32> {
        Ok(self.state.lock()?.used.count_ones())
    }

    /// Total number of IDs in the pool.
    pub const fn capacity(&self) -> u32 {
        self.width
    }

    /// Returns `true` when no ID is free.
    pub fn is_full(&self) -> Result<bool> {
        Ok(self.allocated()? == self.width)
    }
}

impl<H: Eq + Hash> Default for StableIdAllocator<H> {
    fn default() -> Self {
        Self::new()
    }
}
