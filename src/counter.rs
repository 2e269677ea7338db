//! Live-instance accounting for types that want a process-wide census.

use std::sync::atomic::{AtomicUsize, Ordering};

/// A process-wide count of live instances of one type.
///
/// Declare one `static` per counted type and call [`track`](Self::track) in
/// the constructor; the returned token decrements the count when dropped.
pub struct InstanceCounter {
    count: AtomicUsize,
}

impl InstanceCounter {
    pub const fn new() -> Self {
        Self {
            count: AtomicUsize::new(0),
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    pub fn track(&'static self) -> InstanceToken {
        self.count.fetch_add(1, Ordering::Relaxed);
        InstanceToken { counter: self }
    }
}

impl Default for InstanceCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps the owning instance counted for as long as it lives.
pub struct InstanceToken {
    counter: &'static InstanceCounter,
}

impl Drop for InstanceToken {
    fn drop(&mut self) {
        self.counter.count.fetch_sub(1, Ordering::Relaxed);
    }
}
