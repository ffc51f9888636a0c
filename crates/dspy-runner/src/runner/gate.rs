use tokio::sync::{Semaphore, SemaphorePermit};

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("batch size must be at least 1")]
    ZeroCapacity,
    #[error("batch size {requested} exceeds the supported maximum of {max}")]
    TooLarge { requested: usize, max: usize },
}

/// Admission control for conversations: at most `capacity` hold a permit at once.
///
/// Waiters are not guaranteed any particular order.
#[derive(Debug)]
pub struct ConcurrencyGate {
    semaphore: Semaphore,
    capacity: usize,
}

impl ConcurrencyGate {
    pub fn new(capacity: usize) -> Result<Self, GateError> {
        if capacity == 0 {
            return Err(GateError::ZeroCapacity);
        }
        if capacity > Semaphore::MAX_PERMITS {
            return Err(GateError::TooLarge {
                requested: capacity,
                max: Semaphore::MAX_PERMITS,
            });
        }
        Ok(Self {
            semaphore: Semaphore::new(capacity),
            capacity,
        })
    }

    /// Waits until a slot is free and takes it.
    ///
    /// The semaphore is private and never closed, so acquiring cannot fail.
    pub async fn acquire(&self) -> GatePermit<'_> {
        let permit = self
            .semaphore
            .acquire()
            .await
            .expect("gate semaphore is never closed");
        GatePermit { _permit: permit }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of permits currently held.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }
}

/// A held slot. The slot is freed exactly once, when the permit is released
/// or dropped.
#[derive(Debug)]
#[must_use = "dropping the permit frees the slot immediately"]
pub struct GatePermit<'a> {
    _permit: SemaphorePermit<'a>,
}

impl GatePermit<'_> {
    pub fn release(self) {
        drop(self);
    }
}
