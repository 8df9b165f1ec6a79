use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::db::models::Id;

/// Hands out millisecond timestamps as identifiers, bumping by one when two
/// requests land in the same millisecond so ids stay unique and increasing.
#[derive(Debug, Default)]
pub struct IdClock {
    last: AtomicI64,
}

impl IdClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> Id {
        let now = Utc::now().timestamp_millis();
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last.saturating_add(1));
            match self
                .last
                .compare_exchange_weak(last, candidate, Ordering::SeqCst, Ordering::Relaxed)
            {
                Ok(_) => return candidate,
                Err(actual) => last = actual,
            }
        }
    }

    /// Make sure future ids are greater than `id` (used after loading snapshots).
    pub fn observe(&self, id: Id) {
        self.last.fetch_max(id, Ordering::SeqCst);
    }
}
