use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::board::posts::PostStore;
use crate::db::models::Post;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchOutcome {
    /// Below the minimum query length; nothing was searched
    TooShort,
    /// A newer request arrived during the debounce window
    Superseded,
    Results { posts: Vec<Post> },
}

/// Debounced search where only the most recent request gets results.
///
/// Every call takes the next sequence number before waiting; when the wait
/// ends, a call whose number is no longer the latest reports
/// [`SearchOutcome::Superseded`] instead of running the query.
#[derive(Debug)]
pub struct SearchDebouncer {
    delay: Duration,
    min_len: usize,
    latest: AtomicU64,
}

impl SearchDebouncer {
    pub fn new(delay: Duration, min_len: usize) -> Self {
        Self {
            delay,
            min_len,
            latest: AtomicU64::new(0),
        }
    }

    pub async fn search(&self, posts: &PostStore, query: &str) -> SearchOutcome {
        let seq = self.latest.fetch_add(1, Ordering::SeqCst) + 1;

        // A short query still bumps the sequence so older pending searches go stale
        if query.chars().count() < self.min_len {
            return SearchOutcome::TooShort;
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.latest.load(Ordering::SeqCst) != seq {
            tracing::debug!(seq, "Search superseded");
            return SearchOutcome::Superseded;
        }

        SearchOutcome::Results {
            posts: posts.search(query).await,
        }
    }
}
