//! Scrape deadline and deadline-bounded merging of task results

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, timeout_at};

/// Merge levels of the collection fan-out, innermost first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeLevel {
    Servers,
    Systems,
    Metrics,
}

impl MergeLevel {
    /// Extra wait after the deadline at this level
    ///
    /// Inner levels stop first, so what they gathered reaches the outer level before
    /// the outer level stops too.
    fn grace(&self) -> Duration {
        match self {
            MergeLevel::Servers => Duration::ZERO,
            MergeLevel::Systems => Duration::from_millis(25),
            MergeLevel::Metrics => Duration::from_millis(50),
        }
    }
}

/// Largest grace of any merge level
pub const MAX_MERGE_GRACE: Duration = Duration::from_millis(50);

/// The single deadline of one scrape, passed by value to every task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeDeadline {
    expires_at: Instant,
}

impl ScrapeDeadline {
    pub fn after(timeout: Duration) -> Self {
        Self {
            expires_at: Instant::now() + timeout,
        }
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    /// Instant at which the merge site at `level` stops waiting
    pub fn cutoff(&self, level: MergeLevel) -> Instant {
        self.expires_at + level.grace()
    }
}

/// Items received from a fan-out, and whether every sender finished in time
#[derive(Debug)]
pub struct Merged<T> {
    pub items: Vec<T>,
    pub complete: bool,
}

/// Receive until every sender is gone or `cutoff` passes
///
/// The caller must drop its own sender before calling, otherwise this only returns at
/// the cutoff. Items sent after the cutoff are discarded with the receiver.
pub async fn merge_until<T>(mut rx: mpsc::UnboundedReceiver<T>, cutoff: Instant) -> Merged<T> {
    let mut items = Vec::new();
    loop {
        match timeout_at(cutoff, rx.recv()).await {
            Ok(Some(item)) => items.push(item),
            Ok(None) => return Merged { items, complete: true },
            Err(_) => return Merged { items, complete: false },
        }
    }
}
