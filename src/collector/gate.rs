//! Optional ceiling on simultaneous remote operations

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Limits how many connects and function calls run at once
///
/// The default gate is unbounded and never waits.
#[derive(Debug, Clone, Default)]
pub struct CallGate {
    permits: Option<Arc<Semaphore>>,
}

impl CallGate {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn bounded(max_in_flight: usize) -> Self {
        Self {
            permits: Some(Arc::new(Semaphore::new(max_in_flight.max(1)))),
        }
    }

    /// Gate from the optional `server.max_in_flight_calls` setting
    pub fn from_ceiling(max_in_flight: Option<usize>) -> Self {
        max_in_flight.map_or_else(Self::unbounded, Self::bounded)
    }

    pub fn is_bounded(&self) -> bool {
        self.permits.is_some()
    }

    /// Run `operation` while holding a permit
    pub async fn run<F: Future>(&self, operation: F) -> F::Output {
        match &self.permits {
            None => operation.await,
            Some(semaphore) => {
                // The semaphore is never closed, so acquire cannot fail
                let _permit = semaphore.acquire().await.ok();
                operation.await
            }
        }
    }
}
