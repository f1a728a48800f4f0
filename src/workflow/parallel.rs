use std::future::Future;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use log::debug;

use crate::error::{PrevUpdaterError, Result};

pub const DEFAULT_CONCURRENCY: usize = 16;

/// Bounded fan-out over independent requests.
///
/// At most `concurrency` futures are polled at once. Each result is tagged
/// with the index of its input and written back into that slot, so the output
/// order never depends on completion order.
#[derive(Debug, Clone, Copy)]
pub struct FanOut {
    concurrency: usize,
    timeout: Option<Duration>,
}

impl Default for FanOut {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY, None)
    }
}

impl FanOut {
    pub fn new(concurrency: usize, timeout: Option<Duration>) -> Self {
        Self {
            concurrency: concurrency.max(1),
            timeout,
        }
    }

    /// Maps every item through `f` and returns the outputs in input order.
    ///
    /// # Errors
    ///
    /// Returns the first failure in input order, or `Timeout` when the whole
    /// batch does not finish within the configured limit.
    pub async fn map_ordered<T, K, F, Fut>(&self, items: Vec<T>, f: F) -> Result<Vec<K>>
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<K>>,
    {
        let total = items.len();
        debug!(
            "Fanning out {total} requests (concurrency: {})",
            self.concurrency
        );

        let batch = stream::iter(items.into_iter().enumerate())
            .map(|(index, item)| {
                let task = f(item);
                async move { (index, task.await) }
            })
            .buffer_unordered(self.concurrency)
            .collect::<Vec<_>>();

        let tagged = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, batch)
                .await
                .map_err(|_| PrevUpdaterError::Timeout(limit))?,
            None => batch.await,
        };

        let mut slots: Vec<Option<Result<K>>> = (0..total).map(|_| None).collect();
        for (index, result) in tagged {
            slots[index] = Some(result);
        }

        slots.into_iter().flatten().collect()
    }
}
