//! Parallel data fetcher
//!
//! Runs the primary retrieval (metrics table or commentary) and the optional
//! valuation retrieval side by side on a fixed pool of blocking workers.
//! Each branch has its own timeout; a branch that times out or fails is
//! re-run once, sequentially and without a timeout. A branch that fails
//! again yields `None` instead of failing the request. Timed-out work keeps
//! its worker until it returns, so no more than `workers` retrievals are
//! ever live.

use crate::config::AssistantConfig;
use crate::error::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// A blocking retrieval that can be run more than once
pub type FetchTask<T> = Arc<dyn Fn() -> Result<T> + Send + Sync>;

/// Wrap a closure as a [`FetchTask`]
pub fn task<T, F>(f: F) -> FetchTask<T>
where
    F: Fn() -> Result<T> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Fixed-size pool of fetch workers
#[derive(Debug, Clone)]
pub struct ParallelFetcher {
    workers: Arc<Semaphore>,
    timeout: Duration,
}

impl ParallelFetcher {
    pub fn new(workers: usize, timeout: Duration) -> Self {
        Self {
            workers: Arc::new(Semaphore::new(workers.max(1))),
            timeout,
        }
    }

    pub fn from_config(config: &AssistantConfig) -> Self {
        Self::new(config.fetch_workers, config.fetch_timeout)
    }

    /// Run the primary and optional secondary branch concurrently.
    ///
    /// Returns once both branches have resolved, whatever order they finish
    /// in. Branches that failed their first attempt are re-run afterwards,
    /// one at a time, each holding a worker.
    pub async fn fetch_pair<A, B>(
        &self,
        primary: FetchTask<A>,
        secondary: Option<FetchTask<B>>,
    ) -> (Option<A>, Option<B>)
    where
        A: Send + 'static,
        B: Send + 'static,
    {
        let start = Instant::now();
        let secondary_attempt = async {
            match &secondary {
                Some(task) => Some(self.attempt("valuation", Arc::clone(task)).await),
                None => None,
            }
        };
        let (primary_attempt, secondary_attempt) =
            tokio::join!(self.attempt("primary", Arc::clone(&primary)), secondary_attempt);

        let primary = match primary_attempt {
            Some(value) => Some(value),
            None => self.fallback("primary", primary).await,
        };
        let secondary = match (secondary_attempt, secondary) {
            (Some(Some(value)), _) => Some(value),
            (Some(None), Some(task)) => self.fallback("valuation", task).await,
            _ => None,
        };
        debug!(duration_ms = start.elapsed().as_millis(), "Fetch completed");
        (primary, secondary)
    }

    /// First attempt on a worker, bounded by the timeout
    async fn attempt<T: Send + 'static>(&self, branch: &'static str, task: FetchTask<T>) -> Option<T> {
        let start = Instant::now();
        match self.run_on_worker(task, Some(self.timeout)).await {
            Ok(value) => {
                debug!(branch, duration_ms = start.elapsed().as_millis(), "Fetch branch completed");
                Some(value)
            },
            Err(reason) => {
                warn!(branch, %reason, "Fetch branch failed, retrying sequentially");
                None
            },
        }
    }

    /// Second and last attempt, without a timeout
    async fn fallback<T: Send + 'static>(&self, branch: &'static str, task: FetchTask<T>) -> Option<T> {
        match self.run_on_worker(task, None).await {
            Ok(value) => {
                debug!(branch, "Sequential fallback completed");
                Some(value)
            },
            Err(reason) => {
                warn!(branch, %reason, "Sequential fallback failed");
                None
            },
        }
    }

    /// Run `task` on a blocking thread that holds a worker permit until the
    /// task returns, even after the caller stopped waiting for it
    async fn run_on_worker<T: Send + 'static>(
        &self,
        task: FetchTask<T>,
        timeout: Option<Duration>,
    ) -> std::result::Result<T, String> {
        let permit = self
            .workers
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| e.to_string())?;

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            task()
        });

        let joined = match timeout {
            Some(limit) => tokio::time::timeout(limit, handle)
                .await
                .map_err(|_| format!("timed out after {}ms", limit.as_millis()))?,
            None => handle.await,
        };
        match joined {
            Err(join) => Err(join.to_string()),
            Ok(Err(e)) => Err(e.to_string()),
            Ok(Ok(value)) => Ok(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssistantError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fetcher() -> ParallelFetcher {
        ParallelFetcher::new(2, Duration::from_millis(100))
    }

    #[tokio::test]
    async fn test_both_branches_combine_in_any_order() {
        let slow_primary = task(|| {
            std::thread::sleep(Duration::from_millis(30));
            Ok("metrics".to_string())
        });
        let fast_valuation = task(|| Ok(42_u32));

        let (primary, valuation) = fetcher().fetch_pair(slow_primary, Some(fast_valuation)).await;
        assert_eq!(primary.as_deref(), Some("metrics"));
        assert_eq!(valuation, Some(42));

        let fast_primary = task(|| Ok("metrics".to_string()));
        let slow_valuation = task(|| {
            std::thread::sleep(Duration::from_millis(30));
            Ok(42_u32)
        });
        let (primary, valuation) = fetcher().fetch_pair(fast_primary, Some(slow_valuation)).await;
        assert_eq!(primary.as_deref(), Some("metrics"));
        assert_eq!(valuation, Some(42));
    }

    #[tokio::test]
    async fn test_timeout_falls_back_to_sequential() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let flaky = task(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                std::thread::sleep(Duration::from_millis(300));
            }
            Ok(7_u32)
        });

        let (primary, valuation) = fetcher()
            .fetch_pair(task(|| Ok("metrics")), Some(flaky))
            .await;
        assert_eq!(primary, Some("metrics"));
        assert_eq!(valuation, Some(7));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_error_retried_once_then_absent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let broken: FetchTask<u32> = task(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(AssistantError::Config("broken".to_string()))
        });

        let (primary, valuation) = fetcher().fetch_pair(task(|| Ok(1_u8)), Some(broken)).await;
        assert_eq!(primary, Some(1));
        assert_eq!(valuation, None);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fallbacks_stay_within_worker_bound() {
        let live = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let calls = Arc::new(AtomicUsize::new(0));
        let slow = |live: Arc<AtomicUsize>, peak: Arc<AtomicUsize>, calls: Arc<AtomicUsize>| {
            task(move || {
                calls.fetch_add(1, Ordering::SeqCst);
                let now = live.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(300));
                live.fetch_sub(1, Ordering::SeqCst);
                Ok(1_u32)
            })
        };

        let (primary, valuation) = fetcher()
            .fetch_pair(
                slow(live.clone(), peak.clone(), calls.clone()),
                Some(slow(live.clone(), peak.clone(), calls.clone())),
            )
            .await;
        assert_eq!(primary, Some(1));
        assert_eq!(valuation, Some(1));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_missing_secondary() {
        let (primary, valuation) = fetcher()
            .fetch_pair::<_, ()>(task(|| Ok("only")), None)
            .await;
        assert_eq!(primary, Some("only"));
        assert!(valuation.is_none());
    }
}
