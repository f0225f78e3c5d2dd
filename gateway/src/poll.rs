//! Fixed-interval re-invocation of a sync operation with overlap
//! suppression: a tick is skipped when the previous invocation is
//! still outstanding, so slow vendor calls never stack up.

use crate::errors::Result;
use crate::metrics::POLLS_SKIPPED_TOTAL;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info, warn};

pub async fn run_poller<F, Fut, T>(name: &str, period: Duration, f: F)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    info!(poller = name, period_ms = period.as_millis() as u64, "starting poller");

    let in_flight = Arc::new(AtomicBool::new(false));
    let mut ticker = interval(period);

    loop {
        ticker.tick().await;

        if in_flight.swap(true, Ordering::SeqCst) {
            POLLS_SKIPPED_TOTAL.inc();
            debug!(poller = name, "previous poll still running, skipping tick");
            continue;
        }

        let guard = in_flight.clone();
        let fut = f();
        let poller = name.to_string();
        tokio::spawn(async move {
            if let Err(e) = fut.await {
                // No inline retry; the next tick is the retry.
                warn!(poller = %poller, error = %e, "poll failed");
            }
            guard.store(false, Ordering::SeqCst);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test(start_paused = true)]
    async fn overlapping_polls_are_skipped() {
        let started = Arc::new(AtomicUsize::new(0));
        let counter = started.clone();

        let handle = tokio::spawn(run_poller("test", Duration::from_secs(10), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                // Longer than two tick periods.
                tokio::time::sleep(Duration::from_secs(25)).await;
                Ok(())
            }
        }));

        // First tick fires immediately; the next two land while the
        // first invocation is still sleeping.
        tokio::time::sleep(Duration::from_secs(21)).await;
        assert_eq!(started.load(Ordering::SeqCst), 1);

        // After the first poll finishes, a later tick runs again.
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(started.load(Ordering::SeqCst), 2);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn failed_polls_do_not_stop_the_loop() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let handle = tokio::spawn(run_poller("failing", Duration::from_secs(5), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(crate::errors::Error::Unauthorized)
            }
        }));

        tokio::time::sleep(Duration::from_secs(16)).await;
        assert!(attempts.load(Ordering::SeqCst) >= 3);

        handle.abort();
    }
}
