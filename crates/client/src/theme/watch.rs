//! Midnight re-fetch of the liturgical color.

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{LiturgicalColorSource, ThemeSynchronizer};
use crate::clock::until_next_midnight;

/// Running midnight watcher. Dropping it stops the watcher.
#[derive(Debug)]
pub struct ThemeWatch {
    handle: JoinHandle<()>,
}

impl ThemeWatch {
    /// Stop watching.
    pub fn stop(self) {
        self.handle.abort();
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for ThemeWatch {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl<S: LiturgicalColorSource> ThemeSynchronizer<S> {
    /// Re-fetch the color at every local midnight until the returned handle
    /// is dropped.
    ///
    /// The delay is recomputed from the clock after each boundary, so clock
    /// adjustments and DST shifts are picked up at the next arm.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use = "the watcher stops when the handle is dropped"]
    pub fn watch(&self) -> ThemeWatch {
        let sync = self.clone();
        let handle = tokio::spawn(async move {
            loop {
                let delay = until_next_midnight(sync.inner.clock.now());
                debug!(delay_secs = delay.as_secs(), "Theme watcher armed");
                tokio::time::sleep(delay).await;

                info!("Local day changed, refreshing liturgical color");
                if let Err(e) = sync.fetch_liturgical_color(false).await {
                    warn!(error = %e, "Midnight liturgical color refresh failed");
                }
            }
        });
        ThemeWatch { handle }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use chrono::{NaiveDateTime, TimeDelta};
    use parish_core::LiturgicalColor;
    use tokio::time::Instant;

    use super::super::tests::{FakeSource, RecordingSink, noon};
    use super::*;
    use crate::clock::Clock;
    use crate::storage::MemoryStorage;

    /// Wall clock that follows tokio's (pausable) time.
    struct TokioClock {
        start_wall: NaiveDateTime,
        start: Instant,
    }

    impl Clock for TokioClock {
        fn now(&self) -> NaiveDateTime {
            let elapsed = TimeDelta::from_std(self.start.elapsed()).unwrap();
            self.start_wall + elapsed
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetches_at_each_midnight() {
        let clock = Arc::new(TokioClock {
            start_wall: noon() + TimeDelta::hours(11) + TimeDelta::minutes(59),
            start: Instant::now(),
        });
        let source = Arc::new(FakeSource::default());
        source.push(Duration::ZERO, Some(LiturgicalColor::Purple));
        source.push(Duration::ZERO, Some(LiturgicalColor::Rose));
        let sync = ThemeSynchronizer::new(
            source.clone(),
            Arc::new(MemoryStorage::new()),
            clock.clone(),
            Arc::new(RecordingSink::default()),
        );

        let watch = sync.watch();
        assert!(watch.is_running());

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        let active = sync.snapshot().active.unwrap();
        assert_eq!(active.color, LiturgicalColor::Purple);
        assert_eq!(active.date, clock.today());

        tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(sync.snapshot().active.unwrap().color, LiturgicalColor::Rose);

        drop(watch);
        tokio::time::sleep(Duration::from_secs(3 * 24 * 3600)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopping_during_midnight_fetch_leaves_sync_usable() {
        let clock = Arc::new(TokioClock {
            start_wall: noon() + TimeDelta::hours(11) + TimeDelta::minutes(59),
            start: Instant::now(),
        });
        let source = Arc::new(FakeSource::default());
        source.push(Duration::from_secs(30), Some(LiturgicalColor::Purple));
        source.push(Duration::ZERO, Some(LiturgicalColor::Rose));
        let sync = ThemeSynchronizer::new(
            source.clone(),
            Arc::new(MemoryStorage::new()),
            clock,
            Arc::new(RecordingSink::default()),
        );

        let watch = sync.watch();
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        watch.stop();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let outcome = sync.fetch_liturgical_color(false).await.unwrap();
        assert!(matches!(outcome, super::super::FetchOutcome::Applied(_)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(sync.snapshot().active.unwrap().color, LiturgicalColor::Rose);
    }
}
