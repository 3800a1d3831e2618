//! Liturgical color theme synchronization.
//!
//! Keeps the portal's theme in step with the backend's color for the current
//! local day:
//!
//! - On start, a cached color for today is applied without touching the
//!   network; otherwise the color is fetched.
//! - A fetch applies the full variable batch through a [`ThemeSink`] and
//!   caches the color with today's date.
//! - A forced fetch (after an admin override) evicts the cache first.
//! - [`ThemeSynchronizer::watch`] re-fetches at every local midnight.
//!
//! # Concurrent fetches
//!
//! Only one unforced fetch runs at a time; further unforced calls return
//! [`FetchOutcome::Skipped`]. A forced fetch always starts. Every fetch takes a
//! generation number when it starts, and a completion whose generation is no
//! longer the latest is dropped as [`FetchOutcome::Superseded`], so the most
//! recently started request decides the applied color.

mod sink;
mod watch;

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use parish_core::{CssVariables, LiturgicalColorPayload, LiturgicalColorState};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::api::ApiClient;
use crate::clock::Clock;
use crate::error::{ErrorInfo, Result};
use crate::storage::{Storage, keys};

pub use sink::{StylesheetSink, ThemeSink};
pub use watch::ThemeWatch;

/// Where today's color comes from.
pub trait LiturgicalColorSource: Send + Sync + 'static {
    /// Fetch the color for the current day.
    fn fetch_current(&self) -> impl Future<Output = Result<LiturgicalColorPayload>> + Send;
}

impl LiturgicalColorSource for ApiClient {
    async fn fetch_current(&self) -> Result<LiturgicalColorPayload> {
        self.get("liturgical-color").await
    }
}

/// Lifecycle of the applied theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThemePhase {
    /// Nothing applied yet.
    #[default]
    Idle,
    Loading,
    /// The applied color is current.
    Applied,
    /// The network failed; today's cached color is shown instead.
    StaleFallback,
    /// The last fetch failed and no same-day cache existed.
    Failed,
}

/// Result of a fetch that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A color was applied, from the network or from today's cache at start.
    Applied(LiturgicalColorState),
    /// The network failed and today's cached color was applied.
    CacheFallback(LiturgicalColorState),
    /// An unforced fetch was already running.
    Skipped,
    /// A newer fetch started while this one was running.
    Superseded,
}

/// Point-in-time view of the synchronizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemeSnapshot {
    pub phase: ThemePhase,
    pub active: Option<LiturgicalColorState>,
    pub error: Option<String>,
}

impl ThemeSnapshot {
    /// The last error in the uniform shape.
    #[must_use]
    pub fn error_info(&self) -> Option<ErrorInfo> {
        self.error.as_deref().map(ErrorInfo::local)
    }
}

#[derive(Debug, Default)]
struct ThemeState {
    phase: ThemePhase,
    active: Option<LiturgicalColorState>,
    error: Option<String>,
    in_flight: bool,
    generation: u64,
}

/// Releases the in-flight flag when a fetch future is dropped before its
/// request completes, restoring the phase it started from.
struct InFlightGuard<'a> {
    state: &'a Mutex<ThemeState>,
    generation: u64,
    previous: ThemePhase,
    armed: bool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.generation == self.generation && state.in_flight {
            debug!(generation = self.generation, "Liturgical color fetch cancelled");
            state.in_flight = false;
            state.phase = self.previous;
        }
    }
}

/// Applies and refreshes the liturgical color theme.
pub struct ThemeSynchronizer<S> {
    inner: Arc<ThemeSynchronizerInner<S>>,
}

impl<S> Clone for ThemeSynchronizer<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ThemeSynchronizerInner<S> {
    source: S,
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn ThemeSink>,
    state: Mutex<ThemeState>,
}

impl<S: LiturgicalColorSource> ThemeSynchronizer<S> {
    #[must_use]
    pub fn new(
        source: S,
        storage: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn ThemeSink>,
    ) -> Self {
        Self {
            inner: Arc::new(ThemeSynchronizerInner {
                source,
                storage,
                clock,
                sink,
                state: Mutex::new(ThemeState::default()),
            }),
        }
    }

    /// Apply today's cached color if there is one, otherwise fetch.
    ///
    /// # Errors
    ///
    /// Returns the fetch error when there is no cache to fall back to.
    pub async fn initialize(&self) -> Result<FetchOutcome> {
        let today = self.inner.clock.today();
        if let Some(cached) = self.cached_for(today) {
            let mut state = self.lock_state();
            if !state.in_flight {
                self.apply(&mut state, cached.clone(), ThemePhase::Applied);
                info!(color = %cached.color, "Applied cached liturgical color");
                return Ok(FetchOutcome::Applied(cached));
            }
        }
        self.fetch_liturgical_color(false).await
    }

    /// Fetch today's color and apply it.
    ///
    /// # Errors
    ///
    /// Returns the source's error when the fetch fails and, for an unforced
    /// fetch, no color is cached for today. The previously applied theme
    /// stays in place.
    #[instrument(skip(self))]
    pub async fn fetch_liturgical_color(&self, force: bool) -> Result<FetchOutcome> {
        let mut guard = {
            let mut state = self.lock_state();
            if state.in_flight && !force {
                debug!("Liturgical color fetch already in flight");
                return Ok(FetchOutcome::Skipped);
            }
            let previous = state.phase;
            state.in_flight = true;
            state.generation += 1;
            state.phase = ThemePhase::Loading;
            InFlightGuard {
                state: &self.inner.state,
                generation: state.generation,
                previous,
                armed: true,
            }
        };
        let generation = guard.generation;

        if force {
            self.evict_cache();
        }

        let today = self.inner.clock.today();
        let result = self.inner.source.fetch_current().await;
        guard.armed = false;

        let mut state = self.lock_state();
        if state.generation != generation {
            debug!(generation, latest = state.generation, "Discarding superseded fetch");
            return Ok(FetchOutcome::Superseded);
        }
        state.in_flight = false;

        match result {
            Ok(payload) => {
                let color = LiturgicalColorState::from_payload(payload, today);
                self.apply(&mut state, color.clone(), ThemePhase::Applied);
                self.persist(&color, today);
                info!(color = %color.color, date = %color.date, "Applied liturgical color");
                Ok(FetchOutcome::Applied(color))
            }
            Err(e) => {
                let message = e.info().message;
                if !force && let Some(cached) = self.cached_for(today) {
                    warn!(error = %message, "Liturgical color fetch failed, using today's cache");
                    self.apply(&mut state, cached.clone(), ThemePhase::StaleFallback);
                    state.error = Some(message);
                    return Ok(FetchOutcome::CacheFallback(cached));
                }
                tracing::error!(error = %message, force, "Liturgical color fetch failed");
                state.phase = ThemePhase::Failed;
                state.error = Some(message);
                Err(e)
            }
        }
    }

    /// Force a fetch, bypassing the cache and any unforced fetch in flight.
    ///
    /// # Errors
    ///
    /// Returns the source's error.
    pub async fn refresh_color(&self) -> Result<FetchOutcome> {
        self.fetch_liturgical_color(true).await
    }

    #[must_use]
    pub fn snapshot(&self) -> ThemeSnapshot {
        let state = self.lock_state();
        ThemeSnapshot {
            phase: state.phase,
            active: state.active.clone(),
            error: state.error.clone(),
        }
    }

    /// Whether the cached color is missing or from another day.
    #[must_use]
    pub fn needs_refresh(&self) -> bool {
        self.cached_date() != Some(self.inner.clock.today())
    }

    // =========================================================================
    // Cache
    // =========================================================================

    fn cached_date(&self) -> Option<NaiveDate> {
        self.inner
            .storage
            .get(keys::LITURGICAL_COLOR_DATE)
            .and_then(|raw| raw.parse().ok())
    }

    fn cached_for(&self, today: NaiveDate) -> Option<LiturgicalColorState> {
        if self.cached_date()? != today {
            return None;
        }
        let raw = self.inner.storage.get(keys::LITURGICAL_COLOR)?;
        match serde_json::from_str(&raw) {
            Ok(color) => Some(color),
            Err(e) => {
                warn!(error = %e, "Cached liturgical color is unreadable");
                None
            }
        }
    }

    fn persist(&self, color: &LiturgicalColorState, today: NaiveDate) {
        let result = serde_json::to_string(color)
            .map_err(|e| e.to_string())
            .and_then(|json| {
                let storage = &self.inner.storage;
                storage
                    .set(keys::LITURGICAL_COLOR, &json)
                    .and_then(|()| storage.set(keys::LITURGICAL_COLOR_DATE, &today.to_string()))
                    .map_err(|e| e.to_string())
            });
        if let Err(e) = result {
            warn!(error = %e, "Failed to cache liturgical color");
        }
    }

    fn evict_cache(&self) {
        if let Err(e) = self
            .inner
            .storage
            .remove_all(&[keys::LITURGICAL_COLOR, keys::LITURGICAL_COLOR_DATE])
        {
            warn!(error = %e, "Failed to evict cached liturgical color");
        }
    }

    // =========================================================================
    // Application
    // =========================================================================

    fn apply(&self, state: &mut ThemeState, color: LiturgicalColorState, phase: ThemePhase) {
        let variables = CssVariables::for_state(&color);
        if let Err(e) = self.inner.sink.apply(&variables) {
            warn!(error = %e, "Theme sink failed to apply variables");
        }
        state.active = Some(color);
        state.phase = phase;
        state.error = None;
    }

    fn lock_state(&self) -> MutexGuard<'_, ThemeState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use chrono::NaiveDateTime;
    use parish_core::LiturgicalColor;

    use super::*;
    use crate::clock::ManualClock;
    use crate::error::ClientError;
    use crate::storage::MemoryStorage;

    /// Scripted source: each call takes the next (delay, color) pair; `None`
    /// means the call fails.
    #[derive(Default)]
    pub struct FakeSource {
        script: Mutex<VecDeque<(Duration, Option<LiturgicalColor>)>>,
        pub calls: AtomicUsize,
    }

    impl FakeSource {
        pub fn push(&self, delay: Duration, color: Option<LiturgicalColor>) {
            self.script.lock().unwrap().push_back((delay, color));
        }
    }

    impl LiturgicalColorSource for Arc<FakeSource> {
        async fn fetch_current(&self) -> Result<LiturgicalColorPayload> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            let (delay, color) = next.unwrap_or((Duration::ZERO, None));
            tokio::time::sleep(delay).await;
            color
                .map(|color| LiturgicalColorPayload {
                    color,
                    hex: None,
                    tailwind: None,
                    date: None,
                    season: None,
                    celebration: None,
                })
                .ok_or_else(|| ClientError::Api {
                    status: 503,
                    status_text: "Service Unavailable".to_string(),
                    message: "Calendar service unavailable".to_string(),
                })
        }
    }

    #[derive(Default)]
    pub struct RecordingSink {
        pub batches: Mutex<Vec<CssVariables>>,
    }

    impl ThemeSink for RecordingSink {
        fn apply(&self, variables: &CssVariables) -> std::io::Result<()> {
            self.batches.lock().unwrap().push(variables.clone());
            Ok(())
        }
    }

    pub fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    struct Harness {
        sync: ThemeSynchronizer<Arc<FakeSource>>,
        source: Arc<FakeSource>,
        storage: Arc<MemoryStorage>,
        sink: Arc<RecordingSink>,
    }

    fn harness(clock: Arc<dyn Clock>) -> Harness {
        let source = Arc::new(FakeSource::default());
        let storage = Arc::new(MemoryStorage::new());
        let sink = Arc::new(RecordingSink::default());
        let sync = ThemeSynchronizer::new(source.clone(), storage.clone(), clock, sink.clone());
        Harness {
            sync,
            source,
            storage,
            sink,
        }
    }

    fn seed_cache(storage: &MemoryStorage, color: LiturgicalColor, date: NaiveDate) {
        let state = LiturgicalColorState::with_defaults(color, date);
        storage
            .set(keys::LITURGICAL_COLOR, &serde_json::to_string(&state).unwrap())
            .unwrap();
        storage
            .set(keys::LITURGICAL_COLOR_DATE, &date.to_string())
            .unwrap();
    }

    fn active_color(sync: &ThemeSynchronizer<Arc<FakeSource>>) -> Option<LiturgicalColor> {
        sync.snapshot().active.map(|state| state.color)
    }

    #[tokio::test]
    async fn test_same_day_cache_applied_without_network() {
        let h = harness(Arc::new(ManualClock::new(noon())));
        seed_cache(&h.storage, LiturgicalColor::Purple, noon().date());

        let outcome = h.sync.initialize().await.unwrap();

        assert!(matches!(outcome, FetchOutcome::Applied(_)));
        assert_eq!(h.source.calls.load(Ordering::SeqCst), 0);
        assert_eq!(active_color(&h.sync), Some(LiturgicalColor::Purple));
        assert!(!h.sync.needs_refresh());
    }

    #[tokio::test]
    async fn test_stale_cache_triggers_fetch() {
        let h = harness(Arc::new(ManualClock::new(noon())));
        let yesterday = noon().date().pred_opt().unwrap();
        seed_cache(&h.storage, LiturgicalColor::Purple, yesterday);
        h.source.push(Duration::ZERO, Some(LiturgicalColor::Rose));
        assert!(h.sync.needs_refresh());

        h.sync.initialize().await.unwrap();

        assert_eq!(h.source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(active_color(&h.sync), Some(LiturgicalColor::Rose));
        assert_eq!(
            h.storage.get(keys::LITURGICAL_COLOR_DATE).as_deref(),
            Some("2026-10-16")
        );
        assert!(!h.sync.needs_refresh());
    }

    #[tokio::test]
    async fn test_full_batch_applied_at_once() {
        let h = harness(Arc::new(ManualClock::new(noon())));
        h.source.push(Duration::ZERO, Some(LiturgicalColor::Gold));

        h.sync.fetch_liturgical_color(false).await.unwrap();

        let batches = h.sink.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), CssVariables::THEME_VARIABLE_COUNT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forced_fetch_evicts_cache_before_request() {
        let h = harness(Arc::new(ManualClock::new(noon())));
        seed_cache(&h.storage, LiturgicalColor::Green, noon().date());
        h.source.push(Duration::from_secs(5), Some(LiturgicalColor::Red));

        let storage = h.storage.clone();
        let (outcome, ()) = tokio::join!(h.sync.refresh_color(), async move {
            tokio::time::sleep(Duration::from_millis(1)).await;
            assert_eq!(storage.get(keys::LITURGICAL_COLOR), None);
            assert_eq!(storage.get(keys::LITURGICAL_COLOR_DATE), None);
        });

        assert!(matches!(outcome.unwrap(), FetchOutcome::Applied(_)));
        assert_eq!(active_color(&h.sync), Some(LiturgicalColor::Red));
        assert!(h.storage.get(keys::LITURGICAL_COLOR).is_some());
    }

    #[tokio::test]
    async fn test_unforced_failure_falls_back_to_todays_cache() {
        let h = harness(Arc::new(ManualClock::new(noon())));
        seed_cache(&h.storage, LiturgicalColor::White, noon().date());
        h.source.push(Duration::ZERO, None);

        let outcome = h.sync.fetch_liturgical_color(false).await.unwrap();

        assert!(matches!(outcome, FetchOutcome::CacheFallback(_)));
        let snapshot = h.sync.snapshot();
        assert_eq!(snapshot.phase, ThemePhase::StaleFallback);
        assert_eq!(snapshot.error.as_deref(), Some("Calendar service unavailable"));
        assert_eq!(active_color(&h.sync), Some(LiturgicalColor::White));
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_theme() {
        let h = harness(Arc::new(ManualClock::new(noon())));
        h.source.push(Duration::ZERO, Some(LiturgicalColor::Green));
        h.source.push(Duration::ZERO, None);

        h.sync.fetch_liturgical_color(false).await.unwrap();
        let err = h.sync.refresh_color().await.unwrap_err();

        assert_eq!(err.status(), Some(503));
        let snapshot = h.sync.snapshot();
        assert_eq!(snapshot.phase, ThemePhase::Failed);
        assert_eq!(active_color(&h.sync), Some(LiturgicalColor::Green));
        assert_eq!(h.sink.batches.lock().unwrap().len(), 1);
        assert_eq!(
            snapshot.error_info().map(|info| info.message).as_deref(),
            Some("Calendar service unavailable")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unforced_fetch_skipped_while_in_flight() {
        let h = harness(Arc::new(ManualClock::new(noon())));
        h.source.push(Duration::from_secs(2), Some(LiturgicalColor::Green));

        let (first, second) = tokio::join!(
            h.sync.fetch_liturgical_color(false),
            h.sync.fetch_liturgical_color(false)
        );

        assert!(matches!(first.unwrap(), FetchOutcome::Applied(_)));
        assert_eq!(second.unwrap(), FetchOutcome::Skipped);
        assert_eq!(h.source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_fetch_releases_in_flight_flag() {
        let h = harness(Arc::new(ManualClock::new(noon())));
        h.source.push(Duration::from_secs(30), Some(LiturgicalColor::Green));
        h.source.push(Duration::ZERO, Some(LiturgicalColor::White));

        let cancelled =
            tokio::time::timeout(Duration::from_secs(1), h.sync.fetch_liturgical_color(false))
                .await;
        assert!(cancelled.is_err());
        assert_eq!(h.sync.snapshot().phase, ThemePhase::Idle);

        let outcome = h.sync.fetch_liturgical_color(false).await.unwrap();

        assert!(matches!(outcome, FetchOutcome::Applied(_)));
        assert_eq!(h.source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(active_color(&h.sync), Some(LiturgicalColor::White));
    }

    #[tokio::test]
    async fn test_yesterdays_cache_not_served_when_fetch_fails() {
        let h = harness(Arc::new(ManualClock::new(noon())));
        let yesterday = noon().date().pred_opt().unwrap();
        seed_cache(&h.storage, LiturgicalColor::Purple, yesterday);
        h.source.push(Duration::ZERO, None);

        let err = h.sync.initialize().await.unwrap_err();

        assert_eq!(err.status(), Some(503));
        let snapshot = h.sync.snapshot();
        assert_eq!(snapshot.phase, ThemePhase::Failed);
        assert_eq!(snapshot.active, None);
        assert!(h.sink.batches.lock().unwrap().is_empty());
        assert!(h.sync.needs_refresh());
    }

    #[tokio::test(start_paused = true)]
    async fn test_latest_started_fetch_wins() {
        let h = harness(Arc::new(ManualClock::new(noon())));
        // The page-load fetch is slow; the forced refresh after an override
        // starts later and finishes first.
        h.source.push(Duration::from_secs(10), Some(LiturgicalColor::Green));
        h.source.push(Duration::from_secs(1), Some(LiturgicalColor::Rose));

        let (slow, forced) = tokio::join!(h.sync.fetch_liturgical_color(false), async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            h.sync.refresh_color().await
        });

        assert_eq!(slow.unwrap(), FetchOutcome::Superseded);
        assert!(matches!(forced.unwrap(), FetchOutcome::Applied(_)));
        assert_eq!(active_color(&h.sync), Some(LiturgicalColor::Rose));
        assert_eq!(h.sink.batches.lock().unwrap().len(), 1);
        assert_eq!(h.sync.snapshot().phase, ThemePhase::Applied);
    }
}
