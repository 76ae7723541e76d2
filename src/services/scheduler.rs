use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Utc};
use futures_util::future::join_all;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::effectors::Effector;
use crate::models::status::{BatchPhase, RefreshPhase};
use crate::models::telemetry::{Flows, Sample};
use crate::services::interpreter::{interpret, AppliedCache};
use crate::services::solar_envelope::{SolarEnvelope, SolarEstimator};
use crate::services::telemetry_service::TelemetrySource;
use crate::shared_state::AppState;

/// Timing and plant parameters of the three loops.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub refresh_period: Duration,
    pub solar_interval: Duration,
    pub batch_timeout: Duration,
    pub latitude: f64,
    pub longitude: f64,
    pub summer_peak_w: f64,
    pub winter_peak_w: f64,
}

impl SchedulerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            refresh_period: config.refresh_period(),
            solar_interval: config.solar_interval(),
            batch_timeout: config.batch_timeout(),
            latitude: config.plant.latitude,
            longitude: config.plant.longitude,
            summer_peak_w: config.summer_peak_w(),
            winter_peak_w: config.winter_peak_w(),
        }
    }
}

/// Drives fetching, solar estimation and effect dispatch.
///
/// The loops only talk through `watch` channels: the newest sample and the
/// newest envelope overwrite older ones, so a slow batch never queues work.
pub struct Scheduler {
    source: Arc<dyn TelemetrySource>,
    effectors: Vec<Arc<dyn Effector>>,
    app: AppState,
    settings: SchedulerSettings,
}

impl Scheduler {
    pub fn new(
        source: Arc<dyn TelemetrySource>,
        effectors: Vec<Arc<dyn Effector>>,
        app: AppState,
        settings: SchedulerSettings,
    ) -> Self {
        Self { source, effectors, app, settings }
    }

    /// Runs until every loop has lost its counterpart, which in practice is never.
    pub async fn run(self) {
        let settings = self.settings;
        info!(
            refresh_ms = settings.refresh_period.as_millis() as u64,
            solar_s = settings.solar_interval.as_secs(),
            effectors = self.effectors.len(),
            "scheduler started"
        );

        let mut estimator =
            SolarEstimator::new(settings.latitude, settings.longitude, settings.summer_peak_w, settings.winter_peak_w);
        let first = estimator.update(&Local::now(), 0.0);
        let (sample_tx, sample_rx) = watch::channel(None);
        let (envelope_tx, envelope_rx) = watch::channel(first);

        let dispatcher = Dispatcher::new(self.effectors, self.app.clone(), settings.batch_timeout);
        tokio::join!(
            refresh_loop(self.source.as_ref(), sample_tx, settings.refresh_period, &self.app),
            solar_loop(estimator, sample_rx.clone(), envelope_tx, settings.solar_interval),
            dispatcher.run(sample_rx, envelope_rx),
        );
    }
}

// ─── Refresh ─────────────────────────────────────────────────────────────────

/// Fetches one sample per period. A fetch is awaited before the next tick is
/// taken, so fetches never overlap; late ticks are delayed rather than bunched.
pub async fn refresh_loop(
    source: &dyn TelemetrySource,
    samples: watch::Sender<Option<Sample>>,
    period: Duration,
    app: &AppState,
) {
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        app.update_status(|s| s.refresh_phase = RefreshPhase::Fetching);
        match source.fetch().await {
            Ok(sample) => {
                app.update_status(|s| {
                    s.refresh_phase = RefreshPhase::Idle;
                    s.fetches_ok += 1;
                    s.consecutive_failures = 0;
                    s.last_sample_at = Some(Utc::now());
                });
                if samples.send(Some(sample)).is_err() {
                    debug!("no dispatcher listening, refresh loop stops");
                    return;
                }
            }
            Err(e) => {
                let mut failures = 0;
                app.update_status(|s| {
                    s.refresh_phase = RefreshPhase::Idle;
                    s.fetches_failed += 1;
                    s.consecutive_failures += 1;
                    s.last_error = Some(e.to_string());
                    failures = s.consecutive_failures;
                });
                // the scene keeps showing the last good sample
                warn!(error = %e, consecutive = failures, "telemetry fetch failed");
            }
        }
    }
}

// ─── Solar ───────────────────────────────────────────────────────────────────

/// Re-estimates the solar envelope on its own, slower cadence.
pub async fn solar_loop(
    mut estimator: SolarEstimator,
    samples: watch::Receiver<Option<Sample>>,
    envelope: watch::Sender<SolarEnvelope>,
    every: Duration,
) {
    let mut ticker = time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let export = samples
            .borrow()
            .as_ref()
            .map(|sample| Flows::from_sample(sample).grid_export)
            .unwrap_or(0.0);
        let next = estimator.update(&Local::now(), export);
        debug!(
            night = next.is_night,
            capacity_w = next.estimated_peak_capacity,
            "solar envelope refreshed"
        );
        if envelope.send(next).is_err() {
            return;
        }
    }
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

/// Outcome of one settled batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub dispatched: Vec<&'static str>,
    pub failed: Vec<&'static str>,
    pub timed_out: bool,
}

/// Interprets samples and fans them out to the due effectors, one batch at a time.
pub struct Dispatcher {
    effectors: Vec<Arc<dyn Effector>>,
    app: AppState,
    batch_timeout: Duration,
    cache: AppliedCache,
}

impl Dispatcher {
    pub fn new(effectors: Vec<Arc<dyn Effector>>, app: AppState, batch_timeout: Duration) -> Self {
        Self {
            effectors,
            app,
            batch_timeout,
            cache: AppliedCache::default(),
        }
    }

    /// Waits for samples and dispatches the newest one whenever the previous
    /// batch has settled. Samples arriving meanwhile replace each other.
    pub async fn run(
        mut self,
        mut samples: watch::Receiver<Option<Sample>>,
        envelope: watch::Receiver<SolarEnvelope>,
    ) {
        while samples.changed().await.is_ok() {
            let Some(sample) = samples.borrow_and_update().clone() else {
                continue;
            };
            let current = *envelope.borrow();
            self.dispatch(&sample, &current).await;
        }
        debug!("sample channel closed, dispatcher stops");
    }

    pub async fn dispatch(&mut self, sample: &Sample, envelope: &SolarEnvelope) -> BatchReport {
        self.app.update_status(|s| s.batch_phase = BatchPhase::Interpreting);
        let state = interpret(sample, envelope, &self.cache);

        self.app.update_status(|s| s.batch_phase = BatchPhase::Dispatching);
        let due: Vec<&Arc<dyn Effector>> = self.effectors.iter().filter(|e| e.is_due(&state)).collect();
        let mut report = BatchReport {
            dispatched: due.iter().map(|e| e.name()).collect(),
            ..BatchReport::default()
        };

        self.app.update_status(|s| s.batch_phase = BatchPhase::AwaitingBatch);
        let batch = join_all(due.iter().map(|effector| {
            let state = &state;
            async move { (effector.name(), effector.apply(state).await) }
        }));
        match time::timeout(self.batch_timeout, batch).await {
            Ok(results) => {
                for (name, result) in results {
                    if let Err(e) = result {
                        warn!(effector = name, error = %e, "effect failed");
                        report.failed.push(name);
                    }
                }
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.batch_timeout.as_millis() as u64,
                    effectors = report.dispatched.len(),
                    "effect batch timed out, abandoning it"
                );
                report.timed_out = true;
                // abandoned effects never clear their own transitions
                if let Err(e) = self.app.update_scene(|scene| scene.clear_transitions()) {
                    warn!(error = %e, "could not reset transitions");
                }
            }
        }

        // settled either way: the next tick compares against this state
        self.cache.commit(&state);
        self.app.update_status(|s| {
            s.batch_phase = BatchPhase::Idle;
            s.batches_dispatched += 1;
            s.effects_failed += report.failed.len() as u64;
            if report.timed_out {
                s.batches_timed_out += 1;
            }
            s.last_batch_at = Some(Utc::now());
        });
        debug!(
            dispatched = report.dispatched.len(),
            failed = report.failed.len(),
            timed_out = report.timed_out,
            "batch settled"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use futures_util::future::BoxFuture;
    use reqwest::StatusCode;

    use crate::effectors::test_support::context;
    use crate::effectors::{standard_set, EffectError, EffectFuture, Motion};
    use crate::services::interpreter::tests::{day_envelope, quiet_sample};
    use crate::services::interpreter::RenderState;
    use crate::services::locale::test_locale;
    use crate::services::telemetry_service::FetchError;

    /// Always-due effector that records what it saw and how many ran at once.
    #[derive(Default)]
    struct Recorder {
        delay: Duration,
        fail: bool,
        running: AtomicUsize,
        max_running: AtomicUsize,
        seen: Mutex<Vec<f64>>,
    }

    impl Recorder {
        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self { delay, ..Self::default() })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self { fail: true, ..Self::default() })
        }

        fn seen(&self) -> Vec<f64> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Effector for Recorder {
        fn name(&self) -> &'static str {
            if self.fail { "failing" } else { "recorder" }
        }

        fn is_due(&self, _state: &RenderState) -> bool {
            true
        }

        fn apply<'a>(&'a self, state: &'a RenderState) -> EffectFuture<'a> {
            Box::pin(async move {
                let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_running.fetch_max(now, Ordering::SeqCst);
                self.seen.lock().unwrap().push(state.sample.pv_power);
                time::sleep(self.delay).await;
                self.running.fetch_sub(1, Ordering::SeqCst);
                if self.fail {
                    Err(EffectError::Failed("boom".into()))
                } else {
                    Ok(())
                }
            })
        }
    }

    fn app() -> AppState {
        AppState::new(Arc::new(test_locale()))
    }

    fn pv(watts: f64) -> Sample {
        Sample { pv_power: watts, ..quiet_sample() }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_batch_drops_superseded_samples() {
        let recorder = Recorder::slow(Duration::from_secs(3));
        let dispatcher = Dispatcher::new(vec![recorder.clone() as Arc<dyn Effector>], app(), Duration::from_secs(10));
        let (sample_tx, sample_rx) = watch::channel(None);
        let (_envelope_tx, envelope_rx) = watch::channel(day_envelope());
        let task = tokio::spawn(dispatcher.run(sample_rx, envelope_rx));

        sample_tx.send(Some(pv(1.0))).unwrap();
        time::sleep(Duration::from_millis(100)).await;
        for watts in [2.0, 3.0, 4.0] {
            sample_tx.send(Some(pv(watts))).unwrap();
            time::sleep(Duration::from_millis(500)).await;
        }
        time::sleep(Duration::from_secs(10)).await;

        assert_eq!(recorder.seen(), vec![1.0, 4.0]);
        assert_eq!(recorder.max_running.load(Ordering::SeqCst), 1);

        drop(sample_tx);
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_effector_does_not_stop_the_batch() {
        let app = app();
        let healthy = Recorder::slow(Duration::from_millis(200));
        let effectors: Vec<Arc<dyn Effector>> = vec![Recorder::failing(), healthy.clone()];
        let mut dispatcher = Dispatcher::new(effectors, app.clone(), Duration::from_secs(10));

        let report = dispatcher.dispatch(&pv(100.0), &day_envelope()).await;
        assert_eq!(report.dispatched, vec!["failing", "recorder"]);
        assert_eq!(report.failed, vec!["failing"]);
        assert!(!report.timed_out);
        assert_eq!(healthy.seen(), vec![100.0]);

        let report = dispatcher.dispatch(&pv(200.0), &day_envelope()).await;
        assert_eq!(report.failed, vec!["failing"]);
        assert_eq!(healthy.seen(), vec![100.0, 200.0]);

        let status = app.status_snapshot().unwrap();
        assert_eq!(status.batches_dispatched, 2);
        assert_eq!(status.effects_failed, 2);
        assert_eq!(status.batch_phase, BatchPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_settles_and_commits() {
        let app = app();
        let stuck = Recorder::slow(Duration::from_secs(3600));
        let mut dispatcher = Dispatcher::new(vec![stuck.clone() as Arc<dyn Effector>], app.clone(), Duration::from_secs(5));

        let started = time::Instant::now();
        let report = dispatcher.dispatch(&quiet_sample(), &day_envelope()).await;
        assert!(report.timed_out);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(5) && waited < Duration::from_secs(6), "{waited:?}");
        assert_eq!(dispatcher.cache.soc, Some(50.0));
        assert_eq!(app.status_snapshot().unwrap().batches_timed_out, 1);

        // the next sample is dispatched normally
        let report = dispatcher.dispatch(&quiet_sample(), &day_envelope()).await;
        assert!(report.timed_out);
        assert_eq!(stuck.seen().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_clears_stale_transitions() {
        let ctx = context(Motion::default());
        let app = ctx.app.clone();
        let mut dispatcher = Dispatcher::new(standard_set(&ctx), app.clone(), Duration::from_millis(500));
        let sample = Sample { pv_power: 3000.0, battery_power: 1500.0, home_power: 1500.0, ..quiet_sample() };

        let report = dispatcher.dispatch(&sample, &day_envelope()).await;
        assert!(report.timed_out);
        let scene = app.scene_snapshot().unwrap();
        assert!(scene.battery.transition.is_none());
        assert!(scene.arrows.pv_to_battery.transition.is_none());
        // scene updates made before the timeout stay
        assert!(scene.arrows.pv_to_battery.visible);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_soc_dispatches_gauge_once() {
        let ctx = context(Motion::default());
        let mut dispatcher = Dispatcher::new(standard_set(&ctx), ctx.app.clone(), Duration::from_secs(10));

        let first = dispatcher.dispatch(&quiet_sample(), &day_envelope()).await;
        assert!(first.dispatched.contains(&"battery-gauge"));
        let second = dispatcher.dispatch(&quiet_sample(), &day_envelope()).await;
        assert!(!second.dispatched.contains(&"battery-gauge"));
        assert!(second.dispatched.is_empty(), "{:?}", second.dispatched);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_zero_status_is_dispatched() {
        let ctx = context(Motion::default());
        let mut dispatcher = Dispatcher::new(standard_set(&ctx), ctx.app.clone(), Duration::from_secs(10));
        let sample = Sample { ems: 0, ups: 0, ..quiet_sample() };

        let first = dispatcher.dispatch(&sample, &day_envelope()).await;
        assert!(first.dispatched.contains(&"status"), "{:?}", first.dispatched);
        let second = dispatcher.dispatch(&sample, &day_envelope()).await;
        assert!(!second.dispatched.contains(&"status"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_night_before_sunrise_shows_moon() {
        let ctx = context(Motion::default());
        let mut dispatcher = Dispatcher::new(standard_set(&ctx), ctx.app.clone(), Duration::from_secs(10));
        let night = SolarEnvelope { is_night: true, ..day_envelope() };

        let report = dispatcher.dispatch(&Sample { grid_power: 400.0, home_power: 400.0, ..quiet_sample() }, &night).await;
        assert!(report.dispatched.contains(&"sky"));
        let scene = ctx.app.scene_snapshot().unwrap();
        assert!(scene.sky.moon && !scene.sky.sun && !scene.sky.cloud);
        assert!(!scene.arrows.pv_to_grid.visible);
        assert!(scene.arrows.grid_to_home.visible);
    }

    /// Replays a fixed list of fetch results, then fails.
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<Sample, FetchError>>>,
        calls: AtomicUsize,
    }

    impl TelemetrySource for ScriptedSource {
        fn fetch(&self) -> BoxFuture<'_, Result<Sample, FetchError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            Box::pin(async move { next.unwrap_or(Err(FetchError::Status(StatusCode::SERVICE_UNAVAILABLE))) })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_survives_failed_fetches() {
        let app = app();
        let source = Arc::new(ScriptedSource {
            script: Mutex::new(VecDeque::from([
                Err(FetchError::Status(StatusCode::BAD_GATEWAY)),
                Ok(pv(1234.0)),
                Err(FetchError::Status(StatusCode::BAD_GATEWAY)),
            ])),
            calls: AtomicUsize::new(0),
        });
        let (sample_tx, sample_rx) = watch::channel(None);
        let loop_source = source.clone();
        let loop_app = app.clone();
        tokio::spawn(async move {
            refresh_loop(loop_source.as_ref(), sample_tx, Duration::from_secs(2), &loop_app).await;
        });

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert_eq!(sample_rx.borrow().as_ref().map(|s| s.pv_power), Some(1234.0));
        let status = app.status_snapshot().unwrap();
        assert_eq!(status.fetches_ok, 1);
        assert_eq!(status.fetches_failed, 2);
        assert_eq!(status.consecutive_failures, 1);
        assert!(status.last_error.unwrap().contains("502"));
    }

    /// Answers every fetch with a fresh sample whose PV power counts the calls.
    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
    }

    impl TelemetrySource for CountingSource {
        fn fetch(&self) -> BoxFuture<'_, Result<Sample, FetchError>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Box::pin(async move { Ok(pv(n as f64)) })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_keeps_cadence_while_batches_fail_slowly() {
        let app = app();
        let source = Arc::new(CountingSource::default());
        let broken = Arc::new(Recorder { delay: Duration::from_secs(5), fail: true, ..Recorder::default() });
        let healthy = Recorder::slow(Duration::from_millis(100));
        let effectors: Vec<Arc<dyn Effector>> = vec![broken.clone() as Arc<dyn Effector>, healthy.clone()];
        let dispatcher = Dispatcher::new(effectors, app.clone(), Duration::from_secs(60));

        let (sample_tx, sample_rx) = watch::channel(None);
        let (_envelope_tx, envelope_rx) = watch::channel(day_envelope());
        let loop_source = source.clone();
        let loop_app = app.clone();
        tokio::spawn(async move {
            refresh_loop(loop_source.as_ref(), sample_tx, Duration::from_secs(2), &loop_app).await;
        });
        tokio::spawn(dispatcher.run(sample_rx, envelope_rx));

        time::sleep(Duration::from_secs(61)).await;

        // one fetch per 2 s tick, regardless of the 5 s failing batches
        let calls = source.calls.load(Ordering::SeqCst);
        assert!((30..=31).contains(&calls), "{calls}");
        let status = app.status_snapshot().unwrap();
        assert_eq!(status.fetches_ok as usize, calls);
        assert_eq!(status.fetches_failed, 0);

        // every settled batch failed once and the next one still ran
        assert!(status.batches_dispatched >= 10, "{}", status.batches_dispatched);
        assert!((status.batches_dispatched as usize) < calls);
        assert_eq!(status.effects_failed, status.batches_dispatched);
        assert_eq!(broken.max_running.load(Ordering::SeqCst), 1);

        // superseded samples are skipped, newer ones still arrive
        let seen = healthy.seen();
        assert!(seen.len() as u64 >= status.batches_dispatched);
        assert!(seen.windows(2).all(|w| w[0] < w[1]), "{seen:?}");
        assert!(*seen.last().unwrap() > 25.0, "{seen:?}");
    }
}
