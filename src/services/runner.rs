//! Signal Runner Service
//!
//! Drives evaluation cycles: fetch bars for every configured instrument and
//! timeframe, evaluate instruments one after another, hand accepted signals
//! to the dispatcher.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, Mutex};
use tokio::time::{interval, sleep, Duration};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::services::dispatch::AlertDispatcher;
use crate::services::signals::SignalEngine;
use crate::sources::DataProvider;
use crate::types::{BarSeries, Evaluation, Timeframe};

/// What to fetch and how often.
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub instruments: Vec<String>,
    pub timeframes: Vec<Timeframe>,
    pub cycle_interval: Duration,
    /// Pause between provider calls.
    pub request_delay: Duration,
}

impl RunnerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            instruments: config.instruments.clone(),
            timeframes: config.timeframes.clone(),
            cycle_interval: Duration::from_secs(config.cycle_interval_secs.max(1)),
            request_delay: Duration::from_millis(config.request_delay_ms),
        }
    }
}

pub struct SignalRunner {
    engine: Arc<Mutex<SignalEngine>>,
    provider: Arc<dyn DataProvider>,
    dispatcher: Arc<dyn AlertDispatcher>,
    settings: RunnerSettings,
    /// Shutdown signal sender
    shutdown_tx: broadcast::Sender<()>,
    running: AtomicBool,
}

impl SignalRunner {
    pub fn new(
        engine: Arc<Mutex<SignalEngine>>,
        provider: Arc<dyn DataProvider>,
        dispatcher: Arc<dyn AlertDispatcher>,
        settings: RunnerSettings,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            engine,
            provider,
            dispatcher,
            settings,
            shutdown_tx,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Loop on the cycle interval until [`stop`](Self::stop) is called.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        info!(
            "Signal runner started: {} instruments, {:?} interval, provider {}, dispatcher {}",
            self.settings.instruments.len(),
            self.settings.cycle_interval,
            self.provider.name(),
            self.dispatcher.name()
        );
        let mut ticker = interval(self.settings.cycle_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evaluations = self.run_cycle(Utc::now()).await;
                    let accepted = evaluations.iter().filter(|e| e.accepted).count();
                    debug!("Cycle finished: {} evaluated, {} accepted", evaluations.len(), accepted);
                }
                _ = shutdown_rx.recv() => {
                    info!("Signal runner received shutdown signal");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        if !self.is_running() {
            return;
        }
        let _ = self.shutdown_tx.send(());
        info!("Signal runner stopped");
    }

    /// One evaluation cycle. Instruments whose primary series is missing or
    /// too short are skipped and produce no evaluation.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Vec<Evaluation> {
        let (primary, min_bars) = {
            let mut engine = self.engine.lock().await;
            engine.rollover(now);
            (engine.primary(), engine.calculator().params().min_bars)
        };

        let mut evaluations = Vec::new();
        let mut first_call = true;

        for instrument in &self.settings.instruments {
            let mut timeframes: HashMap<Timeframe, BarSeries> = HashMap::new();
            for &timeframe in &self.settings.timeframes {
                if !first_call && !self.settings.request_delay.is_zero() {
                    sleep(self.settings.request_delay).await;
                }
                first_call = false;

                let series = self.provider.fetch_bars(instrument, timeframe).await;
                if !series.is_empty() {
                    timeframes.insert(timeframe, series);
                }
            }

            let primary_len = timeframes.get(&primary).map_or(0, BarSeries::len);
            if primary_len < min_bars {
                debug!(
                    "{}: skipped, {} {} bars (need {})",
                    instrument, primary_len, primary, min_bars
                );
                continue;
            }

            let evaluation = self
                .engine
                .lock()
                .await
                .evaluate(instrument, &timeframes, now);

            if let Some(signal) = &evaluation.signal {
                if let Err(e) = self.dispatcher.dispatch(signal).await {
                    warn!(
                        "Dispatch via {} failed for {}: {}",
                        self.dispatcher.name(),
                        instrument,
                        e
                    );
                }
            }
            evaluations.push(evaluation);
        }

        evaluations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, Result};
    use crate::services::signals::GateConfig;
    use crate::types::Bar;
    use chrono::TimeZone;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::AtomicUsize;

    /// Serves a fixed number of uptrend bars for every request.
    struct FixtureProvider {
        bars: usize,
        calls: AtomicUsize,
    }

    impl DataProvider for FixtureProvider {
        fn name(&self) -> &str {
            "fixture"
        }

        fn fetch_bars<'a>(
            &'a self,
            _instrument: &'a str,
            timeframe: Timeframe,
        ) -> Pin<Box<dyn Future<Output = BarSeries> + Send + 'a>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let step = timeframe.minutes() * 60_000;
            let bars = (0..self.bars)
                .map(|i| {
                    let base = 100.0 + i as f64 * 1.5;
                    Bar {
                        time: 1000000 + i as i64 * step,
                        open: base,
                        high: base + 2.0,
                        low: base - 1.0,
                        close: base + 1.0,
                        volume: 1000.0,
                    }
                })
                .collect();
            Box::pin(async move { BarSeries::new(bars) })
        }
    }

    struct FailingDispatcher {
        calls: AtomicUsize,
    }

    impl AlertDispatcher for FailingDispatcher {
        fn name(&self) -> &str {
            "failing"
        }

        fn send_text<'a>(
            &'a self,
            _text: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Err(AppError::ExternalApi("down".to_string())) })
        }
    }

    fn settings(instruments: &[&str]) -> RunnerSettings {
        RunnerSettings {
            instruments: instruments.iter().map(|s| s.to_string()).collect(),
            timeframes: vec![Timeframe::M15, Timeframe::H1],
            cycle_interval: Duration::from_secs(3600),
            request_delay: Duration::ZERO,
        }
    }

    struct Harness {
        runner: SignalRunner,
        provider: Arc<FixtureProvider>,
        dispatcher: Arc<FailingDispatcher>,
        engine: Arc<Mutex<SignalEngine>>,
    }

    fn create_harness(bars: usize, instruments: &[&str], gate: GateConfig) -> Harness {
        let engine = Arc::new(Mutex::new(SignalEngine::with_gate(Timeframe::M15, gate)));
        let provider = Arc::new(FixtureProvider {
            bars,
            calls: AtomicUsize::new(0),
        });
        let dispatcher = Arc::new(FailingDispatcher {
            calls: AtomicUsize::new(0),
        });
        let runner = SignalRunner::new(
            engine.clone(),
            provider.clone(),
            dispatcher.clone(),
            settings(instruments),
        );
        Harness {
            runner,
            provider,
            dispatcher,
            engine,
        }
    }

    fn create_runner(bars: usize, instruments: &[&str]) -> (SignalRunner, Arc<FixtureProvider>) {
        let harness = create_harness(bars, instruments, GateConfig::default());
        (harness.runner, harness.provider)
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_short_history_is_skipped() {
        let (runner, provider) = create_runner(20, &["XAUUSD", "EURUSD"]);
        let evaluations = runner.run_cycle(noon()).await;
        assert!(evaluations.is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_instruments_evaluated_in_order() {
        let (runner, _) = create_runner(80, &["XAUUSD", "EURUSD"]);
        let evaluations = runner.run_cycle(noon()).await;
        let names: Vec<&str> = evaluations.iter().map(|e| e.instrument.as_str()).collect();
        assert_eq!(names, vec!["XAUUSD", "EURUSD"]);
    }

    #[tokio::test]
    async fn test_failed_dispatch_keeps_acceptance() {
        // The steady uptrend carries the trend and structure factors and
        // nothing against it; the threshold is set to the trend weight.
        let gate = GateConfig {
            min_score: 3,
            ..Default::default()
        };
        let harness = create_harness(80, &["XAUUSD"], gate);

        let evaluations = harness.runner.run_cycle(noon()).await;
        assert_eq!(evaluations.len(), 1);
        assert!(evaluations[0].accepted, "{:?}", evaluations[0].rejection);
        assert_eq!(harness.dispatcher.calls.load(Ordering::SeqCst), 1);

        let status = harness.engine.lock().await.status(noon());
        assert_eq!(status.signals_today, 1);
        assert_eq!(status.active_cooldowns.len(), 1);
        assert_eq!(status.active_cooldowns[0].instrument, "XAUUSD");

        let later = noon() + chrono::Duration::minutes(15);
        let evaluations = harness.runner.run_cycle(later).await;
        assert!(matches!(
            evaluations[0].rejection,
            Some(crate::types::Rejection::Cooldown { .. })
        ));
        assert_eq!(harness.dispatcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_ends_start_loop() {
        let (runner, _) = create_runner(20, &["XAUUSD"]);
        let runner = Arc::new(runner);
        let handle = {
            let runner = runner.clone();
            tokio::spawn(async move { runner.start().await })
        };

        while !runner.is_running() {
            tokio::task::yield_now().await;
        }
        runner.stop();
        handle.await.unwrap();
        assert!(!runner.is_running());
    }

    #[test]
    fn test_settings_from_config() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 5000,
            instruments: vec!["XAUUSD".to_string()],
            timeframes: vec![Timeframe::M15],
            primary_timeframe: Timeframe::M15,
            cycle_interval_secs: 0,
            request_delay_ms: 1500,
            alpha_vantage_api_key: None,
            telegram: None,
            gate: Default::default(),
        };
        let settings = RunnerSettings::from_config(&config);
        assert_eq!(settings.cycle_interval, Duration::from_secs(1));
        assert_eq!(settings.request_delay, Duration::from_millis(1500));
    }
}
