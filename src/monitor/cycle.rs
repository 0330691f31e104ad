use crate::api::PriceSource;
use crate::config::MonitorConfig;
use crate::engine::types::{format_price, AlertEvent, PriceSample};
use crate::engine::{evaluate, AlertState, AlertStateStore, HistoryLog, ThresholdStore};
use crate::notify::{DispatchReport, NotificationDispatcher};
use chrono::{Local, NaiveDateTime};
use futures::future::join_all;
use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub sampled: usize,
    pub skipped_invalid: usize,
    pub fetch_failures: usize,
    pub alerts: Vec<AlertEvent>,
    pub state_persisted: bool,
    pub dispatch: Option<DispatchReport>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Completed(CycleReport),
    // Previous cycle still running
    Skipped,
}

struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct MonitoringCycle {
    thresholds: ThresholdStore,
    source: Arc<dyn PriceSource>,
    state_store: AlertStateStore,
    history: HistoryLog,
    dispatcher: NotificationDispatcher,
    cooldown: chrono::Duration,
    max_history_bytes: u64,
    running: AtomicBool,
}

impl MonitoringCycle {
    pub fn new(
        thresholds: ThresholdStore,
        source: Arc<dyn PriceSource>,
        state_store: AlertStateStore,
        history: HistoryLog,
        dispatcher: NotificationDispatcher,
        settings: &MonitorConfig,
    ) -> Self {
        Self {
            thresholds,
            source,
            state_store,
            history,
            dispatcher,
            cooldown: settings.cooldown,
            max_history_bytes: settings.max_csv_bytes,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub async fn run_once(&self) -> CycleOutcome {
        self.run_at(Local::now().naive_local()).await
    }

    pub async fn run_at(&self, now: NaiveDateTime) -> CycleOutcome {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Previous cycle still running, dropping timer fire");
            return CycleOutcome::Skipped;
        }
        let _guard = RunningGuard(&self.running);
        CycleOutcome::Completed(self.execute(now).await)
    }

    async fn execute(&self, now: NaiveDateTime) -> CycleReport {
        info!("Starting stock price check...");

        self.thresholds.reload();
        if let Err(e) = self.history.rotate_if_needed(self.max_history_bytes) {
            error!("History rotation failed for {}: {}", self.history.path().display(), e);
        }

        let mut state = match self.state_store.load() {
            Ok(state) => state,
            Err(e) => {
                error!(
                    "Error loading alerts file {}: {}, starting from empty state",
                    self.state_store.path().display(),
                    e
                );
                AlertState::default()
            }
        };

        let (symbols, skipped_invalid) = self.thresholds.validated();

        // Fetches run concurrently; everything touching `state` below runs
        // sequentially.
        let fetches = symbols.iter().map(|(symbol, _)| self.source.fetch_latest(symbol));
        let prices = join_all(fetches).await;

        let mut report = CycleReport {
            sampled: 0,
            skipped_invalid,
            fetch_failures: 0,
            alerts: Vec::new(),
            state_persisted: false,
            dispatch: None,
        };

        for ((symbol, threshold), fetched) in symbols.iter().zip(prices) {
            let price = match fetched {
                Ok(price) => price,
                Err(e) => {
                    error!("Failed to fetch {} price: {}", symbol, e);
                    report.fetch_failures += 1;
                    continue;
                }
            };
            info!("{} price: {}", symbol, format_price(price));
            report.sampled += 1;

            let sample = PriceSample {
                symbol: symbol.clone(),
                price,
                timestamp: now,
            };
            if let Err(e) = self.history.append(&sample) {
                error!("Failed to record {} in history: {}", symbol, e);
            }

            let fired = evaluate(symbol, price, threshold, &mut state, now, self.cooldown);
            report.alerts.extend(fired);
        }

        match self.state_store.save(&state) {
            Ok(()) => report.state_persisted = true,
            Err(e) => error!(
                "FAILED TO PERSIST ALERT STATE to {}: {} (duplicate alerts possible next cycle)",
                self.state_store.path().display(),
                e
            ),
        }

        if report.alerts.is_empty() {
            info!("No alerts triggered");
        } else {
            report.dispatch = Some(self.dispatcher.dispatch(&report.alerts).await);
        }

        info!(
            "Check finished: {} sampled, {} invalid, {} fetch failures, {} alerts",
            report.sampled,
            report.skipped_invalid,
            report.fetch_failures,
            report.alerts.len()
        );
        report
    }
}
