use async_trait::async_trait;
use bursawatch::api::PriceSource;
use bursawatch::config::MonitorConfig;
use bursawatch::engine::types::{parse_timestamp, AlertKind, Symbol};
use bursawatch::engine::{AlertStateStore, HistoryLog, ThresholdStore};
use bursawatch::error::{MonitorError, Result};
use bursawatch::monitor::{CycleOutcome, CycleReport, MonitoringCycle};
use bursawatch::notify::{
    ChannelOutcome, DispatchStatus, NotificationChannel, NotificationDispatcher, OutboundMessage,
    RetryPolicy,
};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct ScriptedPrices(Mutex<HashMap<String, f64>>);

impl ScriptedPrices {
    fn set(&self, symbol: &str, price: f64) {
        self.0.lock().unwrap().insert(symbol.to_string(), price);
    }
}

#[async_trait]
impl PriceSource for ScriptedPrices {
    async fn fetch_latest(&self, symbol: &Symbol) -> Result<f64> {
        self.0
            .lock()
            .unwrap()
            .get(symbol.as_str())
            .copied()
            .ok_or_else(|| MonitorError::NoData(symbol.to_string()))
    }
}

struct RecordingChannel {
    name: &'static str,
    healthy: bool,
    attempts: Mutex<usize>,
    sent: Mutex<Vec<OutboundMessage>>,
}

impl RecordingChannel {
    fn new(name: &'static str, healthy: bool) -> Arc<Self> {
        Arc::new(Self {
            name,
            healthy,
            attempts: Mutex::new(0),
            sent: Mutex::new(Vec::new()),
        })
    }

    fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }

    fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    fn name(&self) -> &str {
        self.name
    }

    async fn deliver(&self, message: &OutboundMessage) -> Result<()> {
        *self.attempts.lock().unwrap() += 1;
        if !self.healthy {
            return Err(MonitorError::RemoteError {
                service: self.name.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

struct Harness {
    dir: tempfile::TempDir,
    prices: Arc<ScriptedPrices>,
    digest: Arc<RecordingChannel>,
    direct: Arc<RecordingChannel>,
    cycle: MonitoringCycle,
}

fn harness(thresholds: &str, digest_healthy: bool) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("thresholds.json");
    fs::write(&path, thresholds).unwrap();

    let prices = Arc::new(ScriptedPrices::default());
    let digest = RecordingChannel::new("email", digest_healthy);
    let direct = RecordingChannel::new("telegram", true);

    let dispatcher = NotificationDispatcher::new(Some(digest.clone()), Some(direct.clone()))
        .with_retry_policy(RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        });

    let settings = MonitorConfig {
        check_interval: Duration::from_secs(300),
        cooldown: chrono::Duration::minutes(60),
        max_csv_bytes: 10 * 1024 * 1024,
        http_timeout: Duration::from_secs(10),
    };

    let cycle = MonitoringCycle::new(
        ThresholdStore::load(&path).unwrap(),
        prices.clone(),
        AlertStateStore::new(dir.path().join("last_alerts.json")),
        HistoryLog::new(dir.path().join("history.csv")),
        dispatcher,
        &settings,
    );

    Harness {
        dir,
        prices,
        digest,
        direct,
        cycle,
    }
}

async fn run_at(h: &Harness, at: &str) -> CycleReport {
    match h.cycle.run_at(parse_timestamp(at).unwrap()).await {
        CycleOutcome::Completed(report) => report,
        CycleOutcome::Skipped => panic!("cycle unexpectedly skipped"),
    }
}

fn state_file(dir: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(dir.join("last_alerts.json")).unwrap()).unwrap()
}

const SINGLE: &str = r#"{"5285.KL": {"up": 10.00, "down": 8.50}}"#;

#[tokio::test]
async fn breach_alerts_once_then_cools_down() {
    let h = harness(SINGLE, true);
    h.prices.set("5285.KL", 10.50);

    let first = run_at(&h, "2024-03-01 10:00:00").await;
    assert_eq!(first.alerts.len(), 1);
    assert_eq!(first.alerts[0].kind, AlertKind::Up);
    assert_eq!(first.alerts[0].threshold_value, 10.00);
    assert_eq!(first.dispatch.unwrap().status(), DispatchStatus::Success);
    assert_eq!(
        state_file(h.dir.path())["5285.KL"]["UP"],
        "2024-03-01 10:00:00"
    );

    // Ten minutes later, inside the 60 minute cooldown.
    let second = run_at(&h, "2024-03-01 10:10:00").await;
    assert!(second.alerts.is_empty());
    assert!(second.dispatch.is_none());
    assert!(second.state_persisted);
    assert_eq!(
        state_file(h.dir.path())["5285.KL"]["UP"],
        "2024-03-01 10:00:00"
    );

    let third = run_at(&h, "2024-03-01 11:00:00").await;
    assert_eq!(third.alerts.len(), 1);

    assert_eq!(h.digest.sent().len(), 2);
    assert_eq!(h.direct.sent().len(), 2);
    assert!(h.direct.sent()[0].body.contains("Current: RM 10.50"));

    let history = HistoryLog::new(h.dir.path().join("history.csv"));
    assert_eq!(history.recent(10).unwrap().len(), 3);
}

#[tokio::test]
async fn price_inside_band_changes_nothing() {
    let h = harness(SINGLE, true);
    h.prices.set("5285.KL", 9.00);

    let report = run_at(&h, "2024-03-01 10:00:00").await;
    assert!(report.alerts.is_empty());
    assert!(report.dispatch.is_none());
    assert_eq!(state_file(h.dir.path()), serde_json::json!({}));
    assert_eq!(h.digest.attempts(), 0);
    assert_eq!(h.direct.attempts(), 0);
}

#[tokio::test]
async fn invalid_threshold_is_skipped_without_aborting() {
    let h = harness(
        r#"{"5285.KL": {"up": 5, "down": 5}, "1155.KL": {"up": 10.0, "down": 8.5}}"#,
        true,
    );
    h.prices.set("5285.KL", 5.0);
    h.prices.set("1155.KL", 8.0);

    let report = run_at(&h, "2024-03-01 10:00:00").await;
    assert_eq!(report.skipped_invalid, 1);
    assert_eq!(report.sampled, 1);
    assert_eq!(report.alerts.len(), 1);
    assert_eq!(report.alerts[0].symbol.as_str(), "1155.KL");
    assert_eq!(report.alerts[0].kind, AlertKind::Down);
}

#[tokio::test]
async fn failing_digest_still_delivers_direct_and_persists() {
    let h = harness(SINGLE, false);
    h.prices.set("5285.KL", 8.00);

    let report = run_at(&h, "2024-03-01 10:00:00").await;
    let dispatch = report.dispatch.unwrap();

    assert_eq!(dispatch.digest, ChannelOutcome::Failed);
    assert_eq!(dispatch.direct, ChannelOutcome::Delivered);
    assert_eq!(dispatch.status(), DispatchStatus::Partial);
    assert_eq!(h.digest.attempts(), 3);
    assert_eq!(h.direct.sent().len(), 1);
    assert!(report.state_persisted);
    assert_eq!(
        state_file(h.dir.path())["5285.KL"]["DOWN"],
        "2024-03-01 10:00:00"
    );
}

#[tokio::test]
async fn threshold_updates_apply_on_the_next_cycle() {
    let h = harness(SINGLE, true);
    h.prices.set("5285.KL", 9.50);

    assert!(run_at(&h, "2024-03-01 10:00:00").await.alerts.is_empty());

    let store = ThresholdStore::load(h.dir.path().join("thresholds.json")).unwrap();
    store
        .upsert(
            "5285.KL",
            bursawatch::engine::Threshold {
                up: 9.40,
                down: 8.50,
            },
        )
        .unwrap();
    store.save().unwrap();
    // Make sure the mtime differs from the one seen at startup.
    fs::File::options()
        .write(true)
        .open(h.dir.path().join("thresholds.json"))
        .unwrap()
        .set_modified(std::time::SystemTime::UNIX_EPOCH)
        .unwrap();

    let report = run_at(&h, "2024-03-01 10:05:00").await;
    assert_eq!(report.alerts.len(), 1);
    assert_eq!(report.alerts[0].threshold_value, 9.40);
}

#[tokio::test]
async fn corrupt_state_file_is_replaced_after_cycle() {
    let h = harness(SINGLE, true);
    fs::write(h.dir.path().join("last_alerts.json"), "{oops").unwrap();
    h.prices.set("5285.KL", 10.50);

    let report = run_at(&h, "2024-03-01 10:00:00").await;
    assert_eq!(report.alerts.len(), 1);
    assert!(report.state_persisted);
    assert_eq!(
        state_file(h.dir.path())["5285.KL"]["UP"],
        "2024-03-01 10:00:00"
    );
}
