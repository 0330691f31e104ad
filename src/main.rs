use bursawatch::api::yahoo::YahooChartSource;
use bursawatch::config::Config;
use bursawatch::engine::types::format_price;
use bursawatch::engine::{AlertStateStore, HistoryLog, ThresholdStore};
use bursawatch::monitor::{self, MonitoringCycle, Ticker};
use bursawatch::notify::{
    EmailChannel, NotificationChannel, NotificationDispatcher, TelegramChannel,
};
use env_logger::Builder;
use log::{info, LevelFilter};
use std::error::Error;
use std::io::Write;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    // Configure logger
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("bursawatch", LevelFilter::Debug)
        .filter_module("reqwest", LevelFilter::Warn)
        .parse_default_env() // RUST_LOG wins over the defaults above
        .format(|buf, record| {
            let ts = chrono::Local::now().format("%H:%M:%S%.3f");
            writeln!(
                buf,
                "[{} {:<5} {}] {}",
                ts,
                record.level(),
                record.target(),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr)
        .init();

    info!("Starting Bursa stock monitor...");

    // Missing or broken thresholds refuse to start.
    let config = Config::from_env()?;
    let thresholds = ThresholdStore::load(&config.thresholds_path)?;

    let state_store = AlertStateStore::new(config.alert_state_path());
    state_store.ensure_exists()?;
    let history = HistoryLog::new(config.history_path());
    history.ensure_exists()?;
    if let Some(last) = history.recent(1)?.pop() {
        info!(
            "Last recorded sample: {} {} at {}",
            last.symbol,
            format_price(last.price),
            last.timestamp
        );
    }

    let timeout = config.monitor.http_timeout;
    let digest: Option<Arc<dyn NotificationChannel>> = match &config.email {
        Some(email) => Some(Arc::new(EmailChannel::new(email, timeout)?)),
        None => None,
    };
    let direct: Option<Arc<dyn NotificationChannel>> = match &config.telegram {
        Some(telegram) => Some(Arc::new(TelegramChannel::new(telegram, timeout)?)),
        None => None,
    };

    let cycle = Arc::new(MonitoringCycle::new(
        thresholds,
        Arc::new(YahooChartSource::new(timeout)?),
        state_store,
        history,
        NotificationDispatcher::new(digest, direct),
        &config.monitor,
    ));

    info!(
        "Monitoring every {} minutes (cooldown {} minutes)",
        config.monitor.check_interval.as_secs() / 60,
        config.monitor.cooldown.num_minutes()
    );

    let (ticker, ticks) = Ticker::start(config.monitor.check_interval);
    let monitor_handle = tokio::spawn(monitor::run(cycle, ticks));

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal (Ctrl+C), finishing current check...");
    ticker.stop();
    monitor_handle.await?;

    info!("Shutdown complete");
    Ok(())
}
