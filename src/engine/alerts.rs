use super::cooldown;
use super::state::AlertState;
use super::types::{AlertEvent, AlertKind, Symbol, Threshold};
use chrono::{Duration, NaiveDateTime};
use log::info;

pub fn evaluate(
    symbol: &Symbol,
    price: f64,
    threshold: &Threshold,
    state: &mut AlertState,
    now: NaiveDateTime,
    cooldown: Duration,
) -> Option<AlertEvent> {
    let (kind, threshold_value) = if price >= threshold.up {
        (AlertKind::Up, threshold.up)
    } else if price <= threshold.down {
        (AlertKind::Down, threshold.down)
    } else {
        return None;
    };

    if !cooldown::permit(symbol, kind, state, now, cooldown) {
        return None;
    }

    state.record(symbol, kind, now);
    info!(
        "Alert triggered for {}: {} at {:.2} (threshold: {:.2})",
        symbol, kind, price, threshold_value
    );

    Some(AlertEvent {
        symbol: symbol.clone(),
        price,
        kind,
        threshold_value,
    })
}
