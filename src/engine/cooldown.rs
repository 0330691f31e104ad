use super::state::AlertState;
use super::types::{parse_timestamp, AlertKind, Symbol};
use chrono::{Duration, NaiveDateTime};
use log::{debug, warn};

// Unreadable stored timestamps fail open.
pub fn permit(
    symbol: &Symbol,
    kind: AlertKind,
    state: &AlertState,
    now: NaiveDateTime,
    cooldown: Duration,
) -> bool {
    let last = match state.last_fired(symbol, kind) {
        Some(raw) => raw,
        None => return true,
    };

    let last_time = match parse_timestamp(last) {
        Some(t) => t,
        None => {
            warn!(
                "Invalid timestamp '{}' for {} {}, allowing alert",
                last, symbol, kind
            );
            return true;
        }
    };

    if now.signed_duration_since(last_time) >= cooldown {
        true
    } else {
        debug!("Alert for {} {} skipped (cooldown period)", symbol, kind);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::parse_timestamp;

    fn sym() -> Symbol {
        Symbol::parse("5285.KL").unwrap()
    }

    fn t(raw: &str) -> NaiveDateTime {
        parse_timestamp(raw).unwrap()
    }

    fn hour() -> Duration {
        Duration::hours(1)
    }

    #[test]
    fn permits_when_never_fired() {
        let state = AlertState::default();
        assert!(permit(&sym(), AlertKind::Up, &state, t("2024-03-01 10:00:00"), hour()));
    }

    #[test]
    fn denies_inside_window_and_permits_at_boundary() {
        let mut state = AlertState::default();
        state.record(&sym(), AlertKind::Up, t("2024-03-01 10:00:00"));
        let cooldown = Duration::minutes(60);

        assert!(!permit(&sym(), AlertKind::Up, &state, t("2024-03-01 10:10:00"), cooldown));
        assert!(!permit(&sym(), AlertKind::Up, &state, t("2024-03-01 10:59:59"), cooldown));
        assert!(permit(&sym(), AlertKind::Up, &state, t("2024-03-01 11:00:00"), cooldown));
        assert!(permit(&sym(), AlertKind::Up, &state, t("2024-03-02 09:00:00"), cooldown));
    }

    #[test]
    fn kinds_cool_down_independently() {
        let mut state = AlertState::default();
        state.record(&sym(), AlertKind::Up, t("2024-03-01 10:00:00"));
        assert!(permit(&sym(), AlertKind::Down, &state, t("2024-03-01 10:05:00"), hour()));
    }

    #[test]
    fn unparsable_timestamp_fails_open() {
        let mut state = AlertState::default();
        state.set_raw(&sym(), AlertKind::Down, "not-a-time".to_string());
        assert!(permit(&sym(), AlertKind::Down, &state, t("2024-03-01 10:00:00"), hour()));
    }
}
