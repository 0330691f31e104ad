use super::OutboundMessage;
use crate::engine::types::{format_price, format_timestamp, AlertEvent, AlertKind};
use chrono::NaiveDateTime;

pub const DIGEST_SUBJECT: &str = "Bursa Stock Alerts";

pub fn digest(events: &[AlertEvent], generated_at: &NaiveDateTime) -> OutboundMessage {
    let mut html = String::from("<h2 style='color:#2E86C1;'>Bursa Stock Alerts</h2>");
    html.push_str(
        "<table border='1' cellpadding='5' cellspacing='0' style='border-collapse: collapse;'>",
    );
    html.push_str(
        "<tr style='background-color:#f0f0f0;'><th>Stock</th><th>Price</th><th>Alert</th><th>Threshold</th></tr>",
    );

    for event in events {
        let color = match event.kind {
            AlertKind::Up => "green",
            AlertKind::Down => "red",
        };
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td style='color:{}; font-weight:bold;'>{}</td><td>{}</td></tr>",
            event.symbol,
            format_price(event.price),
            color,
            event.kind,
            format_price(event.threshold_value)
        ));
    }

    html.push_str("</table>");
    html.push_str(&format!(
        "<p style='color:#666; font-size:12px;'>Generated at {}</p>",
        format_timestamp(generated_at)
    ));

    OutboundMessage {
        subject: DIGEST_SUBJECT.to_string(),
        body: html,
    }
}

pub fn direct(event: &AlertEvent) -> OutboundMessage {
    OutboundMessage {
        subject: format!("{} {}", event.symbol, event.kind),
        body: format!(
            "🚨 {} {} Alert!\nCurrent: RM {}\nThreshold: RM {}",
            event.symbol,
            event.kind,
            format_price(event.price),
            format_price(event.threshold_value)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{parse_timestamp, Symbol};

    fn event(symbol: &str, price: f64, kind: AlertKind, threshold_value: f64) -> AlertEvent {
        AlertEvent {
            symbol: Symbol::parse(symbol).unwrap(),
            price,
            kind,
            threshold_value,
        }
    }

    #[test]
    fn digest_has_one_row_per_event() {
        let events = vec![
            event("5285.KL", 10.5, AlertKind::Up, 10.0),
            event("1155.KL", 8.123, AlertKind::Down, 8.5),
        ];
        let at = parse_timestamp("2024-03-01 10:00:00").unwrap();
        let msg = digest(&events, &at);

        assert_eq!(msg.subject, DIGEST_SUBJECT);
        assert_eq!(msg.body.matches("<tr><td>").count(), 2);
        assert!(msg.body.contains("<td>5285.KL</td><td>10.50</td>"));
        assert!(msg.body.contains("color:red; font-weight:bold;'>DOWN"));
        assert!(msg.body.contains("<td>8.12</td>"));
        assert!(msg.body.contains("Generated at 2024-03-01 10:00:00"));
    }

    #[test]
    fn direct_message_template() {
        let msg = direct(&event("5285.KL", 10.5, AlertKind::Up, 10.0));
        assert_eq!(
            msg.body,
            "🚨 5285.KL UP Alert!\nCurrent: RM 10.50\nThreshold: RM 10.00"
        );
    }
}
