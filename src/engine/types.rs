use crate::error::{MonitorError, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const MARKET_SUFFIX: &str = ".KL";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(String);

impl Symbol {
    pub fn parse(raw: &str) -> Result<Self> {
        if Self::is_valid(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(MonitorError::InvalidSymbol(raw.to_string()))
        }
    }

    pub fn is_valid(raw: &str) -> bool {
        match raw.strip_suffix(MARKET_SUFFIX) {
            Some(code) => code.len() == 4 && code.bytes().all(|b| b.is_ascii_digit()),
            None => false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub up: f64,
    pub down: f64,
}

impl Threshold {
    // up > down > 0
    pub fn validate(&self, symbol: &str) -> Result<()> {
        let finite = self.up.is_finite() && self.down.is_finite();
        if finite && self.up > self.down && self.down > 0.0 {
            Ok(())
        } else {
            Err(MonitorError::InvalidThreshold {
                symbol: symbol.to_string(),
                up: self.up,
                down: self.down,
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertKind {
    #[serde(rename = "UP")]
    Up,
    #[serde(rename = "DOWN")]
    Down,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Up => "UP",
            AlertKind::Down => "DOWN",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceSample {
    pub symbol: Symbol,
    pub price: f64,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub symbol: Symbol,
    pub price: f64,
    pub kind: AlertKind,
    pub threshold_value: f64,
}

pub fn format_price(price: f64) -> String {
    format!("{:.2}", price)
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).ok()
}
