use super::types::{format_timestamp, AlertKind, Symbol};
use crate::error::Result;
use chrono::NaiveDateTime;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KindStamps {
    #[serde(rename = "UP", default, skip_serializing_if = "Option::is_none")]
    pub up: Option<String>,
    #[serde(rename = "DOWN", default, skip_serializing_if = "Option::is_none")]
    pub down: Option<String>,
}

impl KindStamps {
    fn get(&self, kind: AlertKind) -> Option<&str> {
        match kind {
            AlertKind::Up => self.up.as_deref(),
            AlertKind::Down => self.down.as_deref(),
        }
    }

    fn slot(&mut self, kind: AlertKind) -> &mut Option<String> {
        match kind {
            AlertKind::Up => &mut self.up,
            AlertKind::Down => &mut self.down,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertState(BTreeMap<String, KindStamps>);

impl AlertState {
    pub fn last_fired(&self, symbol: &Symbol, kind: AlertKind) -> Option<&str> {
        self.0.get(symbol.as_str()).and_then(|s| s.get(kind))
    }

    pub fn record(&mut self, symbol: &Symbol, kind: AlertKind, at: NaiveDateTime) {
        self.set_raw(symbol, kind, format_timestamp(&at));
    }

    pub fn set_raw(&mut self, symbol: &Symbol, kind: AlertKind, stamp: String) {
        *self
            .0
            .entry(symbol.as_str().to_string())
            .or_default()
            .slot(kind) = Some(stamp);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct AlertStateStore {
    path: PathBuf,
}

impl AlertStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ensure_exists(&self) -> Result<()> {
        if !self.path.exists() {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&self.path, "{}")?;
            info!("Created new alert tracking file: {}", self.path.display());
        }
        Ok(())
    }

    pub fn load(&self) -> Result<AlertState> {
        if !self.path.exists() {
            return Ok(AlertState::default());
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(AlertState::default());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    // Full snapshot via temp file + rename
    pub fn save(&self, state: &AlertState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
