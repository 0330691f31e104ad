use super::types::{Symbol, Threshold};
use crate::error::{MonitorError, Result};
use log::{info, warn};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<String, Threshold>,
    modified: Option<SystemTime>,
}

#[derive(Debug, Clone)]
pub struct ThresholdStore {
    path: PathBuf,
    inner: Arc<RwLock<Inner>>,
}

impl ThresholdStore {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let (entries, modified) = read_file(&path).map_err(|e| {
            MonitorError::ConfigError(format!(
                "cannot load thresholds from {}: {}",
                path.display(),
                e
            ))
        })?;

        if entries.is_empty() {
            return Err(MonitorError::ConfigError(format!(
                "no stock thresholds configured in {}",
                path.display()
            )));
        }

        info!("Loaded {} thresholds from {}", entries.len(), path.display());
        Ok(Self {
            path,
            inner: Arc::new(RwLock::new(Inner { entries, modified })),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // Returns whether the table was replaced
    pub fn reload(&self) -> bool {
        let on_disk = fs::metadata(&self.path).and_then(|m| m.modified()).ok();
        if on_disk.is_none() || on_disk == self.read().modified {
            return false;
        }

        match read_file(&self.path) {
            Ok((entries, modified)) => {
                info!(
                    "Reloaded {} thresholds from {}",
                    entries.len(),
                    self.path.display()
                );
                let mut inner = self.write();
                inner.entries = entries;
                inner.modified = modified;
                true
            }
            Err(e) => {
                warn!(
                    "Keeping previous thresholds, reload of {} failed: {}",
                    self.path.display(),
                    e
                );
                false
            }
        }
    }

    pub fn get(&self, symbol: &str) -> Option<Threshold> {
        self.read().entries.get(symbol).copied()
    }

    pub fn snapshot(&self) -> BTreeMap<String, Threshold> {
        self.read().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    pub fn validated(&self) -> (Vec<(Symbol, Threshold)>, usize) {
        let inner = self.read();
        let mut valid = Vec::with_capacity(inner.entries.len());
        let mut skipped = 0;

        for (raw, threshold) in &inner.entries {
            let checked = Symbol::parse(raw).and_then(|s| threshold.validate(raw).map(|_| s));
            match checked {
                Ok(symbol) => valid.push((symbol, *threshold)),
                Err(e) => {
                    warn!("Skipping {}: {}", raw, e);
                    skipped += 1;
                }
            }
        }
        (valid, skipped)
    }

    pub fn upsert(&self, symbol: &str, threshold: Threshold) -> Result<()> {
        Symbol::parse(symbol)?;
        threshold.validate(symbol)?;
        self.write().entries.insert(symbol.to_string(), threshold);
        Ok(())
    }

    pub fn remove(&self, symbol: &str) -> Option<Threshold> {
        self.write().entries.remove(symbol)
    }

    pub fn save(&self) -> Result<()> {
        let mut inner = self.write();
        let json = serde_json::to_string_pretty(&inner.entries)?;
        fs::write(&self.path, json)?;
        inner.modified = fs::metadata(&self.path).and_then(|m| m.modified()).ok();
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// Wrong-shape entries are dropped here; bound violations are left for `validated`.
fn read_file(path: &Path) -> Result<(BTreeMap<String, Threshold>, Option<SystemTime>)> {
    let raw = fs::read_to_string(path)?;
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok();
    let document: BTreeMap<String, Value> = serde_json::from_str(&raw)?;

    let mut entries = BTreeMap::new();
    for (symbol, value) in document {
        match serde_json::from_value::<Threshold>(value) {
            Ok(threshold) => {
                entries.insert(symbol, threshold);
            }
            Err(e) => warn!("Ignoring malformed threshold for {}: {}", symbol, e),
        }
    }
    Ok((entries, modified))
}
