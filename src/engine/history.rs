use super::types::{format_timestamp, parse_timestamp, PriceSample, Symbol};
use crate::error::Result;
use chrono::Local;
use log::{info, warn};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const HEADER: &str = "Timestamp,Stock,Price";

#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
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
            fs::write(&self.path, format!("{}\n", HEADER))?;
            info!("Created new CSV file: {}", self.path.display());
        }
        Ok(())
    }

    pub fn append(&self, sample: &PriceSample) -> Result<()> {
        self.ensure_exists()?;
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        writeln!(
            file,
            "{},{},{}",
            format_timestamp(&sample.timestamp),
            sample.symbol,
            sample.price
        )?;
        Ok(())
    }

    // Backup name: <stem>_backup_<YYYYmmdd_HHMMSS>.csv
    pub fn rotate_if_needed(&self, max_bytes: u64) -> Result<Option<PathBuf>> {
        let size = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(_) => return Ok(None),
        };
        if size <= max_bytes {
            return Ok(None);
        }

        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("history");
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let backup = self.path.with_file_name(format!("{}_backup_{}.csv", stem, stamp));

        fs::rename(&self.path, &backup)?;
        info!("CSV file rotated: {}", backup.display());
        Ok(Some(backup))
    }

    pub fn recent(&self, limit: usize) -> Result<Vec<PriceSample>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        let mut samples: Vec<PriceSample> = raw
            .lines()
            .skip(1)
            .filter_map(|line| match parse_row(line) {
                Some(sample) => Some(sample),
                None => {
                    if !line.trim().is_empty() {
                        warn!("Skipping malformed history row: {}", line);
                    }
                    None
                }
            })
            .collect();

        let start = samples.len().saturating_sub(limit);
        Ok(samples.split_off(start))
    }
}

fn parse_row(line: &str) -> Option<PriceSample> {
    let mut fields = line.splitn(3, ',');
    let timestamp = parse_timestamp(fields.next()?)?;
    let symbol = Symbol::parse(fields.next()?).ok()?;
    let price = fields.next()?.trim().parse::<f64>().ok()?;
    Some(PriceSample {
        symbol,
        price,
        timestamp,
    })
}
