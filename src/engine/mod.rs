pub mod alerts;
pub mod cooldown;
pub mod history;
pub mod state;
pub mod thresholds;
pub mod types;

pub use alerts::evaluate;
pub use history::HistoryLog;
pub use state::{AlertState, AlertStateStore};
pub use thresholds::ThresholdStore;
pub use types::{AlertEvent, AlertKind, PriceSample, Symbol, Threshold};
