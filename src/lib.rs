//! Bursa Malaysia stock price monitor.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod monitor;
pub mod notify;
