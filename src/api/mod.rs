pub mod yahoo;

use crate::engine::types::Symbol;
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_latest(&self, symbol: &Symbol) -> Result<f64>;
}
