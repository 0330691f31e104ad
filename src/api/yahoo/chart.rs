use crate::api::PriceSource;
use crate::engine::types::Symbol;
use crate::error::{MonitorError, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
// Yahoo rejects requests without a browser-like agent.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) bursawatch/0.1";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

pub struct YahooChartSource {
    base_url: String,
    client: Client,
}

impl YahooChartSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_base_url(YAHOO_CHART_URL, timeout)
    }

    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }
}

#[async_trait]
impl PriceSource for YahooChartSource {
    async fn fetch_latest(&self, symbol: &Symbol) -> Result<f64> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), symbol);
        debug!("Fetching {}", url);

        let body = self
            .client
            .get(&url)
            .query(&[("range", "1d"), ("interval", "1d")])
            .send()
            .await?
            .text()
            .await?;

        extract_price(symbol, &body)
    }
}

fn extract_price(symbol: &Symbol, body: &str) -> Result<f64> {
    let response: ChartResponse =
        serde_json::from_str(body).map_err(|e| MonitorError::RemoteError {
            service: "yahoo".to_string(),
            reason: format!("unexpected response: {}", e),
        })?;

    if let Some(err) = response.chart.error {
        return Err(MonitorError::RemoteError {
            service: "yahoo".to_string(),
            reason: format!("{}: {}", err.code, err.description),
        });
    }

    let result = response
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| MonitorError::NoData(symbol.to_string()))?;

    let last_close = result
        .indicators
        .and_then(|i| i.quote.into_iter().next())
        .and_then(|q| q.close.into_iter().rev().flatten().next());

    last_close
        .or(result.meta.regular_market_price)
        .filter(|p| p.is_finite() && *p > 0.0)
        .ok_or_else(|| MonitorError::NoData(symbol.to_string()))
}
