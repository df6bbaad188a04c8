use crate::domain::errors::MarketDataError;
use crate::domain::ports::{MarketDataService, Resolution};
use crate::domain::trading::types::Candle;
use crate::infrastructure::core::HttpClientFactory;
use crate::infrastructure::core::http_client_factory::build_url_with_query;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Assumed wait when a 429 carries no usable Retry-After header
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Column-oriented candle response of `/stock/candle`.
#[derive(Debug, Deserialize)]
struct FinnhubCandles {
    /// "ok" or "no_data"
    s: String,
    #[serde(default)]
    t: Vec<i64>,
    #[serde(default)]
    o: Vec<f64>,
    #[serde(default)]
    h: Vec<f64>,
    #[serde(default)]
    l: Vec<f64>,
    #[serde(default)]
    c: Vec<f64>,
    #[serde(default)]
    v: Vec<f64>,
}

impl FinnhubCandles {
    fn into_candles(self, symbol: &str) -> Result<Vec<Candle>, MarketDataError> {
        if self.s == "no_data" {
            return Err(MarketDataError::NoData {
                symbol: symbol.to_string(),
            });
        }
        if self.s != "ok" {
            return Err(MarketDataError::InvalidData {
                symbol: symbol.to_string(),
                reason: format!("unexpected status '{}'", self.s),
            });
        }

        let n = self.t.len();
        if [self.o.len(), self.h.len(), self.l.len(), self.c.len()]
            .iter()
            .any(|len| *len != n)
        {
            return Err(MarketDataError::InvalidData {
                symbol: symbol.to_string(),
                reason: "column lengths differ".to_string(),
            });
        }

        let price = |value: f64, field: &str| {
            Decimal::from_f64(value).ok_or_else(|| MarketDataError::InvalidData {
                symbol: symbol.to_string(),
                reason: format!("non-finite {} {}", field, value),
            })
        };

        (0..n)
            .map(|i| -> Result<Candle, MarketDataError> {
                Ok(Candle {
                    symbol: symbol.to_string(),
                    open: price(self.o[i], "open")?,
                    high: price(self.h[i], "high")?,
                    low: price(self.l[i], "low")?,
                    close: price(self.c[i], "close")?,
                    volume: self
                        .v
                        .get(i)
                        .and_then(|v| Decimal::from_f64(*v))
                        .unwrap_or(Decimal::ZERO),
                    timestamp: self.t[i],
                })
            })
            .collect()
    }
}

fn error_for_status(status: StatusCode, retry_after: Option<u64>, body: &str) -> MarketDataError {
    match status.as_u16() {
        401 | 403 => MarketDataError::Unauthorized,
        429 => MarketDataError::RateLimitExceeded {
            retry_after_secs: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        _ => MarketDataError::ConnectionLost {
            reason: format!("HTTP {}: {}", status.as_u16(), body.trim()),
        },
    }
}

pub struct FinnhubMarketDataService {
    client: ClientWithMiddleware,
    api_key: String,
    base_url: String,
}

impl FinnhubMarketDataService {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Self {
        Self {
            client: HttpClientFactory::create_client(timeout),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MarketDataService for FinnhubMarketDataService {
    async fn get_historical_bars(
        &self,
        symbol: &str,
        resolution: Resolution,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Candle>> {
        let url = format!("{}/stock/candle", self.base_url);
        let from_ts = from.timestamp().to_string();
        let to_ts = to.timestamp().to_string();
        let url_with_query = build_url_with_query(
            &url,
            &[
                ("symbol", symbol),
                ("resolution", resolution.as_code()),
                ("from", from_ts.as_str()),
                ("to", to_ts.as_str()),
                ("token", self.api_key.as_str()),
            ],
        );

        let response = self
            .client
            .get(&url_with_query)
            .send()
            .await
            .with_context(|| format!("Failed to fetch candles for {}", symbol))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let text = response
            .text()
            .await
            .context("Failed to read Finnhub response text")?;

        if !status.is_success() {
            return Err(error_for_status(status, retry_after, &text).into());
        }

        let raw: FinnhubCandles = serde_json::from_str(&text).map_err(|e| {
            MarketDataError::InvalidData {
                symbol: symbol.to_string(),
                reason: format!("undecodable body ({})", e),
            }
        })?;

        let candles = raw.into_candles(symbol)?;
        debug!("Finnhub: {} candles for {}", candles.len(), symbol);
        Ok(candles)
    }
}
