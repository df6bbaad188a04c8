use super::common::{KEY_HEADER, SECRET_HEADER, error_for_status};
use crate::domain::errors::BrokerError;
use crate::domain::ports::ExecutionService;
use crate::domain::trading::types::{
    AccountSnapshot, OrderIntent, OrderSide, OrderType, PositionSide, PositionSnapshot, TimeInForce,
};
use crate::infrastructure::core::HttpClientFactory;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

// ===== Execution Service (REST API) =====

pub struct AlpacaExecutionService {
    client: ClientWithMiddleware,
    order_client: ClientWithMiddleware,
    api_key: String,
    api_secret: String,
    base_url: String,
}

impl AlpacaExecutionService {
    pub fn new(api_key: String, api_secret: String, base_url: String, timeout: Duration) -> Self {
        Self {
            client: HttpClientFactory::create_client(timeout),
            order_client: HttpClientFactory::create_order_client(timeout),
            api_key,
            api_secret,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .header(KEY_HEADER, &self.api_key)
            .header(SECRET_HEADER, &self.api_secret)
            .send()
            .await
            .with_context(|| format!("Failed to send {} request", what))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to read {} response text", what))?;

        if !status.is_success() {
            return Err(error_for_status(status, &text))
                .with_context(|| format!("Alpaca {} fetch failed", what));
        }

        serde_json::from_str(&text).map_err(|e| {
            anyhow::anyhow!("Failed to decode Alpaca {}: {}. Body: {}", what, e, text)
        })
    }
}

#[derive(Debug, Serialize)]
struct AlpacaOrderRequest {
    symbol: String,
    qty: String,
    side: String,
    #[serde(rename = "type")]
    order_type: String,
    time_in_force: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    take_profit: Option<TakeProfitLeg>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_loss: Option<StopLossLeg>,
}

#[derive(Debug, Serialize)]
struct TakeProfitLeg {
    limit_price: String,
}

#[derive(Debug, Serialize)]
struct StopLossLeg {
    stop_price: String,
}

impl AlpacaOrderRequest {
    /// Bracket legs only travel with whole-share quantities, so a fractional
    /// bracket quantity is rounded down.
    fn from_intent(order: &OrderIntent) -> Result<Self, BrokerError> {
        let side = match order.side {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        };
        let order_type = match order.order_type {
            OrderType::Market => "market",
        };
        let time_in_force = match order.time_in_force {
            TimeInForce::Gtc => "gtc",
        };

        let (quantity, order_class, take_profit, stop_loss) =
            match (order.take_profit, order.stop_loss) {
                (Some(tp), Some(sl)) => {
                    let whole = order.quantity.trunc();
                    if whole.is_zero() {
                        return Err(BrokerError::Rejected {
                            reason: format!(
                                "bracket order for {} needs at least one whole share, got {}",
                                order.symbol, order.quantity
                            ),
                        });
                    }
                    if whole != order.quantity {
                        info!(
                            "AlpacaExecution: Rounding bracket quantity {} down to {} for {}",
                            order.quantity, whole, order.symbol
                        );
                    }
                    (
                        whole,
                        Some("bracket".to_string()),
                        Some(TakeProfitLeg {
                            limit_price: price(tp),
                        }),
                        Some(StopLossLeg {
                            stop_price: price(sl),
                        }),
                    )
                }
                _ => (order.quantity, None, None, None),
            };

        Ok(Self {
            symbol: order.symbol.clone(),
            qty: quantity.normalize().to_string(),
            side: side.to_string(),
            order_type: order_type.to_string(),
            time_in_force: time_in_force.to_string(),
            order_class,
            take_profit,
            stop_loss,
        })
    }
}

/// Alpaca rejects sub-penny prices above $1.
fn price(value: Decimal) -> String {
    value
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
        .to_string()
}

#[derive(Debug, Deserialize)]
struct AlpacaOrderResponse {
    id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct AlpacaAccount {
    equity: String,
}

#[derive(Debug, Deserialize)]
struct AlpacaPosition {
    symbol: String,
    qty: String,
    side: String,
    avg_entry_price: String,
}

impl AlpacaPosition {
    fn into_snapshot(self) -> Result<PositionSnapshot> {
        let qty = Decimal::from_str(&self.qty)
            .with_context(|| format!("Invalid position qty '{}' for {}", self.qty, self.symbol))?;
        let avg_entry_price = Decimal::from_str(&self.avg_entry_price).with_context(|| {
            format!(
                "Invalid avg_entry_price '{}' for {}",
                self.avg_entry_price, self.symbol
            )
        })?;
        let side = match self.side.as_str() {
            "short" => PositionSide::Short,
            _ => PositionSide::Long,
        };

        Ok(PositionSnapshot {
            symbol: self.symbol,
            qty: qty.abs(),
            side,
            avg_entry_price,
        })
    }
}

#[async_trait]
impl ExecutionService for AlpacaExecutionService {
    async fn get_account(&self) -> Result<AccountSnapshot> {
        let account: AlpacaAccount = self.get_json("/v2/account", "account").await?;
        let equity = Decimal::from_str(&account.equity)
            .with_context(|| format!("Invalid account equity '{}'", account.equity))?;
        Ok(AccountSnapshot { equity })
    }

    async fn list_positions(&self) -> Result<Vec<PositionSnapshot>> {
        let positions: Vec<AlpacaPosition> = self.get_json("/v2/positions", "positions").await?;
        positions
            .into_iter()
            .map(AlpacaPosition::into_snapshot)
            .collect()
    }

    async fn place_order(&self, order: OrderIntent) -> Result<String> {
        let order_request = AlpacaOrderRequest::from_intent(&order)?;
        let url = format!("{}/v2/orders", self.base_url);

        let response = self
            .order_client
            .post(&url)
            .header(KEY_HEADER, &self.api_key)
            .header(SECRET_HEADER, &self.api_secret)
            .header("Content-Type", "application/json")
            .body(
                serde_json::to_string(&order_request)
                    .context("Failed to serialize order request")?,
            )
            .send()
            .await
            .context("Failed to send order to Alpaca")?;

        let status = response.status();
        if status.is_success() {
            let order_resp: AlpacaOrderResponse = response
                .json()
                .await
                .context("Failed to parse Alpaca order response")?;
            info!(
                "Alpaca order placed: {} (status: {})",
                order_resp.id, order_resp.status
            );
            Ok(order_resp.id)
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(error_for_status(status, &error_text)).context("Alpaca order failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_plain_market_order_request() {
        let intent = OrderIntent::market("AAPL", OrderSide::Sell, dec!(2.5000));
        let request = AlpacaOrderRequest::from_intent(&intent).unwrap();
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["symbol"], "AAPL");
        assert_eq!(json["qty"], "2.5");
        assert_eq!(json["side"], "sell");
        assert_eq!(json["type"], "market");
        assert_eq!(json["time_in_force"], "gtc");
        assert!(json.get("order_class").is_none());
        assert!(json.get("stop_loss").is_none());
    }

    #[test]
    fn test_bracket_order_request() {
        let intent = OrderIntent::market("GOOD", OrderSide::Buy, dec!(52.0833))
            .with_exits(dec!(94.08), Some(dec!(99.84)));
        let json = serde_json::to_value(AlpacaOrderRequest::from_intent(&intent).unwrap()).unwrap();

        assert_eq!(json["qty"], "52");
        assert_eq!(json["order_class"], "bracket");
        assert_eq!(json["take_profit"]["limit_price"], "99.84");
        assert_eq!(json["stop_loss"]["stop_price"], "94.08");
    }

    #[test]
    fn test_fractional_bracket_below_one_share_rejected() {
        let intent = OrderIntent::market("BRK.A", OrderSide::Buy, dec!(0.4))
            .with_exits(dec!(600000), Some(dec!(630000)));
        assert!(matches!(
            AlpacaOrderRequest::from_intent(&intent),
            Err(BrokerError::Rejected { .. })
        ));
    }

    #[test]
    fn test_short_position_decoding() {
        let raw = r#"{"symbol":"TSLA","qty":"-3","side":"short","avg_entry_price":"250.10","market_value":"-750"}"#;
        let position: AlpacaPosition = serde_json::from_str(raw).unwrap();
        let snapshot = position.into_snapshot().unwrap();

        assert_eq!(snapshot.qty, dec!(3));
        assert_eq!(snapshot.side, PositionSide::Short);
        assert_eq!(snapshot.avg_entry_price, dec!(250.10));
    }
}
