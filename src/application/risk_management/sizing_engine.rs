use crate::domain::trading::types::OrderSide;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use tracing::{info, warn};

/// Quantity precision accepted by the brokerage (fractional shares)
const QUANTITY_DP: u32 = 4;

pub struct SizingEngine;

impl SizingEngine {
    /// Quantity such that hitting the stop loses `balance * risk_fraction`.
    ///
    /// Returns zero ("do not trade") for non-positive prices, a zero stop
    /// distance, or a risk fraction outside (0, 1]. Never negative.
    pub fn calculate_position_size(
        entry_price: Decimal,
        stop_loss_price: Decimal,
        balance: Decimal,
        risk_fraction: Decimal,
    ) -> Decimal {
        if entry_price <= Decimal::ZERO || stop_loss_price <= Decimal::ZERO {
            warn!(
                "SizingEngine: Entry ({}) and stop-loss ({}) prices must be positive",
                entry_price, stop_loss_price
            );
            return Decimal::ZERO;
        }

        let price_difference = (entry_price - stop_loss_price).abs();
        if price_difference.is_zero() {
            warn!(
                "SizingEngine: Entry and stop-loss prices cannot be the same ({})",
                entry_price
            );
            return Decimal::ZERO;
        }

        if risk_fraction <= Decimal::ZERO || risk_fraction > Decimal::ONE {
            warn!(
                "SizingEngine: Risk fraction {} outside (0, 1], refusing to size",
                risk_fraction
            );
            return Decimal::ZERO;
        }

        if balance <= Decimal::ZERO {
            warn!("SizingEngine: Non-positive balance {}, refusing to size", balance);
            return Decimal::ZERO;
        }

        let risk_amount = balance * risk_fraction;
        let quantity = (risk_amount / price_difference)
            .round_dp_with_strategy(QUANTITY_DP, RoundingStrategy::ToZero);

        info!(
            "SizingEngine: Risking ${} over a ${} stop distance -> {} units",
            risk_amount, price_difference, quantity
        );

        quantity
    }

    /// Take-profit at `reward_ratio` times the stop distance, on the profit
    /// side of the entry. Long when the entry is above the stop.
    pub fn determine_take_profit(
        entry_price: Decimal,
        stop_loss_price: Decimal,
        reward_ratio: Decimal,
    ) -> Option<Decimal> {
        if reward_ratio <= Decimal::ZERO || entry_price == stop_loss_price {
            warn!(
                "SizingEngine: Cannot determine take-profit (entry={}, stop={}, ratio={})",
                entry_price, stop_loss_price, reward_ratio
            );
            return None;
        }

        let distance = (entry_price - stop_loss_price).abs() * reward_ratio;

        if entry_price > stop_loss_price {
            return Some(entry_price + distance);
        }

        let target = entry_price - distance;
        if target <= Decimal::ZERO {
            // Short target beyond zero: keep a small positive price
            warn!(
                "SizingEngine: Short take-profit {} is non-positive, clamping",
                target
            );
            return Some(entry_price * dec!(0.05));
        }
        Some(target)
    }

    /// Fixed-percentage stop: below the entry for longs, above for shorts.
    pub fn determine_stop_loss(entry_price: Decimal, side: OrderSide, stop_pct: Decimal) -> Decimal {
        match side {
            OrderSide::Buy => entry_price * (Decimal::ONE - stop_pct),
            OrderSide::Sell => entry_price * (Decimal::ONE + stop_pct),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_distance_returns_zero() {
        let qty =
            SizingEngine::calculate_position_size(dec!(100), dec!(100), dec!(10000), dec!(0.01));
        assert_eq!(qty, Decimal::ZERO);
    }

    #[test]
    fn test_risk_based_quantity() {
        let qty =
            SizingEngine::calculate_position_size(dec!(100), dec!(98), dec!(10000), dec!(0.01));
        assert_eq!(qty, dec!(50));

        // Short side: stop above entry
        let qty =
            SizingEngine::calculate_position_size(dec!(100), dec!(102), dec!(10000), dec!(0.01));
        assert_eq!(qty, dec!(50));
    }

    #[test]
    fn test_non_positive_prices_return_zero() {
        assert_eq!(
            SizingEngine::calculate_position_size(dec!(0), dec!(98), dec!(10000), dec!(0.01)),
            Decimal::ZERO
        );
        assert_eq!(
            SizingEngine::calculate_position_size(dec!(100), dec!(-1), dec!(10000), dec!(0.01)),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_out_of_range_risk_fraction_returns_zero() {
        assert_eq!(
            SizingEngine::calculate_position_size(dec!(100), dec!(98), dec!(10000), dec!(1.5)),
            Decimal::ZERO
        );
        assert_eq!(
            SizingEngine::calculate_position_size(dec!(100), dec!(98), dec!(10000), dec!(0)),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_quantity_truncated_to_four_places() {
        // 100 / 1.92 = 52.083333...
        let qty =
            SizingEngine::calculate_position_size(dec!(96), dec!(94.08), dec!(10000), dec!(0.01));
        assert_eq!(qty, dec!(52.0833));
    }

    #[test]
    fn test_take_profit_long_and_short() {
        assert_eq!(
            SizingEngine::determine_take_profit(dec!(100), dec!(98), dec!(3)),
            Some(dec!(106))
        );
        assert_eq!(
            SizingEngine::determine_take_profit(dec!(100), dec!(102), dec!(3)),
            Some(dec!(94))
        );
    }

    #[test]
    fn test_take_profit_degenerate_inputs() {
        assert_eq!(
            SizingEngine::determine_take_profit(dec!(100), dec!(100), dec!(3)),
            None
        );
        assert_eq!(
            SizingEngine::determine_take_profit(dec!(100), dec!(98), dec!(0)),
            None
        );
        // 100 - 60 * 2 would be negative
        assert_eq!(
            SizingEngine::determine_take_profit(dec!(100), dec!(160), dec!(2)),
            Some(dec!(5))
        );
    }

    #[test]
    fn test_stop_loss_sides() {
        assert_eq!(
            SizingEngine::determine_stop_loss(dec!(100), OrderSide::Buy, dec!(0.02)),
            dec!(98)
        );
        assert_eq!(
            SizingEngine::determine_stop_loss(dec!(100), OrderSide::Sell, dec!(0.02)),
            dec!(102)
        );
    }
}
