use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Account-level risk state owned by one trading agent.
///
/// Mutated only at the start of a tick, when the equity refresh lands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountState {
    /// Latest accepted equity
    pub equity: Decimal,

    /// Equity at the start of the current trading day
    pub daily_start_equity: Decimal,

    /// Loss against `daily_start_equity`, never negative
    pub daily_loss_incurred: Decimal,

    /// Fraction of equity risked per trade, in (0, 1]
    pub risk_per_trade: Decimal,

    /// Fraction of the day's starting equity that may be lost, in (0, 1]
    pub daily_risk_limit: Decimal,

    /// Date the daily reference was taken (UTC), None until the first
    /// equity reading
    pub reference_date: Option<NaiveDate>,
}

/// Result of an equity refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceUpdate {
    Applied,
    /// First reading or new trading day: daily reference and loss were reset
    DailyReset,
    /// Non-positive equity, dropped
    Rejected,
}

impl AccountState {
    /// `initial_equity` sizes trades until the first reading lands; it is
    /// never used as the daily reference.
    pub fn new(initial_equity: Decimal, risk_per_trade: Decimal, daily_risk_limit: Decimal) -> Self {
        Self {
            equity: initial_equity,
            daily_start_equity: initial_equity,
            daily_loss_incurred: Decimal::ZERO,
            risk_per_trade,
            daily_risk_limit,
            reference_date: None,
        }
    }

    /// Apply a fresh equity reading. Non-positive readings are dropped
    /// without touching the state.
    pub fn update_account_balance(&mut self, new_balance: Decimal, today: NaiveDate) -> BalanceUpdate {
        if new_balance <= Decimal::ZERO {
            return BalanceUpdate::Rejected;
        }

        self.equity = new_balance;

        if self.reference_date != Some(today) {
            self.reference_date = Some(today);
            self.daily_start_equity = new_balance;
            self.daily_loss_incurred = Decimal::ZERO;
            return BalanceUpdate::DailyReset;
        }

        self.daily_loss_incurred = (self.daily_start_equity - new_balance).max(Decimal::ZERO);
        BalanceUpdate::Applied
    }

    /// Maximum loss allowed for the current day
    pub fn daily_loss_limit(&self) -> Decimal {
        self.daily_start_equity * self.daily_risk_limit
    }

    pub fn daily_limit_reached(&self) -> bool {
        self.daily_loss_incurred >= self.daily_loss_limit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    /// State whose daily reference was taken at 10000 on day 2
    fn state() -> AccountState {
        let mut state = AccountState::new(dec!(10000), dec!(0.01), dec!(0.05));
        state.update_account_balance(dec!(10000), day(2));
        state
    }

    #[test]
    fn test_first_reading_sets_daily_reference() {
        let mut small = AccountState::new(dec!(10000), dec!(0.01), dec!(0.05));
        assert_eq!(small.update_account_balance(dec!(5000), day(2)), BalanceUpdate::DailyReset);
        assert_eq!(small.daily_start_equity, dec!(5000));
        assert_eq!(small.daily_loss_incurred, Decimal::ZERO);
        assert!(!small.daily_limit_reached());

        let mut large = AccountState::new(dec!(10000), dec!(0.01), dec!(0.05));
        large.update_account_balance(dec!(100000), day(2));
        assert_eq!(large.daily_loss_limit(), dec!(5000));
        large.update_account_balance(dec!(94000), day(2));
        assert_eq!(large.daily_loss_incurred, dec!(6000));
        assert!(large.daily_limit_reached());
    }

    #[test]
    fn test_rejected_reading_leaves_reference_unset() {
        let mut state = AccountState::new(dec!(10000), dec!(0.01), dec!(0.05));
        assert_eq!(state.update_account_balance(dec!(0), day(2)), BalanceUpdate::Rejected);
        assert_eq!(state.reference_date, None);
        assert!(!state.daily_limit_reached());

        assert_eq!(state.update_account_balance(dec!(8000), day(2)), BalanceUpdate::DailyReset);
        assert_eq!(state.daily_start_equity, dec!(8000));
    }

    #[test]
    fn test_rejects_non_positive_balance() {
        let mut state = state();
        assert_eq!(state.update_account_balance(dec!(0), day(2)), BalanceUpdate::Rejected);
        assert_eq!(state.update_account_balance(dec!(-50), day(2)), BalanceUpdate::Rejected);
        assert_eq!(state.equity, dec!(10000));
    }

    #[test]
    fn test_tracks_daily_loss() {
        let mut state = state();
        assert_eq!(state.update_account_balance(dec!(9700), day(2)), BalanceUpdate::Applied);
        assert_eq!(state.daily_loss_incurred, dec!(300));
        assert!(!state.daily_limit_reached());

        state.update_account_balance(dec!(9500), day(2));
        assert_eq!(state.daily_loss_incurred, dec!(500));
        assert!(state.daily_limit_reached());

        // Recovery above the start never produces a negative loss
        state.update_account_balance(dec!(10200), day(2));
        assert_eq!(state.daily_loss_incurred, Decimal::ZERO);
    }

    #[test]
    fn test_new_day_resets_reference() {
        let mut state = state();
        state.update_account_balance(dec!(9000), day(2));
        assert!(state.daily_limit_reached());

        assert_eq!(state.update_account_balance(dec!(9000), day(3)), BalanceUpdate::DailyReset);
        assert_eq!(state.daily_start_equity, dec!(9000));
        assert_eq!(state.daily_loss_incurred, Decimal::ZERO);
        assert!(!state.daily_limit_reached());
    }
}
