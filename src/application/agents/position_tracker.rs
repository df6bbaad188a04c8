use crate::domain::trading::types::{OrderIntent, OrderSide, PositionSide, PositionSnapshot};
use rust_decimal::Decimal;
use std::time::Duration;
use tokio::time::Instant;

/// An entry order this agent opened and may have to close on age.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedEntry {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub opened_at: Instant,
}

impl TrackedEntry {
    fn signed_quantity(&self) -> Decimal {
        match self.side {
            OrderSide::Buy => self.quantity,
            OrderSide::Sell => -self.quantity,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExitAction {
    /// Submit a closing market order
    Close {
        symbol: String,
        side: OrderSide,
        quantity: Decimal,
    },
    /// Nothing left open at the broker; drop the entries
    AlreadyFlat { symbol: String },
}

/// Entries opened by one agent, for the time-based exit rule.
#[derive(Debug, Default)]
pub struct PositionTracker {
    max_age: Option<Duration>,
    entries: Vec<TrackedEntry>,
}

impl PositionTracker {
    /// `None` disables tracking entirely.
    pub fn new(max_age: Option<Duration>) -> Self {
        Self {
            max_age,
            entries: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_age.is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn record(&mut self, intent: &OrderIntent, now: Instant) {
        if !self.is_enabled() {
            return;
        }
        self.entries.push(TrackedEntry {
            symbol: intent.symbol.clone(),
            side: intent.side,
            quantity: intent.quantity,
            opened_at: now,
        });
    }

    fn is_due(&self, entry: &TrackedEntry, now: Instant) -> bool {
        self.max_age
            .is_some_and(|age| now.saturating_duration_since(entry.opened_at) >= age)
    }

    /// Symbols with at least one due entry, in the order they were opened.
    pub fn due_symbols(&self, now: Instant) -> Vec<String> {
        let mut symbols: Vec<String> = Vec::new();
        for entry in self.entries.iter().filter(|e| self.is_due(e, now)) {
            if !symbols.contains(&entry.symbol) {
                symbols.push(entry.symbol.clone());
            }
        }
        symbols
    }

    /// What to do for every symbol with due entries, given the broker's view.
    ///
    /// The closing quantity never exceeds what the broker still holds, so a
    /// position already reduced by a bracket leg is not flipped.
    pub fn plan_exits(&self, now: Instant, positions: &[PositionSnapshot]) -> Vec<ExitAction> {
        self.due_symbols(now)
            .into_iter()
            .map(|symbol| {
                let recorded: Decimal = self
                    .entries
                    .iter()
                    .filter(|e| e.symbol == symbol && self.is_due(e, now))
                    .map(TrackedEntry::signed_quantity)
                    .sum();

                let expected_side = if recorded > Decimal::ZERO {
                    PositionSide::Long
                } else {
                    PositionSide::Short
                };

                match positions.iter().find(|p| p.symbol == symbol) {
                    Some(position)
                        if !recorded.is_zero()
                            && position.side == expected_side
                            && !position.qty.is_zero() =>
                    {
                        ExitAction::Close {
                            side: position.side.closing_side(),
                            quantity: recorded.abs().min(position.qty.abs()),
                            symbol,
                        }
                    }
                    _ => ExitAction::AlreadyFlat { symbol },
                }
            })
            .collect()
    }

    /// Drop the due entries of `symbol`; younger ones stay.
    pub fn forget_due(&mut self, symbol: &str, now: Instant) {
        let max_age = self.max_age;
        self.entries.retain(|e| {
            let due = max_age.is_some_and(|age| now.saturating_duration_since(e.opened_at) >= age);
            !(due && e.symbol == symbol)
        });
    }
}
