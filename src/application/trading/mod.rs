pub mod guarded_call;
pub mod trade_cycle;

pub use guarded_call::{CallFailure, CallPolicy, guarded};
pub use trade_cycle::{SymbolOutcome, TradeCycle, TradeSettings};
