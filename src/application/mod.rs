// Agent lifecycle, scheduling and event fan-out
pub mod agents;

// Position sizing
pub mod risk_management;

// Trading strategies
pub mod strategies;

// Per-symbol trade cycle and collaborator call policy
pub mod trading;
