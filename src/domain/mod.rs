// Operator-facing configuration value objects
pub mod config;

// Events pushed toward the operator session
pub mod events;

// Port interfaces
pub mod ports;

// Risk management domain
pub mod risk;

// Core trading domain
pub mod trading;

// Domain-specific error types
pub mod errors;
