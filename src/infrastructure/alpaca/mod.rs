pub mod common;
pub mod execution;

pub use execution::AlpacaExecutionService;
