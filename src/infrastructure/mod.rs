pub mod alpaca;
pub mod core;
pub mod factory;
pub mod finnhub;
pub mod mock;

pub use factory::ServiceFactory;
