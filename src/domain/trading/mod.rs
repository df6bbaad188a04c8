// Core trading domain value objects
pub mod types;
