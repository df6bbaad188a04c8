pub mod sizing_engine;

pub use sizing_engine::SizingEngine;
