pub mod engine;
pub mod rolling;

pub use engine::{compute, enrich};
