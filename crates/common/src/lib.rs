pub mod config;
pub mod error;
pub mod providers;
pub mod signals;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use providers::{MarketDataProvider, UniverseProvider};
pub use signals::*;
pub use types::*;
