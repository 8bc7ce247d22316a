pub mod config;
pub mod config_loader;
pub mod error;
pub mod traits;
pub mod types;

pub use config::AppConfig;
pub use config_loader::ConfigLoader;
pub use error::{AdapterError, ConfigError, FactorError, SinkError};
pub use traits::{MarketDataAdapter, NotificationSink};
pub use types::{Candle, Exchange, FundingInfo, MarkIndex, TickerStats};
