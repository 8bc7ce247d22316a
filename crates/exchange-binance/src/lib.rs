//! Binance market data adapter.
//!
//! Talks to the spot and USD-M futures REST APIs with shared rate limiting
//! and bounded retry, and builds the daily tracked universe from 24h
//! ticker statistics.

pub mod adapter;
pub mod client;
pub mod types;
pub mod universe;

pub use adapter::BinanceAdapter;
pub use client::BinanceClient;
pub use universe::build_universe;
