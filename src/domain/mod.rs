//! Core domain types and logic.

pub mod ohlcv;
pub mod series;
pub mod error;
pub mod indicator;
pub mod indicator_helpers;
pub mod signal;
pub mod portfolio;
pub mod metrics;
pub mod strategy;
pub mod backtest;
pub mod config_validation;
