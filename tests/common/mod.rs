#![allow(dead_code)]

use backsim::domain::error::BacksimError;
pub use backsim::domain::ohlcv::OhlcvBar;
use backsim::domain::series::TimeSeries;
use backsim::domain::signal::{SignalSeries, TradeSignal};
use backsim::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, BacksimError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(BacksimError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|b| start_date.is_none_or(|s| b.date >= s))
            .filter(|b| end_date.is_none_or(|e| b.date <= e))
            .collect())
    }

    fn list_symbols(&self) -> Result<Vec<String>, BacksimError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Consecutive calendar days starting 2024-01-01.
pub fn dates(count: usize) -> Vec<NaiveDate> {
    (0..count)
        .map(|i| date(2024, 1, 1) + chrono::Duration::days(i as i64))
        .collect()
}

pub fn make_bar(date: &str, close: f64) -> OhlcvBar {
    OhlcvBar {
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 1000,
    }
}

/// Close-only bars on consecutive days from 2024-01-01.
pub fn bars_from_closes(closes: &[f64]) -> Vec<OhlcvBar> {
    dates(closes.len())
        .into_iter()
        .zip(closes)
        .map(|(d, &c)| OhlcvBar::from_close(d, c))
        .collect()
}

pub fn series(values: &[f64]) -> TimeSeries {
    TimeSeries::from_values(&dates(values.len()), values).unwrap()
}

pub fn signals(codes: &[TradeSignal]) -> SignalSeries {
    let texts: Vec<&str> = codes.iter().map(|s| s.code()).collect();
    SignalSeries::from_codes(&dates(codes.len()), &texts).unwrap()
}

/// Write `bars` as `<dir>/<symbol>.csv` with a full OHLCV header.
pub fn write_symbol_csv(dir: &Path, symbol: &str, bars: &[OhlcvBar]) {
    let mut text = String::from("date,open,high,low,close,volume\n");
    for b in bars {
        text.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.date, b.open, b.high, b.low, b.close, b.volume
        ));
    }
    fs::write(dir.join(format!("{}.csv", symbol)), text).unwrap();
}
