//! CSV file data adapter.
//!
//! Reads `<base_path>/<SYMBOL>.csv`. The header must name a `date` and a
//! `close` column; `open`, `high`, `low` and `volume` are optional, and a
//! file without them yields close-only bars. `open`, `high` and `low` come
//! as a set: naming only some of them is an error. Values must be finite.

use crate::domain::error::BacksimError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::signal::SignalSeries;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

fn data_error(reason: String) -> BacksimError {
    BacksimError::Data { reason }
}

/// Header positions of the columns a price file may carry.
struct Columns {
    date: usize,
    close: usize,
    open: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
    volume: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord, path: &Path) -> Result<Self, BacksimError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let required = |name: &str| {
            find(name).ok_or_else(|| {
                data_error(format!("{}: missing '{}' column", path.display(), name))
            })
        };
        let columns = Columns {
            date: required("date")?,
            close: required("close")?,
            open: find("open"),
            high: find("high"),
            low: find("low"),
            volume: find("volume"),
        };

        let ohl = [("open", columns.open), ("high", columns.high), ("low", columns.low)];
        let missing: Vec<&str> = ohl
            .iter()
            .filter(|(_, index)| index.is_none())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() && missing.len() < ohl.len() {
            return Err(data_error(format!(
                "{}: partial OHLC header, missing {}",
                path.display(),
                missing.join(", ")
            )));
        }
        Ok(columns)
    }

    fn has_full_bars(&self) -> bool {
        self.open.is_some() && self.high.is_some() && self.low.is_some()
    }
}

fn parse_date(value: &str, line: u64) -> Result<NaiveDate, BacksimError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| data_error(format!("line {}: invalid date '{}': {}", line, value, e)))
}

fn field<'r>(record: &'r csv::StringRecord, index: usize, name: &str, line: u64) -> Result<&'r str, BacksimError> {
    record
        .get(index)
        .map(str::trim)
        .ok_or_else(|| data_error(format!("line {}: missing {} value", line, name)))
}

fn parse_price(record: &csv::StringRecord, index: usize, name: &str, line: u64) -> Result<f64, BacksimError> {
    let raw = field(record, index, name, line)?;
    let value = raw
        .parse::<f64>()
        .map_err(|e| data_error(format!("line {}: invalid {} value '{}': {}", line, name, raw, e)))?;
    finite(value, name, raw, line)
}

fn finite(value: f64, name: &str, raw: &str, line: u64) -> Result<f64, BacksimError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(data_error(format!("line {}: non-finite {} value '{}'", line, name, raw)))
    }
}

fn parse_volume(record: &csv::StringRecord, index: usize, line: u64) -> Result<i64, BacksimError> {
    let raw = field(record, index, "volume", line)?;
    if raw.is_empty() {
        return Ok(0);
    }
    if let Ok(v) = raw.parse::<i64>() {
        return Ok(v);
    }
    let value = raw
        .parse::<f64>()
        .map_err(|e| data_error(format!("line {}: invalid volume value '{}': {}", line, raw, e)))?;
    finite(value, "volume", raw, line).map(|v| v.round() as i64)
}

/// Sort by date and drop repeated dates, keeping the first row seen.
fn sort_and_dedupe(symbol: &str, bars: &mut Vec<OhlcvBar>) {
    bars.sort_by_key(|b| b.date);
    let before = bars.len();
    bars.dedup_by_key(|b| b.date);
    let dropped = before - bars.len();
    if dropped > 0 {
        warn!("{}: dropped {} rows with duplicate dates", symbol, dropped);
    }
}

fn read_bars(path: &Path, symbol: &str) -> Result<Vec<OhlcvBar>, BacksimError> {
    let content = fs::read_to_string(path)
        .map_err(|e| data_error(format!("failed to read {}: {}", path.display(), e)))?;

    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let headers = rdr
        .headers()
        .map_err(|e| data_error(format!("CSV parse error: {}", e)))?
        .clone();
    let columns = Columns::from_headers(&headers, path)?;
    let full = columns.has_full_bars();
    if !full {
        debug!("{}: no open/high/low columns, reading close-only bars", symbol);
    }

    let mut bars = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| data_error(format!("CSV parse error: {}", e)))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let date = parse_date(field(&record, columns.date, "date", line)?, line)?;
        let close = parse_price(&record, columns.close, "close", line)?;
        let volume = match columns.volume {
            Some(i) => parse_volume(&record, i, line)?,
            None => 0,
        };

        let bar = match (columns.open, columns.high, columns.low) {
            (Some(o), Some(h), Some(l)) => OhlcvBar {
                date,
                open: parse_price(&record, o, "open", line)?,
                high: parse_price(&record, h, "high", line)?,
                low: parse_price(&record, l, "low", line)?,
                close,
                volume,
            },
            _ => OhlcvBar {
                volume,
                ..OhlcvBar::from_close(date, close)
            },
        };
        bars.push(bar);
    }

    sort_and_dedupe(symbol, &mut bars);
    Ok(bars)
}

/// Read a `date,signal` file. Unrecognised signal codes become Hold.
pub fn read_signals(path: &Path) -> Result<SignalSeries, BacksimError> {
    let content = fs::read_to_string(path)
        .map_err(|e| data_error(format!("failed to read {}: {}", path.display(), e)))?;

    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let headers = rdr
        .headers()
        .map_err(|e| data_error(format!("CSV parse error: {}", e)))?
        .clone();
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| data_error(format!("{}: missing '{}' column", path.display(), name)))
    };
    let (date_col, signal_col) = (find("date")?, find("signal")?);

    let mut dates = Vec::new();
    let mut codes = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| data_error(format!("CSV parse error: {}", e)))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        dates.push(parse_date(field(&record, date_col, "date", line)?, line)?);
        codes.push(record.get(signal_col).unwrap_or("").to_string());
    }

    SignalSeries::from_codes(&dates, &codes)
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, BacksimError> {
        let mut bars = read_bars(&self.csv_path(symbol), symbol)?;
        bars.retain(|b| {
            start_date.is_none_or(|start| b.date >= start) && end_date.is_none_or(|end| b.date <= end)
        });
        debug!("{}: loaded {} bars", symbol, bars.len());
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, BacksimError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            data_error(format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| data_error(format!("directory entry error: {}", e)))?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(symbol) = name_str.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::TradeSignal;
    use tempfile::TempDir;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "date,open,high,low,close,volume\n\
            2024-01-16,105.0,115.0,100.0,110.0,60000\n\
            2024-01-15,100.0,110.0,90.0,105.0,50000\n\
            2024-01-17,110.0,120.0,105.0,115.0,55000\n\
            2024-01-16,1.0,1.0,1.0,1.0,1\n";

        fs::write(path.join("BHP.csv"), csv_content).unwrap();
        fs::write(
            path.join("IDX.csv"),
            "Date,Close\n2024-01-15,50.5\n2024-01-16,51.0\n",
        )
        .unwrap();
        fs::write(path.join("notes.txt"), "ignore me").unwrap();

        (dir, path)
    }

    #[test]
    fn fetch_ohlcv_sorts_and_reads_fields() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_ohlcv("BHP", None, None).unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].date, d(15));
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].high, 110.0);
        assert_eq!(bars[0].low, 90.0);
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(bars[0].volume, 50000);
    }

    #[test]
    fn duplicate_dates_keep_first_row() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_ohlcv("BHP", None, None).unwrap();
        assert_eq!(bars[1].date, d(16));
        assert_eq!(bars[1].close, 110.0);
    }

    #[test]
    fn fetch_ohlcv_filters_by_date() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_ohlcv("BHP", Some(d(16)), Some(d(16))).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].date, d(16));
    }

    #[test]
    fn close_only_file() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_ohlcv("IDX", None, None).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].open, 50.5);
        assert_eq!(bars[0].high, 50.5);
        assert_eq!(bars[0].volume, 0);
    }

    #[test]
    fn missing_file_is_an_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let result = adapter.fetch_ohlcv("XYZ", None, None);
        assert!(matches!(result, Err(BacksimError::Data { .. })));
    }

    #[test]
    fn missing_close_column() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("BAD.csv"), "date,price\n2024-01-01,1\n").unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        let err = adapter.fetch_ohlcv("BAD", None, None).unwrap_err();
        assert!(err.to_string().contains("missing 'close' column"));
    }

    #[test]
    fn invalid_price_reports_line() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("BAD.csv"), "date,close\n2024-01-01,abc\n").unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        let err = adapter.fetch_ohlcv("BAD", None, None).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn non_finite_prices_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("NAN.csv"), "date,close\n2024-01-01,NaN\n2024-01-02,10\n").unwrap();
        fs::write(dir.path().join("INF.csv"), "date,close\n2024-01-01,10\n2024-01-02,-inf\n").unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());

        let err = adapter.fetch_ohlcv("NAN", None, None).unwrap_err();
        assert!(matches!(err, BacksimError::Data { .. }));
        assert!(err.to_string().contains("line 2: non-finite close value 'NaN'"));

        let err = adapter.fetch_ohlcv("INF", None, None).unwrap_err();
        assert!(err.to_string().contains("line 3: non-finite close value '-inf'"));
    }

    #[test]
    fn non_finite_volume_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("VOL.csv"), "date,close,volume\n2024-01-01,10,inf\n").unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        let err = adapter.fetch_ohlcv("VOL", None, None).unwrap_err();
        assert!(err.to_string().contains("line 2: non-finite volume value 'inf'"));
    }

    #[test]
    fn partial_ohlc_header_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("PART.csv"),
            "date,open,high,close\n2024-01-01,1,2,1.5\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        let err = adapter.fetch_ohlcv("PART", None, None).unwrap_err();
        assert!(matches!(err, BacksimError::Data { .. }));
        assert!(err.to_string().contains("partial OHLC header, missing low"));
    }

    #[test]
    fn list_symbols_returns_csv_stems() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert_eq!(adapter.list_symbols().unwrap(), vec!["BHP", "IDX"]);
    }

    #[test]
    fn data_range_from_bars() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert_eq!(
            adapter.get_data_range("BHP").unwrap(),
            Some((d(15), d(17), 3))
        );
    }

    #[test]
    fn read_signals_parses_codes() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("signals.csv");
        fs::write(
            &file,
            "date,signal\n2024-01-15,0\n2024-01-16,1\n2024-01-17,oops\n2024-01-18,X\n",
        )
        .unwrap();
        let signals = read_signals(&file).unwrap();
        assert_eq!(
            signals.signals(),
            vec![
                TradeSignal::Hold,
                TradeSignal::Long,
                TradeSignal::Hold,
                TradeSignal::Clear
            ]
        );
    }
}
