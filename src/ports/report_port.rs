//! Report generation port trait.

use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::BacksimError;
use crate::domain::indicator::IndicatorColumn;
use crate::domain::strategy::Strategy;

/// Port for writing backtest and indicator outputs.
pub trait ReportPort {
    /// Write every artifact of one backtest run into `output_dir`.
    fn write(
        &self,
        result: &BacktestResult,
        strategy: &Strategy,
        output_dir: &Path,
    ) -> Result<(), BacksimError>;

    /// Write indicator columns side by side into one table at `path`.
    fn write_indicators(
        &self,
        columns: &[IndicatorColumn],
        path: &Path,
    ) -> Result<(), BacksimError>;
}
