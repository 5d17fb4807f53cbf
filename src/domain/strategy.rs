//! Strategy definition: which series to compare and how to turn the
//! comparison into signals.

use crate::domain::indicator::IndicatorType;
use crate::domain::signal::SignalStrategy;

#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub name: String,
    /// Series that reacts to price.
    pub trend: IndicatorType,
    /// Series the trend is measured against.
    pub baseline: IndicatorType,
    pub signal: SignalStrategy,
    /// Swap Long and Short after generation.
    pub switch: bool,
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy {
            name: "crossover".into(),
            trend: IndicatorType::Close,
            baseline: IndicatorType::Sma(90),
            signal: SignalStrategy::Crossover,
            switch: false,
        }
    }
}

impl Strategy {
    /// One-line description used in logs and summaries.
    pub fn describe(&self) -> String {
        format!(
            "{} {} vs {}{}",
            self.signal.name(),
            self.trend,
            self.baseline,
            if self.switch { " (switched)" } else { "" }
        )
    }
}
