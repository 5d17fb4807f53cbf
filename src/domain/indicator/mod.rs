//! Technical indicator library.
//!
//! Every indicator is a pure function of a [`TimeSeries`] or a slice of
//! [`OhlcvBar`]s and returns series aligned to the input dates, undefined
//! through its warm-up. [`IndicatorType`] names an indicator together with
//! its parameters so configuration and the CLI can refer to it as text
//! (`SMA(30)`, `PRICE_OSC(EMA,26,14)`), and [`compute_indicator`] evaluates
//! one into named columns.

pub mod momentum;
pub mod moving_average;
pub mod parser;
pub mod price;
pub mod trend;
pub mod volatility;
pub mod volume;

use std::fmt;

use crate::domain::error::BacksimError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::series::TimeSeries;

pub use moving_average::MovingAverage;
pub use trend::SarParams;

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorType {
    Close,
    // moving averages
    Sma(usize),
    Ema(usize),
    Dema(usize),
    Tema(usize),
    Tma(usize),
    Zlema(usize),
    Vma(usize),
    T3 {
        period: usize,
        volume_factor: f64,
    },
    T4 {
        period: usize,
        volume_factor: f64,
    },
    // momentum
    Cmo(usize),
    Rmi(usize),
    Rsi,
    GeneralStochastic(usize),
    StochasticOscillator {
        average: MovingAverage,
        period: usize,
    },
    StochasticRsi,
    Aroon(usize),
    AroonOscillator(usize),
    PriceOscillator {
        average: MovingAverage,
        slow: usize,
        fast: usize,
    },
    Macd,
    PercentVolumeOscillator {
        slow: usize,
        fast: usize,
    },
    Qstick {
        average: MovingAverage,
        period: usize,
    },
    DetrendedPriceOscillator(usize),
    DynamicMomentumIndex,
    // trend
    DirectionalIndex(usize),
    Dx(usize),
    Adx(usize),
    Adxr(usize),
    ParabolicSar(SarParams),
    // volatility
    TrueRange,
    Atr(usize),
    Bollinger {
        period: usize,
        multiplier: f64,
    },
    PriceChannel(usize),
    StdDev(usize),
    ChaikinVolatility(usize),
    // volume
    AdLine,
    ChaikinMoneyFlow(usize),
    ChaikinAdOscillator,
    Obv,
    PositiveVolumeIndex,
    PriceVolumeTrend,
    EaseOfMovement {
        scale: f64,
    },
    // price transforms
    AveragePrice,
    MedianPrice,
    TypicalPrice,
    WeightedClose,
    NormalizedPrice,
}

impl IndicatorType {
    /// Names of the columns this indicator produces, in output order.
    pub fn output_names(&self) -> &'static [&'static str] {
        match self {
            IndicatorType::StochasticOscillator { .. } => &["fast_d", "slow_d"],
            IndicatorType::Aroon(_) => &["up", "down"],
            IndicatorType::PriceOscillator { .. } | IndicatorType::Macd => {
                &["difference", "percent"]
            }
            IndicatorType::DirectionalIndex(_) => &["plus", "minus"],
            IndicatorType::Bollinger { .. } => &["lower", "middle", "upper", "width", "percent_b"],
            IndicatorType::PriceChannel(_) => &["high", "low"],
            _ => &["value"],
        }
    }

    pub fn is_single_valued(&self) -> bool {
        self.output_names().len() == 1
    }

    pub fn requires_benchmark(&self) -> bool {
        matches!(self, IndicatorType::NormalizedPrice)
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use IndicatorType as I;
        match self {
            I::Close => write!(f, "CLOSE"),
            I::Sma(n) => write!(f, "SMA({})", n),
            I::Ema(n) => write!(f, "EMA({})", n),
            I::Dema(n) => write!(f, "DEMA({})", n),
            I::Tema(n) => write!(f, "TEMA({})", n),
            I::Tma(n) => write!(f, "TMA({})", n),
            I::Zlema(n) => write!(f, "ZLEMA({})", n),
            I::Vma(n) => write!(f, "VMA({})", n),
            I::T3 {
                period,
                volume_factor,
            } => write!(f, "T3({},{})", period, volume_factor),
            I::T4 {
                period,
                volume_factor,
            } => write!(f, "T4({},{})", period, volume_factor),
            I::Cmo(n) => write!(f, "CMO({})", n),
            I::Rmi(n) => write!(f, "RMI({})", n),
            I::Rsi => write!(f, "RSI"),
            I::GeneralStochastic(n) => write!(f, "GSTOCH({})", n),
            I::StochasticOscillator { average, period } => {
                write!(f, "STOCH({},{})", average, period)
            }
            I::StochasticRsi => write!(f, "STOCH_RSI"),
            I::Aroon(n) => write!(f, "AROON({})", n),
            I::AroonOscillator(n) => write!(f, "AROON_OSC({})", n),
            I::PriceOscillator {
                average,
                slow,
                fast,
            } => write!(f, "PRICE_OSC({},{},{})", average, slow, fast),
            I::Macd => write!(f, "MACD"),
            I::PercentVolumeOscillator { slow, fast } => write!(f, "PVO({},{})", slow, fast),
            I::Qstick { average, period } => write!(f, "QSTICK({},{})", average, period),
            I::DetrendedPriceOscillator(n) => write!(f, "DPO({})", n),
            I::DynamicMomentumIndex => write!(f, "DYMOI"),
            I::DirectionalIndex(n) => write!(f, "DI({})", n),
            I::Dx(n) => write!(f, "DX({})", n),
            I::Adx(n) => write!(f, "ADX({})", n),
            I::Adxr(n) => write!(f, "ADXR({})", n),
            I::ParabolicSar(p) => write!(f, "PSAR({},{},{})", p.start, p.step, p.threshold),
            I::TrueRange => write!(f, "TR"),
            I::Atr(n) => write!(f, "ATR({})", n),
            I::Bollinger { period, multiplier } => write!(f, "BOLLINGER({},{})", period, multiplier),
            I::PriceChannel(n) => write!(f, "PRICE_CHANNEL({})", n),
            I::StdDev(n) => write!(f, "STDDEV({})", n),
            I::ChaikinVolatility(n) => write!(f, "CHAIKIN_VOL({})", n),
            I::AdLine => write!(f, "AD"),
            I::ChaikinMoneyFlow(n) => write!(f, "CMF({})", n),
            I::ChaikinAdOscillator => write!(f, "CHAIKIN_OSC"),
            I::Obv => write!(f, "OBV"),
            I::PositiveVolumeIndex => write!(f, "PVI"),
            I::PriceVolumeTrend => write!(f, "PVT"),
            I::EaseOfMovement { scale } => write!(f, "EMV({})", scale),
            I::AveragePrice => write!(f, "AVG_PRICE"),
            I::MedianPrice => write!(f, "MEDIAN_PRICE"),
            I::TypicalPrice => write!(f, "TYPICAL_PRICE"),
            I::WeightedClose => write!(f, "WEIGHTED_CLOSE"),
            I::NormalizedPrice => write!(f, "NORMALIZED"),
        }
    }
}

/// One named output series.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorColumn {
    pub name: String,
    pub series: TimeSeries,
}

/// Every column produced by one indicator, in [`IndicatorType::output_names`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorOutput {
    pub indicator: IndicatorType,
    pub columns: Vec<IndicatorColumn>,
}

impl IndicatorOutput {
    fn new(indicator: &IndicatorType, series: Vec<TimeSeries>) -> Self {
        let label = indicator.to_string();
        let names = indicator.output_names();
        let columns = names
            .iter()
            .zip(series)
            .map(|(part, series)| IndicatorColumn {
                name: if names.len() == 1 {
                    label.clone()
                } else {
                    format!("{}.{}", label, part)
                },
                series,
            })
            .collect();
        IndicatorOutput {
            indicator: indicator.clone(),
            columns,
        }
    }

    /// The sole series of a single-valued indicator.
    pub fn into_single(self) -> Result<TimeSeries, BacksimError> {
        if self.columns.len() != 1 {
            return Err(BacksimError::unsupported(format!(
                "{} produces {} series where one is required",
                self.indicator,
                self.columns.len()
            )));
        }
        self.columns
            .into_iter()
            .next()
            .map(|c| c.series)
            .ok_or_else(|| BacksimError::unsupported("indicator produced no output"))
    }
}

/// Evaluate `indicator` over `bars`. Close-based indicators read the closing
/// price; `benchmark` is only consulted by the normalized price.
pub fn compute_indicator(
    bars: &[OhlcvBar],
    benchmark: Option<&TimeSeries>,
    indicator: &IndicatorType,
) -> Result<IndicatorOutput, BacksimError> {
    use IndicatorType as I;

    let close = TimeSeries::closes(bars);
    let series = match indicator {
        I::Close => vec![close],
        I::Sma(n) => vec![moving_average::sma(&close, *n)],
        I::Ema(n) => vec![moving_average::ema(&close, *n)],
        I::Dema(n) => vec![moving_average::dema(&close, *n)],
        I::Tema(n) => vec![moving_average::tema(&close, *n)],
        I::Tma(n) => vec![moving_average::tma(&close, *n)],
        I::Zlema(n) => vec![moving_average::zlema(&close, *n)],
        I::Vma(n) => vec![moving_average::vma(&close, *n)],
        I::T3 {
            period,
            volume_factor,
        } => vec![moving_average::t3(&close, *period, *volume_factor)],
        I::T4 {
            period,
            volume_factor,
        } => vec![moving_average::t4(&close, *period, *volume_factor)],
        I::Cmo(n) => vec![momentum::cmo(&close, *n)],
        I::Rmi(n) => vec![momentum::rmi(&close, *n)],
        I::Rsi => vec![momentum::rsi(&close)],
        I::GeneralStochastic(n) => vec![momentum::general_stochastic(&close, *n)],
        I::StochasticOscillator { average, period } => {
            let out = momentum::stochastic_oscillator(&close, *average, *period);
            vec![out.fast_d, out.slow_d]
        }
        I::StochasticRsi => vec![momentum::stochastic_rsi(&close)],
        I::Aroon(n) => {
            let out = momentum::aroon(&close, *n);
            vec![out.up, out.down]
        }
        I::AroonOscillator(n) => vec![momentum::aroon_oscillator(&close, *n)],
        I::PriceOscillator {
            average,
            slow,
            fast,
        } => {
            let out = momentum::price_oscillator(&close, *average, *slow, *fast);
            vec![out.difference, out.percent]
        }
        I::Macd => {
            let out = momentum::macd(&close);
            vec![out.difference, out.percent]
        }
        I::PercentVolumeOscillator { slow, fast } => {
            vec![momentum::percent_volume_oscillator(bars, *slow, *fast)]
        }
        I::Qstick { average, period } => vec![momentum::qstick(bars, *average, *period)],
        I::DetrendedPriceOscillator(n) => vec![momentum::detrended_price_oscillator(&close, *n)],
        I::DynamicMomentumIndex => vec![momentum::dynamic_momentum_index(&close)],
        I::DirectionalIndex(n) => {
            let out = trend::directional_index(bars, *n);
            vec![out.plus, out.minus]
        }
        I::Dx(n) => vec![trend::dx(bars, *n)],
        I::Adx(n) => vec![trend::adx(bars, *n)],
        I::Adxr(n) => vec![trend::adxr(bars, *n)],
        I::ParabolicSar(params) => vec![trend::parabolic_sar(bars, *params)],
        I::TrueRange => vec![volatility::true_range(bars)],
        I::Atr(n) => vec![volatility::atr(bars, *n)],
        I::Bollinger { period, multiplier } => {
            let bb = volatility::bollinger(bars, *period, *multiplier);
            vec![bb.lower, bb.middle, bb.upper, bb.width, bb.percent_b]
        }
        I::PriceChannel(n) => {
            let pc = volatility::price_channel(&close, *n);
            vec![pc.high, pc.low]
        }
        I::StdDev(n) => vec![volatility::rolling_stddev(&close, *n)],
        I::ChaikinVolatility(n) => vec![volatility::chaikin_volatility(bars, *n)],
        I::AdLine => vec![volume::ad_line(bars)],
        I::ChaikinMoneyFlow(n) => vec![volume::chaikin_money_flow(bars, *n)],
        I::ChaikinAdOscillator => vec![volume::chaikin_ad_oscillator(bars)],
        I::Obv => vec![volume::on_balance_volume(bars)],
        I::PositiveVolumeIndex => vec![volume::positive_volume_index(bars)],
        I::PriceVolumeTrend => vec![volume::price_volume_trend(bars)],
        I::EaseOfMovement { scale } => vec![volume::ease_of_movement(bars, *scale)],
        I::AveragePrice => vec![price::average_price(bars)],
        I::MedianPrice => vec![price::median_price(bars)],
        I::TypicalPrice => vec![price::typical_price(bars)],
        I::WeightedClose => vec![price::weighted_close(bars)],
        I::NormalizedPrice => {
            let Some(baseline) = benchmark else {
                return Err(BacksimError::unsupported(
                    "NORMALIZED requires a benchmark series",
                ));
            };
            vec![price::normalized_price(&close, baseline)]
        }
    };

    Ok(IndicatorOutput::new(indicator, series))
}
