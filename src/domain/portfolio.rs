//! Single-asset portfolio simulation.
//!
//! Walks a price series and a signal series in lockstep, trading a fixed
//! number of shares per signal, and publishes an equity curve. The run halts
//! the first time a trade leaves the account with no cash.

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::domain::error::BacksimError;
use crate::domain::series::TimeSeries;
use crate::domain::signal::{SignalSeries, TradeSignal};

/// What the published equity curve measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Valuation {
    /// Cash balance only; open positions are not marked.
    #[default]
    CashOnly,
    /// Cash plus the open position at the current price.
    MarkToMarket,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub initial_value: f64,
    /// Fraction of `initial_value` spent on an opening position at the first price.
    pub seed_fraction: f64,
    /// Shares traded per Long or Short signal.
    pub numtrades: i64,
    pub transaction_cost: f64,
    pub valuation: Valuation,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            initial_value: 1_000_000.0,
            seed_fraction: 0.0,
            numtrades: 1,
            transaction_cost: 0.0,
            valuation: Valuation::CashOnly,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub equity: TimeSeries,
    /// Date of the trade that exhausted cash, if the run halted early.
    pub insolvent_on: Option<NaiveDate>,
    pub trades: usize,
    pub final_cash: f64,
    pub final_position: i64,
}

impl SimulationResult {
    pub fn is_insolvent(&self) -> bool {
        self.insolvent_on.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Portfolio {
    cash: f64,
    position: i64,
}

impl Portfolio {
    fn seeded(config: &SimulationConfig, first_price: Option<f64>) -> Self {
        let seed_cash = config.seed_fraction * config.initial_value;
        match first_price {
            Some(price) if price > 0.0 => Portfolio {
                cash: config.initial_value - seed_cash,
                position: (seed_cash / price).floor() as i64,
            },
            _ => {
                if seed_cash > 0.0 {
                    warn!("first price is unusable, skipping the opening position");
                }
                Portfolio {
                    cash: config.initial_value,
                    position: 0,
                }
            }
        }
    }

    /// Apply one signal. Returns true when cash changed.
    fn apply(&mut self, signal: TradeSignal, price: f64, config: &SimulationConfig) -> bool {
        let shares = config.numtrades;
        match signal {
            TradeSignal::Long => {
                self.cash -= price * shares as f64 + config.transaction_cost;
                self.position += shares;
                true
            }
            TradeSignal::Short => {
                self.cash += price * shares as f64 - config.transaction_cost;
                self.position -= shares;
                true
            }
            TradeSignal::Clear => {
                if self.position == 0 {
                    return false;
                }
                self.cash += price * self.position as f64 - config.transaction_cost;
                self.position = 0;
                true
            }
            TradeSignal::Hold => false,
        }
    }

    fn equity(&self, price: Option<f64>, valuation: Valuation) -> f64 {
        match (valuation, price) {
            (Valuation::MarkToMarket, Some(price)) => self.cash + self.position as f64 * price,
            _ => self.cash,
        }
    }
}

/// Run the simulation. `prices` and `signals` must share the same dates.
///
/// A signal on the first date is ignored; the account opens there. A
/// non-Hold signal on a date without a price is treated as Hold.
pub fn simulate(
    prices: &TimeSeries,
    signals: &SignalSeries,
    config: &SimulationConfig,
) -> Result<SimulationResult, BacksimError> {
    if prices.len() != signals.len() || prices.dates().ne(signals.dates()) {
        return Err(BacksimError::unsupported(
            "price and signal series are not aligned on the same dates",
        ));
    }

    let dates: Vec<NaiveDate> = prices.dates().collect();
    let price_values = prices.values();
    let mut equity: Vec<Option<f64>> = Vec::with_capacity(dates.len());
    let mut insolvent_on = None;
    let mut trades = 0usize;

    let Some(&first_price) = price_values.first() else {
        return Ok(SimulationResult {
            equity: TimeSeries::default(),
            insolvent_on,
            trades,
            final_cash: config.initial_value,
            final_position: 0,
        });
    };

    let mut portfolio = Portfolio::seeded(config, first_price);
    let mut last_price = first_price;
    equity.push(Some(portfolio.equity(last_price, config.valuation)));

    for (i, point) in signals.points().iter().enumerate().skip(1) {
        let price = price_values[i];
        last_price = price.or(last_price);

        let signal = match (point.signal, price) {
            (TradeSignal::Hold, _) => TradeSignal::Hold,
            (signal, Some(_)) => signal,
            (signal, None) => {
                warn!("{} on {} has no price, treating as HOLD", signal, point.date);
                TradeSignal::Hold
            }
        };

        if let Some(price) = price {
            if portfolio.apply(signal, price, config) {
                trades += 1;
                debug!(
                    "{} {} @ {:.4} on {}: cash {:.2}, position {}",
                    signal, config.numtrades, price, point.date, portfolio.cash, portfolio.position
                );
                if portfolio.cash <= 0.0 {
                    warn!("portfolio insolvent on {} (cash {:.2})", point.date, portfolio.cash);
                    insolvent_on = Some(point.date);
                    break;
                }
            }
        }

        equity.push(Some(portfolio.equity(last_price, config.valuation)));
    }

    let curve_len = equity.len();
    Ok(SimulationResult {
        equity: TimeSeries::aligned(dates.into_iter().take(curve_len), equity),
        insolvent_on,
        trades,
        final_cash: portfolio.cash,
        final_position: portfolio.position,
    })
}
