//! Recursive descent parser for indicator names.
//!
//! Grammar: `NAME [ '(' arg { ',' arg } ')' ]`, where an argument is either a
//! moving-average name or a number. Names are case-insensitive. Errors carry
//! the character offset of the offending token.

use std::str::FromStr;

use crate::domain::error::ParseError;
use crate::domain::indicator::moving_average::DEFAULT_VOLUME_FACTOR;
use crate::domain::indicator::volume::DEFAULT_EMV_SCALE;
use crate::domain::indicator::{IndicatorType, MovingAverage, SarParams};

/// Parse indicator text such as `SMA(30)` or `PRICE_OSC(EMA,26,14)`.
pub fn parse_indicator(input: &str) -> Result<IndicatorType, ParseError> {
    let mut parser = Parser::new(input);
    let call = parser.parse_call()?;
    parser.skip_whitespace();
    if let Some(ch) = parser.peek() {
        return Err(ParseError {
            message: format!("unexpected '{}' after indicator", ch),
            position: parser.pos,
        });
    }
    call.build()
}

impl FromStr for IndicatorType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_indicator(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Arg {
    Word(String),
    Number(f64),
}

#[derive(Debug)]
struct Call {
    name: String,
    name_pos: usize,
    args: Vec<(Arg, usize)>,
    end_pos: usize,
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn found(&self) -> String {
        self.peek()
            .map(|c| format!("'{}'", c))
            .unwrap_or_else(|| "end of input".to_string())
    }

    fn parse_word(&mut self, what: &str) -> Result<(String, usize), ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(ParseError {
                message: format!("expected {}, found {}", what, self.found()),
                position: start,
            });
        }
        Ok((self.input[start..self.pos].to_ascii_uppercase(), start))
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        if self.peek() == Some('-') {
            self.advance();
        }

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(ParseError {
                message: format!("expected number, found {}", self.found()),
                position: start,
            });
        }

        let num_str = &self.input[start..self.pos];
        num_str.parse::<f64>().map_err(|_| ParseError {
            message: format!("invalid number: {}", num_str),
            position: start,
        })
    }

    fn parse_arg(&mut self) -> Result<(Arg, usize), ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        match self.peek() {
            Some(ch) if ch.is_ascii_alphabetic() => {
                let (word, _) = self.parse_word("argument")?;
                Ok((Arg::Word(word), start))
            }
            _ => Ok((Arg::Number(self.parse_number()?), start)),
        }
    }

    fn parse_call(&mut self) -> Result<Call, ParseError> {
        let (name, name_pos) = self.parse_word("indicator name")?;
        let mut args = Vec::new();

        self.skip_whitespace();
        if self.peek() == Some('(') {
            self.advance();
            args.push(self.parse_arg()?);
            loop {
                self.skip_whitespace();
                match self.peek() {
                    Some(',') => {
                        self.advance();
                        args.push(self.parse_arg()?);
                    }
                    Some(')') => {
                        self.advance();
                        break;
                    }
                    _ => {
                        return Err(ParseError {
                            message: format!("expected ',' or ')', found {}", self.found()),
                            position: self.pos,
                        });
                    }
                }
            }
        }

        Ok(Call {
            name,
            name_pos,
            args,
            end_pos: self.pos,
        })
    }
}

impl Call {
    fn error(&self, message: String, position: usize) -> ParseError {
        ParseError { message, position }
    }

    fn arity(&self, min: usize, max: usize) -> Result<(), ParseError> {
        let n = self.args.len();
        if n < min || n > max {
            let expected = if min == max {
                format!("{}", min)
            } else {
                format!("{} to {}", min, max)
            };
            return Err(self.error(
                format!("{} takes {} argument(s), found {}", self.name, expected, n),
                self.end_pos,
            ));
        }
        Ok(())
    }

    fn number(&self, index: usize) -> Result<f64, ParseError> {
        match &self.args[index] {
            (Arg::Number(v), _) => Ok(*v),
            (Arg::Word(w), pos) => Err(self.error(format!("expected number, found '{}'", w), *pos)),
        }
    }

    fn positive(&self, index: usize) -> Result<f64, ParseError> {
        let v = self.number(index)?;
        if v > 0.0 {
            Ok(v)
        } else {
            Err(self.error(
                format!("{} argument must be positive, found {}", self.name, v),
                self.args[index].1,
            ))
        }
    }

    fn period(&self, index: usize) -> Result<usize, ParseError> {
        let v = self.number(index)?;
        if v >= 1.0 && v.fract() == 0.0 {
            Ok(v as usize)
        } else {
            Err(self.error(
                format!("period must be a positive integer, found {}", v),
                self.args[index].1,
            ))
        }
    }

    fn average(&self, index: usize) -> Result<MovingAverage, ParseError> {
        match &self.args[index] {
            (Arg::Word(w), pos) => MovingAverage::from_name(w).ok_or_else(|| {
                self.error(
                    format!("unknown moving average '{}' (SMA, EMA, TMA, ZLEMA, VMA)", w),
                    *pos,
                )
            }),
            (Arg::Number(v), pos) => {
                Err(self.error(format!("expected moving average, found {}", v), *pos))
            }
        }
    }

    fn single_period(&self) -> Result<usize, ParseError> {
        self.arity(1, 1)?;
        self.period(0)
    }

    fn bare(&self, ty: IndicatorType) -> Result<IndicatorType, ParseError> {
        self.arity(0, 0)?;
        Ok(ty)
    }

    fn volume_factor(&self) -> Result<(usize, f64), ParseError> {
        self.arity(1, 2)?;
        let factor = if self.args.len() == 2 {
            self.number(1)?
        } else {
            DEFAULT_VOLUME_FACTOR
        };
        Ok((self.period(0)?, factor))
    }

    fn build(&self) -> Result<IndicatorType, ParseError> {
        use IndicatorType as I;

        let ty = match self.name.as_str() {
            "CLOSE" => self.bare(I::Close)?,
            "SMA" => I::Sma(self.single_period()?),
            "EMA" => I::Ema(self.single_period()?),
            "DEMA" => I::Dema(self.single_period()?),
            "TEMA" => I::Tema(self.single_period()?),
            "TMA" => I::Tma(self.single_period()?),
            "ZLEMA" => I::Zlema(self.single_period()?),
            "VMA" => I::Vma(self.single_period()?),
            "T3" => {
                let (period, volume_factor) = self.volume_factor()?;
                I::T3 {
                    period,
                    volume_factor,
                }
            }
            "T4" => {
                let (period, volume_factor) = self.volume_factor()?;
                I::T4 {
                    period,
                    volume_factor,
                }
            }
            "CMO" => I::Cmo(self.single_period()?),
            "RMI" => I::Rmi(self.single_period()?),
            "RSI" => self.bare(I::Rsi)?,
            "GSTOCH" => I::GeneralStochastic(self.single_period()?),
            "STOCH" => {
                self.arity(2, 2)?;
                I::StochasticOscillator {
                    average: self.average(0)?,
                    period: self.period(1)?,
                }
            }
            "STOCH_RSI" => self.bare(I::StochasticRsi)?,
            "AROON" => I::Aroon(self.single_period()?),
            "AROON_OSC" => I::AroonOscillator(self.single_period()?),
            "PRICE_OSC" => {
                self.arity(3, 3)?;
                I::PriceOscillator {
                    average: self.average(0)?,
                    slow: self.period(1)?,
                    fast: self.period(2)?,
                }
            }
            "MACD" => self.bare(I::Macd)?,
            "PVO" => {
                self.arity(2, 2)?;
                I::PercentVolumeOscillator {
                    slow: self.period(0)?,
                    fast: self.period(1)?,
                }
            }
            "QSTICK" => {
                self.arity(2, 2)?;
                I::Qstick {
                    average: self.average(0)?,
                    period: self.period(1)?,
                }
            }
            "DPO" => I::DetrendedPriceOscillator(self.single_period()?),
            "DYMOI" => self.bare(I::DynamicMomentumIndex)?,
            "DI" => I::DirectionalIndex(self.single_period()?),
            "DX" => I::Dx(self.single_period()?),
            "ADX" => I::Adx(self.single_period()?),
            "ADXR" => I::Adxr(self.single_period()?),
            "PSAR" => match self.args.len() {
                0 => I::ParabolicSar(SarParams::default()),
                3 => I::ParabolicSar(SarParams {
                    start: self.positive(0)?,
                    step: self.positive(1)?,
                    threshold: self.positive(2)?,
                }),
                n => {
                    return Err(self.error(
                        format!("PSAR takes 0 or 3 argument(s), found {}", n),
                        self.end_pos,
                    ));
                }
            },
            "TR" => self.bare(I::TrueRange)?,
            "ATR" => I::Atr(self.single_period()?),
            "BOLLINGER" => {
                self.arity(2, 2)?;
                I::Bollinger {
                    period: self.period(0)?,
                    multiplier: self.positive(1)?,
                }
            }
            "PRICE_CHANNEL" => I::PriceChannel(self.single_period()?),
            "STDDEV" => I::StdDev(self.single_period()?),
            "CHAIKIN_VOL" => I::ChaikinVolatility(self.single_period()?),
            "AD" => self.bare(I::AdLine)?,
            "CMF" => I::ChaikinMoneyFlow(self.single_period()?),
            "CHAIKIN_OSC" => self.bare(I::ChaikinAdOscillator)?,
            "OBV" => self.bare(I::Obv)?,
            "PVI" => self.bare(I::PositiveVolumeIndex)?,
            "PVT" => self.bare(I::PriceVolumeTrend)?,
            "EMV" => {
                self.arity(0, 1)?;
                let scale = if self.args.is_empty() {
                    DEFAULT_EMV_SCALE
                } else {
                    self.positive(0)?
                };
                I::EaseOfMovement { scale }
            }
            "AVG_PRICE" => self.bare(I::AveragePrice)?,
            "MEDIAN_PRICE" => self.bare(I::MedianPrice)?,
            "TYPICAL_PRICE" => self.bare(I::TypicalPrice)?,
            "WEIGHTED_CLOSE" => self.bare(I::WeightedClose)?,
            "NORMALIZED" => self.bare(I::NormalizedPrice)?,
            _ => {
                return Err(self.error(
                    format!("unknown indicator '{}'", self.name),
                    self.name_pos,
                ));
            }
        };
        Ok(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> IndicatorType {
        parse_indicator(input).unwrap_or_else(|e| panic!("{}", e.display_with_context(input)))
    }

    #[test]
    fn parses_simple_period() {
        assert_eq!(parse("SMA(30)"), IndicatorType::Sma(30));
        assert_eq!(parse("  ema ( 12 ) "), IndicatorType::Ema(12));
    }

    #[test]
    fn parses_bare_names() {
        assert_eq!(parse("CLOSE"), IndicatorType::Close);
        assert_eq!(parse("rsi"), IndicatorType::Rsi);
        assert_eq!(parse("MACD"), IndicatorType::Macd);
    }

    #[test]
    fn parses_moving_average_argument() {
        assert_eq!(
            parse("PRICE_OSC(EMA,26,14)"),
            IndicatorType::PriceOscillator {
                average: MovingAverage::Ema,
                slow: 26,
                fast: 14,
            }
        );
        assert_eq!(
            parse("QSTICK(zlema, 8)"),
            IndicatorType::Qstick {
                average: MovingAverage::Zlema,
                period: 8,
            }
        );
    }

    #[test]
    fn optional_arguments_take_defaults() {
        assert_eq!(
            parse("T3(5)"),
            IndicatorType::T3 {
                period: 5,
                volume_factor: DEFAULT_VOLUME_FACTOR,
            }
        );
        assert_eq!(parse("PSAR"), IndicatorType::ParabolicSar(SarParams::default()));
        assert_eq!(
            parse("EMV"),
            IndicatorType::EaseOfMovement {
                scale: DEFAULT_EMV_SCALE
            }
        );
    }

    #[test]
    fn display_round_trips() {
        for text in [
            "SMA(90)",
            "BOLLINGER(20,2.5)",
            "STOCH(SMA,14)",
            "PSAR(0.02,0.02,0.2)",
            "T4(7,0.7)",
            "EMV(1000000000)",
            "PRICE_CHANNEL(20)",
        ] {
            assert_eq!(parse(text).to_string(), text);
        }
    }

    #[test]
    fn unknown_indicator_points_at_name() {
        let err = parse_indicator("  FOO(3)").unwrap_err();
        assert_eq!(err.position, 2);
        assert!(err.message.contains("unknown indicator 'FOO'"));
    }

    #[test]
    fn zero_period_rejected() {
        let err = parse_indicator("SMA(0)").unwrap_err();
        assert_eq!(err.position, 4);
        assert!(err.message.contains("positive integer"));
    }

    #[test]
    fn fractional_period_rejected() {
        assert!(parse_indicator("EMA(2.5)").is_err());
    }

    #[test]
    fn wrong_arity() {
        let err = parse_indicator("SMA(1,2)").unwrap_err();
        assert!(err.message.contains("takes 1 argument(s), found 2"));
        assert!(parse_indicator("RSI(14)").is_err());
    }

    #[test]
    fn unknown_moving_average() {
        let err = parse_indicator("PRICE_OSC(WMA,26,12)").unwrap_err();
        assert_eq!(err.position, 10);
    }

    #[test]
    fn unclosed_parenthesis() {
        let err = parse_indicator("SMA(30").unwrap_err();
        assert_eq!(err.position, 6);
        assert!(err.message.contains("found end of input"));
    }

    #[test]
    fn trailing_garbage() {
        let err = parse_indicator("SMA(3) x").unwrap_err();
        assert_eq!(err.position, 7);
    }

    #[test]
    fn from_str_works() {
        let ty: IndicatorType = "ADX(14)".parse().unwrap();
        assert_eq!(ty, IndicatorType::Adx(14));
    }
}
