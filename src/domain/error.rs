//! Domain error types.

/// A parse error with position information for indicator expressions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Top-level error type for backsim.
#[derive(Debug, thiserror::Error)]
pub enum BacksimError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    IndicatorParse(#[from] ParseError),

    #[error("unsupported input: {reason}")]
    UnsupportedInput { reason: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("insufficient data for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BacksimError {
    pub fn unsupported(reason: impl Into<String>) -> Self {
        BacksimError::UnsupportedInput {
            reason: reason.into(),
        }
    }
}

impl From<&BacksimError> for std::process::ExitCode {
    fn from(err: &BacksimError) -> Self {
        let code: u8 = match err {
            BacksimError::Io(_) => 1,
            BacksimError::ConfigParse { .. }
            | BacksimError::ConfigMissing { .. }
            | BacksimError::ConfigInvalid { .. } => 2,
            BacksimError::Data { .. } => 3,
            BacksimError::IndicatorParse(_) | BacksimError::UnsupportedInput { .. } => 4,
            BacksimError::NoData { .. } | BacksimError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
