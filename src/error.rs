use thiserror::Error;

/// Errors raised by the analytics core.
///
/// Degenerate-but-expected inputs (expiry day, zero call OI, no tracked
/// weight) never produce an error; they resolve to documented fallbacks.
/// Everything here is a caller contract violation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("spot price must be positive and finite, got {0}")]
    InvalidSpot(f64),

    #[error("strike must be positive and finite, got {0}")]
    InvalidStrike(f64),

    #[error("strike {0} appears more than once in the option chain")]
    DuplicateStrike(f64),

    #[error("time to expiry must be non-negative and finite, got {0}")]
    InvalidTimeToExpiry(f64),

    #[error("risk-free rate must be finite, got {0}")]
    InvalidRate(f64),

    #[error("implied volatility at strike {strike} must be positive and finite, got {iv}")]
    InvalidVolatility { strike: f64, iv: f64 },

    #[error("total open interest across the chain overflows u64")]
    OpenInterestOverflow,

    #[error("spot range is empty")]
    EmptySpotRange,

    #[error("spot range has {spots} points but payoff curve has {payoffs}")]
    LengthMismatch { spots: usize, payoffs: usize },

    #[error("leg quantity must be at least one lot")]
    InvalidQuantity,

    #[error("payoff curve of {requested} points exceeds the limit of {limit}")]
    TooManySamples { requested: usize, limit: usize },
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
