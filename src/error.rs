use thiserror::Error;

/// Failures surfaced by the query layer and the rate-diff calculator
#[derive(Debug, Error)]
pub enum RateError {
    #[error("malformed date '{input}': {source}")]
    InvalidDate {
        input: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("{code}: need at least two readings in the lookback window, found {found}")]
    NotEnoughData { code: String, found: usize },

    #[error("{code}: earlier reading is zero, percentage change is undefined")]
    DivisionByZero { code: String },
}
