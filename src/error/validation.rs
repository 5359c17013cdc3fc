use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Duration must not be empty.")]
    DurationEmpty,
    #[error("Invalid duration '{value}'.")]
    InvalidDurationFormat { value: String },
    #[error("Invalid duration '{value}': {source}")]
    InvalidDurationNumber {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Duration overflow.")]
    DurationOverflow,
    #[error("Invalid duration unit '{unit}'.")]
    InvalidDurationUnit { unit: String },
    #[error("Duration must be > 0.")]
    DurationZero,
    #[error("Value must be >= {min}.")]
    ValueTooSmall { min: u64 },
    #[error("Invalid value: {source}")]
    InvalidNumber {
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Invalid number '{value}': {source}")]
    InvalidFloat {
        value: String,
        #[source]
        source: std::num::ParseFloatError,
    },
    #[error("Value '{value}' must be a finite number > 0.")]
    NotPositive { value: String },
    #[error("Value '{value}' must be a fraction in (0, 1].")]
    FractionOutOfRange { value: String },
    #[error("Value '{value}' must be a ratio in [0, 1].")]
    RatioOutOfRange { value: String },
    #[error("Invalid boolean '{value}'.")]
    InvalidBoolean { value: String },
    #[error("Missing bootstrap token (set --token, AGENTSTORM_TOKEN, or provide in config).")]
    MissingToken,
    #[error("Host must not be empty.")]
    EmptyHost,
    #[error("{failed} of {total} probe batches were not confirmed.")]
    ProbeIncomplete { failed: u64, total: u64 },
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}
