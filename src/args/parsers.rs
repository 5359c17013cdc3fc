use std::time::Duration;

use super::types::{PositiveU64, PositiveUsize};
use crate::error::{AppError, AppResult, ValidationError};

pub(super) fn parse_positive_u64(s: &str) -> AppResult<PositiveU64> {
    s.parse::<PositiveU64>().map_err(AppError::from)
}

pub(super) fn parse_positive_usize(s: &str) -> AppResult<PositiveUsize> {
    s.parse::<PositiveUsize>().map_err(AppError::from)
}

pub(crate) fn parse_bool_env(s: &str) -> AppResult<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "no" | "n" | "off" => Ok(false),
        _ => Err(AppError::validation(ValidationError::InvalidBoolean {
            value: s.to_owned(),
        })),
    }
}

/// Parses `<digits>[ms|s|m|h]`, seconds when the unit is omitted. Zero is
/// accepted.
pub(crate) fn parse_duration_value(s: &str) -> Result<Duration, ValidationError> {
    let value = s.trim();
    if value.is_empty() {
        return Err(ValidationError::DurationEmpty);
    }

    let digits_len = value.chars().take_while(char::is_ascii_digit).count();
    if digits_len == 0 {
        return Err(ValidationError::InvalidDurationFormat {
            value: value.to_owned(),
        });
    }
    let (num_part, unit_part) = value.split_at(digits_len);
    let number: u64 =
        num_part
            .parse()
            .map_err(|err| ValidationError::InvalidDurationNumber {
                value: value.to_owned(),
                source: err,
            })?;

    let unit = if unit_part.is_empty() { "s" } else { unit_part };
    let seconds_per_unit: u64 = match unit {
        "ms" => return Ok(Duration::from_millis(number)),
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        _ => {
            return Err(ValidationError::InvalidDurationUnit {
                unit: unit.to_owned(),
            });
        }
    };
    let secs = number
        .checked_mul(seconds_per_unit)
        .ok_or(ValidationError::DurationOverflow)?;
    Ok(Duration::from_secs(secs))
}

/// Like [`parse_duration_value`] but rejects zero.
pub(crate) fn parse_duration_arg(s: &str) -> AppResult<Duration> {
    ensure_nonzero_duration(parse_duration_value(s)?).map_err(AppError::from)
}

pub(crate) const fn ensure_nonzero_duration(
    duration: Duration,
) -> Result<Duration, ValidationError> {
    if duration.is_zero() {
        Err(ValidationError::DurationZero)
    } else {
        Ok(duration)
    }
}

fn parse_float(s: &str) -> Result<f64, ValidationError> {
    s.trim()
        .parse::<f64>()
        .map_err(|err| ValidationError::InvalidFloat {
            value: s.to_owned(),
            source: err,
        })
}

/// Finite and strictly positive.
pub(crate) fn ensure_positive_f64(value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ValidationError::NotPositive {
            value: value.to_string(),
        })
    }
}

/// Share of a rate, in `(0, 1]`.
pub(crate) fn ensure_fraction(value: f64) -> Result<f64, ValidationError> {
    if value > 0.0 && value <= 1.0 {
        Ok(value)
    } else {
        Err(ValidationError::FractionOutOfRange {
            value: value.to_string(),
        })
    }
}

/// Threshold ratio, in `[0, 1]`.
pub(crate) fn ensure_ratio(value: f64) -> Result<f64, ValidationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::RatioOutOfRange {
            value: value.to_string(),
        })
    }
}

pub(crate) fn parse_positive_f64(s: &str) -> AppResult<f64> {
    Ok(ensure_positive_f64(parse_float(s)?)?)
}

pub(crate) fn parse_fraction(s: &str) -> AppResult<f64> {
    Ok(ensure_fraction(parse_float(s)?)?)
}

pub(crate) fn parse_ratio(s: &str) -> AppResult<f64> {
    Ok(ensure_ratio(parse_float(s)?)?)
}
