//! The autometrics error type.
//!
//! Every fallible operation in the library returns `Error`. Variants are
//! grouped into two kinds: validation failures, which describe bad data or a
//! bad argument, and configuration failures, which describe a request for
//! something the library does not know how to build. Non-numeric input to
//! `Sample::set_value` has no variant: it is ignored, not raised.

use std::error;
use std::fmt;

/// The broad classification of an `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input data or arguments.
    Validation,
    /// Unknown variant names or unusable configuration values.
    Configuration,
}

/// Errors produced by normalization, metric construction and statistics.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A required field was absent and had no default.
    MissingField(&'static str),
    /// The type is not one of counter, timer, meter or gauge.
    InvalidType(String),
    /// The type is a real metric type but may not be produced by the
    /// normalizer.
    UnsupportedType(String),
    /// The value could not be read as a number.
    NonNumericValue(String),
    /// The timestamp could not be read as a date / time.
    UnparseableTimestamp(String),
    /// `tags` or `metadata` was present but not a mapping.
    NotAMap(&'static str),
    /// Percentiles must be in (0, 1] or (1, 100].
    InvalidPercentile(f64),
    /// The statistic needs more values than the series holds. Carries the
    /// number of values available.
    InsufficientData(usize),
    /// A histogram needs at least one bin.
    InsufficientBins,
    /// A rate was requested over a zero-length interval.
    ZeroTimespan,
    /// No simple metric variant exists under this name.
    UnknownVariant(String),
    /// The server type expression did not compile.
    InvalidRegex(String),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match *self {
            Error::UnknownVariant(_) | Error::InvalidRegex(_) => ErrorKind::Configuration,
            _ => ErrorKind::Validation,
        }
    }

    /// True if this error describes bad data or a bad argument.
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::MissingField(field) => {
                write!(f, "{} not provided and no default value", field)
            }
            Error::InvalidType(ref kind) => write!(f, "{} is not a valid metric type", kind),
            Error::UnsupportedType(ref kind) => write!(
                f,
                "only timer and counter metrics are supported: {}",
                kind
            ),
            Error::NonNumericValue(ref value) => write!(f, "value must be numeric: {}", value),
            Error::UnparseableTimestamp(ref ts) => {
                write!(f, "timestamp could not be parsed: {}", ts)
            }
            Error::NotAMap(field) => write!(f, "{} must be a mapping", field),
            Error::InvalidPercentile(p) => write!(f, "invalid percentile {}", p),
            Error::InsufficientData(count) => write!(f, "not enough data, {} values", count),
            Error::InsufficientBins => write!(f, "insufficient number of bins"),
            Error::ZeroTimespan => write!(f, "rate requested over a zero-length timespan"),
            Error::UnknownVariant(ref name) => write!(f, "invalid simple metric type {}", name),
            Error::InvalidRegex(ref why) => write!(f, "invalid server type expression: {}", why),
        }
    }
}

impl error::Error for Error {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(ErrorKind::Configuration, Error::UnknownVariant("x".into()).kind());
        assert_eq!(ErrorKind::Configuration, Error::InvalidRegex("(".into()).kind());
        assert!(Error::InsufficientData(1).is_validation());
        assert!(Error::MissingField("name").is_validation());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            "not enough data, 1 values",
            format!("{}", Error::InsufficientData(1))
        );
        assert_eq!(
            "only timer and counter metrics are supported: meter",
            format!("{}", Error::UnsupportedType("meter".into()))
        );
    }
}
