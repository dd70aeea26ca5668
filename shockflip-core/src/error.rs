//! Core error kinds.
//!
//! Only two things can fail: the bar stream (malformed input) and the
//! strategy configuration (validated eagerly, before any bar is processed).
//! Numeric degeneracies such as zero variance or zero volume are not errors;
//! they surface as `0.0` or an undefined (`None`) feature instead.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("malformed input at bar {index}: {reason}")]
    MalformedInput { index: usize, reason: String },

    #[error("invalid configuration: {field} {reason}")]
    InvalidConfiguration { field: &'static str, reason: String },
}

impl CoreError {
    pub fn malformed(index: usize, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            index,
            reason: reason.into(),
        }
    }

    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field,
            reason: reason.into(),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_location() {
        let e = CoreError::malformed(7, "high below low");
        assert_eq!(e.to_string(), "malformed input at bar 7: high below low");

        let e = CoreError::invalid("detector.jump_band", "must be > 0");
        assert_eq!(
            e.to_string(),
            "invalid configuration: detector.jump_band must be > 0"
        );
    }
}
