// Scaling Errors
// TK Ales, 2024

use std::io;
use thiserror::Error;

/// Broad class of a [`ScalingError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The scale description in the channel properties is malformed.
    Parse,
    /// The chain references itself or a scale that does not exist.
    Cycle,
    /// A scale could not produce a value for some sample.
    Numeric,
    /// Reading a channel document failed.
    Io,
}

#[derive(Error, Debug)]
pub enum ScalingError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid scaling status: {0}")]
    InvalidScalingStatus(String),

    #[error("Invalid scale count: {0}")]
    InvalidScaleCount(String),

    #[error("Scale {scale}: missing parameter '{parameter}'")]
    MissingParameter { scale: usize, parameter: String },

    #[error("Scale {scale}: invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        scale: usize,
        parameter: String,
        reason: String,
    },

    #[error("Scale {scale}: unknown scale type '{kind}'")]
    UnknownScaleKind { scale: usize, kind: String },

    #[error("Scale {scale}: unknown thermocouple type {code}")]
    UnknownThermocoupleType { scale: usize, code: i64 },

    #[error("Scale {scale}: unknown bridge configuration {code}")]
    UnknownBridgeConfiguration { scale: usize, code: i64 },

    #[error("Scale {scale}: unknown excitation type {code}")]
    UnknownExcitationType { scale: usize, code: i64 },

    #[error("Scale {scale}: invalid input source {value}")]
    InvalidInputSource { scale: usize, value: String },

    #[error("Scale {scale}: polynomial has no coefficients")]
    EmptyPolynomial { scale: usize },

    #[error("Scale {scale}: invalid table: {reason}")]
    InvalidTable { scale: usize, reason: String },

    #[error("Scale chain contains a cycle through scales {scales:?}")]
    Cycle { scales: Vec<usize> },

    #[error("Scale {scale} reads from scale {source_index}, which is not defined")]
    UndefinedReference { scale: usize, source_index: usize },

    #[error("Scale {scale}: input mismatch: {reason}")]
    InputMismatch { scale: usize, reason: String },

    #[error("Scale {scale}: RTD solve did not converge for sample {sample} (R = {resistance} ohm)")]
    RtdNonConvergence {
        scale: usize,
        sample: usize,
        resistance: f64,
    },

    #[error("Scale {scale}: sample {sample} out of supported range: {reason}")]
    OutOfRange {
        scale: usize,
        sample: usize,
        reason: String,
    },
}

impl ScalingError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ScalingError::Io(_) | ScalingError::Json(_) => ErrorCategory::Io,
            ScalingError::Cycle { .. } | ScalingError::UndefinedReference { .. } => {
                ErrorCategory::Cycle
            }
            ScalingError::RtdNonConvergence { .. }
            | ScalingError::OutOfRange { .. }
            | ScalingError::InputMismatch { .. } => ErrorCategory::Numeric,
            _ => ErrorCategory::Parse,
        }
    }

    pub(crate) fn missing(scale: usize, parameter: impl Into<String>) -> Self {
        ScalingError::MissingParameter {
            scale,
            parameter: parameter.into(),
        }
    }

    pub(crate) fn invalid(
        scale: usize,
        parameter: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ScalingError::InvalidParameter {
            scale,
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScalingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            ScalingError::missing(0, "Linear_Slope").category(),
            ErrorCategory::Parse
        );
        assert_eq!(
            ScalingError::Cycle { scales: vec![0, 1] }.category(),
            ErrorCategory::Cycle
        );
        assert_eq!(
            ScalingError::UndefinedReference {
                scale: 0,
                source_index: 4
            }
            .category(),
            ErrorCategory::Cycle
        );
        assert_eq!(
            ScalingError::RtdNonConvergence {
                scale: 0,
                sample: 3,
                resistance: 10.0
            }
            .category(),
            ErrorCategory::Numeric
        );
    }

    #[test]
    fn test_messages_name_scale_and_parameter() {
        let err = ScalingError::missing(2, "RTD_A");
        assert_eq!(err.to_string(), "Scale 2: missing parameter 'RTD_A'");
    }
}
