//! Error types for the scoring pipeline.
//!
//! Only conditions a caller can act on are errors. A date whose providers
//! failed is not an error at all: the scheduler records it as
//! [`crate::schedule::DayPlan::DataUnavailable`] and moves on.

use crate::ProviderKind;
use thiserror::Error;

/// Errors raised by normalization, evaluation and configuration checks.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LaunchError {
    /// A provider returned too few or malformed points to build a series
    #[error("insufficient {provider} data: {reason}")]
    InsufficientData {
        provider: ProviderKind,
        reason: String,
    },

    /// Series handed to the evaluator were sampled on different grids
    #[error("misaligned {provider} series: expected grid {expected}, found {found}")]
    MisalignedSeries {
        provider: ProviderKind,
        expected: String,
        found: String,
    },

    /// Sampling grid parameters are unusable (zero interval, bad offset)
    #[error("invalid sampling grid: {0}")]
    InvalidGrid(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl LaunchError {
    pub(crate) fn insufficient(provider: ProviderKind, reason: impl Into<String>) -> Self {
        LaunchError::InsufficientData {
            provider,
            reason: reason.into(),
        }
    }
}
