//! Structural failures raised by the estimator.
//!
//! Degenerate statistics (zero-sample columns, single-sample strata) are not
//! errors: they surface as `NaN`/`Inf` values in the returned arrays.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EstimateError {
    /// Non-square or empty matrix, or a vector whose length disagrees with
    /// the class count.
    #[error("shape mismatch in {what}: expected {expected}, found {found}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// Class code that is non-finite, non-integral or outside `0..k`.
    #[error("invalid class label {value} in sample record {index}")]
    InvalidLabel { index: usize, value: f64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
}

pub type Result<T> = std::result::Result<T, EstimateError>;

/// Fail with [`EstimateError::ShapeMismatch`] unless `found == expected`.
pub(crate) fn check_len(what: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(EstimateError::ShapeMismatch { what, expected, found })
    }
}
