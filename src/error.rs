//! Error type shared by every fallible map operation.

use thiserror::Error;

use crate::PointId;

/// Errors raised by conversions, grid references and the plot registry.
///
/// Gesture edge cases and path planning never produce an error; they are
/// no-ops or return empty results instead.
#[derive(Debug, Clone, PartialEq, Error)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error), uniffi(flat_error))]
pub enum MapError {
    /// A grid reference such as `"AB12"` could not be parsed.
    #[error("invalid grid reference {input:?}: {reason}")]
    GridReference { input: String, reason: String },

    /// Plot bounds with zero, negative or non-finite extent.
    #[error("degenerate plot bounds (lat span {lat_span}, lng span {lng_span})")]
    DegenerateBounds { lat_span: f64, lng_span: f64 },

    /// Non-finite input coordinate. Geodetic input reports longitude as `x`
    /// and latitude as `y`.
    #[error("invalid coordinate ({x}, {y})")]
    InvalidCoordinate { x: f64, y: f64 },

    /// Grid cell size must be finite and strictly positive.
    #[error("invalid grid cell size {0}")]
    InvalidCellSize(f64),

    /// The `(label, plot_id)` pair is already taken.
    #[error("label {label:?} already exists in plot {plot_id:?}")]
    DuplicateLabel { label: String, plot_id: String },

    #[error("no point with id {0}")]
    PointNotFound(PointId),

    #[error("point label must not be empty")]
    EmptyLabel,
}

impl MapError {
    pub(crate) fn grid(input: &str, reason: &str) -> Self {
        MapError::GridReference {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }
}
