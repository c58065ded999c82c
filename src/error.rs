use thiserror::Error;

/// Errors reported for invalid input to the clustering entry points.
///
/// Broken internal invariants are not represented here; they panic.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Dimension outside the compiled range.
    #[error("unsupported dimension {dim}: expected {min}..={max}")]
    UnsupportedDimension { dim: usize, min: usize, max: usize },

    /// Flat coordinate array whose length is not a multiple of the dimension.
    #[error("coordinate array of length {len} is not a multiple of dimension {dim}")]
    DimensionMismatch { len: usize, dim: usize },

    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        name: &'static str,
        message: &'static str,
    },

    /// A coordinate of the point at `index` is NaN or infinite.
    #[error("point {index} has a non-finite coordinate")]
    NonFiniteCoordinate { index: usize },

    /// More points than cluster labels can address.
    #[error("too many points: {n}")]
    TooManyPoints { n: usize },

    /// Caller-provided output slice of the wrong length.
    #[error("output buffer has length {found}, expected {expected}")]
    OutputLength { expected: usize, found: usize },
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;
