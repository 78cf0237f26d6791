use recfilter_image::ImageError;

/// An error type for the filter engine.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    /// Error when the image is empty or the source and destination sizes differ.
    #[error("Invalid image dimensions ({0} x {1})")]
    InvalidDimensions(usize, usize),

    /// Error when the block side does not exceed the filter order.
    #[error("Block side ({0}) must be greater than the filter order ({1})")]
    InvalidBlockSide(usize, usize),

    /// Error when the filter weights are malformed.
    #[error("Invalid filter weights: {0}")]
    InvalidWeights(String),

    /// Error when a matrix inversion required by the chosen extension fails.
    #[error("Extension matrices are ill-conditioned for the given weights")]
    IllConditionedWeights,

    /// Error from the image container.
    #[error(transparent)]
    Image(#[from] ImageError),
}
