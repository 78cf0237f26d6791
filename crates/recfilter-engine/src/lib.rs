#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// elementary matrices derived from the filter weights.
pub mod elementary;

/// engine error types.
mod error;

/// boundary extension policies and their matrices.
pub mod extension;

/// block decomposition and carry storage.
mod grid;

/// small dense matrices and the LU solve seam.
pub mod mat;

/// the public filter entry points.
pub mod ops;

/// the six filter stages.
mod stages;

/// causal and anticausal recursive sweeps.
pub mod sweep;

/// recursive filter weight builders.
pub mod weights;

pub use error::FilterError;
pub use extension::Extension;
pub use ops::{filter, gaussian_blur, gaussian_filter, DEFAULT_BLOCK_SIDE};
pub use weights::Weights;
