#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// image error types.
mod error;
pub use error::ImageError;

/// image types and traits.
mod image;
pub use image::{Image, ImageSize};
