use recfilter_image::Image;

use crate::elementary::ElementaryMatrices;
use crate::error::FilterError;
use crate::extension::{BoundaryFix, Extension};
use crate::grid::{BlockGrid, CarrySet};
use crate::stages;
use crate::weights::Weights;

/// Default block side of the grid decomposition.
pub const DEFAULT_BLOCK_SIDE: usize = 32;

/// Apply the causal+anticausal recursive filter to `src`, rows then columns,
/// forward and reverse, writing the result to `dst`.
///
/// The image is decomposed into a grid of `block_side` x `block_side`
/// blocks; per-block carries are propagated across the grid so that the
/// result equals the naive sequential filter under the chosen extension
/// policy, for any image size.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W).
/// * `dst` - The destination image with shape (H, W).
/// * `weights` - The recursive filter weights.
/// * `block_side` - The block side b, must exceed the filter order.
/// * `extension` - The boundary extension policy.
///
/// # Errors
///
/// Returns `InvalidDimensions` for empty or mismatched images,
/// `InvalidBlockSide` when `block_side` does not exceed the filter order,
/// and `IllConditionedWeights` when the extension matrices cannot be built.
///
/// # Example
///
/// ```
/// use recfilter_engine::{filter, Extension, Weights};
/// use recfilter_image::{Image, ImageSize};
///
/// let size = ImageSize {
///     width: 64,
///     height: 48,
/// };
/// let src = Image::<f64>::from_size_val(size, 1.0).unwrap();
/// let mut dst = Image::<f64>::from_size_val(size, 0.0).unwrap();
///
/// let weights = Weights::second_order(2.0).unwrap();
/// filter(&src, &mut dst, &weights, 32, Extension::Constant).unwrap();
/// ```
pub fn filter(
    src: &Image<f64>,
    dst: &mut Image<f64>,
    weights: &Weights,
    block_side: usize,
    extension: Extension,
) -> Result<(), FilterError> {
    let (height, width) = (src.rows(), src.cols());
    if height == 0 || width == 0 {
        return Err(FilterError::InvalidDimensions(height, width));
    }
    if dst.size() != src.size() {
        return Err(FilterError::InvalidDimensions(dst.rows(), dst.cols()));
    }
    if block_side <= weights.order() {
        return Err(FilterError::InvalidBlockSide(block_side, weights.order()));
    }

    let elem = ElementaryMatrices::build(weights, block_side);
    let mut grid = BlockGrid::from_image(src, block_side);
    let fix = BoundaryFix::build(
        extension,
        &elem,
        height,
        width,
        grid.m_blocks,
        grid.n_blocks,
    )?;
    let mut carries = CarrySet::new(
        grid.m_blocks,
        grid.n_blocks,
        weights.order(),
        block_side,
        matches!(extension, Extension::EvenPeriodic),
    );

    stages::stage1(&grid, &mut carries, &elem, weights, &fix);
    stages::stage23(&mut carries, &elem, &fix);
    stages::stage45(&mut carries, &elem, &fix, width);
    stages::stage6(&mut grid, &carries, weights);

    grid.copy_to_image(dst);
    Ok(())
}

/// Gaussian-filter `src` into `dst` with scale `sigma`.
///
/// Builds recursive Gaussian weights of the requested order (1 or 2) and
/// delegates to [`filter`].
///
/// # Errors
///
/// Returns `InvalidWeights` for invalid `sigma` or unsupported orders, plus
/// everything [`filter`] surfaces.
pub fn gaussian_filter(
    src: &Image<f64>,
    dst: &mut Image<f64>,
    sigma: f64,
    order: usize,
    block_side: usize,
    extension: Extension,
) -> Result<(), FilterError> {
    let weights = Weights::gaussian(sigma, order)?;
    filter(src, dst, &weights, block_side, extension)
}

/// Gaussian-blur `src` into `dst` with the defaults: second order, block
/// side 32, zero extension.
///
/// # Errors
///
/// Same as [`gaussian_filter`].
pub fn gaussian_blur(src: &Image<f64>, dst: &mut Image<f64>, sigma: f64) -> Result<(), FilterError> {
    gaussian_filter(src, dst, sigma, 2, DEFAULT_BLOCK_SIDE, Extension::Zero)
}
