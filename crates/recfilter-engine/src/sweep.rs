//! Causal and anticausal recursive sweeps over rectangular blocks.
//!
//! The column sweeps filter every column of a block top-down (forward) or
//! bottom-up (reverse); the row sweeps filter every row left-right or
//! right-left. Prologues carry the r samples preceding the block, epilogues
//! the r samples following it, so a local sweep continues the global
//! recurrence exactly.

use crate::mat::Mat;
use crate::weights::Weights;

/// Forward sweep down the columns of `block`.
///
/// # Arguments
///
/// * `prologue` - The r rows preceding the block (r x cols); row r-1 is the
///   sample immediately above the block.
/// * `block` - The block to filter in place.
/// * `weights` - The filter weights.
pub fn col_fwd(prologue: &Mat, block: &mut Mat, weights: &Weights) {
    let (rows, cols) = (block.rows(), block.cols());
    let r = weights.order();
    let b0 = weights.feedforward();
    let feedback = weights.feedback();
    debug_assert_eq!(prologue.rows(), r);
    debug_assert_eq!(prologue.cols(), cols);

    for i in 0..rows {
        for c in 0..cols {
            let mut acc = b0 * block.get(i, c);
            for (k, a) in feedback.iter().enumerate() {
                let k = k + 1;
                let prev = if i >= k {
                    block.get(i - k, c)
                } else {
                    prologue.get(r + i - k, c)
                };
                acc -= a * prev;
            }
            block.set(i, c, acc);
        }
    }
}

/// Reverse sweep up the columns of `block`.
///
/// # Arguments
///
/// * `block` - The block to filter in place.
/// * `epilogue` - The r rows following the block (r x cols); row 0 is the
///   sample immediately below the block.
/// * `weights` - The filter weights.
pub fn col_rev(block: &mut Mat, epilogue: &Mat, weights: &Weights) {
    let (rows, cols) = (block.rows(), block.cols());
    let r = weights.order();
    let b0 = weights.feedforward();
    let feedback = weights.feedback();
    debug_assert_eq!(epilogue.rows(), r);
    debug_assert_eq!(epilogue.cols(), cols);

    for i in (0..rows).rev() {
        for c in 0..cols {
            let mut acc = b0 * block.get(i, c);
            for (k, a) in feedback.iter().enumerate() {
                let k = k + 1;
                let next = if i + k < rows {
                    block.get(i + k, c)
                } else {
                    epilogue.get(i + k - rows, c)
                };
                acc -= a * next;
            }
            block.set(i, c, acc);
        }
    }
}

/// Forward sweep along the rows of `block`.
///
/// # Arguments
///
/// * `prologue` - The r columns preceding the block (rows x r); column r-1 is
///   the sample immediately left of the block.
/// * `block` - The block to filter in place.
/// * `weights` - The filter weights.
pub fn row_fwd(prologue: &Mat, block: &mut Mat, weights: &Weights) {
    let (rows, cols) = (block.rows(), block.cols());
    let r = weights.order();
    let b0 = weights.feedforward();
    let feedback = weights.feedback();
    debug_assert_eq!(prologue.rows(), rows);
    debug_assert_eq!(prologue.cols(), r);

    for i in 0..rows {
        for j in 0..cols {
            let mut acc = b0 * block.get(i, j);
            for (k, a) in feedback.iter().enumerate() {
                let k = k + 1;
                let prev = if j >= k {
                    block.get(i, j - k)
                } else {
                    prologue.get(i, r + j - k)
                };
                acc -= a * prev;
            }
            block.set(i, j, acc);
        }
    }
}

/// Reverse sweep along the rows of `block`.
///
/// # Arguments
///
/// * `block` - The block to filter in place.
/// * `epilogue` - The r columns following the block (rows x r); column 0 is
///   the sample immediately right of the block.
/// * `weights` - The filter weights.
pub fn row_rev(block: &mut Mat, epilogue: &Mat, weights: &Weights) {
    let (rows, cols) = (block.rows(), block.cols());
    let r = weights.order();
    let b0 = weights.feedforward();
    let feedback = weights.feedback();
    debug_assert_eq!(epilogue.rows(), rows);
    debug_assert_eq!(epilogue.cols(), r);

    for i in 0..rows {
        for j in (0..cols).rev() {
            let mut acc = b0 * block.get(i, j);
            for (k, a) in feedback.iter().enumerate() {
                let k = k + 1;
                let next = if j + k < cols {
                    block.get(i, j + k)
                } else {
                    epilogue.get(i, j + k - cols)
                };
                acc -= a * next;
            }
            block.set(i, j, acc);
        }
    }
}
