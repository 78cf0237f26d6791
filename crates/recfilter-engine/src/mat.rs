use faer::prelude::SpSolver;

use crate::error::FilterError;

/// Acceptable residual when verifying a solve or an inverse.
const SOLVE_RESIDUAL_TOL: f64 = 1e-8;

/// A small dense matrix of f64 with row-major storage.
///
/// Carries and elementary matrices are at most b x b with b around 32, so a
/// flat `Vec<f64>` with explicit strides is all the structure needed. The LU
/// solves required by the extension builder go through faer views over the
/// same storage.
#[derive(Debug, Clone, PartialEq)]
pub struct Mat {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Mat {
    /// Create a matrix of zeros.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Create the n x n identity matrix.
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.set(i, i, 1.0);
        }
        m
    }

    /// Create the n x n exchange matrix (ones on the anti-diagonal).
    pub fn exchange(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.set(i, n - 1 - i, 1.0);
        }
        m
    }

    /// Create a matrix from a row-major vector.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), rows * cols);
        Self { rows, cols, data }
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Read the entry at (row, col).
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// Write the entry at (row, col).
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    /// The underlying row-major storage.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// The underlying row-major storage, mutable.
    pub fn as_slice_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Matrix product self * rhs.
    pub fn mul(&self, rhs: &Mat) -> Mat {
        debug_assert_eq!(self.cols, rhs.rows);
        let mut out = Mat::zeros(self.rows, rhs.cols);
        for i in 0..self.rows {
            for k in 0..self.cols {
                let lhs = self.get(i, k);
                if lhs == 0.0 {
                    continue;
                }
                for j in 0..rhs.cols {
                    out.data[i * rhs.cols + j] += lhs * rhs.get(k, j);
                }
            }
        }
        out
    }

    /// Elementwise self += rhs.
    pub fn add_assign(&mut self, rhs: &Mat) {
        debug_assert_eq!((self.rows, self.cols), (rhs.rows, rhs.cols));
        for (a, b) in self.data.iter_mut().zip(rhs.data.iter()) {
            *a += b;
        }
    }

    /// Elementwise self -= rhs.
    pub fn sub_assign(&mut self, rhs: &Mat) {
        debug_assert_eq!((self.rows, self.cols), (rhs.rows, rhs.cols));
        for (a, b) in self.data.iter_mut().zip(rhs.data.iter()) {
            *a -= b;
        }
    }

    /// The transpose.
    pub fn transpose(&self) -> Mat {
        let mut out = Mat::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                out.set(j, i, self.get(i, j));
            }
        }
        out
    }

    /// Reverse both axes.
    pub fn flip(&self) -> Mat {
        let mut out = Mat::zeros(self.rows, self.cols);
        for i in 0..self.rows {
            for j in 0..self.cols {
                out.set(self.rows - 1 - i, self.cols - 1 - j, self.get(i, j));
            }
        }
        out
    }

    /// The first `count` rows.
    pub fn head(&self, count: usize) -> Mat {
        debug_assert!(count <= self.rows);
        Mat::from_vec(count, self.cols, self.data[..count * self.cols].to_vec())
    }

    /// The last `count` rows.
    pub fn tail(&self, count: usize) -> Mat {
        debug_assert!(count <= self.rows);
        let start = (self.rows - count) * self.cols;
        Mat::from_vec(count, self.cols, self.data[start..].to_vec())
    }

    /// The first `count` columns.
    pub fn head_cols(&self, count: usize) -> Mat {
        debug_assert!(count <= self.cols);
        let mut out = Mat::zeros(self.rows, count);
        for i in 0..self.rows {
            for j in 0..count {
                out.set(i, j, self.get(i, j));
            }
        }
        out
    }

    /// The last `count` columns.
    pub fn tail_cols(&self, count: usize) -> Mat {
        debug_assert!(count <= self.cols);
        let offset = self.cols - count;
        let mut out = Mat::zeros(self.rows, count);
        for i in 0..self.rows {
            for j in 0..count {
                out.set(i, j, self.get(i, j + offset));
            }
        }
        out
    }

    /// One column as a vector.
    pub fn col(&self, col: usize) -> Vec<f64> {
        debug_assert!(col < self.cols);
        (0..self.rows).map(|i| self.get(i, col)).collect()
    }

    /// The largest absolute entry.
    pub fn max_abs(&self) -> f64 {
        self.data.iter().fold(0.0, |acc, v| acc.max(v.abs()))
    }
}

/// Tile a row vector `count` times into a (count x len) matrix.
pub fn tile_rows(row: &[f64], count: usize) -> Mat {
    let mut out = Mat::zeros(count, row.len());
    for i in 0..count {
        for (j, v) in row.iter().enumerate() {
            out.set(i, j, *v);
        }
    }
    out
}

/// Tile a column vector `count` times into a (len x count) matrix.
pub fn tile_cols(col: &[f64], count: usize) -> Mat {
    let mut out = Mat::zeros(col.len(), count);
    for (i, v) in col.iter().enumerate() {
        for j in 0..count {
            out.set(i, j, *v);
        }
    }
    out
}

/// Solve a * x = b for x with a partial-pivot LU through faer.
///
/// The solution is verified against the inputs; a residual above tolerance
/// means the system is numerically defective for the given weights.
///
/// # Errors
///
/// Returns `IllConditionedWeights` when the residual check fails.
pub fn solve(a: &Mat, b: &Mat) -> Result<Mat, FilterError> {
    debug_assert_eq!(a.rows, a.cols);
    debug_assert_eq!(a.rows, b.rows);

    let a_ref = faer::mat::from_row_major_slice(a.as_slice(), a.rows, a.cols);
    let b_ref = faer::mat::from_row_major_slice(b.as_slice(), b.rows, b.cols);
    let sol = a_ref.partial_piv_lu().solve(b_ref);

    let mut x = Mat::zeros(b.rows, b.cols);
    for i in 0..b.rows {
        for j in 0..b.cols {
            x.set(i, j, sol.read(i, j));
        }
    }

    if !x.as_slice().iter().all(|v| v.is_finite()) {
        return Err(FilterError::IllConditionedWeights);
    }
    let mut residual = a.mul(&x);
    residual.sub_assign(b);
    if residual.max_abs() > SOLVE_RESIDUAL_TOL * (1.0 + b.max_abs()) {
        return Err(FilterError::IllConditionedWeights);
    }
    Ok(x)
}

/// Invert a square matrix by solving against the identity.
///
/// # Errors
///
/// Returns `IllConditionedWeights` when the matrix is singular or the
/// residual check fails.
pub fn inverse(a: &Mat) -> Result<Mat, FilterError> {
    solve(a, &Mat::identity(a.rows))
}
