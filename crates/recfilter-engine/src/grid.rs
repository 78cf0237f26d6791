//! Block decomposition of the image and carry storage with boundary slots.

use recfilter_image::Image;

use crate::mat::{self, Mat};

/// The image copied into a zero-padded grid of b x b blocks.
///
/// Block (m, n) covers rows [m b, (m+1) b) and columns [n b, (n+1) b) of the
/// padded buffer; cells past the valid extent hold zeros.
pub(crate) struct BlockGrid {
    /// Block side b.
    pub block_side: usize,
    /// Number of block rows M.
    pub m_blocks: usize,
    /// Number of block columns N.
    pub n_blocks: usize,
    /// Valid image height.
    pub height: usize,
    /// Valid image width.
    pub width: usize,
    /// Padded width (n_blocks * block_side).
    pub padded_width: usize,
    /// Padded buffer, row-major.
    pub data: Vec<f64>,
}

impl BlockGrid {
    /// Decompose `src` into blocks of side `block_side`.
    pub fn from_image(src: &Image<f64>, block_side: usize) -> Self {
        let (height, width) = (src.rows(), src.cols());
        let m_blocks = height.div_ceil(block_side);
        let n_blocks = width.div_ceil(block_side);
        let padded_width = n_blocks * block_side;
        let padded_height = m_blocks * block_side;

        let mut data = vec![0.0; padded_height * padded_width];
        let src_data = src.as_slice();
        for row in 0..height {
            data[row * padded_width..row * padded_width + width]
                .copy_from_slice(&src_data[row * width..(row + 1) * width]);
        }

        Self {
            block_side,
            m_blocks,
            n_blocks,
            height,
            width,
            padded_width,
            data,
        }
    }

    /// Copy block (m, n) out of the padded buffer.
    pub fn block(&self, m: usize, n: usize) -> Mat {
        let b = self.block_side;
        let mut out = Mat::zeros(b, b);
        for i in 0..b {
            let row = (m * b + i) * self.padded_width + n * b;
            out.as_slice_mut()[i * b..(i + 1) * b].copy_from_slice(&self.data[row..row + b]);
        }
        out
    }

    /// Tile the padded row `row` restricted to block column `n`, r times
    /// (r x b).
    pub fn row_tile(&self, row: usize, n: usize, r: usize) -> Mat {
        let b = self.block_side;
        let start = row * self.padded_width + n * b;
        mat::tile_rows(&self.data[start..start + b], r)
    }

    /// Tile the padded column `col` restricted to block row `m`, r times
    /// (b x r).
    pub fn col_tile(&self, col: usize, m: usize, r: usize) -> Mat {
        let b = self.block_side;
        let column: Vec<f64> = (0..b)
            .map(|i| self.data[(m * b + i) * self.padded_width + col])
            .collect();
        mat::tile_cols(&column, r)
    }

    /// Copy the valid extent back into `dst`.
    pub fn copy_to_image(&self, dst: &mut Image<f64>) {
        let width = self.width;
        let dst_data = dst.as_slice_mut();
        for row in 0..self.height {
            dst_data[row * width..(row + 1) * width]
                .copy_from_slice(&self.data[row * self.padded_width..row * self.padded_width + width]);
        }
    }
}

/// The four carry grids with their boundary slots, plus the raw reverse
/// carries used only by the even-periodic policy.
///
/// P and E are stored column-major by n so each column of blocks (the
/// sequential unit of stages 2-3) is one contiguous chunk of m_blocks + 1
/// slots; Pt and Et are row-major by m so each row of blocks (stages 4-5) is
/// one contiguous chunk of n_blocks + 1 slots. The accessors take signed
/// block indices and hide the boundary offset.
pub(crate) struct CarrySet {
    /// Number of block rows M.
    pub m_blocks: usize,
    /// Number of block columns N.
    pub n_blocks: usize,
    /// Forward row prologues, r x b, indexed m in [-1, M).
    pub p: Vec<Mat>,
    /// Reverse row epilogues, r x b, indexed m in [0, M].
    pub e: Vec<Mat>,
    /// Forward column prologues, b x r, indexed n in [-1, N).
    pub pt: Vec<Mat>,
    /// Reverse column epilogues, b x r, indexed n in [0, N].
    pub et: Vec<Mat>,
    /// Raw reverse carries of the input, r x b, column-major, m in [0, M).
    /// Empty unless the even-periodic policy is active.
    pub raw_v: Vec<Mat>,
    /// Raw reverse-transposed carries of the vertically filtered block,
    /// b x r, row-major, n in [0, N). Empty unless even-periodic.
    pub raw_h: Vec<Mat>,
}

impl CarrySet {
    /// Allocate zeroed carries for an (m_blocks x n_blocks) grid.
    pub fn new(
        m_blocks: usize,
        n_blocks: usize,
        order: usize,
        block_side: usize,
        with_raw: bool,
    ) -> Self {
        let vertical = |_| Mat::zeros(order, block_side);
        let horizontal = |_| Mat::zeros(block_side, order);
        Self {
            m_blocks,
            n_blocks,
            p: (0..n_blocks * (m_blocks + 1)).map(vertical).collect(),
            e: (0..n_blocks * (m_blocks + 1)).map(vertical).collect(),
            pt: (0..m_blocks * (n_blocks + 1)).map(horizontal).collect(),
            et: (0..m_blocks * (n_blocks + 1)).map(horizontal).collect(),
            raw_v: if with_raw {
                (0..n_blocks * m_blocks).map(vertical).collect()
            } else {
                Vec::new()
            },
            raw_h: if with_raw {
                (0..m_blocks * n_blocks).map(horizontal).collect()
            } else {
                Vec::new()
            },
        }
    }

    /// Storage slot of P[m][n], m in [-1, M).
    #[inline]
    pub fn p_slot(&self, m: isize, n: usize) -> usize {
        debug_assert!(m >= -1 && m < self.m_blocks as isize);
        n * (self.m_blocks + 1) + (m + 1) as usize
    }

    /// Storage slot of E[m][n], m in [0, M].
    #[inline]
    pub fn e_slot(&self, m: usize, n: usize) -> usize {
        debug_assert!(m <= self.m_blocks);
        n * (self.m_blocks + 1) + m
    }

    /// Storage slot of Pt[m][n], n in [-1, N).
    #[inline]
    pub fn pt_slot(&self, m: usize, n: isize) -> usize {
        debug_assert!(n >= -1 && n < self.n_blocks as isize);
        m * (self.n_blocks + 1) + (n + 1) as usize
    }

    /// Storage slot of Et[m][n], n in [0, N].
    #[inline]
    pub fn et_slot(&self, m: usize, n: usize) -> usize {
        debug_assert!(n <= self.n_blocks);
        m * (self.n_blocks + 1) + n
    }

    /// P[m][n], m in [-1, M).
    #[inline]
    pub fn p(&self, m: isize, n: usize) -> &Mat {
        &self.p[self.p_slot(m, n)]
    }

    /// E[m][n], m in [0, M].
    #[inline]
    pub fn e(&self, m: usize, n: usize) -> &Mat {
        &self.e[self.e_slot(m, n)]
    }

    /// Pt[m][n], n in [-1, N).
    #[inline]
    pub fn pt(&self, m: usize, n: isize) -> &Mat {
        &self.pt[self.pt_slot(m, n)]
    }

    /// Et[m][n], n in [0, N].
    #[inline]
    pub fn et(&self, m: usize, n: usize) -> &Mat {
        &self.et[self.et_slot(m, n)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recfilter_image::ImageSize;

    #[test]
    fn test_block_grid_pads_with_zeros() {
        let src = Image::new(
            ImageSize {
                width: 3,
                height: 2,
            },
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        )
        .unwrap();
        let grid = BlockGrid::from_image(&src, 2);
        assert_eq!(grid.m_blocks, 1);
        assert_eq!(grid.n_blocks, 2);
        assert_eq!(grid.padded_width, 4);

        let b00 = grid.block(0, 0);
        assert_eq!(b00.as_slice(), &[1.0, 2.0, 4.0, 5.0]);
        let b01 = grid.block(0, 1);
        assert_eq!(b01.as_slice(), &[3.0, 0.0, 6.0, 0.0]);
    }

    #[test]
    fn test_block_grid_round_trip() {
        let size = ImageSize {
            width: 5,
            height: 3,
        };
        let values: Vec<f64> = (0..15).map(|v| v as f64).collect();
        let src = Image::new(size, values.clone()).unwrap();
        let grid = BlockGrid::from_image(&src, 4);

        let mut dst = Image::from_size_val(size, 0.0).unwrap();
        grid.copy_to_image(&mut dst);
        assert_eq!(dst.as_slice(), values.as_slice());
    }

    #[test]
    fn test_tiles() {
        let src = Image::new(
            ImageSize {
                width: 2,
                height: 2,
            },
            vec![1.0, 2.0, 3.0, 4.0],
        )
        .unwrap();
        let grid = BlockGrid::from_image(&src, 2);
        let rt = grid.row_tile(1, 0, 2);
        assert_eq!(rt.as_slice(), &[3.0, 4.0, 3.0, 4.0]);
        let ct = grid.col_tile(0, 0, 2);
        assert_eq!(ct.as_slice(), &[1.0, 1.0, 3.0, 3.0]);
    }

    #[test]
    fn test_carry_slots() {
        let carries = CarrySet::new(3, 2, 2, 4, false);
        // boundary slot P[-1][n] precedes the column interior
        assert_eq!(carries.p_slot(-1, 0), 0);
        assert_eq!(carries.p_slot(0, 0), 1);
        assert_eq!(carries.p_slot(-1, 1), 4);
        // E[M][n] terminates the column
        assert_eq!(carries.e_slot(3, 0), 3);
        // Pt/Et are row-major
        assert_eq!(carries.pt_slot(1, -1), 3);
        assert_eq!(carries.et_slot(1, 2), 5);
    }
}
