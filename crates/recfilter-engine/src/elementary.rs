//! Elementary matrices derived once from the filter weights.
//!
//! Every matrix here is the response of a forward or reverse sweep to a unit
//! prologue, epilogue or input, obtained by running the sweeps on identity
//! and zero blocks. The carry propagation of stages 2-5 is dense arithmetic
//! over these matrices alone.

use crate::mat::Mat;
use crate::sweep::{col_fwd, col_rev};
use crate::weights::Weights;

/// Elementary matrices for a given (weights, block side) pair.
///
/// Names follow the forward/reverse response convention: `afp` is the
/// forward response to a unit prologue, `arb` the reverse response to a unit
/// block, heads (`h`) and tails (`t`) are the first and last r rows.
/// The `_t` fields are transposes used by the horizontal stages, which
/// multiply carries from the right.
pub struct ElementaryMatrices {
    /// Filter order r.
    pub order: usize,
    /// Block side b.
    pub block_side: usize,

    /// Forward response to a unit prologue (b x r).
    pub afp: Mat,
    /// Forward response to a unit block (b x b).
    pub afb: Mat,
    /// Reverse response to a unit epilogue (b x r).
    pub are: Mat,
    /// Reverse response to a unit block (b x b).
    pub arb: Mat,

    /// Tail of `afp` (r x r): forward state propagation across one block.
    pub abf: Mat,
    /// Head of `are` (r x r): reverse state propagation across one block.
    pub abr: Mat,
    /// Head of `arb` (r x b).
    pub harb: Mat,
    /// Tail of `afb` (r x b).
    pub tafb: Mat,

    /// harb * afp (r x r).
    pub harb_afp: Mat,
    /// harb * afb (r x b).
    pub harb_afb: Mat,
    /// arb * afp (b x r).
    pub arb_afp: Mat,
    /// arb * afb (b x b).
    pub arb_afb: Mat,

    /// Head of `afp` (r x r): forward head response to a unit prologue.
    pub arf: Mat,
    /// `arf` flipped: the reverse counterpart.
    pub arr: Mat,
    /// Leading r x r block of `afb`: forward head response to unit input
    /// (lower triangular, diagonal b0).
    pub abar_f: Mat,
    /// `abar_f` flipped: the reverse counterpart.
    pub abar_r: Mat,
    /// The r x r exchange matrix K.
    pub exchange: Mat,

    /// Transpose of `abf`.
    pub abf_t: Mat,
    /// Transpose of `abr`.
    pub abr_t: Mat,
    /// Transpose of `harb` (b x r).
    pub harb_t: Mat,
    /// Transpose of `tafb` (b x r).
    pub tafb_t: Mat,
    /// Transpose of `harb_afp`.
    pub harb_afp_t: Mat,
    /// Transpose of `harb_afb` (b x r).
    pub harb_afb_t: Mat,

    weights: Weights,
}

impl ElementaryMatrices {
    /// Build the elementary matrices for `weights` and `block_side`.
    pub fn build(weights: &Weights, block_side: usize) -> Self {
        let r = weights.order();
        let b = block_side;

        let mut afp = Mat::zeros(b, r);
        col_fwd(&Mat::identity(r), &mut afp, weights);

        let mut afb = Mat::identity(b);
        col_fwd(&Mat::zeros(r, b), &mut afb, weights);

        let mut are = Mat::zeros(b, r);
        col_rev(&mut are, &Mat::identity(r), weights);

        let mut arb = Mat::identity(b);
        col_rev(&mut arb, &Mat::zeros(r, b), weights);

        let abf = afp.tail(r);
        let abr = are.head(r);
        let harb = arb.head(r);
        let tafb = afb.tail(r);

        let harb_afp = harb.mul(&afp);
        let harb_afb = harb.mul(&afb);
        let arb_afp = arb.mul(&afp);
        let arb_afb = arb.mul(&afb);

        let arf = afp.head(r);
        let arr = arf.flip();
        let abar_f = afb.head(r).head_cols(r);
        let abar_r = abar_f.flip();

        Self {
            order: r,
            block_side: b,
            abf_t: abf.transpose(),
            abr_t: abr.transpose(),
            harb_t: harb.transpose(),
            tafb_t: tafb.transpose(),
            harb_afp_t: harb_afp.transpose(),
            harb_afb_t: harb_afb.transpose(),
            afp,
            afb,
            are,
            arb,
            abf,
            abr,
            harb,
            tafb,
            harb_afp,
            harb_afb,
            arb_afp,
            arb_afb,
            arf,
            arr,
            abar_f,
            abar_r,
            exchange: Mat::exchange(r),
            weights: weights.clone(),
        }
    }

    /// Zero-input forward state propagation across `steps` samples (r x r).
    ///
    /// `span(block_side)` equals `abf`; `span(0)` is the identity. For fewer
    /// steps than the order, part of the state merely shifts through.
    pub fn span(&self, steps: usize) -> Mat {
        let r = self.order;
        if steps == 0 {
            return Mat::identity(r);
        }
        let mut response = Mat::zeros(steps, r);
        col_fwd(&Mat::identity(r), &mut response, &self.weights);
        if steps >= r {
            return response.tail(r);
        }
        // state rows that predate the response come from the prologue
        let mut out = Mat::zeros(r, r);
        for i in 0..r - steps {
            out.set(i, steps + i, 1.0);
        }
        for i in 0..steps {
            for j in 0..r {
                out.set(r - steps + i, j, response.get(i, j));
            }
        }
        out
    }

    /// The reverse head state induced by the forward zero-input response over
    /// `steps` trailing pad samples, per unit forward state (r x r).
    ///
    /// With zero pad cells, a forward sweep leaves the pad holding the decay
    /// of the last valid state; running the reverse sweep over that decay
    /// hands this matrix times the state to the last valid row.
    pub fn pad_absorption(&self, steps: usize) -> Mat {
        let r = self.order;
        if steps == 0 {
            return Mat::zeros(r, r);
        }
        let mut response = Mat::zeros(steps, r);
        col_fwd(&Mat::identity(r), &mut response, &self.weights);
        col_rev(&mut response, &Mat::zeros(r, r), &self.weights);
        if steps >= r {
            return response.head(r);
        }
        // reverse state rows past the pad carry nothing of the pad response
        let mut out = Mat::zeros(r, r);
        for i in 0..steps {
            for j in 0..r {
                out.set(i, j, response.get(i, j));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FilterError;
    use approx::assert_relative_eq;

    fn assert_mat_eq(a: &Mat, b: &Mat, eps: f64) {
        assert_eq!((a.rows(), a.cols()), (b.rows(), b.cols()));
        for i in 0..a.rows() {
            for j in 0..a.cols() {
                assert_relative_eq!(a.get(i, j), b.get(i, j), epsilon = eps);
            }
        }
    }

    #[test]
    fn test_forward_sweep_is_affine() -> Result<(), FilterError> {
        // F(P, B) = afb * B + afp * P
        let w = Weights::second_order(1.0)?;
        let b = 6;
        let elem = ElementaryMatrices::build(&w, b);

        let mut block = Mat::zeros(b, 3);
        for i in 0..b {
            for j in 0..3 {
                block.set(i, j, ((i * 3 + j) as f64 * 0.37).sin());
            }
        }
        let mut prologue = Mat::zeros(2, 3);
        prologue.set(0, 0, 1.0);
        prologue.set(1, 2, -0.5);

        let mut expected = elem.afb.mul(&block);
        expected.add_assign(&elem.afp.mul(&prologue));

        col_fwd(&prologue, &mut block, &w);
        assert_mat_eq(&block, &expected, 1e-13);
        Ok(())
    }

    #[test]
    fn test_reverse_sweep_is_affine() -> Result<(), FilterError> {
        // R(B, E) = arb * B + are * E
        let w = Weights::second_order(2.0)?;
        let b = 5;
        let elem = ElementaryMatrices::build(&w, b);

        let mut block = Mat::zeros(b, 2);
        for i in 0..b {
            for j in 0..2 {
                block.set(i, j, ((i * 2 + j) as f64 * 0.61).cos());
            }
        }
        let mut epilogue = Mat::zeros(2, 2);
        epilogue.set(0, 1, 2.0);
        epilogue.set(1, 0, -1.0);

        let mut expected = elem.arb.mul(&block);
        expected.add_assign(&elem.are.mul(&epilogue));

        col_rev(&mut block, &epilogue, &w);
        assert_mat_eq(&block, &expected, 1e-13);
        Ok(())
    }

    #[test]
    fn test_reverse_propagation_is_conjugated_forward() -> Result<(), FilterError> {
        // abr = K * abf * K
        let w = Weights::second_order(1.0)?;
        let elem = ElementaryMatrices::build(&w, 8);
        let conj = elem.exchange.mul(&elem.abf).mul(&elem.exchange);
        assert_mat_eq(&elem.abr, &conj, 1e-13);
        Ok(())
    }

    #[test]
    fn test_span() -> Result<(), FilterError> {
        let w = Weights::second_order(1.0)?;
        let elem = ElementaryMatrices::build(&w, 4);
        assert_eq!(elem.span(0), Mat::identity(2));
        assert_mat_eq(&elem.span(4), &elem.abf, 1e-14);
        // span composes: span(7) = span(3) * span(4)
        assert_mat_eq(&elem.span(7), &elem.span(3).mul(&elem.span(4)), 1e-13);
        Ok(())
    }

    #[test]
    fn test_span_shorter_than_order() -> Result<(), FilterError> {
        let w = Weights::second_order(1.0)?;
        let (a1, a2) = (w.feedback()[0], w.feedback()[1]);
        let elem = ElementaryMatrices::build(&w, 4);
        // a single step is one application of the companion matrix
        let step = elem.span(1);
        assert_relative_eq!(step.get(0, 0), 0.0, epsilon = 1e-14);
        assert_relative_eq!(step.get(0, 1), 1.0, epsilon = 1e-14);
        assert_relative_eq!(step.get(1, 0), -a2, epsilon = 1e-14);
        assert_relative_eq!(step.get(1, 1), -a1, epsilon = 1e-14);
        assert_mat_eq(&elem.span(2), &step.mul(&step), 1e-13);
        Ok(())
    }

    #[test]
    fn test_abar_f_shape() -> Result<(), FilterError> {
        let w = Weights::second_order(1.0)?;
        let elem = ElementaryMatrices::build(&w, 4);
        // lower triangular with b0 on the diagonal
        assert_relative_eq!(elem.abar_f.get(0, 0), w.feedforward(), epsilon = 1e-14);
        assert_relative_eq!(elem.abar_f.get(1, 1), w.feedforward(), epsilon = 1e-14);
        assert_relative_eq!(elem.abar_f.get(0, 1), 0.0, epsilon = 1e-14);
        Ok(())
    }
}
