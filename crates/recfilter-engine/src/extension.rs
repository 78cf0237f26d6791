//! Boundary extension policies and their configuration matrices.
//!
//! Each non-zero policy owns the small matrices that turn accumulated grid
//! carries into the true boundary carries of the infinitely extended image.
//! Everything is derived once per filter invocation from the elementary
//! matrices; a failed inversion surfaces `IllConditionedWeights` before any
//! stage runs.

use crate::elementary::ElementaryMatrices;
use crate::error::FilterError;
use crate::mat::{self, Mat};

/// Rule for the image values outside the valid extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Extension {
    /// Values outside the image are zero.
    #[default]
    Zero,
    /// The edge row/column is replicated outward.
    Constant,
    /// The image wraps around periodically.
    Periodic,
    /// The image is reflected, then wraps (half-sample symmetric).
    EvenPeriodic,
}

/// Conversion between grid-edge carries and valid-edge carries for one axis.
///
/// The block grid zero-pads the trailing edge, so the accumulated causal
/// carry reaches the grid edge `pad` zero-input steps after the last valid
/// sample. `phi_inv` undoes that propagation, `psi` is the reverse state the
/// pad tail hands back to the last valid sample, and `unpad` maps a true
/// epilogue to the grid slot that delivers it there. With no pad all three
/// reduce to identities/zeros.
pub(crate) struct AxisPad {
    /// Inverse of the zero-input propagation over the pad.
    pub phi_inv: Mat,
    /// Reverse absorption of the pad tail per unit forward state.
    pub psi: Mat,
    /// K * phi_inv * K.
    pub unpad: Mat,
}

impl AxisPad {
    fn build(elem: &ElementaryMatrices, pad: usize) -> Result<Self, FilterError> {
        let r = elem.order;
        if pad == 0 {
            return Ok(Self {
                phi_inv: Mat::identity(r),
                psi: Mat::zeros(r, r),
                unpad: Mat::identity(r),
            });
        }
        let phi_inv = mat::inverse(&elem.span(pad))?;
        let unpad = elem.exchange.mul(&phi_inv).mul(&elem.exchange);
        Ok(Self {
            phi_inv,
            psi: elem.pad_absorption(pad),
            unpad,
        })
    }

    fn transposed(&self) -> Self {
        Self {
            phi_inv: self.phi_inv.transpose(),
            psi: self.psi.transpose(),
            unpad: self.unpad.transpose(),
        }
    }
}

/// Periodic fixpoint matrices for one axis of valid length `len`.
pub(crate) struct PeriodicAxis {
    /// Forward state propagation across the full valid extent.
    pub span: Mat,
    /// (I - span)^-1: solves the forward wrap-around fixpoint.
    pub head_solve: Mat,
    /// K * span * K: the reverse propagation across the extent.
    pub tail_span: Mat,
    /// (I - tail_span)^-1: solves the reverse wrap-around fixpoint.
    pub tail_solve: Mat,
}

impl PeriodicAxis {
    fn build(elem: &ElementaryMatrices, len: usize) -> Result<Self, FilterError> {
        let r = elem.order;
        let span = elem.span(len);
        let mut eye_minus = Mat::identity(r);
        eye_minus.sub_assign(&span);
        let head_solve = mat::inverse(&eye_minus)?;

        let tail_span = elem.exchange.mul(&span).mul(&elem.exchange);
        let mut eye_minus = Mat::identity(r);
        eye_minus.sub_assign(&tail_span);
        let tail_solve = mat::inverse(&eye_minus)?;

        Ok(Self {
            span,
            head_solve,
            tail_span,
            tail_solve,
        })
    }

    fn transposed(&self) -> Self {
        Self {
            span: self.span.transpose(),
            head_solve: self.head_solve.transpose(),
            tail_span: self.tail_span.transpose(),
            tail_solve: self.tail_solve.transpose(),
        }
    }
}

/// Even-periodic fixpoint matrices for one axis of valid length `len`.
///
/// The half-sample symmetric extension has period 2 len, so the forward
/// fixpoint inverts I - span^2.
pub(crate) struct EvenAxis {
    /// Forward state propagation across the valid extent.
    pub span: Mat,
    /// (I - span^2)^-1.
    pub head_solve: Mat,
}

impl EvenAxis {
    fn build(elem: &ElementaryMatrices, len: usize) -> Result<Self, FilterError> {
        let r = elem.order;
        let span = elem.span(len);
        let mut eye_minus = Mat::identity(r);
        eye_minus.sub_assign(&span.mul(&span));
        let head_solve = mat::inverse(&eye_minus)?;
        Ok(Self { span, head_solve })
    }

    fn transposed(&self) -> Self {
        Self {
            span: self.span.transpose(),
            head_solve: self.head_solve.transpose(),
        }
    }
}

/// Per-policy configuration matrices.
///
/// Vertical fields multiply r x b carries from the left; the `_t` fields are
/// the pre-transposed horizontal counterparts that multiply b x r carries
/// from the right.
pub(crate) enum PolicyFix {
    /// Zero extension needs no extra matrices.
    Zero,
    /// Constant (edge replication) extension.
    Constant {
        /// SF * AbarF: steady forward state per unit replicated sample.
        head_gain: Mat,
        /// SRF * ArF: reverse tail state per unit forward edge state.
        tail_state: Mat,
        /// (SR * AbarR - SRF * ArF) * SF * AbarF: reverse tail state per
        /// unit replicated sample.
        tail_tile: Mat,
        /// Transpose of `head_gain`.
        head_gain_t: Mat,
        /// Transpose of `tail_state`.
        tail_state_t: Mat,
        /// Transpose of `tail_tile`.
        tail_tile_t: Mat,
    },
    /// Periodic extension.
    Periodic {
        /// Vertical axis (full image height).
        v: PeriodicAxis,
        /// Horizontal axis (full image width), pre-transposed.
        h: PeriodicAxis,
    },
    /// Even-periodic (symmetric) extension.
    EvenPeriodic {
        /// Vertical axis (full image height).
        v: EvenAxis,
        /// Horizontal axis (full image width), pre-transposed.
        h: EvenAxis,
        /// L = (K - ArR)^-1 * AbarR: reverse tail state per unit forward
        /// state at the reflection.
        tail_map: Mat,
        /// Transpose of `tail_map`.
        tail_map_t: Mat,
    },
}

/// Boundary-fix configuration for one filter invocation.
pub(crate) struct BoundaryFix {
    /// Policy-specific matrices.
    pub policy: PolicyFix,
    /// Vertical pad conversion (left-multiplication form).
    pub v_pad: AxisPad,
    /// Horizontal pad conversion (pre-transposed, right-multiplication form).
    pub h_pad: AxisPad,
}

impl BoundaryFix {
    /// Build the boundary fix for `extension` over an image of the given
    /// valid extent decomposed into an (m_blocks x n_blocks) grid.
    ///
    /// # Errors
    ///
    /// Returns `IllConditionedWeights` when any required inversion fails.
    pub fn build(
        extension: Extension,
        elem: &ElementaryMatrices,
        height: usize,
        width: usize,
        m_blocks: usize,
        n_blocks: usize,
    ) -> Result<Self, FilterError> {
        let pad_v = m_blocks * elem.block_side - height;
        let pad_h = n_blocks * elem.block_side - width;
        let v_pad = AxisPad::build(elem, pad_v)?;
        let h_pad = AxisPad::build(elem, pad_h)?.transposed();

        let policy = match extension {
            Extension::Zero => PolicyFix::Zero,
            Extension::Constant => build_constant(elem)?,
            Extension::Periodic => PolicyFix::Periodic {
                v: PeriodicAxis::build(elem, height)?,
                h: PeriodicAxis::build(elem, width)?.transposed(),
            },
            Extension::EvenPeriodic => {
                let tail_map = build_reflection_tail(elem)?;
                PolicyFix::EvenPeriodic {
                    v: EvenAxis::build(elem, height)?,
                    h: EvenAxis::build(elem, width)?.transposed(),
                    tail_map_t: tail_map.transpose(),
                    tail_map,
                }
            }
        };

        Ok(Self {
            policy,
            v_pad,
            h_pad,
        })
    }
}

/// Constant-extension matrices from the coupled forward/reverse fixpoint.
fn build_constant(elem: &ElementaryMatrices) -> Result<PolicyFix, FilterError> {
    let r = elem.order;

    // srf sums the reverse responses to the decaying forward tail windows:
    // srf = abar_r + arr * srf * arf, written out over vec(srf) as
    // sys[r i + j, r p + q] = delta - arr[i, p] * arf[q, j].
    let mut sys = Mat::zeros(r * r, r * r);
    let mut rhs = Mat::zeros(r * r, 1);
    for i in 0..r {
        for j in 0..r {
            rhs.set(r * i + j, 0, elem.abar_r.get(i, j));
            for p in 0..r {
                for q in 0..r {
                    let delta = if i == p && j == q { 1.0 } else { 0.0 };
                    let coupling = elem.arr.get(i, p) * elem.arf.get(q, j);
                    sys.set(r * i + j, r * p + q, delta - coupling);
                }
            }
        }
    }
    let vec_srf = mat::solve(&sys, &rhs)?;
    let mut srf = Mat::zeros(r, r);
    for i in 0..r {
        for j in 0..r {
            srf.set(i, j, vec_srf.get(r * i + j, 0));
        }
    }

    let mut eye_minus = Mat::identity(r);
    eye_minus.sub_assign(&elem.arf);
    let sf = mat::inverse(&eye_minus)?;

    let mut eye_minus = Mat::identity(r);
    eye_minus.sub_assign(&elem.arr);
    let sr = mat::inverse(&eye_minus)?;

    let head_gain = sf.mul(&elem.abar_f);
    let tail_state = srf.mul(&elem.arf);
    let mut tail_mix = sr.mul(&elem.abar_r);
    tail_mix.sub_assign(&tail_state);
    let tail_tile = tail_mix.mul(&head_gain);

    Ok(PolicyFix::Constant {
        head_gain_t: head_gain.transpose(),
        tail_state_t: tail_state.transpose(),
        tail_tile_t: tail_tile.transpose(),
        head_gain,
        tail_state,
        tail_tile,
    })
}

/// L = (K - ArR)^-1 * AbarR for the even-periodic reflection tail.
fn build_reflection_tail(elem: &ElementaryMatrices) -> Result<Mat, FilterError> {
    let mut k_minus = elem.exchange.clone();
    k_minus.sub_assign(&elem.arr);
    mat::solve(&k_minus, &elem.abar_r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weights::Weights;
    use approx::assert_relative_eq;

    #[test]
    fn test_zero_build() -> Result<(), FilterError> {
        let w = Weights::second_order(1.0)?;
        let elem = ElementaryMatrices::build(&w, 4);
        // 8 = 2 * 4: no pad, conversions are identities
        let fix = BoundaryFix::build(Extension::Zero, &elem, 8, 8, 2, 2)?;
        assert!(matches!(fix.policy, PolicyFix::Zero));
        assert_eq!(fix.v_pad.phi_inv, Mat::identity(2));
        assert_eq!(fix.v_pad.psi, Mat::zeros(2, 2));
        Ok(())
    }

    #[test]
    fn test_pad_conversion_inverts_span() -> Result<(), FilterError> {
        let w = Weights::second_order(1.0)?;
        let elem = ElementaryMatrices::build(&w, 8);
        // 13 rows in 2 blocks of 8: pad of 3
        let fix = BoundaryFix::build(Extension::Zero, &elem, 13, 16, 2, 2)?;
        let product = fix.v_pad.phi_inv.mul(&elem.span(3));
        for i in 0..2 {
            for j in 0..2 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(product.get(i, j), expected, epsilon = 1e-10);
            }
        }
        Ok(())
    }

    #[test]
    fn test_constant_first_order_closed_form() -> Result<(), FilterError> {
        // for r = 1 the fixpoints collapse to scalars: head gain is
        // b0 / (1 + a1) and the tail tile follows the same geometric series
        let w = Weights::first_order(1.0)?;
        let b0 = w.feedforward();
        let a1 = w.feedback()[0];
        let elem = ElementaryMatrices::build(&w, 4);
        match build_constant(&elem)? {
            PolicyFix::Constant {
                head_gain,
                tail_state,
                tail_tile,
                ..
            } => {
                // arf = arr = -a1 for r = 1
                assert_relative_eq!(head_gain.get(0, 0), b0 / (1.0 + a1), epsilon = 1e-12);
                // srf = b0 / (1 - a1^2), tail_state = srf * (-a1)
                let srf = b0 / (1.0 - a1 * a1);
                assert_relative_eq!(tail_state.get(0, 0), -a1 * srf, epsilon = 1e-12);
                let sr = 1.0 / (1.0 + a1);
                let expected_tile = (sr * b0 + a1 * srf) * b0 / (1.0 + a1);
                assert_relative_eq!(tail_tile.get(0, 0), expected_tile, epsilon = 1e-12);
            }
            _ => unreachable!(),
        }
        Ok(())
    }

    #[test]
    fn test_constant_second_order_tail_operator() -> Result<(), FilterError> {
        // weights with poles 1/2 and 1/4: the reverse tail response to a
        // unit forward edge state has a closed geometric-series form
        let w = Weights::new(1.0, vec![-0.75, 0.125])?;
        let elem = ElementaryMatrices::build(&w, 4);
        match build_constant(&elem)? {
            PolicyFix::Constant { tail_state, .. } => {
                assert_relative_eq!(tail_state.get(0, 0), -8.0 / 35.0, epsilon = 1e-12);
                assert_relative_eq!(tail_state.get(0, 1), 128.0 / 105.0, epsilon = 1e-12);
                assert_relative_eq!(tail_state.get(1, 0), -16.0 / 105.0, epsilon = 1e-12);
                assert_relative_eq!(tail_state.get(1, 1), 24.0 / 35.0, epsilon = 1e-12);
            }
            _ => unreachable!(),
        }
        Ok(())
    }

    #[test]
    fn test_periodic_fixpoint_solves() -> Result<(), FilterError> {
        let w = Weights::second_order(2.0)?;
        let elem = ElementaryMatrices::build(&w, 8);
        let axis = PeriodicAxis::build(&elem, 24)?;
        // (I - span) * head_solve = I
        let mut eye_minus = Mat::identity(2);
        eye_minus.sub_assign(&axis.span);
        let product = eye_minus.mul(&axis.head_solve);
        for i in 0..2 {
            for j in 0..2 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(product.get(i, j), expected, epsilon = 1e-10);
            }
        }
        Ok(())
    }

    #[test]
    fn test_reflection_tail_first_order() -> Result<(), FilterError> {
        // r = 1: L = b0 / (1 + a1), the half-sample symmetric tail gain
        let w = Weights::first_order(2.0)?;
        let elem = ElementaryMatrices::build(&w, 4);
        let l = build_reflection_tail(&elem)?;
        let b0 = w.feedforward();
        let a1 = w.feedback()[0];
        assert_relative_eq!(l.get(0, 0), b0 / (1.0 + a1), epsilon = 1e-12);
        Ok(())
    }
}
