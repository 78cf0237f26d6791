//! The six stages of the block-parallel filter.
//!
//! Stage 1 extracts per-block carries independently. Stages 2-3 resolve the
//! vertical carries (parallel over block columns, sequential top-down then
//! bottom-up within each). Stages 4-5 resolve the horizontal carries from the
//! already resolved vertical ones (parallel over block rows, sequential
//! left-right then right-left). Stage 6 replays the four sweeps inside every
//! block with its neighbours' carries as prologues and epilogues.
//!
//! Boundary fixes for the active extension policy run at the top of stages
//! 2-3 and 4-5; they only touch the boundary slots, so the propagation
//! sweeps themselves are policy independent.

use rayon::prelude::*;

use crate::elementary::ElementaryMatrices;
use crate::extension::{AxisPad, BoundaryFix, PolicyFix};
use crate::grid::{BlockGrid, CarrySet};
use crate::mat::{self, Mat};
use crate::sweep::{col_fwd, col_rev, row_fwd, row_rev};
use crate::weights::Weights;

struct BlockCarries {
    p: Mat,
    e: Mat,
    pt: Mat,
    et: Mat,
    raw_v: Option<Mat>,
    raw_h: Option<Mat>,
}

/// Stage 1: extract the four carries of every block independently.
///
/// Under the constant policy the boundary slots are additionally seeded with
/// the replicated edge rows and columns of the image.
pub(crate) fn stage1(
    grid: &BlockGrid,
    carries: &mut CarrySet,
    elem: &ElementaryMatrices,
    weights: &Weights,
    fix: &BoundaryFix,
) {
    let (mb, nb) = (grid.m_blocks, grid.n_blocks);
    let r = elem.order;
    let b = elem.block_side;
    let with_raw = !carries.raw_v.is_empty();

    let extracted: Vec<BlockCarries> = (0..mb * nb)
        .into_par_iter()
        .map(|idx| {
            let (m, n) = (idx / nb, idx % nb);
            let mut block = grid.block(m, n);
            let zeros_v = Mat::zeros(r, b);
            let zeros_h = Mat::zeros(b, r);

            // raw reverse carry of the input, before any forward pass
            let raw_v = with_raw.then(|| {
                let mut tmp = block.clone();
                col_rev(&mut tmp, &zeros_v, weights);
                tmp.head(r)
            });

            col_fwd(&zeros_v, &mut block, weights);
            let p = block.tail(r);
            col_rev(&mut block, &zeros_v, weights);
            let e = block.head(r);
            // raw reverse-transposed carry of the vertically filtered block
            let raw_h = with_raw.then(|| block.mul(&elem.harb_t));
            row_fwd(&zeros_h, &mut block, weights);
            let pt = block.tail_cols(r);
            row_rev(&mut block, &zeros_h, weights);
            let et = block.head_cols(r);

            BlockCarries {
                p,
                e,
                pt,
                et,
                raw_v,
                raw_h,
            }
        })
        .collect();

    for (idx, extracted) in extracted.into_iter().enumerate() {
        let (m, n) = (idx / nb, idx % nb);
        let slot = carries.p_slot(m as isize, n);
        carries.p[slot] = extracted.p;
        let slot = carries.e_slot(m, n);
        carries.e[slot] = extracted.e;
        let slot = carries.pt_slot(m, n as isize);
        carries.pt[slot] = extracted.pt;
        let slot = carries.et_slot(m, n);
        carries.et[slot] = extracted.et;
        if let Some(raw) = extracted.raw_v {
            carries.raw_v[n * mb + m] = raw;
        }
        if let Some(raw) = extracted.raw_h {
            carries.raw_h[m * nb + n] = raw;
        }
    }

    if matches!(fix.policy, PolicyFix::Constant { .. }) {
        for n in 0..nb {
            let slot = carries.p_slot(-1, n);
            carries.p[slot] = grid.row_tile(0, n, r);
            let slot = carries.e_slot(mb, n);
            carries.e[slot] = grid.row_tile(grid.height - 1, n, r);
        }
        for m in 0..mb {
            let slot = carries.pt_slot(m, -1);
            carries.pt[slot] = grid.col_tile(0, m, r);
            let slot = carries.et_slot(m, nb);
            carries.et[slot] = grid.col_tile(grid.width - 1, m, r);
        }
    }
}

/// Stages 2-3: resolve the vertical carries column by column.
pub(crate) fn stage23(carries: &mut CarrySet, elem: &ElementaryMatrices, fix: &BoundaryFix) {
    let mb = carries.m_blocks;
    let slots = mb + 1;
    let pad = &fix.v_pad;

    match &fix.policy {
        PolicyFix::Zero => {
            carries
                .p
                .par_chunks_mut(slots)
                .zip_eq(carries.e.par_chunks_mut(slots))
                .for_each(|(p_col, e_col)| {
                    sweep_p(p_col, elem, mb);
                    let state = pad.phi_inv.mul(&p_col[mb]);
                    let zero_tail = Mat::zeros(e_col[mb].rows(), e_col[mb].cols());
                    e_col[mb] = grid_epilogue(&zero_tail, &state, pad);
                    sweep_e(p_col, e_col, elem, mb);
                });
        }
        PolicyFix::Constant {
            head_gain,
            tail_state,
            tail_tile,
            ..
        } => {
            carries
                .p
                .par_chunks_mut(slots)
                .zip_eq(carries.e.par_chunks_mut(slots))
                .for_each(|(p_col, e_col)| {
                    // boundary slots hold the replicated edge tiles
                    p_col[0] = head_gain.mul(&p_col[0]);
                    sweep_p(p_col, elem, mb);
                    let state = pad.phi_inv.mul(&p_col[mb]);
                    let mut tail = tail_state.mul(&state);
                    tail.add_assign(&tail_tile.mul(&e_col[mb]));
                    e_col[mb] = grid_epilogue(&tail, &state, pad);
                    sweep_e(p_col, e_col, elem, mb);
                });
        }
        PolicyFix::Periodic { v, .. } => {
            carries
                .p
                .par_chunks_mut(slots)
                .zip_eq(carries.e.par_chunks_mut(slots))
                .for_each(|(p_col, e_col)| {
                    // wrap-around fixpoint of the forward pass
                    let mut acc = Mat::zeros(p_col[0].rows(), p_col[0].cols());
                    for m in 0..mb {
                        acc = elem.abf.mul(&acc);
                        acc.add_assign(&p_col[m + 1]);
                    }
                    let z = pad.phi_inv.mul(&acc);
                    p_col[0] = v.head_solve.mul(&z);
                    sweep_p(p_col, elem, mb);

                    // wrap-around fixpoint of the reverse pass over the
                    // forward-filtered signal
                    let mut acc = Mat::zeros(e_col[0].rows(), e_col[0].cols());
                    for m in (0..mb).rev() {
                        acc = elem.abr.mul(&acc);
                        acc.add_assign(&e_col[m]);
                        acc.add_assign(&elem.harb_afp.mul(&p_col[m]));
                    }
                    let mut state = v.span.mul(&p_col[0]);
                    state.add_assign(&z);
                    let mut reverse_zero_start = acc;
                    reverse_zero_start.sub_assign(&v.tail_span.mul(&pad.psi.mul(&state)));
                    let tail = v.tail_solve.mul(&reverse_zero_start);
                    e_col[mb] = grid_epilogue(&tail, &state, pad);
                    sweep_e(p_col, e_col, elem, mb);
                });
        }
        PolicyFix::EvenPeriodic { v, tail_map, .. } => {
            carries
                .p
                .par_chunks_mut(slots)
                .zip_eq(carries.e.par_chunks_mut(slots))
                .zip_eq(carries.raw_v.par_chunks(mb))
                .for_each(|((p_col, e_col), raw_col)| {
                    let mut acc = Mat::zeros(p_col[0].rows(), p_col[0].cols());
                    for m in 0..mb {
                        acc = elem.abf.mul(&acc);
                        acc.add_assign(&p_col[m + 1]);
                    }
                    let z = pad.phi_inv.mul(&acc);

                    // raw reverse carry of the valid extent; trailing zero
                    // pads contribute nothing
                    let mut raw = Mat::zeros(p_col[0].rows(), p_col[0].cols());
                    for m in (0..mb).rev() {
                        raw = elem.abr.mul(&raw);
                        raw.add_assign(&raw_col[m]);
                    }

                    let mut head = v.span.mul(&z);
                    head.add_assign(&elem.exchange.mul(&raw));
                    p_col[0] = v.head_solve.mul(&head);
                    sweep_p(p_col, elem, mb);

                    let mut state = v.span.mul(&p_col[0]);
                    state.add_assign(&z);
                    let tail = tail_map.mul(&state);
                    e_col[mb] = grid_epilogue(&tail, &state, pad);
                    sweep_e(p_col, e_col, elem, mb);
                });
        }
    }
}

/// Stages 4-5: resolve the horizontal carries row by row, consuming the
/// resolved vertical carries.
pub(crate) fn stage45(
    carries: &mut CarrySet,
    elem: &ElementaryMatrices,
    fix: &BoundaryFix,
    width: usize,
) {
    let mb = carries.m_blocks;
    let nb = carries.n_blocks;
    let slots = nb + 1;
    let r = elem.order;
    let pad = &fix.h_pad;

    let p = &carries.p;
    let e = &carries.e;
    let pt = &mut carries.pt;
    let et = &mut carries.et;
    let raw_h = &carries.raw_h;

    match &fix.policy {
        PolicyFix::Zero => {
            pt.par_chunks_mut(slots)
                .zip_eq(et.par_chunks_mut(slots))
                .enumerate()
                .for_each(|(m, (pt_row, et_row))| {
                    incorporate_vertical(m, pt_row, et_row, p, e, elem, mb, nb);
                    sweep_pt(pt_row, elem, nb);
                    let state = pt_row[nb].mul(&pad.phi_inv);
                    let zero_tail = Mat::zeros(et_row[nb].rows(), et_row[nb].cols());
                    et_row[nb] = grid_epilogue_t(&zero_tail, &state, pad);
                    sweep_et(pt_row, et_row, elem, nb);
                });
        }
        PolicyFix::Constant {
            head_gain_t,
            tail_state_t,
            tail_tile_t,
            ..
        } => {
            let last_col = width - 1 - (nb - 1) * elem.block_side;
            pt.par_chunks_mut(slots)
                .zip_eq(et.par_chunks_mut(slots))
                .enumerate()
                .for_each(|(m, (pt_row, et_row))| {
                    incorporate_vertical(m, pt_row, et_row, p, e, elem, mb, nb);

                    // the horizontal extension replicates the vertically
                    // filtered edge column, rebuilt here from the raw tile
                    // and the resolved vertical carries of block column 0
                    let cnw = mat::tile_cols(&p[m].col(0), r);
                    let csw = mat::tile_cols(&e[m + 1].col(0), r);
                    let mut tile = elem.arb_afb.mul(&pt_row[0]);
                    tile.add_assign(&elem.arb_afp.mul(&cnw));
                    tile.add_assign(&elem.are.mul(&csw));
                    pt_row[0] = tile.mul(head_gain_t);
                    sweep_pt(pt_row, elem, nb);

                    let state = pt_row[nb].mul(&pad.phi_inv);
                    let cne = mat::tile_cols(&p[(nb - 1) * (mb + 1) + m].col(last_col), r);
                    let cse = mat::tile_cols(&e[(nb - 1) * (mb + 1) + m + 1].col(last_col), r);
                    let mut tile = elem.arb_afb.mul(&et_row[nb]);
                    tile.add_assign(&elem.arb_afp.mul(&cne));
                    tile.add_assign(&elem.are.mul(&cse));
                    let mut tail = tile.mul(tail_tile_t);
                    tail.add_assign(&state.mul(tail_state_t));
                    et_row[nb] = grid_epilogue_t(&tail, &state, pad);
                    sweep_et(pt_row, et_row, elem, nb);
                });
        }
        PolicyFix::Periodic { h, .. } => {
            pt.par_chunks_mut(slots)
                .zip_eq(et.par_chunks_mut(slots))
                .enumerate()
                .for_each(|(m, (pt_row, et_row))| {
                    incorporate_vertical(m, pt_row, et_row, p, e, elem, mb, nb);

                    let mut acc = Mat::zeros(pt_row[0].rows(), pt_row[0].cols());
                    for n in 0..nb {
                        acc = acc.mul(&elem.abf_t);
                        acc.add_assign(&pt_row[n + 1]);
                    }
                    let z = acc.mul(&pad.phi_inv);
                    pt_row[0] = z.mul(&h.head_solve);
                    sweep_pt(pt_row, elem, nb);

                    let mut acc = Mat::zeros(et_row[0].rows(), et_row[0].cols());
                    for n in (0..nb).rev() {
                        acc = acc.mul(&elem.abr_t);
                        acc.add_assign(&et_row[n]);
                        acc.add_assign(&pt_row[n].mul(&elem.harb_afp_t));
                    }
                    let mut state = pt_row[0].mul(&h.span);
                    state.add_assign(&z);
                    let mut reverse_zero_start = acc;
                    reverse_zero_start.sub_assign(&state.mul(&pad.psi).mul(&h.tail_span));
                    let tail = reverse_zero_start.mul(&h.tail_solve);
                    et_row[nb] = grid_epilogue_t(&tail, &state, pad);
                    sweep_et(pt_row, et_row, elem, nb);
                });
        }
        PolicyFix::EvenPeriodic { h, tail_map_t, .. } => {
            pt.par_chunks_mut(slots)
                .zip_eq(et.par_chunks_mut(slots))
                .zip_eq(raw_h.par_chunks(nb))
                .enumerate()
                .for_each(|(m, ((pt_row, et_row), raw_row))| {
                    let dz = incorporate_vertical(m, pt_row, et_row, p, e, elem, mb, nb);

                    let mut acc = Mat::zeros(pt_row[0].rows(), pt_row[0].cols());
                    for n in 0..nb {
                        acc = acc.mul(&elem.abf_t);
                        acc.add_assign(&pt_row[n + 1]);
                    }
                    let z = acc.mul(&pad.phi_inv);

                    // raw reverse carry of the vertically filtered row strip
                    let mut raw = Mat::zeros(pt_row[0].rows(), pt_row[0].cols());
                    for n in (0..nb).rev() {
                        raw = raw.mul(&elem.abr_t);
                        raw.add_assign(&raw_row[n]);
                        raw.add_assign(&dz[n].mul(&elem.harb_t));
                    }

                    let mut head = z.mul(&h.span);
                    head.add_assign(&raw.mul(&elem.exchange));
                    pt_row[0] = head.mul(&h.head_solve);
                    sweep_pt(pt_row, elem, nb);

                    let mut state = pt_row[0].mul(&h.span);
                    state.add_assign(&z);
                    let tail = state.mul(tail_map_t);
                    et_row[nb] = grid_epilogue_t(&tail, &state, pad);
                    sweep_et(pt_row, et_row, elem, nb);
                });
        }
    }
}

/// Stage 6: finalize every block with its neighbours' carries.
pub(crate) fn stage6(grid: &mut BlockGrid, carries: &CarrySet, weights: &Weights) {
    let b = grid.block_side;
    let nb = grid.n_blocks;
    let padded_width = grid.padded_width;

    grid.data
        .par_chunks_mut(b * padded_width)
        .enumerate()
        .for_each(|(m, strip)| {
            for n in 0..nb {
                let mut block = Mat::zeros(b, b);
                for i in 0..b {
                    let offset = i * padded_width + n * b;
                    block.as_slice_mut()[i * b..(i + 1) * b]
                        .copy_from_slice(&strip[offset..offset + b]);
                }

                col_fwd(carries.p(m as isize - 1, n), &mut block, weights);
                col_rev(&mut block, carries.e(m + 1, n), weights);
                row_fwd(carries.pt(m, n as isize - 1), &mut block, weights);
                row_rev(&mut block, carries.et(m, n + 1), weights);

                for i in 0..b {
                    let offset = i * padded_width + n * b;
                    strip[offset..offset + b]
                        .copy_from_slice(&block.as_slice()[i * b..(i + 1) * b]);
                }
            }
        });
}

/// Fold the resolved vertical carries of block row `m` into the stage-1
/// horizontal carries, returning the per-block correction dz.
fn incorporate_vertical(
    m: usize,
    pt_row: &mut [Mat],
    et_row: &mut [Mat],
    p: &[Mat],
    e: &[Mat],
    elem: &ElementaryMatrices,
    mb: usize,
    nb: usize,
) -> Vec<Mat> {
    let mut corrections = Vec::with_capacity(nb);
    for n in 0..nb {
        let p_prev = &p[n * (mb + 1) + m];
        let e_next = &e[n * (mb + 1) + m + 1];
        let mut dz = elem.arb_afp.mul(p_prev);
        dz.add_assign(&elem.are.mul(e_next));
        pt_row[n + 1].add_assign(&dz.mul(&elem.tafb_t));
        et_row[n].add_assign(&dz.mul(&elem.harb_afb_t));
        corrections.push(dz);
    }
    corrections
}

/// Forward propagation sweep over one column of P carries.
fn sweep_p(p_col: &mut [Mat], elem: &ElementaryMatrices, mb: usize) {
    for m in 0..mb {
        let product = elem.abf.mul(&p_col[m]);
        p_col[m + 1].add_assign(&product);
    }
}

/// Reverse propagation sweep over one column of E carries.
fn sweep_e(p_col: &[Mat], e_col: &mut [Mat], elem: &ElementaryMatrices, mb: usize) {
    for m in (0..mb).rev() {
        let mut update = elem.harb_afp.mul(&p_col[m]);
        update.add_assign(&elem.abr.mul(&e_col[m + 1]));
        e_col[m].add_assign(&update);
    }
}

/// Forward propagation sweep over one row of Pt carries.
fn sweep_pt(pt_row: &mut [Mat], elem: &ElementaryMatrices, nb: usize) {
    for n in 0..nb {
        let product = pt_row[n].mul(&elem.abf_t);
        pt_row[n + 1].add_assign(&product);
    }
}

/// Reverse propagation sweep over one row of Et carries.
fn sweep_et(pt_row: &[Mat], et_row: &mut [Mat], elem: &ElementaryMatrices, nb: usize) {
    for n in (0..nb).rev() {
        let mut update = pt_row[n].mul(&elem.harb_afp_t);
        update.add_assign(&et_row[n + 1].mul(&elem.abr_t));
        et_row[n].add_assign(&update);
    }
}

/// Convert a true epilogue at the valid edge into the grid boundary slot
/// that delivers it there through the zero pad.
fn grid_epilogue(tail: &Mat, state: &Mat, pad: &AxisPad) -> Mat {
    let mut adjusted = tail.clone();
    adjusted.sub_assign(&pad.psi.mul(state));
    pad.unpad.mul(&adjusted)
}

/// Transposed counterpart of [`grid_epilogue`] for the horizontal axis.
fn grid_epilogue_t(tail: &Mat, state: &Mat, pad: &AxisPad) -> Mat {
    let mut adjusted = tail.clone();
    adjusted.sub_assign(&state.mul(&pad.psi));
    adjusted.mul(&pad.unpad)
}
