//! Naive reference implementation: extend the signal explicitly, run the
//! sequential recurrences, keep the valid extent.
#![allow(dead_code)]

use recfilter_engine::{Extension, Weights};

/// Margin of extended samples on each side for the non-zero policies. The
/// slowest pole in the test suite decays far below 1e-14 over this span.
const MARGIN: usize = 2048;

fn ext_index(global: isize, len: usize, extension: Extension) -> usize {
    let len_i = len as isize;
    match extension {
        Extension::Zero => unreachable!("zero extension uses no margin"),
        Extension::Constant => global.clamp(0, len_i - 1) as usize,
        Extension::Periodic => global.rem_euclid(len_i) as usize,
        Extension::EvenPeriodic => {
            let phase = global.rem_euclid(2 * len_i);
            if phase < len_i {
                phase as usize
            } else {
                (2 * len_i - 1 - phase) as usize
            }
        }
    }
}

fn forward_in_place(data: &mut [f64], weights: &Weights) {
    let b0 = weights.feedforward();
    let feedback = weights.feedback();
    for j in 0..data.len() {
        let mut acc = b0 * data[j];
        for (k, a) in feedback.iter().enumerate() {
            let k = k + 1;
            if j >= k {
                acc -= a * data[j - k];
            }
        }
        data[j] = acc;
    }
}

fn reverse_in_place(data: &mut [f64], weights: &Weights) {
    let b0 = weights.feedforward();
    let feedback = weights.feedback();
    for j in (0..data.len()).rev() {
        let mut acc = b0 * data[j];
        for (k, a) in feedback.iter().enumerate() {
            let k = k + 1;
            if j + k < data.len() {
                acc -= a * data[j + k];
            }
        }
        data[j] = acc;
    }
}

fn filter_1d(data: &[f64], weights: &Weights, extension: Extension) -> Vec<f64> {
    match extension {
        Extension::Zero => {
            let mut out = data.to_vec();
            forward_in_place(&mut out, weights);
            reverse_in_place(&mut out, weights);
            out
        }
        _ => {
            let len = data.len();
            let mut ext: Vec<f64> = (0..len + 2 * MARGIN)
                .map(|i| data[ext_index(i as isize - MARGIN as isize, len, extension)])
                .collect();
            forward_in_place(&mut ext, weights);
            reverse_in_place(&mut ext, weights);
            ext[MARGIN..MARGIN + len].to_vec()
        }
    }
}

/// Filter every column then every row of a (height x width) image.
pub fn naive_filter(
    img: &[f64],
    height: usize,
    width: usize,
    weights: &Weights,
    extension: Extension,
) -> Vec<f64> {
    let mut out = vec![0.0; height * width];

    for c in 0..width {
        let column: Vec<f64> = (0..height).map(|r| img[r * width + c]).collect();
        let filtered = filter_1d(&column, weights, extension);
        for (r, v) in filtered.iter().enumerate() {
            out[r * width + c] = *v;
        }
    }

    for r in 0..height {
        let filtered = filter_1d(&out[r * width..(r + 1) * width], weights, extension);
        out[r * width..(r + 1) * width].copy_from_slice(&filtered);
    }

    out
}

/// Largest absolute difference between two buffers.
pub fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .fold(0.0, |acc, (x, y)| acc.max((x - y).abs()))
}
