//! Global properties of the filter: determinism, identity limit, policy
//! agreement away from boundaries.

mod common;

use common::max_abs_diff;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use recfilter_engine::{filter, Extension, FilterError, Weights};
use recfilter_image::{Image, ImageSize};

fn random_image(width: usize, height: usize, seed: u64) -> Image<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = (0..width * height).map(|_| rng.gen_range(-1.0..1.0)).collect();
    Image::new(ImageSize { width, height }, data).unwrap()
}

#[test]
fn test_determinism() -> Result<(), FilterError> {
    let src = random_image(50, 33, 11);
    let weights = Weights::second_order(2.0)?;

    let mut first = Image::from_size_val(src.size(), 0.0)?;
    filter(&src, &mut first, &weights, 16, Extension::EvenPeriodic)?;
    let mut second = Image::from_size_val(src.size(), 0.0)?;
    filter(&src, &mut second, &weights, 16, Extension::EvenPeriodic)?;

    for (a, b) in first.as_slice().iter().zip(second.as_slice().iter()) {
        assert_eq!(a.to_bits(), b.to_bits());
    }
    Ok(())
}

#[test]
fn test_vanishing_sigma_approaches_identity() -> Result<(), FilterError> {
    let src = random_image(9, 9, 5);
    for order in [1, 2] {
        let weights = Weights::gaussian(0.01, order)?;
        let mut dst = Image::from_size_val(src.size(), 0.0)?;
        filter(&src, &mut dst, &weights, 4, Extension::Zero)?;
        assert!(max_abs_diff(dst.as_slice(), src.as_slice()) < 1e-9);
    }
    Ok(())
}

#[test]
fn test_policies_agree_in_the_interior() -> Result<(), FilterError> {
    // far from the boundary the extension choice is irrelevant
    let src = random_image(64, 64, 23);
    let weights = Weights::second_order(1.0)?;

    let mut outputs = Vec::new();
    for extension in [
        Extension::Zero,
        Extension::Constant,
        Extension::Periodic,
        Extension::EvenPeriodic,
    ] {
        let mut dst = Image::from_size_val(src.size(), 0.0)?;
        filter(&src, &mut dst, &weights, 16, extension)?;
        outputs.push(dst.into_vec());
    }

    for other in &outputs[1..] {
        for row in 28..36 {
            for col in 28..36 {
                let idx = row * 64 + col;
                assert!((outputs[0][idx] - other[idx]).abs() < 1e-10);
            }
        }
    }
    Ok(())
}

#[test]
fn test_constant_extension_preserves_flat_image() -> Result<(), FilterError> {
    // a constant image filtered with edge replication stays constant
    let size = ImageSize {
        width: 21,
        height: 13,
    };
    let src = Image::from_size_val(size, 3.5)?;
    let weights = Weights::second_order(2.0)?;
    let mut dst = Image::from_size_val(size, 0.0)?;
    filter(&src, &mut dst, &weights, 8, Extension::Constant)?;
    for v in dst.as_slice() {
        assert!((v - 3.5).abs() < 1e-9);
    }
    Ok(())
}

#[test]
fn test_cascade_weights_run_through_filter() -> Result<(), FilterError> {
    let src = random_image(16, 16, 2);
    let weights = Weights::cascade(16, 4)?;
    let mut dst = Image::from_size_val(src.size(), 0.0)?;
    filter(&src, &mut dst, &weights, 8, Extension::Zero)?;
    assert!(dst.as_slice().iter().all(|v| v.is_finite()));
    Ok(())
}
