use crate::error::FilterError;

/// Real pole of the Gaussian z-transform approximation used by the
/// first-order constructor.
const POLE_REAL: f64 = 1.86543;

/// Complex pole (real and imaginary parts) used by the second-order
/// constructor.
const POLE_COMPLEX_RE: f64 = 1.41650;
const POLE_COMPLEX_IM: f64 = 1.00829;

/// Recursive filter weights (b0, a1, .., ar).
///
/// `feedforward` scales the input sample; `feedback` holds the r feedback
/// taps subtracted from previous (forward sweep) or next (reverse sweep)
/// outputs. Weights are immutable after construction and shared by both the
/// row and column passes.
#[derive(Debug, Clone, PartialEq)]
pub struct Weights {
    feedforward: f64,
    feedback: Vec<f64>,
}

impl Weights {
    /// Create weights from an explicit coefficient tuple.
    ///
    /// # Arguments
    ///
    /// * `feedforward` - The b0 coefficient, must be nonzero.
    /// * `feedback` - The a1..ar feedback taps, at least one.
    ///
    /// # Errors
    ///
    /// Returns `InvalidWeights` when b0 is zero or not finite, or when no
    /// feedback tap is given.
    pub fn new(feedforward: f64, feedback: Vec<f64>) -> Result<Self, FilterError> {
        if feedback.is_empty() {
            return Err(FilterError::InvalidWeights(
                "at least one feedback coefficient is required".to_string(),
            ));
        }
        if feedforward == 0.0 || !feedforward.is_finite() {
            return Err(FilterError::InvalidWeights(format!(
                "feedforward coefficient must be finite and nonzero, got {feedforward}"
            )));
        }
        if feedback.iter().any(|a| !a.is_finite()) {
            return Err(FilterError::InvalidWeights(
                "feedback coefficients must be finite".to_string(),
            ));
        }
        Ok(Self {
            feedforward,
            feedback,
        })
    }

    /// First-order weights approximating a Gaussian of scale `sigma`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidWeights` when `sigma` is not finite and positive.
    pub fn first_order(sigma: f64) -> Result<Self, FilterError> {
        let q = interpolation_q(sigma)?;
        let d = POLE_REAL.powf(1.0 / q);
        let b0 = -(1.0 - d) / d;
        let a1 = -1.0 / d;
        Weights::new(b0, vec![a1])
    }

    /// Second-order weights approximating a Gaussian of scale `sigma`.
    ///
    /// The complex pole is raised to the power 1/q in polar form.
    ///
    /// # Errors
    ///
    /// Returns `InvalidWeights` when `sigma` is not finite and positive.
    pub fn second_order(sigma: f64) -> Result<Self, FilterError> {
        let q = interpolation_q(sigma)?;
        let modulus = POLE_COMPLEX_RE.hypot(POLE_COMPLEX_IM).powf(1.0 / q);
        let argument = POLE_COMPLEX_IM.atan2(POLE_COMPLEX_RE) / q;
        let re = modulus * argument.cos();
        let n2 = modulus * modulus;
        let b0 = (1.0 - 2.0 * re + n2) / n2;
        let a1 = -2.0 * re / n2;
        let a2 = 1.0 / n2;
        Weights::new(b0, vec![a1, a2])
    }

    /// Gaussian weights of the requested order (1 or 2).
    ///
    /// # Errors
    ///
    /// Returns `InvalidWeights` for unsupported orders or invalid `sigma`.
    pub fn gaussian(sigma: f64, order: usize) -> Result<Self, FilterError> {
        match order {
            1 => Weights::first_order(sigma),
            2 => Weights::second_order(sigma),
            _ => Err(FilterError::InvalidWeights(format!(
                "gaussian weights support orders 1 and 2, got {order}"
            ))),
        }
    }

    /// Second-order section for a k-fold cascade approximation of length `n`.
    ///
    /// Uses the damped-cosine pole placement rho = (eps sin theta)^(1/(k n))
    /// with eps = 1e-4 and theta = 1.2. Unlike the Gaussian constructors the
    /// section is not normalized to unit DC gain; callers opt in knowingly.
    ///
    /// # Errors
    ///
    /// Returns `InvalidWeights` when `n` or `k` is zero.
    pub fn cascade(n: usize, k: usize) -> Result<Self, FilterError> {
        const EPS: f64 = 1e-4;
        const THETA: f64 = 1.2;
        if n == 0 || k == 0 {
            return Err(FilterError::InvalidWeights(
                "cascade length and repetition count must be positive".to_string(),
            ));
        }
        let rho = (EPS * THETA.sin()).powf(1.0 / (k * n) as f64);
        let a1 = -2.0 * rho * THETA.cos();
        let a2 = rho * rho;
        Weights::new(1.0, vec![a1, a2])
    }

    /// The filter order r (number of feedback taps).
    pub fn order(&self) -> usize {
        self.feedback.len()
    }

    /// The b0 feedforward coefficient.
    pub fn feedforward(&self) -> f64 {
        self.feedforward
    }

    /// The a1..ar feedback taps.
    pub fn feedback(&self) -> &[f64] {
        &self.feedback
    }
}

/// Pole interpolation exponent q for the Gaussian scale `sigma`.
fn interpolation_q(sigma: f64) -> Result<f64, FilterError> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(FilterError::InvalidWeights(format!(
            "sigma must be finite and positive, got {sigma}"
        )));
    }
    Ok(0.00399341 + 0.4715161 * sigma)
}
