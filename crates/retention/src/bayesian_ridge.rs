use serde::Serialize;

use crate::{Point, errors::FitFailure};

// NOTE: The Gamma priors are uninformative, so the regularisation comes from maximising the evidence
const DEFAULT_MAX_ITER: usize = 300;
const DEFAULT_TOLERANCE: f64 = 1e-3;
const DEFAULT_GAMMA_PRIOR: f64 = 1e-6;
pub(crate) const MIN_POINTS: usize = 2;

/// A fitted `retention_time = slope * log_p + intercept` line
#[derive(Copy, Clone, PartialEq, Debug, Serialize)]
pub struct LinearModel {
    pub slope: f64,
    pub intercept: f64,
    /// The learned precision of the noise
    pub alpha: f64,
    /// The learned precision of the slope; larger values mean stronger shrinkage
    pub lambda: f64,
}

impl LinearModel {
    #[must_use]
    pub fn predict(&self, log_p: f64) -> f64 {
        self.slope.mul_add(log_p, self.intercept)
    }
}

/// A single-feature ridge regression whose penalty is learned from the data by maximising the marginal likelihood
///
/// The penalty relative to the noise (`lambda / alpha`) ends up large when a handful of points can't pin the slope
/// down, and negligible once there are enough of them, so small groups are shrunk far harder than large ones.
#[derive(Copy, Clone, Debug)]
pub struct BayesianRidge {
    max_iter: usize,
    tolerance: f64,
    alpha_shape: f64,
    alpha_rate: f64,
    lambda_shape: f64,
    lambda_rate: f64,
}

impl Default for BayesianRidge {
    fn default() -> Self {
        Self {
            max_iter: DEFAULT_MAX_ITER,
            tolerance: DEFAULT_TOLERANCE,
            alpha_shape: DEFAULT_GAMMA_PRIOR,
            alpha_rate: DEFAULT_GAMMA_PRIOR,
            lambda_shape: DEFAULT_GAMMA_PRIOR,
            lambda_rate: DEFAULT_GAMMA_PRIOR,
        }
    }
}

impl BayesianRidge {
    /// # Errors
    ///
    /// Fails when there are fewer than two points, when any value is non-finite, or when every point shares the same
    /// log P
    pub fn fit(&self, points: &[Point]) -> Result<LinearModel, FitFailure> {
        let n = points.len();
        if n < MIN_POINTS {
            return Err(FitFailure::TooFewAnchors {
                found: n,
                required: MIN_POINTS,
            });
        }
        if points
            .iter()
            .any(|p| !p.log_p.is_finite() || !p.retention_time.is_finite())
        {
            return Err(FitFailure::NonFinite);
        }

        #[allow(clippy::cast_precision_loss)]
        let n_f = n as f64;
        let x_mean = points.iter().map(|p| p.log_p).sum::<f64>() / n_f;
        let y_mean = points.iter().map(|p| p.retention_time).sum::<f64>() / n_f;
        let centered: Vec<_> = points
            .iter()
            .map(|p| (p.log_p - x_mean, p.retention_time - y_mean))
            .collect();

        let sxx: f64 = centered.iter().map(|(x, _)| x * x).sum();
        let sxy: f64 = centered.iter().map(|(x, y)| x * y).sum();
        let syy: f64 = centered.iter().map(|(_, y)| y * y).sum();
        if sxx <= f64::EPSILON {
            return Err(FitFailure::ZeroVariance);
        }

        let sum_squared_error =
            |slope: f64| -> f64 { centered.iter().map(|(x, y)| (y - slope * x).powi(2)).sum() };

        let mut alpha = 1.0 / (syy / n_f + f64::EPSILON);
        let mut lambda = 1.0;
        let mut previous_slope = None;
        for _ in 0..self.max_iter {
            let slope = sxy / (sxx + lambda / alpha);
            let sse = sum_squared_error(slope);

            // NOTE: `gamma` is the effective number of parameters the data actually determines
            let gamma = alpha * sxx / alpha.mul_add(sxx, lambda);
            lambda = (gamma + 2.0 * self.lambda_shape) / slope.mul_add(slope, 2.0 * self.lambda_rate);
            alpha = (n_f - gamma + 2.0 * self.alpha_shape) / (sse + 2.0 * self.alpha_rate);

            if previous_slope.is_some_and(|previous: f64| (previous - slope).abs() < self.tolerance) {
                break;
            }
            previous_slope = Some(slope);
        }

        let slope = sxy / (sxx + lambda / alpha);
        let intercept = slope.mul_add(-x_mean, y_mean);
        if !slope.is_finite() || !intercept.is_finite() {
            return Err(FitFailure::NonFinite);
        }

        Ok(LinearModel {
            slope,
            intercept,
            alpha,
            lambda,
        })
    }
}

// Module Tests ========================================================================================================
