use tracing::debug;

use crate::{BayesianRidge, Point, errors::FitFailure};

/// The coefficient of determination of `predicted` against `actual`
///
/// # Errors
///
/// Fails with `ConstantRetention` when `actual` has no variance, since R² is undefined there
pub fn r_squared(actual: &[f64], predicted: &[f64]) -> Result<f64, FitFailure> {
    debug_assert_eq!(actual.len(), predicted.len());
    if actual.is_empty() {
        return Err(FitFailure::TooFewAnchors {
            found: 0,
            required: 1,
        });
    }

    #[allow(clippy::cast_precision_loss)]
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let total: f64 = actual.iter().map(|y| (y - mean).powi(2)).sum();
    let residual: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p).powi(2))
        .sum();

    if total <= f64::EPSILON {
        return Err(FitFailure::ConstantRetention);
    }
    Ok(1.0 - residual / total)
}

/// Leave-one-out R²: every point is predicted by a model that never saw it, and R² is computed over those
/// out-of-sample predictions
///
/// # Errors
///
/// Fails if any of the folds can't be fitted (for example, if holding a point out leaves every remaining log P equal)
pub fn leave_one_out(ridge: &BayesianRidge, points: &[Point]) -> Result<f64, FitFailure> {
    let mut predicted = Vec::with_capacity(points.len());
    let mut training = Vec::with_capacity(points.len().saturating_sub(1));
    for (held_out, point) in points.iter().enumerate() {
        training.clear();
        training.extend(
            points
                .iter()
                .enumerate()
                .filter_map(|(i, &p)| (i != held_out).then_some(p)),
        );

        let model = ridge.fit(&training).map_err(|failure| {
            debug!(held_out, %failure, "leave-one-out fold failed");
            FitFailure::DegenerateFold { held_out }
        })?;
        predicted.push(model.predict(point.log_p));
    }

    let actual: Vec<_> = points.iter().map(|p| p.retention_time).collect();
    r_squared(&actual, &predicted)
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use assert_float_eq::assert_float_absolute_eq;

    use super::*;

    fn points(data: &[(f64, f64)]) -> Vec<Point> {
        data.iter()
            .map(|&(log_p, retention_time)| Point::new(log_p, retention_time))
            .collect()
    }

    fn training_r2(points: &[Point]) -> f64 {
        let model = BayesianRidge::default().fit(points).unwrap();
        let actual: Vec<_> = points.iter().map(|p| p.retention_time).collect();
        let predicted: Vec<_> = points.iter().map(|p| model.predict(p.log_p)).collect();
        r_squared(&actual, &predicted).unwrap()
    }

    #[test]
    fn r_squared_basics() {
        assert_float_absolute_eq!(
            r_squared(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap(),
            1.0,
            1e-12
        );
        // Predicting the mean everywhere explains nothing
        assert_float_absolute_eq!(
            r_squared(&[1.0, 2.0, 3.0], &[2.0, 2.0, 2.0]).unwrap(),
            0.0,
            1e-12
        );
        // Doing worse than the mean goes negative
        assert!(r_squared(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap() < 0.0);
        assert_eq!(
            r_squared(&[5.0, 5.0], &[5.0, 5.0]),
            Err(FitFailure::ConstantRetention)
        );
    }

    #[test]
    fn small_groups_collapse_out_of_sample() {
        // Two nearly coincident anchors and one far away: the line through all three fits beautifully, but no
        // two-point model can predict the third
        let anchors = points(&[(1.0, 8.0), (1.1, 8.2), (5.0, 12.0)]);
        let training = training_r2(&anchors);
        let validation = leave_one_out(&BayesianRidge::default(), &anchors).unwrap();
        assert!(training >= 0.9, "training R² was {training}");
        assert!(validation <= 0.2, "validation R² was {validation}");
        assert_float_absolute_eq!(validation, -0.576_201, 1e-4);
    }

    #[test]
    fn large_groups_converge() {
        let anchors: Vec<_> = (0..20)
            .map(|i| {
                let log_p = f64::from(i) * 5.0 / 19.0;
                // A small, deterministic wobble around a true line
                let wobble = [0.08, -0.05, 0.02, -0.09, 0.04][i as usize % 5];
                Point::new(log_p, 2.0f64.mul_add(log_p, 8.0) + wobble)
            })
            .collect();
        let training = training_r2(&anchors);
        let validation = leave_one_out(&BayesianRidge::default(), &anchors).unwrap();
        assert!((training - validation).abs() < 0.05);
        assert!(validation > 0.99);
    }

    #[test]
    fn degenerate_folds_are_reported() {
        // Holding out the only distinct log P leaves a zero-variance fold
        let anchors = points(&[(1.0, 8.0), (1.0, 8.1), (2.0, 9.0)]);
        assert_eq!(
            leave_one_out(&BayesianRidge::default(), &anchors),
            Err(FitFailure::DegenerateFold { held_out: 2 })
        );
    }
}
