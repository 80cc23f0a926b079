use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SurrogateError {
    #[error("Need at least one sample and one feature, got {samples} x {features}")]
    Empty { samples: usize, features: usize },
    #[error("Sample count mismatch: {x} rows, {y} targets, {weights} weights")]
    Mismatch { x: usize, y: usize, weights: usize },
    #[error("Normal equations are not positive definite")]
    Singular,
}

#[derive(Debug, Clone)]
pub struct RidgeFit {
    pub coefficients: Array1<f64>,
    pub intercept: f64,
    /// Weighted coefficient of determination on the training samples.
    pub score: f64,
}

impl RidgeFit {
    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        x.dot(&self.coefficients) + self.intercept
    }
}

/// Random on/off superpixel vectors. Row 0 is the unperturbed image.
pub fn sample_presence<R: Rng>(num_features: usize, num_samples: usize, rng: &mut R) -> Array2<f64> {
    let mut presence =
        Array2::from_shape_simple_fn((num_samples, num_features), || {
            if rng.random_bool(0.5) {
                1.0
            } else {
                0.0
            }
        });
    if num_samples > 0 {
        presence.row_mut(0).fill(1.0);
    }
    presence
}

/// `sqrt(exp(-d^2 / width^2))` over the cosine distance of each row to the
/// all-ones row. An all-zero row is at distance 1.
pub fn kernel_weights(presence: &Array2<f64>, kernel_width: f64) -> Array1<f64> {
    let ones_norm = (presence.ncols() as f64).sqrt();
    presence
        .axis_iter(Axis(0))
        .map(|row| {
            let norm = row.dot(&row).sqrt();
            let distance = if norm == 0.0 || ones_norm == 0.0 {
                1.0
            } else {
                1.0 - row.sum() / (norm * ones_norm)
            };
            (-(distance * distance) / (kernel_width * kernel_width))
                .exp()
                .sqrt()
        })
        .collect()
}

/// Ridge regression with an unpenalized intercept, samples weighted by `weights`.
pub fn weighted_ridge(
    x: &Array2<f64>,
    y: &Array1<f64>,
    weights: &Array1<f64>,
    alpha: f64,
) -> Result<RidgeFit, SurrogateError> {
    let (samples, features) = x.dim();
    if samples == 0 || features == 0 {
        return Err(SurrogateError::Empty { samples, features });
    }
    if y.len() != samples || weights.len() != samples {
        return Err(SurrogateError::Mismatch {
            x: samples,
            y: y.len(),
            weights: weights.len(),
        });
    }

    let weight_sum = weights.sum();
    if weight_sum <= 0.0 {
        return Err(SurrogateError::Singular);
    }

    let x_offset = weights.dot(x) / weight_sum;
    let y_offset = weights.dot(y) / weight_sum;

    let sqrt_w = weights.mapv(f64::sqrt);
    let xc = (x - &x_offset) * &sqrt_w.view().insert_axis(Axis(1));
    let yc = (y - y_offset) * &sqrt_w;

    let mut gram = xc.t().dot(&xc);
    for i in 0..features {
        gram[[i, i]] += alpha;
    }
    let rhs = xc.t().dot(&yc);

    let coefficients = cholesky_solve(&gram, &rhs).ok_or(SurrogateError::Singular)?;
    let intercept = y_offset - x_offset.dot(&coefficients);

    let mut fit = RidgeFit {
        coefficients,
        intercept,
        score: 0.0,
    };
    fit.score = weighted_r2(y, &fit.predict(x), weights);
    Ok(fit)
}

/// Up to `k` feature indices with positive weight, strongest first.
pub fn top_positive_features(coefficients: &Array1<f64>, k: usize) -> Vec<usize> {
    let mut ranked: Vec<(usize, f64)> = coefficients.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
    ranked
        .into_iter()
        .filter(|&(_, w)| w > 0.0)
        .take(k)
        .map(|(i, _)| i)
        .collect()
}

fn weighted_r2(y: &Array1<f64>, predicted: &Array1<f64>, weights: &Array1<f64>) -> f64 {
    let mean = weights.dot(y) / weights.sum();
    let residual: f64 = ((y - predicted).mapv(|r| r * r) * weights).sum();
    let total: f64 = (y.mapv(|v| (v - mean).powi(2)) * weights).sum();
    if total == 0.0 {
        if residual == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - residual / total
    }
}

/// Solves `a * x = b` for symmetric positive definite `a`.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[[i, i]] = sum.sqrt();
            } else {
                l[[i, j]] = sum / l[[j, j]];
            }
        }
    }

    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let s: f64 = (0..i).map(|k| l[[i, k]] * z[k]).sum();
        z[i] = (b[i] - s) / l[[i, i]];
    }

    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let s: f64 = (i + 1..n).map(|k| l[[k, i]] * x[k]).sum();
        x[i] = (z[i] - s) / l[[i, i]];
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2};
    use rand::{rngs::StdRng, SeedableRng};

    /// Every on/off combination of three features, twice over.
    fn design() -> Array2<f64> {
        let rows: Vec<f64> = (0..16)
            .flat_map(|i| (0..3).map(move |bit| ((i % 8) >> bit & 1) as f64))
            .collect();
        Array2::from_shape_vec((16, 3), rows).unwrap()
    }

    #[test]
    fn test_sampling_keeps_original_first() {
        let mut rng = StdRng::seed_from_u64(7);
        let presence = sample_presence(12, 200, &mut rng);

        assert_eq!(presence.dim(), (200, 12));
        assert!(presence.row(0).iter().all(|&v| v == 1.0));
        assert!(presence.iter().all(|&v| v == 0.0 || v == 1.0));
        let on = presence.sum() / presence.len() as f64;
        assert!(on > 0.4 && on < 0.6);
    }

    #[test]
    fn test_sampling_is_reproducible_with_seed() {
        let a = sample_presence(5, 20, &mut StdRng::seed_from_u64(42));
        let b = sample_presence(5, 20, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_kernel_weights() {
        let presence = arr2(&[[1.0, 1.0, 1.0, 1.0], [0.0, 0.0, 0.0, 0.0], [1.0, 0.0, 0.0, 0.0]]);
        let weights = kernel_weights(&presence, 0.25);

        assert!((weights[0] - 1.0).abs() < 1e-12);
        assert!((weights[1] - (-8.0f64).exp()).abs() < 1e-12);
        // cosine distance 1 - sqrt(1/4) = 0.5
        assert!((weights[2] - (-2.0f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_ridge_recovers_linear_relationship() {
        let x = design();
        let y = x.dot(&arr1(&[0.5, -0.3, 0.0])) + 0.1;
        let weights = Array1::ones(16);

        let fit = weighted_ridge(&x, &y, &weights, 1e-8).unwrap();

        assert!((fit.coefficients[0] - 0.5).abs() < 1e-4);
        assert!((fit.coefficients[1] + 0.3).abs() < 1e-4);
        assert!(fit.coefficients[2].abs() < 1e-4);
        assert!((fit.intercept - 0.1).abs() < 1e-4);
        assert!(fit.score > 0.999);
    }

    #[test]
    fn test_ridge_penalty_shrinks_weights() {
        let x = design();
        let y = x.dot(&arr1(&[1.0, 0.0, 0.0]));
        let weights = Array1::ones(16);

        let loose = weighted_ridge(&x, &y, &weights, 1e-6).unwrap();
        let tight = weighted_ridge(&x, &y, &weights, 10.0).unwrap();
        assert!(tight.coefficients[0] < loose.coefficients[0]);
        assert!(tight.coefficients[0] > 0.0);
    }

    #[test]
    fn test_ridge_rejects_bad_shapes() {
        let x = design();
        let y = Array1::zeros(3);
        let weights = Array1::ones(16);
        assert!(matches!(
            weighted_ridge(&x, &y, &weights, 1.0),
            Err(SurrogateError::Mismatch { .. })
        ));
    }

    #[test]
    fn test_top_positive_features() {
        let coefficients = arr1(&[0.2, -0.9, 0.5, 0.0, 0.05]);
        assert_eq!(top_positive_features(&coefficients, 2), vec![2, 0]);
        assert_eq!(top_positive_features(&coefficients, 10), vec![2, 0, 4]);
        assert!(top_positive_features(&arr1(&[-1.0, -0.5]), 5).is_empty());
    }
}
