// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! Closed-form ridge regression.
//!
//! Given design matrix `H` (N × D) and targets `Y` (N × K):
//!
//! `W = (Hcᵀ·Hc + λI)⁻¹ · Hcᵀ · Yc`,  `b = ȳ − W·h̄`
//!
//! where `Hc`, `Yc` are the column-centred matrices. Centring absorbs the
//! bias without an augmented constant column, and leaves the bias
//! unregularised. Solved via Cholesky in f64, with an SVD fallback when
//! rounding leaves a regularised system numerically singular.

use nalgebra::{DMatrix, SVD};
use tracing::debug;

use crate::error::LinalgError;

/// Trained readout parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RidgeSolution {
    /// Row-major `K × D`: `weights[k * input_dim + d]`
    pub weights: Vec<f32>,
    /// Length `K`
    pub bias: Vec<f32>,
    pub input_dim: usize,
    pub output_dim: usize,
}

impl RidgeSolution {
    /// `W · x + b`
    pub fn predict(&self, x: &[f32]) -> Vec<f32> {
        let mut out = self.bias.clone();
        for (k, acc) in out.iter_mut().enumerate() {
            let row = &self.weights[k * self.input_dim..(k + 1) * self.input_dim];
            for (w, v) in row.iter().zip(x) {
                *acc += w * v;
            }
        }
        out
    }
}

/// Ridge regression with regularisation strength `lambda`.
#[derive(Debug, Clone)]
pub struct RidgeRegression {
    pub lambda: f64,
}

impl RidgeRegression {
    pub fn new(lambda: f64) -> Self {
        Self { lambda }
    }

    /// Fit `W`, `b` from paired rows.
    ///
    /// Every state row must have the same width (taken from the first row)
    /// and likewise for targets. With `lambda > 0` the system is solvable
    /// for any number of rows, including fewer rows than columns and
    /// collinear columns.
    pub fn train(&self, states: &[Vec<f32>], targets: &[Vec<f32>]) -> Result<RidgeSolution, LinalgError> {
        if states.is_empty() {
            return Err(LinalgError::Empty);
        }
        if states.len() != targets.len() {
            return Err(LinalgError::DimensionMismatch {
                context: "target rows",
                expected: states.len(),
                actual: targets.len(),
            });
        }

        let n = states.len();
        let d = states[0].len();
        let k = targets[0].len();
        for s in states {
            if s.len() != d {
                return Err(LinalgError::DimensionMismatch {
                    context: "design row width",
                    expected: d,
                    actual: s.len(),
                });
            }
        }
        for t in targets {
            if t.len() != k {
                return Err(LinalgError::DimensionMismatch {
                    context: "target row width",
                    expected: k,
                    actual: t.len(),
                });
            }
        }
        let n_f = n as f64;

        // Means for centering
        let mut state_mean = vec![0.0f64; d];
        let mut target_mean = vec![0.0f64; k];
        for s in states {
            for (m, &v) in state_mean.iter_mut().zip(s) {
                *m += v as f64;
            }
        }
        for t in targets {
            for (m, &v) in target_mean.iter_mut().zip(t) {
                *m += v as f64;
            }
        }
        state_mean.iter_mut().for_each(|m| *m /= n_f);
        target_mean.iter_mut().for_each(|m| *m /= n_f);

        // Hcᵀ·Hc (D × D, symmetric) and Hcᵀ·Yc (D × K)
        let mut hth = vec![0.0f64; d * d];
        let mut hty = vec![0.0f64; d * k];
        let mut centred = vec![0.0f64; d];
        for i in 0..n {
            for a in 0..d {
                centred[a] = states[i][a] as f64 - state_mean[a];
            }
            for a in 0..d {
                let xa = centred[a];
                if xa == 0.0 {
                    continue;
                }
                // Upper triangle only
                for b in a..d {
                    hth[a * d + b] += xa * centred[b];
                }
                for b in 0..k {
                    hty[a * k + b] += xa * (targets[i][b] as f64 - target_mean[b]);
                }
            }
        }

        for a in 0..d {
            for b in (a + 1)..d {
                hth[b * d + a] = hth[a * d + b];
            }
            hth[a * d + a] += self.lambda;
        }

        let w_t = match cholesky_solve(&hth, &hty, d, k) {
            Ok(x) => x,
            Err(err @ LinalgError::NotPositiveDefinite { .. }) if self.lambda > 0.0 => {
                debug!(%err, lambda = self.lambda, dim = d, "cholesky failed on regularised system, using SVD");
                svd_solve(&hth, &hty, d, k)?
            }
            Err(err) => return Err(err),
        };

        // Wᵀ (D × K) → W (K × D)
        let mut weights = vec![0.0f32; k * d];
        for a in 0..d {
            for b in 0..k {
                weights[b * d + a] = w_t[a * k + b] as f32;
            }
        }

        let mut bias = vec![0.0f32; k];
        for b in 0..k {
            let mut dot = 0.0f64;
            for a in 0..d {
                dot += w_t[a * k + b] * state_mean[a];
            }
            bias[b] = (target_mean[b] - dot) as f32;
        }

        Ok(RidgeSolution {
            weights,
            bias,
            input_dim: d,
            output_dim: k,
        })
    }
}

fn check_system(a: &[f64], b: &[f64], d: usize, k: usize) -> Result<(), LinalgError> {
    if a.len() != d * d {
        return Err(LinalgError::DimensionMismatch {
            context: "solver lhs",
            expected: d * d,
            actual: a.len(),
        });
    }
    if b.len() != d * k {
        return Err(LinalgError::DimensionMismatch {
            context: "solver rhs",
            expected: d * k,
            actual: b.len(),
        });
    }
    Ok(())
}

/// Solve `A·X = B` via Cholesky decomposition.
///
/// `A` is `d × d` symmetric positive definite (row-major).
/// `B` is `d × k` (row-major). Returns `X` as `d × k` (row-major).
///
/// A pivot at or below `d·ε` times its diagonal entry counts as zero, so
/// matrices that are singular up to rounding are rejected rather than
/// solved into noise.
pub fn cholesky_solve(a: &[f64], b: &[f64], d: usize, k: usize) -> Result<Vec<f64>, LinalgError> {
    check_system(a, b, d, k)?;
    let rel_tol = f64::EPSILON * d as f64;

    // A = L · Lᵀ
    let mut l = vec![0.0f64; d * d];
    for i in 0..d {
        for j in 0..=i {
            let mut sum = 0.0f64;
            for p in 0..j {
                sum += l[i * d + p] * l[j * d + p];
            }
            if i == j {
                let val = a[i * d + i] - sum;
                if val <= a[i * d + i].abs() * rel_tol || !val.is_finite() {
                    return Err(LinalgError::NotPositiveDefinite { pivot: i, value: val });
                }
                l[i * d + j] = val.sqrt();
            } else {
                l[i * d + j] = (a[i * d + j] - sum) / l[j * d + j];
            }
        }
    }

    // Forward substitution: L · y = B
    let mut y = vec![0.0f64; d * k];
    for i in 0..d {
        for col in 0..k {
            let mut sum = b[i * k + col];
            for j in 0..i {
                sum -= l[i * d + j] * y[j * k + col];
            }
            y[i * k + col] = sum / l[i * d + i];
        }
    }

    // Back substitution: Lᵀ · x = y
    let mut x = vec![0.0f64; d * k];
    for i in (0..d).rev() {
        for col in 0..k {
            let mut sum = y[i * k + col];
            for j in (i + 1)..d {
                sum -= l[j * d + i] * x[j * k + col];
            }
            x[i * k + col] = sum / l[i * d + i];
        }
    }

    Ok(x)
}

/// Minimum-norm least-squares solution of `A·X = B` through the SVD.
///
/// Singular values below `d·ε·σ_max` are treated as zero. Same layout as
/// [`cholesky_solve`]; `A` need not be definite.
pub fn svd_solve(a: &[f64], b: &[f64], d: usize, k: usize) -> Result<Vec<f64>, LinalgError> {
    check_system(a, b, d, k)?;
    let svd = SVD::new(DMatrix::from_row_slice(d, d, a), true, true);
    let cutoff = svd.singular_values.max() * f64::EPSILON * d as f64;
    let x = svd.solve(&DMatrix::from_row_slice(d, k, b), cutoff).map_err(LinalgError::Svd)?;

    let mut out = Vec::with_capacity(d * k);
    for i in 0..d {
        for j in 0..k {
            out.push(x[(i, j)]);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ridge_identity() {
        let states: Vec<Vec<f32>> = vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0]];
        let targets = states.clone();

        let sol = RidgeRegression::new(1e-6).train(&states, &targets).unwrap();
        assert!((sol.weights[0] - 1.0).abs() < 0.01, "weight should be ~1.0, got {}", sol.weights[0]);
        assert!(sol.bias[0].abs() < 0.01, "bias should be ~0.0, got {}", sol.bias[0]);
    }

    #[test]
    fn test_ridge_linear_function() {
        // y = 2x + 3
        let states: Vec<Vec<f32>> = (0..100).map(|i| vec![i as f32 * 0.1]).collect();
        let targets: Vec<Vec<f32>> = states.iter().map(|s| vec![2.0 * s[0] + 3.0]).collect();

        let sol = RidgeRegression::new(1e-6).train(&states, &targets).unwrap();
        assert!((sol.weights[0] - 2.0).abs() < 0.01, "weight should be ~2.0, got {}", sol.weights[0]);
        assert!((sol.bias[0] - 3.0).abs() < 0.01, "bias should be ~3.0, got {}", sol.bias[0]);
        let pred = sol.predict(&[1.5]);
        assert!((pred[0] - 6.0).abs() < 0.02);
    }

    #[test]
    fn test_ridge_multi_output() {
        // y0 = x0 + x1, y1 = x0 - x1
        let states: Vec<Vec<f32>> = vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 1.0],
            vec![2.0, 1.0],
            vec![1.0, 2.0],
            vec![3.0, 0.5],
        ];
        let targets: Vec<Vec<f32>> = states.iter().map(|s| vec![s[0] + s[1], s[0] - s[1]]).collect();

        let sol = RidgeRegression::new(1e-6).train(&states, &targets).unwrap();
        let expected = [1.0, 1.0, 1.0, -1.0];
        for (i, (&w, &e)) in sol.weights.iter().zip(&expected).enumerate() {
            assert!((w - e).abs() < 0.01, "W[{}] should be ~{}, got {}", i, e, w);
        }
    }

    #[test]
    fn test_ridge_regularization_shrinks() {
        let states: Vec<Vec<f32>> = vec![vec![1.0], vec![2.0], vec![3.0]];
        let targets: Vec<Vec<f32>> = vec![vec![100.0], vec![200.0], vec![300.0]];

        let low = RidgeRegression::new(1e-6).train(&states, &targets).unwrap();
        let high = RidgeRegression::new(1e6).train(&states, &targets).unwrap();
        assert!(
            high.weights[0].abs() < low.weights[0].abs(),
            "high regularization should shrink weights: {} vs {}",
            high.weights[0],
            low.weights[0]
        );
    }

    #[test]
    fn test_ridge_underdetermined_is_solvable() {
        // 3 rows, 10 columns
        let states: Vec<Vec<f32>> = (0..3)
            .map(|i| (0..10).map(|j| ((i * 7 + j * 3) % 5) as f32 * 0.2).collect())
            .collect();
        let targets: Vec<Vec<f32>> = vec![vec![1.0], vec![0.0], vec![-1.0]];
        let sol = RidgeRegression::new(1e-3).train(&states, &targets).unwrap();
        assert_eq!(sol.weights.len(), 10);
        assert!(sol.weights.iter().all(|w| w.is_finite()));
    }

    #[test]
    fn test_ridge_zero_lambda_singular_fails() {
        // Constant column → centred column is zero → singular without λ
        let states: Vec<Vec<f32>> = vec![vec![1.0, 5.0], vec![2.0, 5.0], vec![3.0, 5.0]];
        let targets: Vec<Vec<f32>> = vec![vec![1.0], vec![2.0], vec![3.0]];
        let err = RidgeRegression::new(0.0).train(&states, &targets).unwrap_err();
        assert!(matches!(err, LinalgError::NotPositiveDefinite { pivot: 1, .. }), "got {:?}", err);
    }

    #[test]
    fn test_ridge_collinear_columns_tiny_lambda() {
        // Two identical columns: the λ shift is lost to rounding
        let states: Vec<Vec<f32>> = (0..50)
            .map(|i| {
                let u = (i as f32 * 0.3).sin();
                vec![u, u]
            })
            .collect();
        let targets: Vec<Vec<f32>> = states.iter().map(|s| vec![2.0 * s[0] + 0.5]).collect();

        for lambda in [1e-16, 1e-20] {
            let sol = RidgeRegression::new(lambda).train(&states, &targets).unwrap();
            assert!(sol.weights.iter().all(|w| w.is_finite()));
            assert!((sol.weights[0] - sol.weights[1]).abs() < 1e-4, "weights {:?}", sol.weights);
            let pred = sol.predict(&[0.4, 0.4]);
            assert!((pred[0] - 1.3).abs() < 1e-3, "λ = {:e}: predicted {}", lambda, pred[0]);
        }

        // λ = 0 still refuses the singular system
        let err = RidgeRegression::new(0.0).train(&states, &targets).unwrap_err();
        assert!(matches!(err, LinalgError::NotPositiveDefinite { pivot: 1, .. }), "got {:?}", err);
    }

    #[test]
    fn test_ridge_rejects_ragged_rows() {
        let states: Vec<Vec<f32>> = vec![vec![1.0, 2.0], vec![1.0]];
        let targets: Vec<Vec<f32>> = vec![vec![1.0], vec![2.0]];
        let err = RidgeRegression::new(1e-3).train(&states, &targets).unwrap_err();
        assert!(matches!(err, LinalgError::DimensionMismatch { context: "design row width", .. }));
        assert_eq!(RidgeRegression::new(1.0).train(&[], &[]).unwrap_err(), LinalgError::Empty);
    }

    #[test]
    fn test_cholesky_solve_known_system() {
        // [4 2; 2 3] x = [2; 1]  →  x = [0.5, 0]
        let x = cholesky_solve(&[4.0, 2.0, 2.0, 3.0], &[2.0, 1.0], 2, 1).unwrap();
        assert!((x[0] - 0.5).abs() < 1e-12);
        assert!(x[1].abs() < 1e-12);
    }

    #[test]
    fn test_svd_solve_rank_deficient() {
        // [1 1; 1 1] x = [2; 2]  →  minimum-norm x = [1, 1]
        let a = [1.0, 1.0, 1.0, 1.0];
        assert!(matches!(
            cholesky_solve(&a, &[2.0, 2.0], 2, 1),
            Err(LinalgError::NotPositiveDefinite { pivot: 1, .. })
        ));
        let x = svd_solve(&a, &[2.0, 2.0], 2, 1).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-12 && (x[1] - 1.0).abs() < 1e-12, "x = {:?}", x);

        let x = svd_solve(&[4.0, 2.0, 2.0, 3.0], &[2.0, 1.0], 2, 1).unwrap();
        assert!((x[0] - 0.5).abs() < 1e-12 && x[1].abs() < 1e-12);
        assert!(matches!(svd_solve(&a, &[1.0], 2, 1), Err(LinalgError::DimensionMismatch { .. })));
    }
}
