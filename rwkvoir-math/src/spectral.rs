// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! Spectral radius of (non-symmetric) recurrent weight matrices.
//!
//! Reservoir matrices are real but not symmetric, so the dominant
//! eigenvalue is generally a complex-conjugate pair. Plain power iteration
//! does not converge on such pairs, which is why the primary path takes all
//! eigenvalues from the real Schur form and returns the largest modulus.
//!
//! Cost: O(N³) once per reservoir construction.

use nalgebra::Schur;
use tracing::warn;

use crate::matrix::CsrMatrix;

const SCHUR_MAX_ITERATIONS: usize = 100_000;
const POWER_ITERATIONS: usize = 500;

/// Largest eigenvalue modulus of a square matrix.
///
/// Falls back to [`power_iteration_estimate`] if the Schur iteration does
/// not converge.
pub fn spectral_radius(matrix: &CsrMatrix) -> f64 {
    debug_assert_eq!(matrix.rows, matrix.cols);
    if matrix.rows == 0 || matrix.nnz() == 0 {
        return 0.0;
    }

    let dense = matrix.to_nalgebra();
    match Schur::try_new(dense, f64::EPSILON, SCHUR_MAX_ITERATIONS) {
        Some(schur) => schur
            .complex_eigenvalues()
            .iter()
            .map(|c| c.norm())
            .fold(0.0f64, f64::max),
        None => {
            warn!(
                units = matrix.rows,
                "Schur decomposition did not converge, estimating spectral radius by power iteration"
            );
            power_iteration_estimate(matrix, POWER_ITERATIONS)
        }
    }
}

/// Spectral radius estimate via power iteration on `‖Aᵏv‖^(1/k)`.
///
/// Tracks the geometric growth rate of the iterate rather than a single
/// Rayleigh quotient, which still converges to `|λ_max|` when the dominant
/// eigenvalues are a complex pair, only more slowly.
pub fn power_iteration_estimate(matrix: &CsrMatrix, iterations: usize) -> f64 {
    let n = matrix.rows;
    if n == 0 || iterations == 0 {
        return 0.0;
    }

    let mut v = vec![1.0f32 / (n as f32).sqrt(); n];
    let mut next = vec![0.0f32; n];
    let mut log_growth = 0.0f64;

    for _ in 0..iterations {
        next.fill(0.0);
        matrix.matvec_add(&v, &mut next);
        let norm: f64 = next.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>().sqrt();
        if norm < 1e-300 {
            return 0.0;
        }
        log_growth += norm.ln();
        for (dst, &src) in v.iter_mut().zip(&next) {
            *dst = (src as f64 / norm) as f32;
        }
    }

    (log_growth / iterations as f64).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init::sparse_normal;
    use crate::matrix::DenseMatrix;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn csr(rows: usize, data: Vec<f32>) -> CsrMatrix {
        CsrMatrix::from_dense(&DenseMatrix::from_row_major(rows, rows, data).unwrap())
    }

    #[test]
    fn test_diagonal_matrix() {
        let m = csr(3, vec![0.5, 0.0, 0.0, 0.0, -2.0, 0.0, 0.0, 0.0, 1.0]);
        let rho = spectral_radius(&m);
        assert!((rho - 2.0).abs() < 1e-9, "expected 2.0, got {}", rho);
    }

    #[test]
    fn test_rotation_has_complex_eigenvalues() {
        // 90° rotation scaled by 3: eigenvalues ±3i
        let m = csr(2, vec![0.0, -3.0, 3.0, 0.0]);
        let rho = spectral_radius(&m);
        assert!((rho - 3.0).abs() < 1e-9, "expected 3.0, got {}", rho);
    }

    #[test]
    fn test_zero_matrix() {
        assert_eq!(spectral_radius(&CsrMatrix::empty(5, 5)), 0.0);
        assert_eq!(spectral_radius(&CsrMatrix::empty(0, 0)), 0.0);
    }

    #[test]
    fn test_power_iteration_agrees_with_schur() {
        let mut rng = StdRng::seed_from_u64(3);
        let m = sparse_normal(&mut rng, 40, 0.3);
        let exact = spectral_radius(&m);
        let estimate = power_iteration_estimate(&m, 2000);
        assert!(
            (exact - estimate).abs() / exact < 0.1,
            "power iteration {} should be close to exact {}",
            estimate,
            exact
        );
    }

    #[test]
    fn test_scaling_is_linear() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut m = sparse_normal(&mut rng, 25, 0.5);
        let rho = spectral_radius(&m);
        m.scale((0.9 / rho) as f32);
        let scaled = spectral_radius(&m);
        assert!((scaled - 0.9).abs() < 1e-4, "rescaled radius {}", scaled);
    }
}
