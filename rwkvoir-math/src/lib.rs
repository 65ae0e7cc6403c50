// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! Numerical kernels for the rwkvoir reservoir engine.
//!
//! Everything here is node-agnostic: row-major dense and CSR sparse
//! matrices, seeded weight initialisers, spectral radius computation and
//! the closed-form ridge regression solver.

pub mod error;
pub mod init;
pub mod matrix;
pub mod ridge;
pub mod spectral;

pub use error::LinalgError;
pub use matrix::{CsrMatrix, DenseMatrix};
pub use ridge::{cholesky_solve, svd_solve, RidgeRegression, RidgeSolution};
pub use spectral::{power_iteration_estimate, spectral_radius};
