// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

use thiserror::Error;

/// Failures raised by the linear algebra kernels.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LinalgError {
    #[error("dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("matrix is not positive definite (pivot {pivot} = {value:e})")]
    NotPositiveDefinite { pivot: usize, value: f64 },
    #[error("SVD solve failed: {0}")]
    Svd(&'static str),
    #[error("need at least one sample")]
    Empty,
}
