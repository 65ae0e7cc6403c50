// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! Seeded weight initialisers.
//!
//! The generator is always passed in by the caller so each reservoir can
//! own its stream; nothing here touches a global RNG.

use rand::Rng;
use rand_distr::StandardNormal;

use crate::matrix::{CsrMatrix, DenseMatrix};

/// Dense matrix with entries uniform in `[-scale, scale)`.
pub fn uniform_dense<R: Rng + ?Sized>(rng: &mut R, rows: usize, cols: usize, scale: f32) -> DenseMatrix {
    let data = (0..rows * cols)
        .map(|_| rng.gen_range(-1.0f32..1.0) * scale)
        .collect();
    DenseMatrix { rows, cols, data }
}

/// Square sparse matrix: each entry is present with probability
/// `connectivity` and, when present, drawn from N(0, 1).
///
/// Entries are visited row-major and both draws are always consumed, so the
/// pattern and values for a given seed do not depend on `connectivity`
/// rounding.
pub fn sparse_normal<R: Rng + ?Sized>(rng: &mut R, n: usize, connectivity: f32) -> CsrMatrix {
    let connectivity = connectivity.clamp(0.0, 1.0);
    let mut row_offsets = Vec::with_capacity(n + 1);
    let mut col_indices = Vec::new();
    let mut values = Vec::new();
    row_offsets.push(0u32);

    for _ in 0..n {
        for j in 0..n {
            let keep = rng.gen::<f32>() < connectivity;
            let value: f32 = rng.sample(StandardNormal);
            if keep && value != 0.0 {
                col_indices.push(j as u32);
                values.push(value);
            }
        }
        row_offsets.push(col_indices.len() as u32);
    }

    CsrMatrix {
        rows: n,
        cols: n,
        row_offsets,
        col_indices,
        values,
    }
}
