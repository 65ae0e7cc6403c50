// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! Row-major dense and CSR sparse matrices in f32.
//!
//! Both layouts are flat `Vec`s so the hot loops in the reservoir update
//! stay cache-friendly and allocation-free. Conversion to `nalgebra` is
//! only done for one-off eigen computations.

use nalgebra::DMatrix;

use crate::error::LinalgError;

// ─── Dense ───────────────────────────────────────────

/// Dense `rows × cols` matrix, row-major: `data[i * cols + j]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f32>,
}

impl DenseMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Wrap an existing row-major buffer.
    pub fn from_row_major(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self, LinalgError> {
        if data.len() != rows * cols {
            return Err(LinalgError::DimensionMismatch {
                context: "dense matrix buffer",
                expected: rows * cols,
                actual: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.cols + col]
    }

    pub fn row(&self, row: usize) -> &[f32] {
        let base = row * self.cols;
        &self.data[base..base + self.cols]
    }

    /// `out[i] += Σ_j self[i][j] · x[j]`
    ///
    /// `x` must have length `cols` and `out` length `rows`; callers check.
    pub fn matvec_add(&self, x: &[f32], out: &mut [f32]) {
        debug_assert_eq!(x.len(), self.cols);
        debug_assert_eq!(out.len(), self.rows);
        for (i, acc) in out.iter_mut().enumerate() {
            let row = self.row(i);
            let mut sum = 0.0f32;
            for (w, v) in row.iter().zip(x) {
                sum += w * v;
            }
            *acc += sum;
        }
    }
}

// ─── CSR ─────────────────────────────────────────────

/// Compressed sparse row matrix.
///
/// Row `i` holds `col_indices[row_offsets[i]..row_offsets[i + 1]]` with the
/// matching `values`. Columns within a row are strictly increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    pub rows: usize,
    pub cols: usize,
    pub row_offsets: Vec<u32>,
    pub col_indices: Vec<u32>,
    pub values: Vec<f32>,
}

impl CsrMatrix {
    /// An all-zero matrix with no stored entries.
    pub fn empty(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            row_offsets: vec![0; rows + 1],
            col_indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Compress a dense matrix, dropping exact zeros.
    pub fn from_dense(dense: &DenseMatrix) -> Self {
        let mut row_offsets = Vec::with_capacity(dense.rows + 1);
        let mut col_indices = Vec::new();
        let mut values = Vec::new();
        row_offsets.push(0u32);
        for i in 0..dense.rows {
            for (j, &v) in dense.row(i).iter().enumerate() {
                if v != 0.0 {
                    col_indices.push(j as u32);
                    values.push(v);
                }
            }
            row_offsets.push(col_indices.len() as u32);
        }
        Self {
            rows: dense.rows,
            cols: dense.cols,
            row_offsets,
            col_indices,
            values,
        }
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Fraction of entries that are stored.
    pub fn density(&self) -> f32 {
        let total = self.rows * self.cols;
        if total == 0 {
            0.0
        } else {
            self.nnz() as f32 / total as f32
        }
    }

    /// `out[i] += Σ_j self[i][j] · x[j]`
    pub fn matvec_add(&self, x: &[f32], out: &mut [f32]) {
        debug_assert_eq!(x.len(), self.cols);
        debug_assert_eq!(out.len(), self.rows);
        for (i, acc) in out.iter_mut().enumerate() {
            let start = self.row_offsets[i] as usize;
            let end = self.row_offsets[i + 1] as usize;
            let mut sum = 0.0f32;
            for edge in start..end {
                sum += self.values[edge] * x[self.col_indices[edge] as usize];
            }
            *acc += sum;
        }
    }

    /// Multiply every stored entry by `factor`.
    pub fn scale(&mut self, factor: f32) {
        for v in &mut self.values {
            *v *= factor;
        }
    }

    pub fn to_dense(&self) -> DenseMatrix {
        let mut dense = DenseMatrix::zeros(self.rows, self.cols);
        for i in 0..self.rows {
            let start = self.row_offsets[i] as usize;
            let end = self.row_offsets[i + 1] as usize;
            for edge in start..end {
                let j = self.col_indices[edge] as usize;
                dense.data[i * self.cols + j] = self.values[edge];
            }
        }
        dense
    }

    pub fn to_nalgebra(&self) -> DMatrix<f64> {
        let mut m = DMatrix::<f64>::zeros(self.rows, self.cols);
        for i in 0..self.rows {
            let start = self.row_offsets[i] as usize;
            let end = self.row_offsets[i + 1] as usize;
            for edge in start..end {
                m[(i, self.col_indices[edge] as usize)] = self.values[edge] as f64;
            }
        }
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dense() -> DenseMatrix {
        // [1 0 2]
        // [0 0 0]
        // [0 3 0]
        DenseMatrix::from_row_major(3, 3, vec![1.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0, 3.0, 0.0])
            .unwrap()
    }

    #[test]
    fn test_dense_from_row_major_checks_length() {
        let err = DenseMatrix::from_row_major(2, 2, vec![1.0; 3]).unwrap_err();
        assert_eq!(
            err,
            LinalgError::DimensionMismatch {
                context: "dense matrix buffer",
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn test_dense_matvec_accumulates() {
        let m = sample_dense();
        let mut out = vec![1.0, 1.0, 1.0];
        m.matvec_add(&[1.0, 2.0, 3.0], &mut out);
        assert_eq!(out, vec![8.0, 1.0, 7.0]);
    }

    #[test]
    fn test_csr_matches_dense() {
        let dense = sample_dense();
        let csr = CsrMatrix::from_dense(&dense);
        assert_eq!(csr.nnz(), 3);
        assert_eq!(csr.row_offsets, vec![0, 2, 2, 3]);
        assert_eq!(csr.to_dense(), dense);

        let x = [0.5, -1.0, 2.0];
        let mut a = vec![0.0; 3];
        let mut b = vec![0.0; 3];
        dense.matvec_add(&x, &mut a);
        csr.matvec_add(&x, &mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn test_csr_scale_and_density() {
        let mut csr = CsrMatrix::from_dense(&sample_dense());
        csr.scale(2.0);
        assert_eq!(csr.values, vec![2.0, 4.0, 6.0]);
        assert!((csr.density() - 3.0 / 9.0).abs() < 1e-6);
        assert_eq!(CsrMatrix::empty(4, 4).nnz(), 0);
    }

    #[test]
    fn test_to_nalgebra() {
        let csr = CsrMatrix::from_dense(&sample_dense());
        let m = csr.to_nalgebra();
        assert_eq!(m[(0, 2)], 2.0);
        assert_eq!(m[(2, 1)], 3.0);
        assert_eq!(m[(1, 1)], 0.0);
    }
}
