// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! Training data helpers and error metrics.
//!
//! [`Model::fit`](crate::model::Model::fit) takes flat row-major buffers.
//! [`StateCollector`] gathers rows one step at a time and flattens them;
//! [`one_step_pairs`] builds next-value prediction data from a scalar
//! series.

use crate::error::{RcError, Result};

/// Paired input and target rows gathered step by step.
#[derive(Debug, Clone, Default)]
pub struct StateCollector {
    /// Collected input rows
    pub states: Vec<Vec<f32>>,
    /// Corresponding target rows
    pub targets: Vec<Vec<f32>>,
}

impl StateCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one step. Every row must match the width of the first.
    pub fn collect(&mut self, state: &[f32], target: &[f32]) -> Result<()> {
        if let (Some(s), Some(t)) = (self.states.first(), self.targets.first()) {
            if s.len() != state.len() {
                return Err(RcError::dims("collected state width", s.len(), state.len()));
            }
            if t.len() != target.len() {
                return Err(RcError::dims("collected target width", t.len(), target.len()));
            }
        }
        self.states.push(state.to_vec());
        self.targets.push(target.to_vec());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn clear(&mut self) {
        self.states.clear();
        self.targets.clear();
    }

    pub fn state_dim(&self) -> usize {
        self.states.first().map_or(0, Vec::len)
    }

    pub fn target_dim(&self) -> usize {
        self.targets.first().map_or(0, Vec::len)
    }

    /// Row-major `(x, y)` buffers plus the row count, as taken by `Model::fit`.
    pub fn to_flat(&self) -> (Vec<f32>, Vec<f32>, usize) {
        let x = self.states.concat();
        let y = self.targets.concat();
        (x, y, self.len())
    }
}

/// Inputs `series[0..n-1]` and targets `series[1..n]` for one-step-ahead
/// prediction of a scalar series.
pub fn one_step_pairs(series: &[f32]) -> (Vec<f32>, Vec<f32>) {
    if series.len() < 2 {
        return (Vec::new(), Vec::new());
    }
    let x = series[..series.len() - 1].to_vec();
    let y = series[1..].to_vec();
    (x, y)
}

/// Normalised mean squared error: `MSE / Var(actual)`.
///
/// NMSE = 0 is a perfect fit, 1 matches predicting the mean. A constant
/// `actual` has no variance and yields 0.
pub fn nmse(predicted: &[f32], actual: &[f32]) -> Result<f32> {
    if predicted.len() != actual.len() {
        return Err(RcError::dims("nmse lengths", actual.len(), predicted.len()));
    }
    if actual.is_empty() {
        return Err(RcError::dims("nmse samples", 1, 0));
    }
    let n = actual.len() as f32;

    let mean: f32 = actual.iter().sum::<f32>() / n;
    let variance: f32 = actual.iter().map(|&y| (y - mean) * (y - mean)).sum::<f32>() / n;
    if variance < 1e-12 {
        return Ok(0.0);
    }

    Ok(mse(predicted, actual) / variance)
}

fn mse(predicted: &[f32], actual: &[f32]) -> f32 {
    predicted
        .iter()
        .zip(actual)
        .map(|(&p, &a)| (p - a) * (p - a))
        .sum::<f32>()
        / actual.len() as f32
}

/// Root mean squared error.
pub fn rmse(predicted: &[f32], actual: &[f32]) -> Result<f32> {
    if predicted.len() != actual.len() {
        return Err(RcError::dims("rmse lengths", actual.len(), predicted.len()));
    }
    if actual.is_empty() {
        return Err(RcError::dims("rmse samples", 1, 0));
    }
    Ok(mse(predicted, actual).sqrt())
}
