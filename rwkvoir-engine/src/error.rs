// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

use rwkvoir_math::LinalgError;
use thiserror::Error;

/// Errors surfaced by nodes and models.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RcError {
    #[error("dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("invalid index: {0}")]
    InvalidIndex(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("edge {from} -> {to} already exists")]
    DuplicateEdge { from: usize, to: usize },
    #[error("edge {from} -> {to} would create a cycle")]
    CycleDetected { from: usize, to: usize },
    #[error("readout has not been trained")]
    Untrained,
    #[error("allocation failed: {0}")]
    AllocationFailure(String),
    #[error("solver error: {0}")]
    Solver(#[from] LinalgError),
}

impl RcError {
    pub(crate) fn dims(context: &'static str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            context,
            expected,
            actual,
        }
    }
}

pub type Result<T> = std::result::Result<T, RcError>;
