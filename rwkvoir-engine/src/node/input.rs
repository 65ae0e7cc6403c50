// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

use super::{check_len, Node, NodeKind};
use crate::error::{RcError, Result};

/// Passthrough entry point for the external signal.
#[derive(Debug, Clone)]
pub struct Input {
    dim: usize,
}

impl Input {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(RcError::InvalidParameter("input_dim must be > 0".into()));
        }
        Ok(Self { dim })
    }
}

impl Node for Input {
    fn kind(&self) -> NodeKind {
        NodeKind::Input
    }

    fn input_dim(&self) -> Option<usize> {
        Some(self.dim)
    }

    fn output_dim(&self) -> usize {
        self.dim
    }

    fn forward(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        check_len("input node", self.dim, input.len())?;
        Ok(input.to_vec())
    }
}
