// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! Linear readout `y = W_out · x + b`, fitted in closed form.

use rwkvoir_math::RidgeRegression;
use tracing::{debug, warn};

use super::{check_len, Node, NodeKind, Trainable};
use crate::config::{RidgeParams, UntrainedPolicy};
use crate::error::{RcError, Result};

#[derive(Debug, Clone)]
pub struct Ridge {
    params: RidgeParams,
    /// Row-major `output_dim × input_dim`
    weights: Vec<f32>,
    bias: Vec<f32>,
    trained: bool,
    warned_untrained: bool,
}

impl Ridge {
    pub fn new(params: RidgeParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            weights: vec![0.0; params.output_dim * params.input_dim],
            bias: vec![0.0; params.output_dim],
            params,
            trained: false,
            warned_untrained: false,
        })
    }

    pub fn params(&self) -> &RidgeParams {
        &self.params
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn bias(&self) -> &[f32] {
        &self.bias
    }

    /// Change the regularisation strength used by the next fit.
    pub fn set_ridge(&mut self, ridge: f32) -> Result<()> {
        let params = RidgeParams { ridge, ..self.params.clone() };
        params.validate()?;
        self.params = params;
        Ok(())
    }
}

impl Node for Ridge {
    fn kind(&self) -> NodeKind {
        NodeKind::Ridge
    }

    fn input_dim(&self) -> Option<usize> {
        Some(self.params.input_dim)
    }

    fn output_dim(&self) -> usize {
        self.params.output_dim
    }

    fn forward(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        check_len("ridge input", self.params.input_dim, input.len())?;

        if !self.trained {
            match self.params.on_untrained {
                UntrainedPolicy::Error => return Err(RcError::Untrained),
                UntrainedPolicy::ZeroOutput => {
                    if !self.warned_untrained {
                        warn!(
                            output_dim = self.params.output_dim,
                            "ridge readout run before fit, returning zeros"
                        );
                        self.warned_untrained = true;
                    }
                    return Ok(vec![0.0; self.params.output_dim]);
                }
            }
        }

        let d = self.params.input_dim;
        let out: Vec<f32> = self
            .bias
            .iter()
            .zip(self.weights.chunks_exact(d))
            .map(|(&b, row)| b + row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>())
            .collect();
        Ok(out)
    }

    fn as_trainable(&mut self) -> Option<&mut dyn Trainable> {
        Some(self)
    }

    fn is_trained(&self) -> bool {
        self.trained
    }
}

impl Trainable for Ridge {
    fn fit(&mut self, design: &[Vec<f32>], targets: &[Vec<f32>]) -> Result<()> {
        self.params.validate()?;
        if design.is_empty() {
            return Err(RcError::dims("ridge training rows", 1, 0));
        }
        check_len("ridge target rows", design.len(), targets.len())?;
        for row in design {
            check_len("ridge design row", self.params.input_dim, row.len())?;
        }
        for row in targets {
            check_len("ridge target row", self.params.output_dim, row.len())?;
        }

        let solution = RidgeRegression::new(self.params.ridge as f64).train(design, targets)?;
        self.weights = solution.weights;
        self.bias = solution.bias;
        self.trained = true;

        debug!(
            rows = design.len(),
            input_dim = self.params.input_dim,
            output_dim = self.params.output_dim,
            ridge = self.params.ridge,
            "ridge readout fitted"
        );
        Ok(())
    }
}
