// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! Parameter records for nodes and the canonical Echo State Network.
//!
//! All records are plain data with `serde` support so a full ESN can be
//! described in a config file and rebuilt deterministically.

use serde::{Deserialize, Serialize};

use crate::error::{RcError, Result};
use crate::model::Model;
use crate::node::{Input, Reservoir, Ridge};

/// Elementwise nonlinearity applied by a reservoir.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Tanh,
    Sigmoid,
    Relu,
    Identity,
}

impl Activation {
    #[inline]
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Self::Tanh => x.tanh(),
            Self::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Self::Relu => x.max(0.0),
            Self::Identity => x,
        }
    }

    /// Closed range `(lo, hi)` containing every output of [`Self::apply`].
    pub fn range(self) -> (f32, f32) {
        match self {
            Self::Tanh => (-1.0, 1.0),
            Self::Sigmoid => (0.0, 1.0),
            Self::Relu => (0.0, f32::INFINITY),
            Self::Identity => (f32::NEG_INFINITY, f32::INFINITY),
        }
    }
}

/// What a ridge readout does when run before it has been fitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UntrainedPolicy {
    /// `forward` fails with [`RcError::Untrained`].
    #[default]
    Error,
    /// `forward` returns zeros and logs a warning once.
    ZeroOutput,
}

/// Reservoir construction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReservoirParams {
    /// Number of reservoir units (state and output dimension)
    pub units: usize,
    /// Target spectral radius of the recurrent matrix
    pub spectral_radius: f32,
    /// Leaky-integration coefficient, in (0, 1]
    pub leak_rate: f32,
    /// Scale of the input weights
    pub input_scaling: f32,
    /// Probability that a recurrent connection is absent, in [0, 1]
    pub sparsity: f32,
    pub activation: Activation,
    pub seed: u64,
    /// Input width. `None` fixes it on the first forward call.
    pub input_dim: Option<usize>,
}

impl Default for ReservoirParams {
    fn default() -> Self {
        Self {
            units: 100,
            spectral_radius: 0.9,
            leak_rate: 0.3,
            input_scaling: 1.0,
            sparsity: 0.9,
            activation: Activation::Tanh,
            seed: 42,
            input_dim: None,
        }
    }
}

impl ReservoirParams {
    pub fn with_units(mut self, units: usize) -> Self {
        self.units = units;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_input_dim(mut self, input_dim: usize) -> Self {
        self.input_dim = Some(input_dim);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.units == 0 {
            return Err(RcError::InvalidParameter("units must be > 0".into()));
        }
        if !(self.leak_rate > 0.0 && self.leak_rate <= 1.0) {
            return Err(RcError::InvalidParameter(format!(
                "leak_rate must be in (0, 1], got {}",
                self.leak_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.sparsity) {
            return Err(RcError::InvalidParameter(format!(
                "sparsity must be in [0, 1], got {}",
                self.sparsity
            )));
        }
        if !self.spectral_radius.is_finite() || self.spectral_radius < 0.0 {
            return Err(RcError::InvalidParameter(format!(
                "spectral_radius must be finite and >= 0, got {}",
                self.spectral_radius
            )));
        }
        if !self.input_scaling.is_finite() || self.input_scaling < 0.0 {
            return Err(RcError::InvalidParameter(format!(
                "input_scaling must be finite and >= 0, got {}",
                self.input_scaling
            )));
        }
        if self.input_dim == Some(0) {
            return Err(RcError::InvalidParameter("input_dim must be > 0".into()));
        }
        Ok(())
    }
}

/// Ridge readout construction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeParams {
    /// Regularisation strength (λ >= 0)
    pub ridge: f32,
    pub input_dim: usize,
    pub output_dim: usize,
    #[serde(default)]
    pub on_untrained: UntrainedPolicy,
}

impl RidgeParams {
    pub fn new(ridge: f32, input_dim: usize, output_dim: usize) -> Self {
        Self {
            ridge,
            input_dim,
            output_dim,
            on_untrained: UntrainedPolicy::Error,
        }
    }

    pub fn with_untrained_policy(mut self, policy: UntrainedPolicy) -> Self {
        self.on_untrained = policy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.ridge.is_finite() || self.ridge < 0.0 {
            return Err(RcError::InvalidParameter(format!(
                "ridge must be finite and >= 0, got {}",
                self.ridge
            )));
        }
        if self.input_dim == 0 || self.output_dim == 0 {
            return Err(RcError::InvalidParameter(format!(
                "ridge dimensions must be > 0, got {}x{}",
                self.output_dim, self.input_dim
            )));
        }
        Ok(())
    }
}

/// Canonical input → reservoir → ridge readout network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EsnConfig {
    pub input_dim: usize,
    pub output_dim: usize,
    pub reservoir: ReservoirParams,
    /// Readout regularisation strength
    pub ridge: f32,
    #[serde(default)]
    pub on_untrained: UntrainedPolicy,
}

impl EsnConfig {
    /// Default reservoir sized for `input_dim → output_dim`.
    pub fn new(input_dim: usize, output_dim: usize) -> Self {
        Self {
            input_dim,
            output_dim,
            reservoir: ReservoirParams::default().with_input_dim(input_dim),
            ridge: 1e-6,
            on_untrained: UntrainedPolicy::Error,
        }
    }

    /// Scalar time-series preset used by the sine demo: 100 units,
    /// spectral radius 1.25, leak rate 0.3, seed 42.
    pub fn sine_demo() -> Self {
        Self {
            input_dim: 1,
            output_dim: 1,
            reservoir: ReservoirParams {
                units: 100,
                spectral_radius: 1.25,
                leak_rate: 0.3,
                input_scaling: 1.0,
                sparsity: 0.9,
                activation: Activation::Tanh,
                seed: 42,
                input_dim: Some(1),
            },
            ridge: 1e-5,
            on_untrained: UntrainedPolicy::Error,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.input_dim == 0 || self.output_dim == 0 {
            return Err(RcError::InvalidParameter(
                "ESN input_dim and output_dim must be > 0".into(),
            ));
        }
        if let Some(dim) = self.reservoir.input_dim {
            if dim != self.input_dim {
                return Err(RcError::dims("reservoir input_dim", self.input_dim, dim));
            }
        }
        self.reservoir.validate()?;
        self.readout_params().validate()
    }

    pub fn readout_params(&self) -> RidgeParams {
        RidgeParams::new(self.ridge, self.reservoir.units, self.output_dim)
            .with_untrained_policy(self.on_untrained)
    }

    /// Build the model with nodes named `input`, `reservoir`, `readout`
    /// at indices 0, 1, 2.
    pub fn build(&self) -> Result<Model> {
        self.validate()?;
        let mut reservoir_params = self.reservoir.clone();
        reservoir_params.input_dim = Some(self.input_dim);

        let mut model = Model::new();
        let input = model.add_node(Box::new(Input::new(self.input_dim)?), Some("input"))?;
        let reservoir = model.add_node(Box::new(Reservoir::new(reservoir_params)?), Some("reservoir"))?;
        let readout = model.add_node(Box::new(Ridge::new(self.readout_params())?), Some("readout"))?;
        model.connect(input, reservoir)?;
        model.connect(reservoir, readout)?;
        Ok(model)
    }
}
