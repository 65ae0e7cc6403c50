// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! Computational units of a reservoir graph.
//!
//! Every node implements [`Node`]: a forward step over a flat `f32` vector
//! that may read and mutate private state. Three variants ship with the
//! engine:
//! - [`Input`]: passthrough of the external signal
//! - [`Reservoir`]: fixed random recurrent layer with leaky integration
//! - [`Ridge`]: linear readout trained in closed form
//!
//! Anything else implements the trait directly and reports
//! [`NodeKind::Custom`].

mod input;
mod reservoir;
mod ridge;

pub use input::Input;
pub use reservoir::Reservoir;
pub use ridge::Ridge;

use crate::error::{RcError, Result};

/// Variant tag, for diagnostics and the C boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Input,
    Reservoir,
    Ridge,
    Custom,
}

/// A stateful forward computation.
pub trait Node: Send {
    fn kind(&self) -> NodeKind {
        NodeKind::Custom
    }

    /// Expected input width, or `None` if the node accepts it lazily.
    fn input_dim(&self) -> Option<usize>;

    fn output_dim(&self) -> usize;

    fn state_dim(&self) -> usize {
        0
    }

    /// Consume `input`, update internal state, and return a fresh output
    /// of length [`Self::output_dim`].
    fn forward(&mut self, input: &[f32]) -> Result<Vec<f32>>;

    /// Copy of the current state (length [`Self::state_dim`]).
    fn state(&self) -> Vec<f32> {
        Vec::new()
    }

    /// Overwrite the state. Fails without modification on a length mismatch.
    fn set_state(&mut self, state: &[f32]) -> Result<()> {
        check_len("state", self.state_dim(), state.len())
    }

    /// Zero the state. Weights are untouched.
    fn reset(&mut self) {}

    /// Capability hook used by `Model::fit`.
    fn as_trainable(&mut self) -> Option<&mut dyn Trainable> {
        None
    }

    /// Whether the node is ready to produce meaningful output.
    fn is_trained(&self) -> bool {
        true
    }
}

/// Nodes whose parameters are fitted from collected observations.
pub trait Trainable {
    /// Fit from design rows (node inputs) and matching target rows.
    fn fit(&mut self, design: &[Vec<f32>], targets: &[Vec<f32>]) -> Result<()>;
}

pub(crate) fn check_len(context: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(RcError::dims(context, expected, actual));
    }
    Ok(())
}
