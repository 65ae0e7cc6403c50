// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! rwkvoir reservoir computing engine.
//!
//! Stateful nodes composed into a directed acyclic graph and driven one
//! time step at a time:
//! - [`node`]: the [`Node`] trait and the Input, Reservoir and Ridge nodes
//! - [`model`]: graph construction, execution and batch training
//! - [`config`]: serialisable parameters and the canonical ESN builder
//! - [`training`]: state collection and error metrics

pub mod config;
pub mod error;
pub mod model;
pub mod node;
pub mod training;

pub use config::{Activation, EsnConfig, ReservoirParams, RidgeParams, UntrainedPolicy};
pub use error::{RcError, Result};
pub use model::Model;
pub use node::{Input, Node, NodeKind, Reservoir, Ridge, Trainable};
pub use training::{nmse, StateCollector};
