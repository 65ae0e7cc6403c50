// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! Echo State Network reservoir.
//!
//! Fixed random weights, never trained:
//! - `W_in` (units × input_dim): dense, uniform in `[-1, 1)` × `input_scaling`
//! - `W` (units × units): CSR, each entry present with probability
//!   `1 - sparsity`, N(0, 1) values, rescaled to `spectral_radius`
//!
//! Update (leaky integrator):
//!
//! `x ← (1 − α)·x + α·f(W_in·u + W·x)`
//!
//! Both matrices come from one node-local `StdRng`, recurrent first. When
//! `input_dim` is not known at construction, `W_in` is drawn from the same
//! stream on the first forward call, so the weights for a given seed and
//! input width are identical either way.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rwkvoir_math::init::{sparse_normal, uniform_dense};
use rwkvoir_math::{spectral_radius, CsrMatrix, DenseMatrix};
use tracing::{debug, warn};

use super::{check_len, Node, NodeKind};
use crate::config::ReservoirParams;
use crate::error::{RcError, Result};

/// Recurrent matrices with a radius below this are treated as all-zero.
const DEGENERATE_RADIUS: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct Reservoir {
    params: ReservoirParams,
    w_in: Option<DenseMatrix>,
    w: CsrMatrix,
    state: Vec<f32>,
    /// Kept for lazily drawing `W_in`.
    rng: StdRng,
}

impl Reservoir {
    pub fn new(params: ReservoirParams) -> Result<Self> {
        params.validate()?;
        let units = params.units;

        // The Schur step needs a dense f64 copy of W; fail cleanly if it
        // cannot be allocated.
        let dense_len = units
            .checked_mul(units)
            .ok_or_else(|| RcError::AllocationFailure(format!("{units}x{units} recurrent matrix")))?;
        let mut probe: Vec<f64> = Vec::new();
        probe
            .try_reserve_exact(dense_len)
            .map_err(|e| RcError::AllocationFailure(format!("{units}x{units} recurrent matrix: {e}")))?;
        drop(probe);

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut w = sparse_normal(&mut rng, units, 1.0 - params.sparsity);

        let rho = spectral_radius(&w);
        if rho > DEGENERATE_RADIUS {
            w.scale((params.spectral_radius as f64 / rho) as f32);
        } else if w.nnz() > 0 || params.spectral_radius > 0.0 {
            warn!(
                units,
                sparsity = params.sparsity,
                "recurrent matrix has zero spectral radius, leaving it unscaled"
            );
        }

        let w_in = params
            .input_dim
            .map(|dim| uniform_dense(&mut rng, units, dim, params.input_scaling));

        debug!(
            units,
            nnz = w.nnz(),
            raw_radius = rho,
            target_radius = params.spectral_radius,
            seed = params.seed,
            "reservoir initialised"
        );

        Ok(Self {
            state: vec![0.0; units],
            params,
            w_in,
            w,
            rng,
        })
    }

    pub fn params(&self) -> &ReservoirParams {
        &self.params
    }

    /// Input weights, once the input width is known.
    pub fn input_weights(&self) -> Option<&DenseMatrix> {
        self.w_in.as_ref()
    }

    pub fn recurrent_weights(&self) -> &CsrMatrix {
        &self.w
    }

    fn ensure_input_weights(&mut self, input_len: usize) -> Result<&DenseMatrix> {
        if self.w_in.is_none() {
            if input_len == 0 {
                return Err(RcError::dims("reservoir input", 1, 0));
            }
            debug!(units = self.params.units, input_dim = input_len, "reservoir input width fixed");
            self.w_in = Some(uniform_dense(
                &mut self.rng,
                self.params.units,
                input_len,
                self.params.input_scaling,
            ));
        }
        match self.w_in.as_ref() {
            Some(w_in) => {
                check_len("reservoir input", w_in.cols, input_len)?;
                Ok(w_in)
            }
            None => Err(RcError::InvalidState("reservoir input weights missing".into())),
        }
    }
}

impl Node for Reservoir {
    fn kind(&self) -> NodeKind {
        NodeKind::Reservoir
    }

    fn input_dim(&self) -> Option<usize> {
        self.w_in.as_ref().map(|w| w.cols)
    }

    fn output_dim(&self) -> usize {
        self.params.units
    }

    fn state_dim(&self) -> usize {
        self.params.units
    }

    fn forward(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        let units = self.params.units;
        let mut pre = vec![0.0f32; units];
        self.ensure_input_weights(input.len())?.matvec_add(input, &mut pre);
        self.w.matvec_add(&self.state, &mut pre);

        let alpha = self.params.leak_rate;
        let activation = self.params.activation;
        for (s, &p) in self.state.iter_mut().zip(&pre) {
            *s = (1.0 - alpha) * *s + alpha * activation.apply(p);
        }
        Ok(self.state.clone())
    }

    fn state(&self) -> Vec<f32> {
        self.state.clone()
    }

    fn set_state(&mut self, state: &[f32]) -> Result<()> {
        check_len("reservoir state", self.params.units, state.len())?;
        self.state.copy_from_slice(state);
        Ok(())
    }

    fn reset(&mut self) {
        self.state.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Activation;

    fn params(units: usize) -> ReservoirParams {
        ReservoirParams {
            units,
            spectral_radius: 0.9,
            leak_rate: 0.5,
            input_scaling: 1.0,
            sparsity: 0.1,
            activation: Activation::Tanh,
            seed: 42,
            input_dim: None,
        }
    }

    #[test]
    fn test_reservoir_dims() {
        let res = Reservoir::new(params(100)).unwrap();
        assert_eq!(res.kind(), NodeKind::Reservoir);
        assert_eq!(res.output_dim(), 100);
        assert_eq!(res.state_dim(), 100);
        assert_eq!(res.input_dim(), None);
        assert!(res.state().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_spectral_radius_is_scaled() {
        let res = Reservoir::new(params(60)).unwrap();
        let rho = spectral_radius(res.recurrent_weights());
        assert!((rho - 0.9).abs() < 1e-4, "spectral radius should be 0.9, got {}", rho);
    }

    #[test]
    fn test_sparsity_controls_density() {
        let mut p = params(80);
        p.sparsity = 0.9;
        let res = Reservoir::new(p).unwrap();
        let density = res.recurrent_weights().density();
        assert!((0.07..0.13).contains(&density), "density should be ~0.1, got {}", density);
    }

    #[test]
    fn test_fully_sparse_reservoir_is_zero() {
        let mut p = params(10);
        p.sparsity = 1.0;
        let mut res = Reservoir::new(p).unwrap();
        assert_eq!(res.recurrent_weights().nnz(), 0);
        let out = res.forward(&[1.0]).unwrap();
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_forward_bounded_by_tanh() {
        let mut res = Reservoir::new(params(50)).unwrap();
        let input = [0.1, 0.2, 0.3, 0.4, 0.5];
        let out = res.forward(&input).unwrap();
        assert_eq!(out.len(), 50);
        for &v in &out {
            assert!((-1.0..=1.0).contains(&v), "output {} out of tanh range", v);
        }

        for big in [1e3f32, -1e6, 1e30] {
            let out = res.forward(&[big; 5]).unwrap();
            assert!(out.iter().all(|v| (-1.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn test_bounded_for_every_activation() {
        for activation in [Activation::Tanh, Activation::Sigmoid, Activation::Relu] {
            let mut p = params(30);
            p.activation = activation;
            let (lo, hi) = activation.range();
            let mut res = Reservoir::new(p).unwrap();
            for step in 0..20 {
                let u = [(step as f32 * 0.7).sin() * 50.0, -3.0];
                for &v in &res.forward(&u).unwrap() {
                    assert!(v >= lo && v <= hi, "{:?} output {} outside [{}, {}]", activation, v, lo, hi);
                }
            }
        }
    }

    #[test]
    fn test_state_changes_between_calls() {
        let mut res = Reservoir::new(params(50)).unwrap();
        let input = [0.1, 0.2, 0.3, 0.4, 0.5];
        let first = res.forward(&input).unwrap();
        let second = res.forward(&input).unwrap();
        assert!(
            first.iter().zip(&second).any(|(a, b)| (a - b).abs() > 1e-6),
            "state did not change between forward passes"
        );
    }

    #[test]
    fn test_reset_zeroes_state_and_history() {
        let mut res = Reservoir::new(params(20)).unwrap();
        let input = [0.1, 0.2, 0.3];
        let fresh = res.forward(&input).unwrap();
        for _ in 0..5 {
            res.forward(&input).unwrap();
        }
        res.reset();
        assert!(res.state().iter().all(|&v| v == 0.0));
        assert_eq!(res.forward(&input).unwrap(), fresh);
    }

    #[test]
    fn test_set_state_round_trip() {
        let mut res = Reservoir::new(params(20)).unwrap();
        let input = [0.3, -0.1];
        for _ in 0..3 {
            res.forward(&input).unwrap();
        }
        let snapshot = res.state();
        res.set_state(&snapshot).unwrap();
        let a = res.forward(&input).unwrap();

        res.set_state(&snapshot).unwrap();
        let b = res.forward(&input).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_set_state_wrong_length() {
        let mut res = Reservoir::new(params(20)).unwrap();
        res.forward(&[1.0]).unwrap();
        let before = res.state();
        assert_eq!(res.set_state(&[0.0; 19]), Err(RcError::dims("reservoir state", 20, 19)));
        assert_eq!(res.state(), before);
    }

    #[test]
    fn test_input_width_fixed_after_first_call() {
        let mut res = Reservoir::new(params(10)).unwrap();
        res.forward(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(res.input_dim(), Some(3));
        assert_eq!(res.forward(&[1.0]), Err(RcError::dims("reservoir input", 3, 1)));
    }

    #[test]
    fn test_declared_input_dim_validated() {
        let mut res = Reservoir::new(params(10).with_input_dim(2)).unwrap();
        assert_eq!(res.input_dim(), Some(2));
        assert!(res.forward(&[1.0, 2.0, 3.0]).is_err());
        assert!(res.forward(&[1.0, 2.0]).is_ok());
    }

    #[test]
    fn test_lazy_and_eager_weights_match() {
        let mut lazy = Reservoir::new(params(15)).unwrap();
        let mut eager = Reservoir::new(params(15).with_input_dim(2)).unwrap();
        let a = lazy.forward(&[0.4, -0.7]).unwrap();
        let b = eager.forward(&[0.4, -0.7]).unwrap();
        assert_eq!(a, b);
        assert_eq!(lazy.input_weights(), eager.input_weights());
    }

    #[test]
    fn test_seed_determinism() {
        let a = Reservoir::new(params(25)).unwrap();
        let b = Reservoir::new(params(25)).unwrap();
        let c = Reservoir::new(params(25).with_seed(7)).unwrap();
        assert_eq!(a.recurrent_weights(), b.recurrent_weights());
        assert_ne!(a.recurrent_weights(), c.recurrent_weights());
    }

    #[test]
    fn test_full_leak_rate_is_memoryless_in_blend() {
        // α = 1: new state is exactly f(pre), no blending with the old state
        let mut p = params(5);
        p.leak_rate = 1.0;
        p.sparsity = 1.0;
        let mut res = Reservoir::new(p).unwrap();
        let a = res.forward(&[0.5]).unwrap();
        let b = res.forward(&[0.5]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let mut p = params(10);
        p.leak_rate = 0.0;
        assert!(matches!(Reservoir::new(p), Err(RcError::InvalidParameter(_))));
    }
}
