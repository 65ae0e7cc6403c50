// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! rwkvoir Echo State Network demo: one-step sine prediction.
//!
//! Builds input → reservoir(100) → ridge readout, runs it untrained on a
//! few samples, fits it on a sine wave and reports the test NMSE and RMSE.
//!
//! Run: RUST_LOG=debug cargo run --release --example esn_sine -p rwkvoir-engine

use anyhow::{Context, Result};
use rwkvoir_engine::training::{one_step_pairs, rmse};
use rwkvoir_engine::{nmse, EsnConfig, UntrainedPolicy};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== rwkvoir: Echo State Network ===");
    println!();

    let mut config = EsnConfig::sine_demo();
    config.on_untrained = UntrainedPolicy::ZeroOutput;
    let mut esn = config.build().context("building ESN")?;

    for name in ["input", "reservoir", "readout"] {
        let idx = esn.node_index(name).context("missing node")?;
        println!("  {:<10} index {}", name, idx);
    }
    println!("Model created with {} nodes", esn.node_count());
    println!();

    let n_samples = 200;
    let series: Vec<f32> = (0..n_samples)
        .map(|i| (2.0 * std::f32::consts::PI * i as f32 / 20.0).sin())
        .collect();
    println!("Generated {} sine samples (period 20)", n_samples);

    println!("Untrained run:");
    for (i, &u) in series.iter().take(10).enumerate() {
        let out = esn.run(&[u])?;
        println!("  step {:2}: input={:+.4} output={:+.4}", i, u, out[0]);
    }
    esn.reset();

    let (x, y) = one_step_pairs(&series);
    let train = 150;
    let warmup = 30;
    esn.fit(&x[..train], &y[..train], train, warmup)
        .context("fitting readout")?;

    for &u in &x[..train] {
        esn.run(&[u])?;
    }
    let mut predicted = Vec::with_capacity(x.len() - train);
    for &u in &x[train..] {
        predicted.push(esn.run(&[u])?[0]);
    }
    let error = nmse(&predicted, &y[train..])?;
    let root_error = rmse(&predicted, &y[train..])?;

    println!();
    println!("Trained on {} steps ({} warmup)", train, warmup);
    println!("Test NMSE: {:.6}", error);
    println!("Test RMSE: {:.6}", root_error);
    for (p, t) in predicted.iter().zip(&y[train..]).take(5) {
        println!("  predicted={:+.4} target={:+.4}", p, t);
    }
    Ok(())
}
