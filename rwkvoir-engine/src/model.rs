// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! Directed acyclic graph of nodes, executed one time step at a time.
//!
//! Nodes are indexed in insertion order. Edges carry a node's full output
//! to its successor. A node with several predecessors sees their outputs
//! concatenated in edge insertion order. Sources (no incoming edge) split
//! the external input between them, sinks (no outgoing edge) form the
//! model output.
//!
//! Edges that would close a cycle are rejected at [`Model::connect`];
//! recurrence lives inside nodes.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use std::ops::Range;

use tracing::{debug, trace};

use crate::error::{RcError, Result};
use crate::node::{Node, NodeKind};

/// Per-call routing derived from the graph and the input width.
struct Plan {
    order: Vec<usize>,
    /// Predecessors of each node in edge insertion order
    preds: Vec<Vec<usize>>,
    /// Slice of the external input fed to each source
    source_ranges: Vec<Option<Range<usize>>>,
    sinks: Vec<usize>,
}

/// Flattened training data for [`Model::fit`].
struct Batch<'a> {
    x: &'a [f32],
    y: &'a [f32],
    in_width: usize,
    out_width: usize,
    batch_size: usize,
    warmup: usize,
}

#[derive(Default)]
pub struct Model {
    nodes: Vec<Box<dyn Node>>,
    names: HashMap<String, usize>,
    edges: Vec<(usize, usize)>,
    order: Option<Vec<usize>>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `node` and return its index.
    pub fn add_node(&mut self, node: Box<dyn Node>, name: Option<&str>) -> Result<usize> {
        let idx = self.nodes.len();
        if let Some(name) = name {
            if self.names.contains_key(name) {
                return Err(RcError::InvalidState(format!("node name '{name}' already in use")));
            }
            self.names.insert(name.to_string(), idx);
        }
        debug!(index = idx, kind = ?node.kind(), name = ?name, output_dim = node.output_dim(), "node added");
        self.nodes.push(node);
        self.order = None;
        Ok(idx)
    }

    pub fn node_index(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    pub fn node(&self, idx: usize) -> Option<&(dyn Node + 'static)> {
        self.nodes.get(idx).map(|n| &**n)
    }

    pub fn node_mut(&mut self, idx: usize) -> Option<&mut (dyn Node + 'static)> {
        self.nodes.get_mut(idx).map(|n| &mut **n)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    fn sources(&self) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&i| !self.edges.iter().any(|&(_, to)| to == i))
            .collect()
    }

    fn sinks(&self) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&i| !self.edges.iter().any(|&(from, _)| from == i))
            .collect()
    }

    /// Total external input width, if every source declares one.
    pub fn input_dim(&self) -> Option<usize> {
        let sources = self.sources();
        if sources.is_empty() {
            return None;
        }
        sources.iter().map(|&i| self.nodes[i].input_dim()).sum()
    }

    /// Width of the concatenated sink outputs.
    pub fn output_dim(&self) -> usize {
        self.sinks().iter().map(|&i| self.nodes[i].output_dim()).sum()
    }

    pub fn connect(&mut self, from: usize, to: usize) -> Result<()> {
        let n = self.nodes.len();
        if from >= n || to >= n {
            return Err(RcError::InvalidIndex(format!(
                "edge {from} -> {to} out of range for {n} nodes"
            )));
        }
        if from == to {
            return Err(RcError::InvalidIndex(format!("self-loop on node {from}")));
        }
        if self.edges.contains(&(from, to)) {
            return Err(RcError::DuplicateEdge { from, to });
        }
        if self.reaches(to, from) {
            return Err(RcError::CycleDetected { from, to });
        }
        self.edges.push((from, to));
        self.order = None;
        debug!(from, to, edges = self.edges.len(), "edge added");
        Ok(())
    }

    /// Whether `target` is reachable from `start` along existing edges.
    fn reaches(&self, start: usize, target: usize) -> bool {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![start];
        while let Some(i) = stack.pop() {
            if i == target {
                return true;
            }
            if std::mem::replace(&mut seen[i], true) {
                continue;
            }
            stack.extend(self.edges.iter().filter(|&&(f, _)| f == i).map(|&(_, t)| t));
        }
        false
    }

    /// Kahn's algorithm, lowest index first among ready nodes.
    fn topological_order(&self) -> Vec<usize> {
        let n = self.nodes.len();
        let mut in_degree = vec![0usize; n];
        for &(_, to) in &self.edges {
            in_degree[to] += 1;
        }
        let mut ready: BinaryHeap<Reverse<usize>> =
            (0..n).filter(|&i| in_degree[i] == 0).map(Reverse).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(Reverse(i)) = ready.pop() {
            order.push(i);
            for &(from, to) in &self.edges {
                if from == i {
                    in_degree[to] -= 1;
                    if in_degree[to] == 0 {
                        ready.push(Reverse(to));
                    }
                }
            }
        }
        order
    }

    /// Cached execution order.
    pub fn execution_order(&mut self) -> &[usize] {
        if self.order.is_none() {
            self.order = Some(self.topological_order());
        }
        self.order.as_deref().unwrap_or_default()
    }

    /// Validate widths for an external input of `input_len` and derive routing.
    /// Touches no node state.
    fn plan(&mut self, input_len: usize) -> Result<Plan> {
        if self.nodes.is_empty() {
            return Err(RcError::InvalidState("model has no nodes".into()));
        }
        let order = self.execution_order().to_vec();
        let n = self.nodes.len();

        let mut preds = vec![Vec::new(); n];
        for &(from, to) in &self.edges {
            preds[to].push(from);
        }

        let sources = self.sources();
        let mut source_ranges = vec![None; n];
        if let [only] = sources[..] {
            if let Some(dim) = self.nodes[only].input_dim() {
                if dim != input_len {
                    return Err(RcError::dims("model input", dim, input_len));
                }
            }
            source_ranges[only] = Some(0..input_len);
        } else {
            let mut offset = 0;
            for &s in &sources {
                let dim = self.nodes[s].input_dim().ok_or_else(|| {
                    RcError::InvalidState(format!(
                        "source node {s} has no declared input_dim, cannot split input between {} sources",
                        sources.len()
                    ))
                })?;
                source_ranges[s] = Some(offset..offset + dim);
                offset += dim;
            }
            if offset != input_len {
                return Err(RcError::dims("model input", offset, input_len));
            }
        }

        for (i, p) in preds.iter().enumerate() {
            if p.is_empty() {
                continue;
            }
            if let Some(expected) = self.nodes[i].input_dim() {
                let actual: usize = p.iter().map(|&j| self.nodes[j].output_dim()).sum();
                if expected != actual {
                    return Err(RcError::dims("node input from predecessors", expected, actual));
                }
            }
        }

        Ok(Plan {
            order,
            preds,
            source_ranges,
            sinks: self.sinks(),
        })
    }

    fn gather_input(plan: &Plan, idx: usize, input: &[f32], outputs: &[Option<Vec<f32>>]) -> Result<Vec<f32>> {
        if let Some(range) = &plan.source_ranges[idx] {
            return Ok(input[range.clone()].to_vec());
        }
        let mut buf = Vec::new();
        for &p in &plan.preds[idx] {
            let out = outputs[p]
                .as_ref()
                .ok_or_else(|| RcError::InvalidState(format!("node {p} has not produced output")))?;
            buf.extend_from_slice(out);
        }
        Ok(buf)
    }

    /// Execute the nodes of `plan.order` for which `include` holds.
    fn step(
        &mut self,
        plan: &Plan,
        input: &[f32],
        include: impl Fn(usize) -> bool,
    ) -> Result<Vec<Option<Vec<f32>>>> {
        let mut outputs: Vec<Option<Vec<f32>>> = vec![None; self.nodes.len()];
        for &idx in plan.order.iter().filter(|&&i| include(i)) {
            let x = Self::gather_input(plan, idx, input, &outputs)?;
            outputs[idx] = Some(self.nodes[idx].forward(&x)?);
        }
        Ok(outputs)
    }

    /// Advance every node by one time step and return the sink outputs,
    /// concatenated in index order.
    ///
    /// Widths are checked before any node runs. A node failing mid-run
    /// (e.g. an untrained readout) leaves the nodes executed before it
    /// advanced.
    pub fn run(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        let plan = self.plan(input.len())?;
        trace!(input_len = input.len(), nodes = plan.order.len(), "model run");
        let mut outputs = self.step(&plan, input, |_| true)?;

        let mut result = Vec::with_capacity(self.output_dim());
        for &s in &plan.sinks {
            if let Some(out) = outputs[s].take() {
                result.extend(out);
            }
        }
        Ok(result)
    }

    /// Train every trainable node on `batch_size` time steps.
    ///
    /// `x_train` holds one input row per step; `y_train` holds one target
    /// row per step, made of the trainable nodes' output widths in
    /// execution order. The first `warmup` steps drive the state but are
    /// not used as training rows. Node states are restored to their
    /// values at call time before returning, whether training succeeded
    /// or not.
    pub fn fit(&mut self, x_train: &[f32], y_train: &[f32], batch_size: usize, warmup: usize) -> Result<()> {
        if batch_size == 0 || batch_size <= warmup {
            return Err(RcError::dims(
                "fit batch_size (must exceed warmup)",
                warmup.saturating_add(1),
                batch_size,
            ));
        }
        if self.nodes.is_empty() {
            return Err(RcError::InvalidState("model has no nodes".into()));
        }

        let in_width = match self.input_dim() {
            Some(w) => w,
            None => {
                if x_train.len() % batch_size != 0 || x_train.is_empty() {
                    return Err(RcError::dims("fit x_train length", batch_size, x_train.len()));
                }
                x_train.len() / batch_size
            }
        };
        let x_len = batch_size
            .checked_mul(in_width)
            .ok_or_else(|| RcError::dims("fit x_train length", usize::MAX, x_train.len()))?;
        if x_train.len() != x_len {
            return Err(RcError::dims("fit x_train length", x_len, x_train.len()));
        }

        let plan = self.plan(in_width)?;
        let trainable = self.trainable_nodes();
        if trainable.is_empty() {
            return Err(RcError::InvalidState("model has no trainable nodes".into()));
        }

        let out_width: usize = trainable.iter().map(|&i| self.nodes[i].output_dim()).sum();
        let y_len = batch_size
            .checked_mul(out_width)
            .ok_or_else(|| RcError::dims("fit y_train length", usize::MAX, y_train.len()))?;
        if y_train.len() != y_len {
            return Err(RcError::dims("fit y_train length", y_len, y_train.len()));
        }

        let batch = Batch {
            x: x_train,
            y: y_train,
            in_width,
            out_width,
            batch_size,
            warmup,
        };
        let snapshot: Vec<Vec<f32>> = self.nodes.iter().map(|n| n.state()).collect();
        let result = self.fit_nodes(&plan, &trainable, &snapshot, &batch);
        let restored = self.restore(&snapshot);
        result.and(restored)
    }

    fn fit_nodes(&mut self, plan: &Plan, trainable: &[usize], snapshot: &[Vec<f32>], batch: &Batch<'_>) -> Result<()> {
        let rows = batch.batch_size - batch.warmup;
        let mut target_offset = 0;

        for &t in trainable {
            self.restore(snapshot)?;
            let ancestors = self.ancestors(t);
            let k = self.nodes[t].output_dim();

            let mut design = Vec::with_capacity(rows);
            let mut targets = Vec::with_capacity(rows);
            for step in 0..batch.batch_size {
                let x = &batch.x[step * batch.in_width..(step + 1) * batch.in_width];
                let outputs = self.step(plan, x, |i| ancestors[i])?;
                if step < batch.warmup {
                    continue;
                }
                design.push(Self::gather_input(plan, t, x, &outputs)?);
                let row = step * batch.out_width + target_offset;
                targets.push(batch.y[row..row + k].to_vec());
            }

            debug!(node = t, rows = design.len(), warmup = batch.warmup, "fitting trainable node");
            match self.nodes[t].as_trainable() {
                Some(node) => node.fit(&design, &targets)?,
                None => return Err(RcError::InvalidState(format!("node {t} is not trainable"))),
            }
            target_offset += k;
        }
        Ok(())
    }

    /// Trainable nodes in execution order.
    pub fn trainable_nodes(&mut self) -> Vec<usize> {
        let order = self.execution_order().to_vec();
        order
            .into_iter()
            .filter(|&i| self.nodes[i].as_trainable().is_some())
            .collect()
    }

    /// Width of one `y_train` row for [`Model::fit`].
    pub fn target_dim(&mut self) -> usize {
        self.trainable_nodes()
            .iter()
            .map(|&i| self.nodes[i].output_dim())
            .sum()
    }

    /// Mask of nodes upstream of `target` (excluding `target`).
    fn ancestors(&self, target: usize) -> Vec<bool> {
        let mut mask = vec![false; self.nodes.len()];
        let mut stack = vec![target];
        while let Some(i) = stack.pop() {
            for &(from, to) in &self.edges {
                if to == i && !mask[from] {
                    mask[from] = true;
                    stack.push(from);
                }
            }
        }
        mask
    }

    fn restore(&mut self, snapshot: &[Vec<f32>]) -> Result<()> {
        for (node, state) in self.nodes.iter_mut().zip(snapshot) {
            node.set_state(state)?;
        }
        Ok(())
    }

    /// Zero every node's state. Trained weights are kept.
    pub fn reset(&mut self) {
        for node in &mut self.nodes {
            node.reset();
        }
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<NodeKind> = self.nodes.iter().map(|n| n.kind()).collect();
        f.debug_struct("Model")
            .field("nodes", &kinds)
            .field("names", &self.names)
            .field("edges", &self.edges)
            .finish()
    }
}
