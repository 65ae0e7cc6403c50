// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! C interface to the rwkvoir engine (see `include/rwkvoir.h`).
//!
//! Nodes and models are opaque heap handles. Failures are reported by a
//! sentinel return value (NULL, `false`, `-1`, `0`) and a thread-local
//! message readable through [`rwkvoir_last_error`].
//!
//! Output buffers: if `*out` is NULL the library allocates the result
//! with the C allocator and the caller releases it with `free()` or
//! [`rwkvoir_buffer_free`]. Otherwise `*out`
//! is a caller buffer of capacity `*out_len` floats that must be large
//! enough to hold the result.
//!
//! # Safety
//!
//! Every pointer argument must be NULL or valid for the access the
//! function documents. Handles must come from this library and must not
//! be used after they are freed. A node handle passed to
//! [`rwkvoir_model_add_node`] stays valid until its model is freed.

#![allow(non_camel_case_types)]
#![allow(clippy::missing_safety_doc)]

use std::cell::RefCell;
use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;

use rwkvoir_engine::{
    Activation, Input, Model, Node, NodeKind, RcError, Reservoir, ReservoirParams, Ridge, RidgeParams,
    UntrainedPolicy,
};
use tracing::debug;

pub const RWKVOIR_NODE_RESERVOIR: c_int = 0;
pub const RWKVOIR_NODE_RIDGE: c_int = 1;
pub const RWKVOIR_NODE_INPUT: c_int = 2;
pub const RWKVOIR_NODE_CUSTOM: c_int = 3;

pub const RWKVOIR_ACTIVATION_TANH: c_int = 0;
pub const RWKVOIR_ACTIVATION_SIGMOID: c_int = 1;
pub const RWKVOIR_ACTIVATION_RELU: c_int = 2;
pub const RWKVOIR_ACTIVATION_IDENTITY: c_int = 3;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct rwkvoir_reservoir_params {
    pub units: usize,
    pub spectral_radius: f32,
    pub leak_rate: f32,
    pub input_scaling: f32,
    pub sparsity: f32,
    /// One of the `RWKVOIR_ACTIVATION_*` constants
    pub activation: c_int,
    pub seed: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct rwkvoir_ridge_params {
    pub ridge: f32,
    pub input_dim: usize,
    pub output_dim: usize,
}

/// Node handle. Empty once adopted by a model.
pub struct rwkvoir_node {
    node: Option<Box<dyn Node>>,
    adopted: bool,
}

impl rwkvoir_node {
    fn get(&self) -> Result<&(dyn Node + 'static), RcError> {
        self.node.as_deref().ok_or_else(adopted_error)
    }

    fn get_mut(&mut self) -> Result<&mut (dyn Node + 'static), RcError> {
        self.node.as_deref_mut().ok_or_else(adopted_error)
    }
}

/// Model handle. Keeps the shells of adopted node handles alive so that
/// `rwkvoir_node_free` on them stays a no-op until the model is freed.
pub struct rwkvoir_model {
    model: Model,
    adopted: Vec<Box<rwkvoir_node>>,
}

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn record_error(err: &RcError) {
    debug!(error = %err, "rwkvoir C call failed");
    let msg = CString::new(err.to_string().replace('\0', " ")).ok();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = msg);
}

/// Run `f`, turning errors and panics into `fallback`.
fn guard<T>(fallback: T, f: impl FnOnce() -> Result<T, RcError>) -> T {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => value,
        Ok(Err(err)) => {
            record_error(&err);
            fallback
        }
        Err(_) => {
            record_error(&RcError::InvalidState("internal panic".into()));
            fallback
        }
    }
}

fn null_arg(what: &str) -> RcError {
    RcError::InvalidParameter(format!("{what} pointer is NULL"))
}

fn adopted_error() -> RcError {
    RcError::InvalidState("node handle is owned by a model".into())
}

fn activation_from_c(code: c_int) -> Result<Activation, RcError> {
    match code {
        RWKVOIR_ACTIVATION_TANH => Ok(Activation::Tanh),
        RWKVOIR_ACTIVATION_SIGMOID => Ok(Activation::Sigmoid),
        RWKVOIR_ACTIVATION_RELU => Ok(Activation::Relu),
        RWKVOIR_ACTIVATION_IDENTITY => Ok(Activation::Identity),
        other => Err(RcError::InvalidParameter(format!("unknown activation {other}"))),
    }
}

fn into_handle(node: Box<dyn Node>) -> *mut rwkvoir_node {
    Box::into_raw(Box::new(rwkvoir_node {
        node: Some(node),
        adopted: false,
    }))
}

unsafe fn input_slice<'a>(data: *const f32, len: usize, what: &str) -> Result<&'a [f32], RcError> {
    if len == 0 {
        return Ok(&[]);
    }
    if data.is_null() {
        return Err(null_arg(what));
    }
    Ok(std::slice::from_raw_parts(data, len))
}

extern "C" {
    fn malloc(size: usize) -> *mut c_void;
    fn free(ptr: *mut c_void);
}

/// Copy `data` into a `malloc`ed block so C callers can `free()` it.
unsafe fn c_alloc_copy(data: &[f32]) -> Result<*mut f32, RcError> {
    let bytes = data
        .len()
        .checked_mul(std::mem::size_of::<f32>())
        .ok_or_else(|| RcError::AllocationFailure(format!("{} floats overflow usize", data.len())))?;
    let block = malloc(bytes).cast::<f32>();
    if block.is_null() {
        return Err(RcError::AllocationFailure(format!("malloc of {bytes} bytes failed")));
    }
    ptr::copy_nonoverlapping(data.as_ptr(), block, data.len());
    Ok(block)
}

unsafe fn write_buffer(data: Vec<f32>, out: *mut *mut f32, out_len: *mut usize) -> Result<(), RcError> {
    if out.is_null() || out_len.is_null() {
        return Err(null_arg("output"));
    }
    if (*out).is_null() {
        *out = if data.is_empty() {
            ptr::null_mut()
        } else {
            c_alloc_copy(&data)?
        };
        *out_len = data.len();
    } else {
        let capacity = *out_len;
        if data.len() > capacity {
            return Err(RcError::DimensionMismatch {
                context: "caller output buffer",
                expected: data.len(),
                actual: capacity,
            });
        }
        ptr::copy_nonoverlapping(data.as_ptr(), *out, data.len());
        *out_len = data.len();
    }
    Ok(())
}

fn to_index(idx: c_int) -> Result<usize, RcError> {
    usize::try_from(idx).map_err(|_| RcError::InvalidIndex(format!("negative node index {idx}")))
}

// ─── Nodes ──────────────────────────────────────────

#[no_mangle]
pub unsafe extern "C" fn rwkvoir_create_reservoir(params: *const rwkvoir_reservoir_params) -> *mut rwkvoir_node {
    guard(ptr::null_mut(), || {
        let p = params.as_ref().ok_or_else(|| null_arg("params"))?;
        let params = ReservoirParams {
            units: p.units,
            spectral_radius: p.spectral_radius,
            leak_rate: p.leak_rate,
            input_scaling: p.input_scaling,
            sparsity: p.sparsity,
            activation: activation_from_c(p.activation)?,
            seed: u64::from(p.seed),
            input_dim: None,
        };
        Ok(into_handle(Box::new(Reservoir::new(params)?)))
    })
}

/// Readouts created here return zeros until fitted.
#[no_mangle]
pub unsafe extern "C" fn rwkvoir_create_ridge(params: *const rwkvoir_ridge_params) -> *mut rwkvoir_node {
    guard(ptr::null_mut(), || {
        let p = params.as_ref().ok_or_else(|| null_arg("params"))?;
        let params = RidgeParams::new(p.ridge, p.input_dim, p.output_dim)
            .with_untrained_policy(UntrainedPolicy::ZeroOutput);
        Ok(into_handle(Box::new(Ridge::new(params)?)))
    })
}

#[no_mangle]
pub extern "C" fn rwkvoir_create_input(input_dim: usize) -> *mut rwkvoir_node {
    guard(ptr::null_mut(), || Ok(into_handle(Box::new(Input::new(input_dim)?))))
}

#[no_mangle]
pub unsafe extern "C" fn rwkvoir_node_forward(
    node: *mut rwkvoir_node,
    input: *const f32,
    input_len: usize,
    output: *mut *mut f32,
    output_len: *mut usize,
) -> bool {
    guard(false, || {
        let node = node.as_mut().ok_or_else(|| null_arg("node"))?.get_mut()?;
        let input = input_slice(input, input_len, "input")?;
        let out = node.forward(input)?;
        write_buffer(out, output, output_len)?;
        Ok(true)
    })
}

#[no_mangle]
pub unsafe extern "C" fn rwkvoir_node_get_state(
    node: *const rwkvoir_node,
    state: *mut *mut f32,
    state_len: *mut usize,
) -> bool {
    guard(false, || {
        let node = node.as_ref().ok_or_else(|| null_arg("node"))?.get()?;
        write_buffer(node.state(), state, state_len)?;
        Ok(true)
    })
}

#[no_mangle]
pub unsafe extern "C" fn rwkvoir_node_set_state(node: *mut rwkvoir_node, state: *const f32, state_len: usize) -> bool {
    guard(false, || {
        let node = node.as_mut().ok_or_else(|| null_arg("node"))?.get_mut()?;
        node.set_state(input_slice(state, state_len, "state")?)?;
        Ok(true)
    })
}

#[no_mangle]
pub unsafe extern "C" fn rwkvoir_node_reset(node: *mut rwkvoir_node) {
    guard((), || {
        node.as_mut().ok_or_else(|| null_arg("node"))?.get_mut()?.reset();
        Ok(())
    })
}

#[no_mangle]
pub unsafe extern "C" fn rwkvoir_node_get_output_dim(node: *const rwkvoir_node) -> usize {
    guard(0, || Ok(node.as_ref().ok_or_else(|| null_arg("node"))?.get()?.output_dim()))
}

#[no_mangle]
pub unsafe extern "C" fn rwkvoir_node_get_state_dim(node: *const rwkvoir_node) -> usize {
    guard(0, || Ok(node.as_ref().ok_or_else(|| null_arg("node"))?.get()?.state_dim()))
}

/// `RWKVOIR_NODE_*` tag, or -1.
#[no_mangle]
pub unsafe extern "C" fn rwkvoir_node_get_type(node: *const rwkvoir_node) -> c_int {
    guard(-1, || {
        let kind = node.as_ref().ok_or_else(|| null_arg("node"))?.get()?.kind();
        Ok(match kind {
            NodeKind::Reservoir => RWKVOIR_NODE_RESERVOIR,
            NodeKind::Ridge => RWKVOIR_NODE_RIDGE,
            NodeKind::Input => RWKVOIR_NODE_INPUT,
            NodeKind::Custom => RWKVOIR_NODE_CUSTOM,
        })
    })
}

/// No-op for NULL and for handles adopted by a model.
#[no_mangle]
pub unsafe extern "C" fn rwkvoir_node_free(node: *mut rwkvoir_node) {
    if node.is_null() || (*node).adopted {
        return;
    }
    drop(Box::from_raw(node));
}

// ─── Models ─────────────────────────────────────────

#[no_mangle]
pub extern "C" fn rwkvoir_model_create() -> *mut rwkvoir_model {
    Box::into_raw(Box::new(rwkvoir_model {
        model: Model::new(),
        adopted: Vec::new(),
    }))
}

/// Transfer `node` into `model`. Returns its index, or -1.
#[no_mangle]
pub unsafe extern "C" fn rwkvoir_model_add_node(
    model: *mut rwkvoir_model,
    node: *mut rwkvoir_node,
    name: *const c_char,
) -> c_int {
    guard(-1, || {
        let model = model.as_mut().ok_or_else(|| null_arg("model"))?;
        let handle = node.as_mut().ok_or_else(|| null_arg("node"))?;
        if handle.adopted || handle.node.is_none() {
            return Err(adopted_error());
        }
        let name = if name.is_null() {
            None
        } else {
            Some(
                CStr::from_ptr(name)
                    .to_str()
                    .map_err(|_| RcError::InvalidParameter("node name is not valid UTF-8".into()))?,
            )
        };
        if let Some(name) = name {
            if model.model.node_index(name).is_some() {
                return Err(RcError::InvalidState(format!("node name '{name}' already in use")));
            }
        }
        let index = c_int::try_from(model.model.node_count())
            .map_err(|_| RcError::InvalidState("model node limit reached".into()))?;

        let inner = handle.node.take().ok_or_else(adopted_error)?;
        handle.adopted = true;
        model.adopted.push(Box::from_raw(node));
        model.model.add_node(inner, name)?;
        Ok(index)
    })
}

#[no_mangle]
pub unsafe extern "C" fn rwkvoir_model_connect(model: *mut rwkvoir_model, from_idx: c_int, to_idx: c_int) -> bool {
    guard(false, || {
        let model = model.as_mut().ok_or_else(|| null_arg("model"))?;
        model.model.connect(to_index(from_idx)?, to_index(to_idx)?)?;
        Ok(true)
    })
}

#[no_mangle]
pub unsafe extern "C" fn rwkvoir_model_run(
    model: *mut rwkvoir_model,
    input: *const f32,
    input_len: usize,
    output: *mut *mut f32,
    output_len: *mut usize,
) -> bool {
    guard(false, || {
        let model = model.as_mut().ok_or_else(|| null_arg("model"))?;
        let out = model.model.run(input_slice(input, input_len, "input")?)?;
        write_buffer(out, output, output_len)?;
        Ok(true)
    })
}

/// `x_train` holds `batch_size × input_dim` floats and `y_train`
/// `batch_size × Σ readout output_dim` floats.
#[no_mangle]
pub unsafe extern "C" fn rwkvoir_model_fit(
    model: *mut rwkvoir_model,
    x_train: *const f32,
    y_train: *const f32,
    batch_size: usize,
    warmup: usize,
) -> bool {
    guard(false, || {
        let model = &mut model.as_mut().ok_or_else(|| null_arg("model"))?.model;
        let in_dim = model
            .input_dim()
            .ok_or_else(|| RcError::InvalidState("model input width is not known".into()))?;
        let overflow = || RcError::InvalidParameter(format!("batch_size {batch_size} too large"));
        let x_len = batch_size.checked_mul(in_dim).ok_or_else(overflow)?;
        let y_len = batch_size.checked_mul(model.target_dim()).ok_or_else(overflow)?;

        let x = input_slice(x_train, x_len, "X_train")?;
        let y = input_slice(y_train, y_len, "y_train")?;
        model.fit(x, y, batch_size, warmup)?;
        Ok(true)
    })
}

#[no_mangle]
pub unsafe extern "C" fn rwkvoir_model_reset(model: *mut rwkvoir_model) {
    if let Some(model) = model.as_mut() {
        model.model.reset();
    }
}

#[no_mangle]
pub unsafe extern "C" fn rwkvoir_model_get_node_count(model: *const rwkvoir_model) -> usize {
    model.as_ref().map_or(0, |m| m.model.node_count())
}

#[no_mangle]
pub unsafe extern "C" fn rwkvoir_model_get_output_dim(model: *const rwkvoir_model) -> usize {
    model.as_ref().map_or(0, |m| m.model.output_dim())
}

/// Frees the model, its nodes and the handles it adopted.
#[no_mangle]
pub unsafe extern "C" fn rwkvoir_model_free(model: *mut rwkvoir_model) {
    if !model.is_null() {
        drop(Box::from_raw(model));
    }
}

// ─── Buffers and errors ─────────────────────────────

/// Release a buffer allocated by this library. Equivalent to `free()`;
/// `len` is accepted for symmetry with the allocating calls.
#[no_mangle]
pub unsafe extern "C" fn rwkvoir_buffer_free(buffer: *mut f32, _len: usize) {
    if !buffer.is_null() {
        free(buffer.cast::<c_void>());
    }
}

/// Message of the most recent failure on this thread, or NULL. Valid
/// until the next failing call on the same thread.
#[no_mangle]
pub extern "C" fn rwkvoir_last_error() -> *const c_char {
    LAST_ERROR.with(|slot| slot.borrow().as_ref().map_or(ptr::null(), |msg| msg.as_ptr()))
}
