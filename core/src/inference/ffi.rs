//! FFI declarations for the MXNet C prediction API (`mxnet/c_predict_api.h`).
//!
//! This module contains the raw FFI bindings. Use the safe wrappers
//! in the `predictor` module instead of calling these directly.

use std::ffi::c_void;
#[cfg(feature = "mxnet")]
use std::os::raw::{c_char, c_int};

/// `mx_uint` in the C headers.
pub type MxUint = u32;

/// `mx_float` in the C headers.
pub type MxFloat = f32;

/// Opaque handle to a native predictor.
pub type PredictorHandle = *mut c_void;

#[cfg(feature = "mxnet")]
extern "C" {
    // Error reporting
    pub fn MXGetLastError() -> *const c_char;

    // Predictor lifecycle
    pub fn MXPredCreate(
        symbol_json_str: *const c_char,
        param_bytes: *const c_void,
        param_size: c_int,
        dev_type: c_int,
        dev_id: c_int,
        num_input_nodes: MxUint,
        input_keys: *const *const c_char,
        input_shape_indptr: *const MxUint,
        input_shape_data: *const MxUint,
        out: *mut PredictorHandle,
    ) -> c_int;
    pub fn MXPredCreatePartialOut(
        symbol_json_str: *const c_char,
        param_bytes: *const c_void,
        param_size: c_int,
        dev_type: c_int,
        dev_id: c_int,
        num_input_nodes: MxUint,
        input_keys: *const *const c_char,
        input_shape_indptr: *const MxUint,
        input_shape_data: *const MxUint,
        num_output_nodes: MxUint,
        output_keys: *const *const c_char,
        out: *mut PredictorHandle,
    ) -> c_int;
    pub fn MXPredFree(handle: PredictorHandle) -> c_int;

    // Inference
    pub fn MXPredSetInput(
        handle: PredictorHandle,
        key: *const c_char,
        data: *const MxFloat,
        size: MxUint,
    ) -> c_int;
    pub fn MXPredForward(handle: PredictorHandle) -> c_int;

    // Outputs
    pub fn MXPredGetOutputShape(
        handle: PredictorHandle,
        index: MxUint,
        shape_data: *mut *mut MxUint,
        shape_ndim: *mut MxUint,
    ) -> c_int;
    pub fn MXPredGetOutput(
        handle: PredictorHandle,
        index: MxUint,
        data: *mut MxFloat,
        size: MxUint,
    ) -> c_int;
}
