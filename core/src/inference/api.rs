//! The seam between `Predictor` and the native prediction library.
//!
//! [`PredictApi`] mirrors the C entry points one-to-one, taking arguments
//! that have already been marshalled and returning the raw status code.
//! [`MxNet`] forwards to the linked `libmxnet` (cargo feature `mxnet`).

use std::ffi::CStr;
use std::os::raw::{c_char, c_int};

use super::ffi::{MxFloat, MxUint, PredictorHandle};

/// Marshalled arguments shared by both creation entry points.
#[derive(Debug, Clone, Copy)]
pub struct CreateArgs<'a> {
    /// Symbol graph as a C string.
    pub symbol: &'a CStr,
    /// Parameter bytes; the length fits in a `c_int`.
    pub params: &'a [u8],
    pub dev_type: c_int,
    pub dev_id: c_int,
    /// Number of input nodes, range-checked when the keys were marshalled.
    pub num_input_nodes: MxUint,
    /// One key pointer per input node.
    pub input_keys: &'a [*const c_char],
    /// `input_keys.len() + 1` offsets into `input_shape_data`.
    pub input_shape_indptr: &'a [MxUint],
    pub input_shape_data: &'a [MxUint],
}

/// Native prediction operations.
///
/// Implementations must not cache the last-error string: [`last_error`]
/// describes only the most recent failing call, and is shared process-wide
/// by the native library, so calls from several threads must be serialized
/// by the caller for the message to be meaningful.
///
/// # Safety
///
/// For every `unsafe` method, pointer arguments must be valid for the
/// duration of the call and `handle` must come from a successful create
/// on the same implementation and must not have been freed.
///
/// [`last_error`]: PredictApi::last_error
pub trait PredictApi {
    /// `MXPredCreate`. Negative status is failure.
    ///
    /// # Safety
    /// Every pointer in `args.input_keys` must be a valid C string.
    unsafe fn create(&self, args: &CreateArgs<'_>, out: &mut PredictorHandle) -> c_int;

    /// `MXPredCreatePartialOut`. Non-zero status is failure.
    ///
    /// # Safety
    /// Every pointer in `args.input_keys` and `output_keys` must be a valid C string.
    unsafe fn create_partial_out(
        &self,
        args: &CreateArgs<'_>,
        output_keys: &[*const c_char],
        out: &mut PredictorHandle,
    ) -> c_int;

    /// `MXPredSetInput`.
    ///
    /// # Safety
    /// `handle` must be live.
    unsafe fn set_input(&self, handle: PredictorHandle, key: &CStr, data: &[MxFloat]) -> c_int;

    /// `MXPredForward`.
    ///
    /// # Safety
    /// `handle` must be live.
    unsafe fn forward(&self, handle: PredictorHandle) -> c_int;

    /// `MXPredGetOutputShape`. On success `shape_data` points to `shape_ndim`
    /// values owned by the library, valid until the next call on `handle`.
    ///
    /// # Safety
    /// `handle` must be live.
    unsafe fn output_shape(
        &self,
        handle: PredictorHandle,
        index: MxUint,
        shape_data: &mut *const MxUint,
        shape_ndim: &mut MxUint,
    ) -> c_int;

    /// `MXPredGetOutput`, filling all of `data`.
    ///
    /// # Safety
    /// `handle` must be live.
    unsafe fn output(&self, handle: PredictorHandle, index: MxUint, data: &mut [MxFloat])
        -> c_int;

    /// `MXPredFree`. The handle is released whatever the status.
    ///
    /// # Safety
    /// `handle` must be live and is dangling afterwards.
    unsafe fn free(&self, handle: PredictorHandle) -> c_int;

    /// `MXGetLastError`, copied into an owned string.
    fn last_error(&self) -> String;
}

/// The linked MXNet library.
#[cfg(feature = "mxnet")]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MxNet;

#[cfg(feature = "mxnet")]
impl PredictApi for MxNet {
    unsafe fn create(&self, args: &CreateArgs<'_>, out: &mut PredictorHandle) -> c_int {
        super::ffi::MXPredCreate(
            args.symbol.as_ptr(),
            args.params.as_ptr().cast(),
            args.params.len() as c_int,
            args.dev_type,
            args.dev_id,
            args.num_input_nodes,
            args.input_keys.as_ptr(),
            args.input_shape_indptr.as_ptr(),
            args.input_shape_data.as_ptr(),
            out,
        )
    }

    unsafe fn create_partial_out(
        &self,
        args: &CreateArgs<'_>,
        output_keys: &[*const c_char],
        out: &mut PredictorHandle,
    ) -> c_int {
        super::ffi::MXPredCreatePartialOut(
            args.symbol.as_ptr(),
            args.params.as_ptr().cast(),
            args.params.len() as c_int,
            args.dev_type,
            args.dev_id,
            args.num_input_nodes,
            args.input_keys.as_ptr(),
            args.input_shape_indptr.as_ptr(),
            args.input_shape_data.as_ptr(),
            output_keys.len() as MxUint,
            output_keys.as_ptr(),
            out,
        )
    }

    unsafe fn set_input(&self, handle: PredictorHandle, key: &CStr, data: &[MxFloat]) -> c_int {
        super::ffi::MXPredSetInput(handle, key.as_ptr(), data.as_ptr(), data.len() as MxUint)
    }

    unsafe fn forward(&self, handle: PredictorHandle) -> c_int {
        super::ffi::MXPredForward(handle)
    }

    unsafe fn output_shape(
        &self,
        handle: PredictorHandle,
        index: MxUint,
        shape_data: &mut *const MxUint,
        shape_ndim: &mut MxUint,
    ) -> c_int {
        let mut data: *mut MxUint = std::ptr::null_mut();
        let code = super::ffi::MXPredGetOutputShape(handle, index, &mut data, shape_ndim);
        *shape_data = data;
        code
    }

    unsafe fn output(
        &self,
        handle: PredictorHandle,
        index: MxUint,
        data: &mut [MxFloat],
    ) -> c_int {
        super::ffi::MXPredGetOutput(handle, index, data.as_mut_ptr(), data.len() as MxUint)
    }

    unsafe fn free(&self, handle: PredictorHandle) -> c_int {
        super::ffi::MXPredFree(handle)
    }

    fn last_error(&self) -> String {
        unsafe {
            let err_ptr = super::ffi::MXGetLastError();
            if err_ptr.is_null() {
                "Unknown error".to_string()
            } else {
                CStr::from_ptr(err_ptr).to_string_lossy().into_owned()
            }
        }
    }
}

impl<T: PredictApi + ?Sized> PredictApi for &T {
    unsafe fn create(&self, args: &CreateArgs<'_>, out: &mut PredictorHandle) -> c_int {
        (**self).create(args, out)
    }

    unsafe fn create_partial_out(
        &self,
        args: &CreateArgs<'_>,
        output_keys: &[*const c_char],
        out: &mut PredictorHandle,
    ) -> c_int {
        (**self).create_partial_out(args, output_keys, out)
    }

    unsafe fn set_input(&self, handle: PredictorHandle, key: &CStr, data: &[MxFloat]) -> c_int {
        (**self).set_input(handle, key, data)
    }

    unsafe fn forward(&self, handle: PredictorHandle) -> c_int {
        (**self).forward(handle)
    }

    unsafe fn output_shape(
        &self,
        handle: PredictorHandle,
        index: MxUint,
        shape_data: &mut *const MxUint,
        shape_ndim: &mut MxUint,
    ) -> c_int {
        (**self).output_shape(handle, index, shape_data, shape_ndim)
    }

    unsafe fn output(
        &self,
        handle: PredictorHandle,
        index: MxUint,
        data: &mut [MxFloat],
    ) -> c_int {
        (**self).output(handle, index, data)
    }

    unsafe fn free(&self, handle: PredictorHandle) -> c_int {
        (**self).free(handle)
    }

    fn last_error(&self) -> String {
        (**self).last_error()
    }
}
