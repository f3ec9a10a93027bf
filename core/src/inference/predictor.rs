//! Safe wrapper around a native predictor handle.
//!
//! A [`Predictor`] owns exactly one handle. Inputs are staged with
//! [`Predictor::set_input`], executed with [`Predictor::forward`] and read
//! back with [`Predictor::output`]; [`Predictor::free`] consumes the value,
//! so a released handle can never be used again.

use std::borrow::Cow;
use std::ffi::{CStr, CString};
use std::fmt;
use std::os::raw::c_int;
use std::ptr;

use ndarray::{ArrayD, IxDyn};
use tracing::{debug, trace, warn};

use super::api::{CreateArgs, PredictApi};
#[cfg(feature = "mxnet")]
use super::api::MxNet;
use super::ffi::{MxUint, PredictorHandle};
use super::marshal::{c_string, CStrTable, InputTable};
use super::options::{InputNode, Options};
use crate::error::{MxError, Result};

/// Output tensor copied out of a predictor.
#[derive(Debug, Clone)]
pub struct TensorData {
    /// The tensor data as a dynamic-dimensional array.
    pub data: ArrayD<f32>,
}

impl TensorData {
    /// Get the shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Get the number of dimensions.
    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    /// Get the total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the tensor is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Turn a native status into a `Result`, fetching the last-error message
/// immediately when the call failed.
fn check<A: PredictApi>(api: &A, op: &'static str, code: c_int, failed: bool) -> Result<()> {
    if failed {
        Err(MxError::native(op, code, api.last_error()))
    } else {
        Ok(())
    }
}

/// Extend `data` with zero-valued samples until it holds `batch_size`
/// samples of `key`'s per-sample shape. Batch size 1 passes data through.
pub(crate) fn pad_to_batch<'a>(
    options: &Options,
    key: &str,
    data: &'a [f32],
) -> Result<Cow<'a, [f32]>> {
    let batch_size = options.batch_size();
    if batch_size == 1 {
        return Ok(Cow::Borrowed(data));
    }

    let shape = options
        .input_node(key)
        .map(InputNode::sample_shape)
        .unwrap_or(&[]);
    if shape.len() != 3 {
        return Err(MxError::validation(format!(
            "invalid input shape for {}: {:?}",
            key, shape
        )));
    }

    let sample_len = shape.iter().map(|&d| d as usize).product::<usize>();
    if sample_len == 0 {
        return Err(MxError::validation(format!(
            "invalid input shape for {}: {:?}",
            key, shape
        )));
    }
    let samples = data.len() / sample_len;
    let batch_size = batch_size as usize;
    if samples > batch_size {
        return Err(MxError::validation(format!(
            "input {} holds {} samples, more than batch size {}",
            key, samples, batch_size
        )));
    }
    if samples == batch_size {
        return Ok(Cow::Borrowed(data));
    }

    let padding = (batch_size - samples) * sample_len;
    let mut padded = Vec::with_capacity(data.len() + padding);
    padded.extend_from_slice(data);
    padded.resize(data.len() + padding, 0.0);
    trace!(key, samples, batch_size, padding, "padded input to batch size");
    Ok(Cow::Owned(padded))
}

/// A loaded, ready-to-run model instance.
///
/// The handle is released by [`Predictor::free`], or on drop if `free` was
/// never called. A predictor may move between threads but must not be used
/// from several threads at once.
///
/// # Example
///
/// ```ignore
/// use mxpredict::{Device, InputNode, Options, Predictor};
///
/// let options = Options::new()
///     .with_symbol(std::fs::read("model-symbol.json")?)
///     .with_weights(std::fs::read("model-0000.params")?)
///     .with_device(Device::cpu())
///     .with_input_node(InputNode::new("data", [1, 3, 224, 224]));
///
/// let mut predictor = Predictor::create(options)?;
/// predictor.set_input("data", &input)?;
/// predictor.forward()?;
/// let probs = predictor.output(0)?;
/// predictor.free()?;
/// ```
pub struct Predictor<A: PredictApi> {
    api: A,
    handle: PredictorHandle,
    options: Options,
}

impl<A: PredictApi> fmt::Debug for Predictor<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predictor")
            .field("handle", &self.handle)
            .field("device", &self.options.device())
            .field("inputs", &self.options.input_nodes())
            .field("output", &self.options.output_node())
            .finish()
    }
}

// SAFETY: the handle is only touched through `&mut self` or `&self` on a
// non-Sync value, so at most one thread uses it at a time.
unsafe impl<A: PredictApi + Send> Send for Predictor<A> {}

#[cfg(feature = "mxnet")]
impl Predictor<MxNet> {
    /// Create a predictor computing every output of the graph.
    pub fn create(options: Options) -> Result<Self> {
        Self::create_with(MxNet, options)
    }

    /// Create a predictor computing only `options.output_node()`.
    pub fn create_partial(options: Options) -> Result<Self> {
        Self::create_partial_with(MxNet, options)
    }
}

impl<A: PredictApi> Predictor<A> {
    /// Create a predictor computing every output of the graph.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the symbol, weights or input nodes are
    /// missing, and the library's last error if creation fails.
    pub fn create_with(api: A, options: Options) -> Result<Self> {
        options.validate()?;
        let symbol = c_string_bytes(options.symbol())?;
        let inputs = InputTable::new(options.input_nodes())?;
        let args = create_args(&options, &symbol, &inputs);

        let mut handle: PredictorHandle = ptr::null_mut();
        let code = unsafe { api.create(&args, &mut handle) };
        // Negative is failure for MXPredCreate.
        check(&api, "MXPredCreate", code, code < 0)?;
        Self::wrap(api, handle, options, None)
    }

    /// Create a predictor computing only the layer named by
    /// `options.output_node()`. Output index 0 then refers to that layer.
    ///
    /// # Errors
    ///
    /// As [`Predictor::create_with`], plus a validation error when no
    /// output node is set.
    pub fn create_partial_with(api: A, options: Options) -> Result<Self> {
        options.validate_partial()?;
        let symbol = c_string_bytes(options.symbol())?;
        let inputs = InputTable::new(options.input_nodes())?;
        let outputs = CStrTable::new(options.output_node(), "output node")?;
        let args = create_args(&options, &symbol, &inputs);

        let mut handle: PredictorHandle = ptr::null_mut();
        let code = unsafe { api.create_partial_out(&args, outputs.as_slice(), &mut handle) };
        check(&api, "MXPredCreatePartialOut", code, code != 0)?;
        let output = options.output_node().map(str::to_owned);
        Self::wrap(api, handle, options, output.as_deref())
    }

    /// `output` is the single layer requested from the library, or `None`
    /// when every output is computed.
    fn wrap(
        api: A,
        handle: PredictorHandle,
        options: Options,
        output: Option<&str>,
    ) -> Result<Self> {
        if handle.is_null() {
            return Err(MxError::native_call("creation succeeded but returned a null handle"));
        }
        debug!(
            device = %options.device(),
            inputs = options.input_nodes().len(),
            output = output.unwrap_or("*"),
            batch_size = options.batch_size(),
            "created predictor"
        );
        Ok(Self {
            api,
            handle,
            options,
        })
    }

    /// The options this predictor was created from.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Stage input data for the node named `key`.
    ///
    /// With a batch size other than 1 the data is padded with zeros up to
    /// a full batch of the node's per-sample shape.
    pub fn set_input(&mut self, key: &str, data: &[f32]) -> Result<()> {
        if data.is_empty() {
            return Err(MxError::validation("input data is empty"));
        }
        let data = pad_to_batch(&self.options, key, data)?;
        if MxUint::try_from(data.len()).is_err() {
            return Err(MxError::validation(format!(
                "input {} too large: {} elements",
                key,
                data.len()
            )));
        }
        let c_key = c_string(key, "input key")?;

        trace!(key, len = data.len(), "set input");
        let code = unsafe { self.api.set_input(self.handle, &c_key, &data) };
        check(&self.api, "MXPredSetInput", code, code != 0)
    }

    /// Run a forward pass over the staged inputs.
    pub fn forward(&mut self) -> Result<()> {
        trace!("forward");
        let code = unsafe { self.api.forward(self.handle) };
        check(&self.api, "MXPredForward", code, code != 0)
    }

    /// Shape of output `index` (0 for single-output models).
    pub fn output_shape(&self, index: u32) -> Result<Vec<u32>> {
        let mut shape_data: *const MxUint = ptr::null();
        let mut shape_ndim: MxUint = 0;
        let code = unsafe {
            self.api
                .output_shape(self.handle, index, &mut shape_data, &mut shape_ndim)
        };
        check(&self.api, "MXPredGetOutputShape", code, code != 0)?;

        if shape_ndim == 0 {
            return Ok(Vec::new());
        }
        if shape_data.is_null() {
            return Err(MxError::native_call(format!(
                "output {} reported {} dimensions but no shape data",
                index, shape_ndim
            )));
        }
        // The library owns this buffer; copy it before any other call.
        let shape = unsafe { std::slice::from_raw_parts(shape_data, shape_ndim as usize) };
        Ok(shape.to_vec())
    }

    /// Flattened data of output `index`, as many values as the product of
    /// its shape.
    pub fn output(&self, index: u32) -> Result<Vec<f32>> {
        let shape = self.output_shape(index)?;
        let size = shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d as usize))
            .filter(|&n| MxUint::try_from(n).is_ok())
            .ok_or_else(|| {
                MxError::native_call(format!("output {} shape {:?} is too large", index, shape))
            })?;

        let mut data = vec![0.0f32; size];
        trace!(index, size, "get output");
        let code = unsafe { self.api.output(self.handle, index, &mut data) };
        check(&self.api, "MXPredGetOutput", code, code != 0)?;
        Ok(data)
    }

    /// Output `index` as an n-dimensional array.
    pub fn output_tensor(&self, index: u32) -> Result<TensorData> {
        let shape: Vec<usize> = self.output_shape(index)?.iter().map(|&d| d as usize).collect();
        let data = self.output(index)?;
        let array = ArrayD::from_shape_vec(IxDyn(&shape), data)
            .map_err(|e| MxError::tensor(format!("Array shape error: {}", e)))?;
        Ok(TensorData { data: array })
    }

    /// Release the native handle.
    ///
    /// The handle is gone after this call even when an error is returned.
    pub fn free(mut self) -> Result<()> {
        let handle = std::mem::replace(&mut self.handle, ptr::null_mut());
        debug!("freeing predictor");
        let code = unsafe { self.api.free(handle) };
        check(&self.api, "MXPredFree", code, code != 0)
    }
}

impl<A: PredictApi> Drop for Predictor<A> {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            let code = unsafe { self.api.free(self.handle) };
            if code != 0 {
                warn!(code, error = %self.api.last_error(), "failed to free dropped predictor");
            }
            self.handle = ptr::null_mut();
        }
    }
}

fn c_string_bytes(bytes: &[u8]) -> Result<CString> {
    CString::new(bytes).map_err(|_| MxError::validation("symbol contains a NUL byte"))
}

fn create_args<'a>(
    options: &'a Options,
    symbol: &'a CStr,
    inputs: &'a InputTable,
) -> CreateArgs<'a> {
    let device = options.device();
    // Range of weights length and device id is checked by Options::validate.
    CreateArgs {
        symbol,
        params: options.weights(),
        dev_type: device.device_type().code(),
        dev_id: device.id() as c_int,
        num_input_nodes: inputs.num_nodes(),
        input_keys: inputs.keys.as_slice(),
        input_shape_indptr: &inputs.shapes.indptr,
        input_shape_data: &inputs.shapes.data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batched(batch_size: u32) -> Options {
        Options::new().with_batch_size(batch_size).with_input_nodes([
            InputNode::new("data", [4, 3, 2, 2]),
            InputNode::new("chw", [3, 2, 2]),
            InputNode::new("flat", [4, 12]),
        ])
    }

    #[test]
    fn test_no_padding_for_batch_one() {
        let data = vec![1.0; 5];
        let out = pad_to_batch(&batched(1), "missing", &data).unwrap();
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(out.len(), 5);
    }

    #[test]
    fn test_pads_single_sample_to_batch() {
        let data = vec![1.0; 12];
        let out = pad_to_batch(&batched(4), "data", &data).unwrap();
        assert_eq!(out.len(), 48);
        assert!(out[..12].iter().all(|&v| v == 1.0));
        assert!(out[12..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_three_dim_shape_is_per_sample() {
        let data = vec![2.0; 24];
        let out = pad_to_batch(&batched(3), "chw", &data).unwrap();
        assert_eq!(out.len(), 36);
    }

    #[test]
    fn test_full_batch_is_borrowed() {
        let data = vec![0.5; 48];
        let out = pad_to_batch(&batched(4), "data", &data).unwrap();
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    #[test]
    fn test_invalid_shapes() {
        let data = vec![0.0; 12];
        assert!(pad_to_batch(&batched(4), "flat", &data)
            .unwrap_err()
            .is_validation());
        assert!(pad_to_batch(&batched(4), "missing", &data)
            .unwrap_err()
            .is_validation());
    }

    #[test]
    fn test_duplicate_key_uses_last_node() {
        let opts = batched(2).with_input_node(InputNode::new("data", [2, 1, 2, 2]));
        let out = pad_to_batch(&opts, "data", &[1.0; 4]).unwrap();
        assert_eq!(out.len(), 8);
    }

    #[test]
    fn test_oversized_batch_rejected() {
        let data = vec![0.0; 12 * 5];
        let err = pad_to_batch(&batched(4), "data", &data).unwrap_err();
        assert!(err.to_string().contains("more than batch size"));
    }

    #[test]
    fn test_tensor_data_accessors() {
        let t = TensorData {
            data: ArrayD::zeros(IxDyn(&[1, 10])),
        };
        assert_eq!(t.shape(), &[1, 10]);
        assert_eq!(t.ndim(), 2);
        assert_eq!(t.len(), 10);
        assert!(!t.is_empty());
    }
}
