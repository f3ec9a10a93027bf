//! Predictor module.
//!
//! This module provides FFI bindings to the MXNet C prediction API and
//! safe Rust wrappers for creating predictors and running inference.

mod api;
mod ffi;
mod marshal;
mod options;
mod predictor;

#[cfg(feature = "mxnet")]
pub use api::MxNet;
pub use api::{CreateArgs, PredictApi};
pub use ffi::{MxFloat, MxUint, PredictorHandle};
pub use marshal::{CStrTable, InputTable, ShapeTable};
pub use options::{Device, DeviceType, InputNode, Options};
pub use predictor::{Predictor, TensorData};
