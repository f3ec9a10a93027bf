//! mxpredict: safe Rust bindings for the MXNet C prediction API.
//!
//! This crate wraps `c_predict_api.h` (`MXPredCreate`, `MXPredSetInput`,
//! `MXPredForward`, ...) behind an owned [`Predictor`] type, converting
//! native status codes and `MXGetLastError` into [`MxError`] values.
//!
//! # Features
//!
//! - **mxnet**: Link against `libmxnet` and enable the `MxNet` backend
//!   together with `Predictor::create` / `Predictor::create_partial`.
//!   Without it, predictors are driven through any [`PredictApi`]
//!   implementation passed to `Predictor::create_with`.
//!
//! # Example
//!
//! ```ignore
//! use mxpredict::tensor::image_to_tensor;
//! use mxpredict::{Device, InputNode, Options, Predictor};
//!
//! let options = Options::new()
//!     .with_symbol(std::fs::read("squeezenet-symbol.json")?)
//!     .with_weights(std::fs::read("squeezenet-0000.params")?)
//!     .with_device(Device::cpu())
//!     .with_input_node(InputNode::new("data", [1, 3, 224, 224]));
//!
//! let mut predictor = Predictor::create(options)?;
//!
//! let img = image::open("cat.jpg")?.resize_exact(224, 224, image::imageops::FilterType::Triangle);
//! predictor.set_input("data", &image_to_tensor(&img)?)?;
//! predictor.forward()?;
//!
//! let shape = predictor.output_shape(0)?;
//! let probs = predictor.output(0)?;
//! println!("output {:?}: {} values", shape, probs.len());
//!
//! predictor.free()?;
//! ```
//!
//! # Building
//!
//! With the `mxnet` feature the build script looks for `libmxnet` in
//! `MXNET_LIB_DIR`, then `$MXNET_HOME/lib`, then through `pkg-config`.
//!
//! ```bash
//! MXNET_HOME=/opt/mxnet cargo build --release --features mxnet
//! ```
//!
//! # Thread Safety
//!
//! A `Predictor` can be moved to another thread but not shared. The
//! native last-error message is process-wide, so calls into the library
//! from several threads should be serialized to get accurate diagnostics.

pub mod config;
pub mod error;
pub mod inference;
pub mod tensor;

// Re-export commonly used types
pub use error::{MxError, Result};
#[cfg(feature = "mxnet")]
pub use inference::MxNet;
pub use inference::{Device, DeviceType, InputNode, Options, PredictApi, Predictor, TensorData};
