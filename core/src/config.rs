//! Predictor description files.
//!
//! A description names the model files and the input layout, and is turned
//! into [`Options`] by reading those files:
//!
//! ```yaml
//! model:
//!   symbol: resnet-18-symbol.json
//!   params: resnet-18-0000.params
//! device: cpu
//! inputs:
//!   - name: data
//!     shape: [1, 3, 224, 224]
//! output: softmax
//! batch_size: 1
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{MxError, Result};
use crate::inference::{Device, InputNode, Options};

/// Top-level configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Model files.
    pub model: ModelConfig,

    /// Device to run on (cpu, gpu:0, ...).
    #[serde(default = "default_device")]
    pub device: String,

    /// Input nodes, in the order the graph expects them.
    pub inputs: Vec<InputConfig>,

    /// Single output layer for partial-output predictors.
    #[serde(default)]
    pub output: Option<String>,

    /// Batch size the inputs are padded to.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

/// Model file locations.
#[derive(Debug, Deserialize)]
pub struct ModelConfig {
    /// Path to the symbol JSON.
    pub symbol: PathBuf,

    /// Path to the parameter file.
    pub params: PathBuf,
}

/// One input node.
#[derive(Debug, Deserialize)]
pub struct InputConfig {
    pub name: String,
    pub shape: Vec<u32>,
}

fn default_device() -> String {
    "cpu".to_string()
}

fn default_batch_size() -> u32 {
    1
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        return Err(MxError::FileNotFound(path.to_path_buf()));
    }
    Ok(std::fs::read(path)?)
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Load configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Parsed device.
    pub fn device(&self) -> Result<Device> {
        self.device.parse()
    }

    /// Read the model files and build predictor options.
    ///
    /// Relative model paths are resolved against `base_dir`.
    pub fn into_options(self, base_dir: impl AsRef<Path>) -> Result<Options> {
        let base_dir = base_dir.as_ref();
        let device = self.device()?;
        let symbol = read_file(&base_dir.join(&self.model.symbol))?;
        let weights = read_file(&base_dir.join(&self.model.params))?;

        let mut options = Options::new()
            .with_symbol(symbol)
            .with_weights(weights)
            .with_device(device)
            .with_batch_size(self.batch_size)
            .with_input_nodes(
                self.inputs
                    .into_iter()
                    .map(|input| InputNode::new(input.name, input.shape)),
            );
        if let Some(output) = self.output {
            options = options.with_output_node(output);
        }
        Ok(options)
    }
}
