//! Predictor configuration: device, input nodes, and the options builder.

use std::fmt;
use std::str::FromStr;

use crate::error::{MxError, Result};

/// Device kinds understood by the native library, with its integer codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum DeviceType {
    /// Host CPU.
    #[default]
    Cpu = 1,
    /// GPU with index.
    Gpu = 2,
    /// CPU with page-locked memory.
    CpuPinned = 3,
}

impl DeviceType {
    /// The `dev_type` code passed to the native library.
    pub fn code(self) -> i32 {
        self as i32
    }

    fn name(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Gpu => "gpu",
            Self::CpuPinned => "cpu_pinned",
        }
    }
}

/// Device specification for a predictor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Device {
    device_type: DeviceType,
    id: u32,
}

impl Device {
    /// Create a device of the given type and index.
    pub fn new(device_type: DeviceType, id: u32) -> Self {
        Self { device_type, id }
    }

    /// Create a CPU device.
    pub fn cpu() -> Self {
        Self::new(DeviceType::Cpu, 0)
    }

    /// Create a GPU device with the given index.
    pub fn gpu(id: u32) -> Self {
        Self::new(DeviceType::Gpu, id)
    }

    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    pub fn id(&self) -> u32 {
        self.id
    }
}

impl FromStr for Device {
    type Err = MxError;

    /// Parse a device string like "cpu", "gpu", "gpu:1", "cuda:0", "cpu_pinned".
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_lowercase();
        let (kind, index) = match s.split_once(':') {
            Some((kind, idx)) => {
                let index: u32 = idx
                    .parse()
                    .map_err(|_| MxError::validation(format!("Invalid device index: {}", idx)))?;
                (kind, index)
            }
            None => (s.as_str(), 0),
        };
        let device_type = match kind {
            "cpu" => DeviceType::Cpu,
            "gpu" | "cuda" => DeviceType::Gpu,
            "cpu_pinned" => DeviceType::CpuPinned,
            _ => return Err(MxError::validation(format!("Invalid device: {}", s))),
        };
        Ok(Self::new(device_type, index))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.device_type.name(), self.id)
    }
}

/// Name and shape of one model input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputNode {
    key: String,
    shape: Vec<u32>,
}

impl InputNode {
    pub fn new(key: impl Into<String>, shape: impl Into<Vec<u32>>) -> Self {
        Self {
            key: key.into(),
            shape: shape.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn shape(&self) -> &[u32] {
        &self.shape
    }

    /// Shape of one sample: the node shape without its leading batch
    /// dimension, unless the shape is already `(C, H, W)`.
    pub(crate) fn sample_shape(&self) -> &[u32] {
        if self.shape.len() == 3 {
            &self.shape
        } else {
            self.shape.get(1..).unwrap_or(&[])
        }
    }
}

/// Everything needed to create a predictor.
///
/// ```ignore
/// let options = Options::new()
///     .with_symbol(std::fs::read("resnet-symbol.json")?)
///     .with_weights(std::fs::read("resnet-0000.params")?)
///     .with_device(Device::cpu())
///     .with_input_node(InputNode::new("data", [1, 3, 224, 224]))
///     .with_batch_size(1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    symbol: Vec<u8>,
    weights: Vec<u8>,
    device: Device,
    input_nodes: Vec<InputNode>,
    output_node: Option<String>,
    batch_size: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            symbol: Vec::new(),
            weights: Vec::new(),
            device: Device::default(),
            input_nodes: Vec::new(),
            output_node: None,
            batch_size: 1,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialized symbol graph (JSON).
    pub fn with_symbol(mut self, symbol: impl Into<Vec<u8>>) -> Self {
        self.symbol = symbol.into();
        self
    }

    /// Raw bytes of the parameter file.
    pub fn with_weights(mut self, weights: impl Into<Vec<u8>>) -> Self {
        self.weights = weights.into();
        self
    }

    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Append one input node.
    pub fn with_input_node(mut self, node: InputNode) -> Self {
        self.input_nodes.push(node);
        self
    }

    /// Replace the input node list.
    pub fn with_input_nodes(mut self, nodes: impl IntoIterator<Item = InputNode>) -> Self {
        self.input_nodes = nodes.into_iter().collect();
        self
    }

    /// Name of the single output layer used by partial-output predictors.
    pub fn with_output_node(mut self, name: impl Into<String>) -> Self {
        self.output_node = Some(name.into());
        self
    }

    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn symbol(&self) -> &[u8] {
        &self.symbol
    }

    pub fn weights(&self) -> &[u8] {
        &self.weights
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn input_nodes(&self) -> &[InputNode] {
        &self.input_nodes
    }

    pub fn output_node(&self) -> Option<&str> {
        self.output_node.as_deref()
    }

    pub fn batch_size(&self) -> u32 {
        self.batch_size
    }

    /// Look up an input node by key. With duplicate keys the last node wins.
    pub fn input_node(&self, key: &str) -> Option<&InputNode> {
        self.input_nodes.iter().rev().find(|n| n.key == key)
    }

    /// Check the preconditions of full-output predictor creation.
    pub fn validate(&self) -> Result<()> {
        if self.symbol.is_empty() {
            return Err(MxError::validation("invalid empty symbol"));
        }
        if self.weights.is_empty() {
            return Err(MxError::validation("invalid empty weights"));
        }
        if self.input_nodes.is_empty() {
            return Err(MxError::validation("no input nodes found"));
        }
        if self.batch_size == 0 {
            return Err(MxError::validation("batch size must be positive"));
        }
        if self.symbol.contains(&0) {
            return Err(MxError::validation("symbol contains a NUL byte"));
        }
        if i32::try_from(self.weights.len()).is_err() {
            return Err(MxError::validation(format!(
                "weights too large: {} bytes",
                self.weights.len()
            )));
        }
        if i32::try_from(self.device.id).is_err() {
            return Err(MxError::validation(format!(
                "device index out of range: {}",
                self.device.id
            )));
        }
        for node in &self.input_nodes {
            if node.key.is_empty() {
                return Err(MxError::validation("input node with empty key"));
            }
            if node.shape.contains(&0) {
                return Err(MxError::validation(format!(
                    "input node {} has a zero dimension: {:?}",
                    node.key, node.shape
                )));
            }
        }
        Ok(())
    }

    /// Check the preconditions of partial-output predictor creation.
    pub fn validate_partial(&self) -> Result<()> {
        self.validate()?;
        match self.output_node.as_deref() {
            None | Some("") => Err(MxError::validation("invalid empty output node")),
            Some(_) => Ok(()),
        }
    }
}
