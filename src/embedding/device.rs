//! Execution device selection.
//!
//! Devices are chosen by asking ONNX Runtime which execution providers it can
//! actually register, not by looking at the host OS.

use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, CoreMLExecutionProvider,
    ExecutionProvider, ExecutionProviderDispatch,
};
use serde::Deserialize;
use tracing::{debug, info};

/// Which device the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    /// Probe CoreML, then CUDA, then fall back to CPU.
    #[default]
    Auto,
    Cpu,
    Cuda,
    Coreml,
}

impl std::str::FromStr for DevicePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "cuda" => Ok(Self::Cuda),
            "coreml" => Ok(Self::Coreml),
            _ => Err(format!("unknown device: {s}. Supported: auto, cpu, cuda, coreml")),
        }
    }
}

/// The device inference will run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda { device_id: i32 },
    CoreMl,
}

impl Device {
    pub fn is_accelerator(&self) -> bool {
        !matches!(self, Self::Cpu)
    }

    /// The execution provider to register on the ONNX session.
    pub fn execution_provider(&self) -> ExecutionProviderDispatch {
        match *self {
            Self::Cpu => CPUExecutionProvider::default().build(),
            Self::Cuda { device_id } => CUDAExecutionProvider::default()
                .with_device_id(device_id)
                .build()
                .error_on_failure(),
            Self::CoreMl => CoreMLExecutionProvider::default().build().error_on_failure(),
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpu => f.write_str("cpu"),
            Self::Cuda { device_id } => write!(f, "cuda:{device_id}"),
            Self::CoreMl => f.write_str("coreml"),
        }
    }
}

/// What the runtime reports as usable on this host.
#[derive(Debug, Clone, Copy, Default)]
pub struct Capabilities {
    pub coreml: bool,
    pub cuda: bool,
}

impl Capabilities {
    /// Ask ONNX Runtime which accelerators it can use. Probe errors count as
    /// "not available".
    pub fn probe() -> Self {
        let coreml = CoreMLExecutionProvider::default()
            .is_available()
            .unwrap_or(false);
        let cuda = CUDAExecutionProvider::default()
            .is_available()
            .unwrap_or(false);
        debug!(coreml, cuda, "probed execution providers");
        Self { coreml, cuda }
    }
}

/// Pick a device. Never fails: CPU is always available.
///
/// Under [`DevicePreference::Auto`] the Apple accelerator wins over CUDA,
/// and CUDA over CPU. An explicit preference is honored only if the runtime
/// supports it.
pub fn select_device(preference: DevicePreference, caps: Capabilities) -> Device {
    let device = match preference {
        DevicePreference::Cpu => Device::Cpu,
        DevicePreference::Coreml if caps.coreml => Device::CoreMl,
        DevicePreference::Cuda if caps.cuda => Device::Cuda { device_id: 0 },
        DevicePreference::Auto if caps.coreml => Device::CoreMl,
        DevicePreference::Auto if caps.cuda => Device::Cuda { device_id: 0 },
        _ => Device::Cpu,
    };

    if device.is_accelerator() {
        info!(%device, "GPU {device} is available and will be used as a device");
    } else {
        debug!(?preference, "using cpu");
    }
    device
}
