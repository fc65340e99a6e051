use std::{fmt, str::FromStr};

use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, CoreMLExecutionProvider,
    DirectMLExecutionProvider, ExecutionProviderDispatch, TensorRTExecutionProvider,
};

use crate::errors::{BackgroundRemovalError, Result};

/// A named compute backend the inference runtime can target.
///
/// Lists of providers express a preference order; the runtime tries them
/// front to back.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExecutionProvider {
    Cuda,
    TensorRt,
    CoreMl,
    DirectMl,
    Cpu,
    /// A name this crate does not know. Passed through so the loader can
    /// reject it the same way the runtime rejects an unavailable backend.
    Other(String),
}

impl ExecutionProvider {
    /// GPU first, CPU as the last resort.
    pub fn default_preference() -> Vec<Self> {
        vec![Self::Cuda, Self::Cpu]
    }

    pub fn cpu_only() -> Vec<Self> {
        vec![Self::Cpu]
    }

    pub fn is_cpu(&self) -> bool {
        matches!(self, Self::Cpu)
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Cuda => "CUDAExecutionProvider",
            Self::TensorRt => "TensorRTExecutionProvider",
            Self::CoreMl => "CoreMLExecutionProvider",
            Self::DirectMl => "DirectMLExecutionProvider",
            Self::Cpu => "CPUExecutionProvider",
            Self::Other(name) => name.as_str(),
        }
    }

    /// Build the runtime registration for this provider.
    ///
    /// Accelerated providers are registered with `error_on_failure` so a
    /// missing driver fails session construction instead of silently
    /// running on the CPU.
    pub fn dispatch(&self) -> Result<ExecutionProviderDispatch> {
        let dispatch = match self {
            Self::Cuda => CUDAExecutionProvider::default().build().error_on_failure(),
            Self::TensorRt => TensorRTExecutionProvider::default()
                .build()
                .error_on_failure(),
            Self::CoreMl => CoreMLExecutionProvider::default()
                .build()
                .error_on_failure(),
            Self::DirectMl => DirectMLExecutionProvider::default()
                .build()
                .error_on_failure(),
            Self::Cpu => CPUExecutionProvider::default().build(),
            Self::Other(name) => {
                return Err(BackgroundRemovalError::Configuration {
                    message: format!("unsupported execution provider `{name}`"),
                })
            }
        };
        Ok(dispatch)
    }

    /// Parse a list of names, keeping their order.
    pub fn parse_list<I, S>(names: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .map(|name| Self::from(name.as_ref()))
            .collect()
    }
}

impl From<&str> for ExecutionProvider {
    fn from(name: &str) -> Self {
        let trimmed = name.trim();
        let lowered = trimmed.to_ascii_lowercase();
        let short = lowered.strip_suffix("executionprovider").unwrap_or(&lowered);
        match short {
            "cuda" | "gpu" => Self::Cuda,
            "tensorrt" | "trt" => Self::TensorRt,
            "coreml" => Self::CoreMl,
            "directml" | "dml" => Self::DirectMl,
            "cpu" => Self::Cpu,
            _ => Self::Other(trimmed.to_string()),
        }
    }
}

impl FromStr for ExecutionProvider {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for ExecutionProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `true` when every entry targets the CPU. Such requests have nothing to
/// fall back to.
pub fn is_cpu_only(providers: &[ExecutionProvider]) -> bool {
    !providers.is_empty() && providers.iter().all(ExecutionProvider::is_cpu)
}

pub fn describe(providers: &[ExecutionProvider]) -> String {
    providers
        .iter()
        .map(ExecutionProvider::name)
        .collect::<Vec<_>>()
        .join(", ")
}
