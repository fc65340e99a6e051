use clap::Parser;
use std::path::{Path, PathBuf};

use crate::provider::ExecutionProvider;

/// Construction-time settings of a `BackgroundRemover`.
///
/// `None` means the bundled model and the GPU-first provider policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub model_path: Option<PathBuf>,
    pub providers: Option<Vec<ExecutionProvider>>,
}

impl Settings {
    pub fn with_model_path(mut self, model_path: impl Into<PathBuf>) -> Self {
        self.model_path = Some(model_path.into());
        self
    }

    pub fn with_providers(mut self, providers: Vec<ExecutionProvider>) -> Self {
        self.providers = Some(providers);
        self
    }
}

#[derive(Parser, Clone, Debug)]
#[command(
    version,
    about = "Remove the background from an image while preserving quality.",
    long_about = None
)]
pub struct Config {
    /// Path to the input image
    pub input: PathBuf,

    /// Destination for the background-free PNG (defaults to the input name with `_transparent`)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// ONNX Runtime execution providers in order of preference, e.g. `CUDAExecutionProvider`
    #[arg(long, num_args = 0..)]
    pub providers: Option<Vec<String>>,

    /// Override the bundled u2netp.onnx model
    #[arg(short, long)]
    pub model_path: Option<PathBuf>,
}

impl Config {
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| transparent_sibling(&self.input))
    }

    pub fn settings(&self) -> Settings {
        Settings {
            model_path: self.model_path.clone(),
            providers: self
                .providers
                .as_ref()
                .map(|names| ExecutionProvider::parse_list(names)),
        }
    }
}

/// `photo.jpg` -> `photo_transparent.png` in the same directory.
pub fn transparent_sibling(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{stem}_transparent.png"))
}
