use std::path::PathBuf;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Structured error types for background removal.
///
/// Each variant keeps the context of the stage that failed, so callers (a CLI
/// printing a message, a GUI raising a dialog) decide presentation themselves.
/// Sources are `Send + Sync` so a failure can be handed back from a worker thread.
#[derive(Error, Debug)]
pub enum BackgroundRemovalError {
    #[error("Model not found: expected the segmentation model at {path:?}")]
    ModelNotFound { path: PathBuf },

    #[error("Provider initialization error: could not create a session with [{providers}]")]
    ProviderInitialization {
        providers: String,
        #[source]
        source: BoxError,
    },

    #[error("Inference error: {operation} failed")]
    Inference {
        operation: String,
        #[source]
        source: BoxError,
    },

    #[error("Invalid image: {reason}")]
    InvalidImage { reason: String },

    #[error("Image I/O error: {operation} failed (file: {path:?})")]
    ImageIo {
        path: PathBuf,
        operation: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

pub type Result<T> = std::result::Result<T, BackgroundRemovalError>;

impl BackgroundRemovalError {
    pub(crate) fn invalid_image(reason: impl Into<String>) -> Self {
        Self::InvalidImage {
            reason: reason.into(),
        }
    }

    pub(crate) fn inference(operation: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Inference {
            operation: operation.into(),
            source: source.into(),
        }
    }
}

/// Convert ONNX Runtime errors raised during a forward pass.
///
/// Session construction never goes through this conversion; the loader maps
/// those failures to `ProviderInitialization` itself.
impl From<ort::Error> for BackgroundRemovalError {
    fn from(err: ort::Error) -> Self {
        Self::inference("ort operation", err)
    }
}

/// Shape errors only occur while reshaping tensors around the model call.
impl From<ndarray::ShapeError> for BackgroundRemovalError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::inference("tensor shape conversion", err)
    }
}
