use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView, GrayImage, ImageFormat, RgbImage, RgbaImage};
use parking_lot::Mutex;

use crate::{
    codec, compositor,
    config::Settings,
    errors::{BackgroundRemovalError, Result},
    provider::ExecutionProvider,
    session::OnnxSession,
    traits::InferenceSession,
};

/// Removes image backgrounds with a saliency segmentation model.
///
/// The session is loaded once and reused. `remove_background` takes `&self`
/// and may be called from several threads; forward passes are serialized on
/// an internal mutex since the session is not assumed to be reentrant.
pub struct BackgroundRemover<S: InferenceSession = OnnxSession> {
    session: Mutex<S>,
}

impl BackgroundRemover<OnnxSession> {
    /// Load the model described by `settings`.
    ///
    /// Fails with `ModelNotFound` before touching the runtime when the model
    /// file is missing.
    pub fn new(settings: &Settings) -> Result<Self> {
        let session =
            OnnxSession::load(settings.model_path.as_deref(), settings.providers.as_deref())?;
        Ok(Self::with_session(session))
    }

    /// Providers the underlying session ended up using.
    pub fn providers(&self) -> Vec<ExecutionProvider> {
        self.session.lock().providers().to_vec()
    }

    pub fn model_path(&self) -> PathBuf {
        self.session.lock().model_path().to_path_buf()
    }
}

impl<S: InferenceSession> BackgroundRemover<S> {
    pub fn with_session(session: S) -> Self {
        Self {
            session: Mutex::new(session),
        }
    }

    /// Return a copy of `image` whose alpha channel is the predicted mask.
    ///
    /// Any channel layout is accepted; the output is RGBA8 with the input's
    /// dimensions. The input is left untouched.
    pub fn remove_background(&self, image: &DynamicImage) -> Result<RgbaImage> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(BackgroundRemovalError::invalid_image(format!(
                "image has degenerate dimensions {width}x{height}"
            )));
        }

        let rgb = image.to_rgb8();
        let mask = self.predict_mask(&rgb)?;
        compositor::composite(&rgb, &mask)
    }

    /// The model's mask at its native resolution, before resizing.
    pub fn predict_mask(&self, image: &RgbImage) -> Result<GrayImage> {
        let tensor = codec::encode(image)?;
        let outputs = self.session.lock().infer(tensor.view())?;
        let mask = outputs.first().ok_or_else(|| {
            BackgroundRemovalError::inference("mask extraction", "model produced no outputs")
        })?;
        codec::decode(mask.view())
    }

    /// Decode `input`, remove its background and write the result as PNG.
    pub fn remove_background_from_path(&self, input: &Path, output: &Path) -> Result<()> {
        let image = image::open(input).map_err(|e| BackgroundRemovalError::ImageIo {
            path: input.to_path_buf(),
            operation: "decode".to_string(),
            source: e,
        })?;

        let result = self.remove_background(&image)?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| BackgroundRemovalError::FileSystem {
                path: parent.to_path_buf(),
                operation: "create output directory".to_string(),
                source: e,
            })?;
        }

        result
            .save_with_format(output, ImageFormat::Png)
            .map_err(|e| BackgroundRemovalError::ImageIo {
                path: output.to_path_buf(),
                operation: "encode PNG".to_string(),
                source: e,
            })
    }

    pub fn into_session(self) -> S {
        self.session.into_inner()
    }
}
