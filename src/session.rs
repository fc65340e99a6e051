use std::path::{Path, PathBuf};

use ndarray::prelude::*;
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::TensorRef,
};

use crate::{
    codec::INPUT_SIZE,
    errors::{BackgroundRemovalError, BoxError, Result},
    provider::{self, ExecutionProvider},
    traits::InferenceSession,
};

pub const MODEL_FILENAME: &str = "u2netp.onnx";

/// `models/u2netp.onnx` next to the running executable.
pub fn default_model_path() -> PathBuf {
    let relative = Path::new("models").join(MODEL_FILENAME);
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(&relative)))
        .unwrap_or(relative)
}

/// The explicit path if given, else the bundled location. Must exist.
pub fn resolve_model_path(model_path: Option<&Path>) -> Result<PathBuf> {
    let path = model_path.map_or_else(default_model_path, Path::to_path_buf);
    if !path.is_file() {
        return Err(BackgroundRemovalError::ModelNotFound { path });
    }
    Ok(path)
}

/// Two-step session construction.
///
/// `attempt` is called with the requested providers, or the GPU-first default
/// when none (or an empty list) were requested. If that fails and the list
/// was not already CPU-only, it is called exactly once more with CPU only.
/// Returns the session together with the provider list that produced it.
pub fn open_with_fallback<S, F>(
    requested: Option<&[ExecutionProvider]>,
    mut attempt: F,
) -> Result<(S, Vec<ExecutionProvider>)>
where
    F: FnMut(&[ExecutionProvider]) -> std::result::Result<S, BoxError>,
{
    let providers = match requested {
        Some(list) if !list.is_empty() => list.to_vec(),
        _ => ExecutionProvider::default_preference(),
    };

    let err = match attempt(&providers) {
        Ok(session) => return Ok((session, providers)),
        Err(err) => err,
    };

    if provider::is_cpu_only(&providers) {
        return Err(BackgroundRemovalError::ProviderInitialization {
            providers: provider::describe(&providers),
            source: err,
        });
    }

    log::warn!(
        "Session creation with [{}] failed ({err}), retrying with CPU only",
        provider::describe(&providers)
    );

    let cpu = ExecutionProvider::cpu_only();
    match attempt(&cpu) {
        Ok(session) => Ok((session, cpu)),
        Err(source) => Err(BackgroundRemovalError::ProviderInitialization {
            providers: provider::describe(&cpu),
            source,
        }),
    }
}

fn build_session(
    model_path: &Path,
    providers: &[ExecutionProvider],
) -> std::result::Result<Session, BoxError> {
    let dispatch = providers
        .iter()
        .map(ExecutionProvider::dispatch)
        .collect::<Result<Vec<_>>>()?;

    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level2)?
        .with_intra_threads(1)?
        .with_inter_threads(1)?
        .with_parallel_execution(false)?
        .with_execution_providers(dispatch)?
        .commit_from_file(model_path)?;

    Ok(session)
}

/// ONNX Runtime session for the U2-NetP model.
///
/// Created once and reused for every image. Dropping it releases the
/// runtime session and any device memory it holds.
#[derive(Debug)]
pub struct OnnxSession {
    session: Session,
    input_name: String,
    model_path: PathBuf,
    providers: Vec<ExecutionProvider>,
}

impl OnnxSession {
    pub fn load(
        model_path: Option<&Path>,
        providers: Option<&[ExecutionProvider]>,
    ) -> Result<Self> {
        let model_path = resolve_model_path(model_path)?;
        log::debug!("Loading segmentation model from {}", model_path.display());

        let (session, providers) =
            open_with_fallback(providers, |providers| build_session(&model_path, providers))?;

        let input = session.inputs.first().ok_or_else(|| {
            BackgroundRemovalError::inference(
                "model input lookup",
                format!("{} declares no inputs", model_path.display()),
            )
        })?;
        let input_name = input.name.clone();

        if let Some(shape) = input.input_type.tensor_shape() {
            let dims: Vec<i64> = shape.iter().copied().collect();
            check_input_shape(&dims)?;
        }

        log::debug!(
            "Session ready: input `{input_name}`, providers [{}]",
            provider::describe(&providers)
        );

        Ok(Self {
            session,
            input_name,
            model_path,
            providers,
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Providers the session was created with. Fixed for its lifetime.
    pub fn providers(&self) -> &[ExecutionProvider] {
        &self.providers
    }
}

/// Dynamic dimensions (negative) are accepted; fixed ones must match
/// `[1, 3, 320, 320]`.
fn check_input_shape(dims: &[i64]) -> Result<()> {
    let (width, height) = INPUT_SIZE;
    let expected = [1, 3, i64::from(height), i64::from(width)];
    let matches = dims.len() == expected.len()
        && dims
            .iter()
            .zip(expected.iter())
            .all(|(&actual, &wanted)| actual < 0 || actual == wanted);

    if matches {
        Ok(())
    } else {
        Err(BackgroundRemovalError::inference(
            "model input shape check",
            format!("expected {expected:?}, model declares {dims:?}"),
        ))
    }
}

impl InferenceSession for OnnxSession {
    fn infer(&mut self, input: ArrayView4<f32>) -> Result<Vec<ArrayD<f32>>> {
        let input = input.as_standard_layout();
        let outputs = self.session.run(
            ort::inputs![self.input_name.as_str() => TensorRef::from_array_view(&input)?],
        )?;

        // Side outputs are copied along with the mask so callers see every
        // output in model order. For U2-NetP that is seven 320x320 planes.
        (0..outputs.len())
            .map(|index| -> Result<ArrayD<f32>> {
                Ok(outputs[index].try_extract_array::<f32>()?.to_owned())
            })
            .collect()
    }
}
