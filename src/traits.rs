use crate::errors::Result;
use ndarray::prelude::*;

/// A loaded, ready-to-run segmentation model.
///
/// Implementations are not assumed to tolerate concurrent `infer` calls,
/// hence `&mut self`; `BackgroundRemover` serializes access behind a mutex.
pub trait InferenceSession: Send {
    /// Run one forward pass and return every model output in declaration order.
    /// The mask is at index 0.
    fn infer(&mut self, input: ArrayView4<f32>) -> Result<Vec<ArrayD<f32>>>;
}
