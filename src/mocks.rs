use crate::codec::INPUT_SIZE;
use crate::errors::{BackgroundRemovalError, Result};
use crate::traits::InferenceSession;
use ndarray::prelude::*;

/// What the mock model predicts.
#[derive(Debug, Clone, PartialEq)]
pub enum MockPrediction {
    /// Every pixel gets the same confidence.
    Uniform(f32),
    /// Confidence grows left to right.
    HorizontalGradient,
    /// Confidence follows the normalized red channel of the input.
    RedChannel,
    /// Every forward pass fails.
    Failure,
}

/// Test double for an ONNX session with the U2-NetP tensor contract.
#[derive(Debug, Clone)]
pub struct MockSession {
    pub prediction: MockPrediction,
    pub calls: usize,
}

impl MockSession {
    pub const fn new(prediction: MockPrediction) -> Self {
        Self {
            prediction,
            calls: 0,
        }
    }
}

impl InferenceSession for MockSession {
    fn infer(&mut self, input: ArrayView4<f32>) -> Result<Vec<ArrayD<f32>>> {
        self.calls += 1;

        let (width, height) = INPUT_SIZE;
        let expected = [1, 3, height as usize, width as usize];
        if input.shape() != expected.as_slice() {
            return Err(BackgroundRemovalError::inference(
                "mock forward pass",
                format!("expected input {expected:?}, got {:?}", input.shape()),
            ));
        }

        let shape = (1, 1, height as usize, width as usize);
        let mask = match &self.prediction {
            MockPrediction::Uniform(value) => Array4::from_elem(shape, *value),
            MockPrediction::HorizontalGradient => {
                Array4::from_shape_fn(shape, |(_, _, _, x)| x as f32 / (width - 1) as f32)
            }
            MockPrediction::RedChannel => input.slice(s![.., 0..1, .., ..]).to_owned(),
            MockPrediction::Failure => {
                return Err(BackgroundRemovalError::inference(
                    "mock forward pass",
                    "simulated runtime failure",
                ))
            }
        };

        // U2-Net also emits six side outputs; one extra is enough to exercise ordering.
        let side = Array4::<f32>::zeros(shape);
        Ok(vec![mask.into_dyn(), side.into_dyn()])
    }
}
