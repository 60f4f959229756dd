use super::{Classifier, SaliencyTensors};
use crate::error::PipelineError;
use ndarray::Array3;

/// Classifier returning fixed probabilities, for tests and local runs
/// without a model file.
///
/// The saliency tensors are deterministic and non-degenerate, with the
/// gradient concentrated on one feature channel chosen by the class index.
pub struct StubClassifier {
    probabilities: Vec<f32>,
    spatial: usize,
    channels: usize,
}

impl StubClassifier {
    pub fn new(probabilities: Vec<f32>) -> Self {
        Self {
            probabilities,
            spatial: 7,
            channels: 8,
        }
    }
}

impl Classifier for StubClassifier {
    fn num_classes(&self) -> usize {
        self.probabilities.len()
    }

    fn infer(&self, _input: &Array3<f32>) -> Result<Vec<f32>, PipelineError> {
        Ok(self.probabilities.clone())
    }

    fn saliency_tensors(
        &self,
        _input: &Array3<f32>,
        class_index: usize,
    ) -> Result<SaliencyTensors, PipelineError> {
        let (s, c) = (self.spatial, self.channels);
        let activations = Array3::from_shape_fn((s, s, c), |(y, x, ch)| {
            ((y + x + ch + 1) as f32) / ((s + s + c) as f32)
        });
        let hot = class_index % c;
        let gradients =
            Array3::from_shape_fn((s, s, c), |(_, _, ch)| if ch == hot { 1.0 } else { 0.1 });
        Ok(SaliencyTensors {
            activations,
            gradients,
        })
    }
}
