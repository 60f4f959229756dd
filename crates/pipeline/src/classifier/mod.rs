use crate::error::PipelineError;
use ndarray::Array3;

#[cfg(feature = "ort-backend")]
pub mod ort;

pub mod stub;

/// Activation and gradient tensors captured at the classifier's designated
/// feature-extraction layer, shaped height x width x channels.
pub struct SaliencyTensors {
    pub activations: Array3<f32>,
    pub gradients: Array3<f32>,
}

/// Opaque trained multi-label classifier.
///
/// Implementations must be deterministic for a fixed input and free of side
/// effects. A single instance is loaded at process start and shared
/// read-only across concurrent requests; it is never mutated afterwards.
pub trait Classifier: Send + Sync {
    /// Number of diagnostic classes in the output vector.
    fn num_classes(&self) -> usize;

    /// Forward pass producing per-class sigmoid probabilities in [0,1],
    /// index-aligned with the configured class list. The probabilities are
    /// independent and do not sum to 1.
    fn infer(&self, input: &Array3<f32>) -> Result<Vec<f32>, PipelineError>;

    /// One forward-backward pass exposing the designated layer's activations
    /// and the gradient of the selected class's output with respect to them.
    fn saliency_tensors(
        &self,
        input: &Array3<f32>,
        class_index: usize,
    ) -> Result<SaliencyTensors, PipelineError>;
}
