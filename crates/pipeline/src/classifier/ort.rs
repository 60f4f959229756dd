use super::{Classifier, SaliencyTensors};
use crate::error::PipelineError;
use ndarray::{Array1, Array3, ArrayViewD, Axis, Ix4};
use ort::{
    session::{Session, builder::GraphOptimizationLevel},
    value::TensorRef,
};
use std::sync::Mutex;

// Graph contract of the deployed export. The Grad-CAM backward pass for the
// selected class is baked into the ONNX graph at export time, so one run
// yields probabilities plus the designated layer's activations and the
// gradient of the selected class's output with respect to them.
//
// The export has no forward-only entry point: a plain inference run still
// executes the backward pass (for whatever class index it is given) and the
// gradient outputs are discarded. One inference-equivalent unit of wasted
// work per `infer` call, in exchange for a single deployable graph.
const INPUT_NAME: &str = "input";
const CLASS_INDEX_NAME: &str = "class_index";
const PROBABILITIES_NAME: &str = "probabilities";
const ACTIVATIONS_NAME: &str = "activations";
const GRADIENTS_NAME: &str = "gradients";

#[derive(Debug, Clone, Copy)]
pub enum ExecutionProvider {
    Cpu,
    Cuda,
}

pub struct OrtClassifier {
    // ONNX Runtime sessions require exclusive access per run; concurrent
    // requests queue at this lock rather than anywhere in the pipeline.
    session: Mutex<Session>,
    num_classes: usize,
}

impl From<ort::Error> for PipelineError {
    fn from(e: ort::Error) -> Self {
        PipelineError::Inference(e.into())
    }
}

impl OrtClassifier {
    pub fn load(path: &str, num_classes: usize) -> anyhow::Result<Self> {
        Self::load_with_provider(path, num_classes, ExecutionProvider::Cpu)
    }

    /// Load model with specified execution provider
    pub fn load_with_provider(
        path: &str,
        num_classes: usize,
        provider: ExecutionProvider,
    ) -> anyhow::Result<Self> {
        // Initialize ORT environment (idempotent)
        let _ = ort::init().commit();

        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?;

        match provider {
            ExecutionProvider::Cuda => {
                tracing::info!("Initializing ONNX Runtime with CUDA execution provider");
                builder = builder.with_execution_providers([
                    ort::execution_providers::CUDAExecutionProvider::default()
                        .with_device_id(0)
                        .build()
                        .error_on_failure(),
                ])?;
            }
            ExecutionProvider::Cpu => {
                tracing::info!("Initializing ONNX Runtime with CPU execution provider");
            }
        }

        let session = builder.commit_from_file(path)?;

        tracing::info!("Model loaded from {}", path);
        Ok(Self {
            session: Mutex::new(session),
            num_classes,
        })
    }

    fn run(
        &self,
        input: &Array3<f32>,
        class_index: usize,
    ) -> Result<(Vec<f32>, Array3<f32>, Array3<f32>), PipelineError> {
        let batched = input.view().insert_axis(Axis(0));
        let class_index = Array1::from_elem(1, class_index as i64);

        let mut session = self.session.lock().map_err(|_| {
            PipelineError::Inference(anyhow::anyhow!("classifier session lock poisoned"))
        })?;

        let outputs = session.run(ort::inputs![
            INPUT_NAME => TensorRef::from_array_view(batched)?,
            CLASS_INDEX_NAME => TensorRef::from_array_view(class_index.view())?
        ])?;

        let probabilities: Vec<f32> = outputs[PROBABILITIES_NAME]
            .try_extract_array::<f32>()?
            .iter()
            .copied()
            .collect();
        if probabilities.len() != self.num_classes {
            return Err(PipelineError::Inference(anyhow::anyhow!(
                "classifier returned {} scores for {} configured classes",
                probabilities.len(),
                self.num_classes
            )));
        }

        let activations = to_spatial(
            outputs[ACTIVATIONS_NAME].try_extract_array::<f32>()?,
            ACTIVATIONS_NAME,
        )?;
        let gradients = to_spatial(
            outputs[GRADIENTS_NAME].try_extract_array::<f32>()?,
            GRADIENTS_NAME,
        )?;

        Ok((probabilities, activations, gradients))
    }
}

/// Drops the leading batch axis of a `[1, h, w, c]` output.
fn to_spatial(view: ArrayViewD<'_, f32>, name: &str) -> Result<Array3<f32>, PipelineError> {
    let batched = view.to_owned().into_dimensionality::<Ix4>().map_err(|_| {
        PipelineError::Inference(anyhow::anyhow!("{name} output is not a 4-D tensor"))
    })?;
    Ok(batched.index_axis(Axis(0), 0).to_owned())
}

impl Classifier for OrtClassifier {
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn infer(&self, input: &Array3<f32>) -> Result<Vec<f32>, PipelineError> {
        // Runs the full graph with class 0 and keeps only the probabilities;
        // see the graph-contract note above on the discarded backward pass.
        let (probabilities, _, _) = self.run(input, 0)?;
        Ok(probabilities)
    }

    fn saliency_tensors(
        &self,
        input: &Array3<f32>,
        class_index: usize,
    ) -> Result<SaliencyTensors, PipelineError> {
        let (_, activations, gradients) = self.run(input, class_index)?;
        Ok(SaliencyTensors {
            activations,
            gradients,
        })
    }
}
