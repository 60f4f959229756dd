use crate::{
    classes::ClassList,
    classifier::Classifier,
    decode::ImageDecoder,
    error::PipelineError,
    normalize::Normalizer,
    response::{self, InferenceResult},
    saliency,
};

/// Runs one diagnostic request end-to-end: decode, normalize, infer,
/// saliency for the predicted class, assemble.
///
/// Holds the classifier by value; callers share the whole service behind an
/// `Arc` across concurrent requests. Nothing here is mutated per request and
/// no results are cached.
pub struct PipelineService<C: Classifier> {
    classifier: C,
    classes: ClassList,
    normalizer: Normalizer,
    input_size: u32,
}

impl<C: Classifier> PipelineService<C> {
    pub fn new(classifier: C, classes: ClassList, input_size: u32) -> Self {
        Self {
            classifier,
            classes,
            normalizer: Normalizer::new(input_size),
            input_size,
        }
    }

    pub fn classes(&self) -> &ClassList {
        &self.classes
    }

    pub fn analyze(&self, image_bytes: &[u8]) -> Result<InferenceResult, PipelineError> {
        let span = tracing::info_span!("analyze_image", payload_bytes = image_bytes.len());
        let _enter = span.enter();

        let intensities = ImageDecoder::decode(image_bytes)?;
        tracing::trace!(
            rows = intensities.nrows(),
            cols = intensities.ncols(),
            "Decoded intensity array"
        );

        let input = self.normalizer.normalize(&intensities)?;

        let probabilities = {
            let _infer_span = tracing::info_span!("model_inference").entered();
            self.classifier.infer(&input)?
        };
        if probabilities.len() != self.classes.len() {
            return Err(PipelineError::Inference(anyhow::anyhow!(
                "classifier returned {} probabilities for {} configured classes",
                probabilities.len(),
                self.classes.len()
            )));
        }

        // Saliency is computed for the predicted class only: one extra
        // forward-backward pass, never one per class.
        let primary_index = response::argmax(&probabilities);
        let heatmap = {
            let _saliency_span = tracing::info_span!("saliency_generation").entered();
            let tensors = self.classifier.saliency_tensors(&input, primary_index)?;
            saliency::generate(&tensors.activations, &tensors.gradients, self.input_size)?
        };

        response::assemble(&probabilities, &heatmap, &self.classes)
    }
}
