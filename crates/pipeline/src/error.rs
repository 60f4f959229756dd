use thiserror::Error;

/// Stage-local failures of the inference pipeline.
///
/// Every variant is caught at the request boundary and converted into a
/// uniform failure response; no stage recovers or retries internally, and a
/// failed request never invalidates the loaded classifier.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to decode image: {0}")]
    Decode(String),
    #[error("failed to normalize image: {0}")]
    Normalization(String),
    #[error("inference failed: {0}")]
    Inference(#[from] anyhow::Error),
    #[error("failed to generate saliency map: {0}")]
    Saliency(String),
}
