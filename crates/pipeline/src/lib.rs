pub mod classes;
pub mod classifier;
pub mod decode;
pub mod error;
pub mod normalize;
pub mod response;
pub mod saliency;
pub mod service;
pub mod severity;

// Re-export commonly used types for convenience
pub use classes::ClassList;
pub use classifier::{Classifier, SaliencyTensors};
pub use error::PipelineError;
pub use response::InferenceResult;
pub use service::PipelineService;
pub use severity::SeverityTier;
