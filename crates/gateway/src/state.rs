use crate::metrics::Metrics;
use pipeline::{Classifier, PipelineService};
use std::sync::Arc;

/// Shared per-process state: one classifier pipeline loaded at startup,
/// never mutated afterwards.
pub struct AppState<C: Classifier> {
    pub service: Arc<PipelineService<C>>,
    pub model_loaded: bool,
    pub metrics: Arc<Metrics>,
}

impl<C: Classifier> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            model_loaded: self.model_loaded,
            metrics: self.metrics.clone(),
        }
    }
}
