use crate::classes::ClassList;
use crate::error::PipelineError;
use crate::severity::{self, SeverityTier};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use ndarray::Array2;
use serde::Serialize;
use std::io::Cursor;

/// Immutable result of one inference request.
#[derive(Debug, Clone, Serialize)]
pub struct InferenceResult {
    /// Per-class confidence percentages (0-100), index-aligned with the
    /// class list.
    pub confidences: Vec<f32>,
    pub primary_index: usize,
    pub primary_diagnosis: String,
    pub primary_confidence: f32,
    pub severity: SeverityTier,
    /// Saliency map as a base64-encoded 8-bit grayscale PNG.
    pub heatmap_base64: String,
}

/// Packages raw probabilities and the saliency map into the response
/// contract: argmax primary class, percent scale, severity tier and the
/// transport-encoded heatmap.
pub fn assemble(
    probabilities: &[f32],
    heatmap: &Array2<f32>,
    classes: &ClassList,
) -> Result<InferenceResult, PipelineError> {
    if probabilities.is_empty() {
        return Err(PipelineError::Inference(anyhow::anyhow!(
            "empty probability vector"
        )));
    }
    if probabilities.len() != classes.len() {
        return Err(PipelineError::Inference(anyhow::anyhow!(
            "{} probabilities for {} configured classes",
            probabilities.len(),
            classes.len()
        )));
    }

    let primary_index = argmax(probabilities);
    let confidences: Vec<f32> = probabilities.iter().map(|p| p * 100.0).collect();
    let primary_confidence = confidences[primary_index];
    let primary_diagnosis = classes.name(primary_index).to_string();
    let severity = severity::classify(&primary_diagnosis, primary_confidence);
    let heatmap_base64 = encode_heatmap(heatmap)?;

    Ok(InferenceResult {
        confidences,
        primary_index,
        primary_diagnosis,
        primary_confidence,
        severity,
        heatmap_base64,
    })
}

/// First-occurrence-wins argmax: ties resolve to the lowest index.
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

fn encode_heatmap(heatmap: &Array2<f32>) -> Result<String, PipelineError> {
    let (rows, cols) = heatmap.dim();
    let img = image::GrayImage::from_fn(cols as u32, rows as u32, |x, y| {
        image::Luma([(heatmap[[y as usize, x as usize]].clamp(0.0, 1.0) * 255.0) as u8])
    });

    let mut png = Cursor::new(Vec::new());
    img.write_to(&mut png, image::ImageFormat::Png)
        .map_err(|e| PipelineError::Saliency(format!("failed to encode heatmap: {e}")))?;

    Ok(STANDARD.encode(png.into_inner()))
}
