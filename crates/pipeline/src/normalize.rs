use crate::error::PipelineError;
use common::span;
use image::{ImageBuffer, Rgb, imageops};
use ndarray::{Array2, Array3};

pub const DEFAULT_INPUT_SIZE: u32 = 224;

// Training-time input standardization of the deployed classifier. These
// constants are versioned alongside the model file: a mismatch silently
// degrades accuracy without erroring.
const CHANNEL_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const CHANNEL_STD: [f32; 3] = [0.229, 0.224, 0.225];

type UnitImage = ImageBuffer<Rgb<f32>, Vec<f32>>;

/// Turns a raw intensity array into the classifier's expected input tensor.
///
/// The steps are order-significant: per-image min-max rescale to [0,1],
/// replication of the single channel into three, bilinear resize to the
/// target square, then per-channel standardization.
pub struct Normalizer {
    target_size: u32,
}

impl Normalizer {
    pub fn new(target_size: u32) -> Self {
        Self { target_size }
    }

    pub fn normalize(&self, intensities: &Array2<f32>) -> Result<Array3<f32>, PipelineError> {
        let _s = span!("normalize_intensities");

        let unit = self.to_unit_rgb(intensities)?;
        Ok(standardize(&unit))
    }

    /// Rescales to [0,1] using the image's own observed min/max, replicates
    /// to three identical channels and resizes to the target square.
    ///
    /// A constant image has no contrast to rescale; it maps to all zeros
    /// rather than dividing by a zero range.
    pub fn to_unit_rgb(&self, intensities: &Array2<f32>) -> Result<UnitImage, PipelineError> {
        let (rows, cols) = intensities.dim();
        if rows == 0 || cols == 0 {
            return Err(PipelineError::Normalization(
                "empty intensity array".to_string(),
            ));
        }

        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for &v in intensities.iter() {
            if !v.is_finite() {
                return Err(PipelineError::Normalization(format!(
                    "non-finite pixel intensity {v}"
                )));
            }
            min = min.min(v);
            max = max.max(v);
        }
        let range = max - min;

        let mut replicated = UnitImage::new(cols as u32, rows as u32);
        for ((y, x), &v) in intensities.indexed_iter() {
            let unit = if range > 0.0 { (v - min) / range } else { 0.0 };
            replicated.put_pixel(x as u32, y as u32, Rgb([unit, unit, unit]));
        }

        if replicated.dimensions() == (self.target_size, self.target_size) {
            return Ok(replicated);
        }
        Ok(imageops::resize(
            &replicated,
            self.target_size,
            self.target_size,
            imageops::FilterType::Triangle,
        ))
    }
}

fn standardize(unit: &UnitImage) -> Array3<f32> {
    let (width, height) = unit.dimensions();
    Array3::from_shape_fn((height as usize, width as usize, 3), |(y, x, c)| {
        (unit.get_pixel(x as u32, y as u32)[c] - CHANNEL_MEAN[c]) / CHANNEL_STD[c]
    })
}
