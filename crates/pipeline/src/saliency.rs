use crate::error::PipelineError;
use image::{ImageBuffer, Luma, imageops};
use ndarray::{Array2, Array3, Axis};

/// Gradient-weighted class activation mapping.
///
/// Averages the gradient tensor over all spatial positions to obtain one
/// importance weight per feature channel, sums the activation channels with
/// those weights, clamps negative influence to zero and rescales by the
/// map's own maximum before upsampling to the target square.
///
/// A map whose maximum is zero (uniformly zero or negative weighted
/// activations) stays all-zero rather than dividing by zero.
pub fn generate(
    activations: &Array3<f32>,
    gradients: &Array3<f32>,
    target_size: u32,
) -> Result<Array2<f32>, PipelineError> {
    let (h, w, c) = activations.dim();
    if h == 0 || w == 0 || c == 0 {
        return Err(PipelineError::Saliency(
            "empty activation tensor".to_string(),
        ));
    }
    if gradients.dim() != (h, w, c) {
        return Err(PipelineError::Saliency(format!(
            "activation/gradient shape mismatch: {:?} vs {:?}",
            activations.dim(),
            gradients.dim()
        )));
    }

    // One importance weight per feature channel.
    let weights = gradients
        .mean_axis(Axis(0))
        .and_then(|m| m.mean_axis(Axis(0)))
        .ok_or_else(|| PipelineError::Saliency("empty gradient tensor".to_string()))?;

    let mut cam = Array2::<f32>::zeros((h, w));
    for ((y, x, ch), &a) in activations.indexed_iter() {
        cam[[y, x]] += weights[ch] * a;
    }

    // Only positive influence is visualized.
    cam.mapv_inplace(|v| v.max(0.0));

    let max = cam.iter().fold(0.0f32, |m, &v| m.max(v));
    if max > 0.0 {
        cam.mapv_inplace(|v| v / max);
    }

    let map = ImageBuffer::<Luma<f32>, Vec<f32>>::from_fn(w as u32, h as u32, |x, y| {
        Luma([cam[[y as usize, x as usize]]])
    });
    let upsampled = imageops::resize(&map, target_size, target_size, imageops::FilterType::Triangle);

    Ok(Array2::from_shape_fn(
        (target_size as usize, target_size as usize),
        |(y, x)| upsampled.get_pixel(x as u32, y as u32)[0].clamp(0.0, 1.0),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_is_unit_range_with_target_shape() {
        let activations = Array3::from_shape_fn((7, 7, 4), |(y, x, c)| {
            ((y * 7 + x) as f32) * 0.01 + c as f32 * 0.1
        });
        let gradients = Array3::from_elem((7, 7, 4), 0.5);

        let map = generate(&activations, &gradients, 224).unwrap();

        assert_eq!(map.dim(), (224, 224));
        for &v in map.iter() {
            assert!((0.0..=1.0).contains(&v), "{v} outside [0,1]");
        }
        // Max-rescaled, so the peak is exactly 1.
        assert!(map.iter().any(|&v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn weights_are_per_channel_gradient_means() {
        // Two channels: only channel 1 carries gradient, so the map must
        // follow channel 1's activations.
        let mut activations = Array3::<f32>::zeros((2, 2, 2));
        activations[[0, 0, 0]] = 100.0; // ignored channel
        activations[[1, 1, 1]] = 2.0;
        activations[[0, 1, 1]] = 1.0;

        let mut gradients = Array3::<f32>::zeros((2, 2, 2));
        gradients.index_axis_mut(Axis(2), 1).fill(1.0);

        let map = generate(&activations, &gradients, 2).unwrap();

        assert!((map[[1, 1]] - 1.0).abs() < 1e-6);
        assert!((map[[0, 1]] - 0.5).abs() < 1e-6);
        assert_eq!(map[[0, 0]], 0.0);
    }

    #[test]
    fn zero_gradients_yield_defined_all_zero_map() {
        let activations = Array3::from_elem((7, 7, 4), 1.0);
        let gradients = Array3::<f32>::zeros((7, 7, 4));

        let map = generate(&activations, &gradients, 32).unwrap();

        for &v in map.iter() {
            assert_eq!(v, 0.0);
        }
    }

    #[test]
    fn negative_influence_is_clamped() {
        let activations = Array3::from_elem((4, 4, 2), 1.0);
        let gradients = Array3::from_elem((4, 4, 2), -1.0);

        let map = generate(&activations, &gradients, 8).unwrap();

        assert!(map.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn shape_mismatch_is_a_saliency_error() {
        let activations = Array3::<f32>::zeros((7, 7, 4));
        let gradients = Array3::<f32>::zeros((7, 7, 8));

        assert!(matches!(
            generate(&activations, &gradients, 224),
            Err(PipelineError::Saliency(_))
        ));
    }
}
