use crate::error::PipelineError;
use common::span_debug;
use dicom_object::from_reader;
use dicom_pixeldata::{ConvertOptions, PixelDecoder, VoiLutOption};
use ndarray::Array2;

const DICOM_PREAMBLE_LEN: usize = 128;
const DICOM_MAGIC: &[u8; 4] = b"DICM";

/// Decodes an uploaded payload of unknown encoding into a single-channel
/// intensity array.
///
/// Deliberate two-stage fallback chain, not a format sniff: the DICOM branch
/// is attempted fully first, and any failure there moves on to raster
/// decoding with a forced grayscale conversion. A raster failure is final.
pub struct ImageDecoder;

impl ImageDecoder {
    pub fn decode(bytes: &[u8]) -> Result<Array2<f32>, PipelineError> {
        let _span = span_debug!("decode_image");

        let dicom_err = match decode_dicom(bytes) {
            Ok(intensities) => return Ok(intensities),
            Err(e) => e,
        };

        tracing::debug!(error = %dicom_err, "payload is not DICOM, trying raster decode");

        match decode_raster(bytes) {
            Ok(intensities) => Ok(intensities),
            Err(raster_err) => Err(PipelineError::Decode(format!(
                "neither DICOM ({dicom_err:#}) nor raster ({raster_err}) decoding succeeded"
            ))),
        }
    }
}

fn decode_dicom(bytes: &[u8]) -> anyhow::Result<Array2<f32>> {
    let obj = from_reader(strip_preamble(bytes))?;
    let decoded = obj.decode_pixel_data()?;

    let rows = decoded.rows() as usize;
    let columns = decoded.columns() as usize;
    let samples = decoded.samples_per_pixel() as usize;
    if rows == 0 || columns == 0 || samples == 0 {
        anyhow::bail!("pixel data has degenerate dimensions {rows}x{columns}x{samples}");
    }

    // Windowing: apply the file's embedded VOI LUT when one is present.
    let options = ConvertOptions::new().with_voi_lut(VoiLutOption::Default);
    let values = decoded.to_vec_with_options::<f32>(&options)?;
    if values.len() < rows * columns * samples {
        anyhow::bail!(
            "pixel data shorter than advertised dimensions ({} values for {rows}x{columns}x{samples})",
            values.len()
        );
    }

    // First frame, first sample plane.
    Ok(Array2::from_shape_fn((rows, columns), |(r, c)| {
        values[(r * columns + c) * samples]
    }))
}

fn decode_raster(bytes: &[u8]) -> Result<Array2<f32>, image::ImageError> {
    let gray = image::load_from_memory(bytes)?.to_luma8();
    let (width, height) = gray.dimensions();
    Ok(Array2::from_shape_fn(
        (height as usize, width as usize),
        |(y, x)| gray.get_pixel(x as u32, y as u32)[0] as f32,
    ))
}

/// DICOM files written with the standard 128-byte preamble carry the `DICM`
/// magic right after it; `from_reader` expects the stream to start at the
/// magic code.
fn strip_preamble(bytes: &[u8]) -> &[u8] {
    if bytes.len() > DICOM_PREAMBLE_LEN + DICOM_MAGIC.len()
        && &bytes[DICOM_PREAMBLE_LEN..DICOM_PREAMBLE_LEN + DICOM_MAGIC.len()] == DICOM_MAGIC
    {
        &bytes[DICOM_PREAMBLE_LEN..]
    } else {
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32, pixel: impl Fn(u32, u32) -> u8) -> Vec<u8> {
        let img = GrayImage::from_fn(width, height, |x, y| Luma([pixel(x, y)]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn raster_fallback_decodes_grayscale_png() {
        let bytes = png_bytes(8, 4, |x, y| (x * 10 + y) as u8);
        let intensities = ImageDecoder::decode(&bytes).unwrap();

        assert_eq!(intensities.dim(), (4, 8));
        assert_eq!(intensities[[0, 0]], 0.0);
        assert_eq!(intensities[[3, 7]], 73.0);
    }

    #[test]
    fn unrecognized_bytes_report_both_stage_failures() {
        let err = ImageDecoder::decode(b"definitely not an image").unwrap_err();
        let message = err.to_string();

        assert!(matches!(err, PipelineError::Decode(_)));
        assert!(message.contains("DICOM"), "missing DICOM stage: {message}");
        assert!(message.contains("raster"), "missing raster stage: {message}");
    }

    #[test]
    fn empty_payload_is_a_decode_error() {
        assert!(matches!(
            ImageDecoder::decode(&[]),
            Err(PipelineError::Decode(_))
        ));
    }

    #[test]
    fn preamble_is_stripped_when_magic_follows_it() {
        let mut bytes = vec![0u8; DICOM_PREAMBLE_LEN];
        bytes.extend_from_slice(DICOM_MAGIC);
        bytes.extend_from_slice(b"rest of the dataset");

        assert!(strip_preamble(&bytes).starts_with(DICOM_MAGIC));
    }

    #[test]
    fn payload_without_preamble_passes_through_unchanged() {
        let bytes = b"DICMsomething";
        assert_eq!(strip_preamble(bytes), bytes);
    }
}
