use std::io::Cursor;

use archiver_logging::archiver_warn;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageError, Rgb, RgbImage};

pub const DEFAULT_JPEG_QUALITY: u8 = 85;

#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("decode failed: {0}")]
    Decode(ImageError),
    #[error("encode failed: {0}")]
    Encode(ImageError),
}

/// Re-encodes raster images as JPEG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageTranscoder {
    quality: u8,
}

impl Default for ImageTranscoder {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl ImageTranscoder {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// JPEG bytes for `bytes` and `true`, or `bytes` unchanged and `false`
    /// when they cannot be transcoded.
    pub fn to_jpeg(&self, bytes: Vec<u8>) -> (Vec<u8>, bool) {
        match self.try_to_jpeg(&bytes) {
            Ok(jpeg) => (jpeg, true),
            Err(err) => {
                archiver_warn!("keeping original bytes, transcode failed: {}", err);
                (bytes, false)
            }
        }
    }

    pub fn try_to_jpeg(&self, bytes: &[u8]) -> Result<Vec<u8>, TranscodeError> {
        let image = image::load_from_memory(bytes).map_err(TranscodeError::Decode)?;
        let rgb = flatten_onto_white(&image);

        let mut out = Cursor::new(Vec::new());
        let encoder = JpegEncoder::new_with_quality(&mut out, self.quality);
        rgb.write_with_encoder(encoder)
            .map_err(TranscodeError::Encode)?;
        Ok(out.into_inner())
    }
}

/// Drop the alpha channel by compositing over an opaque white background.
fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }
    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha)) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}
