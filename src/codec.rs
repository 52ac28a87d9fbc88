// codec.rs — `image` crate adapters for the collaborator traits.
//
// Only compiled with the "image-io" feature. Everything stays in memory:
// the sink encodes into a byte vector and leaves persistence to its owner.

use std::io::Cursor;

use ::image::{ImageFormat, RgbImage};
use tracing::{debug, instrument};

use crate::error::{RasterError, Result};
use crate::image::{RasterBuffer, Rgb};
use crate::io::{OutputFormat, RasterSink, RasterSource};

impl RasterSource for RgbImage {
    fn width(&self) -> u32 {
        self.dimensions().0
    }

    fn height(&self) -> u32 {
        self.dimensions().1
    }

    fn get(&self, x: u32, y: u32) -> Result<Rgb> {
        let (width, height) = self.dimensions();
        self.get_pixel_checked(x, y)
            .map(|p| Rgb::from_channels(p.0))
            .ok_or(RasterError::OutOfBounds {
                x: x as i64,
                y: y as i64,
                width,
                height,
            })
    }
}

impl From<&RgbImage> for RasterBuffer {
    fn from(img: &RgbImage) -> Self {
        let (w, h) = img.dimensions();
        RasterBuffer::from_fn(w, h, |x, y| Rgb::from_channels(img.get_pixel(x, y).0))
    }
}

impl RasterBuffer {
    /// Copy into an `image::RgbImage` for encoding or display.
    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width(), self.height(), |x, y| {
            ::image::Rgb(self[(x, y)].channels())
        })
    }
}

impl From<OutputFormat> for ImageFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::Jpeg => ImageFormat::Jpeg,
        }
    }
}

/// Sink that encodes each written buffer into `bytes`, replacing the
/// previous contents.
#[derive(Debug, Default)]
pub struct EncodedSink {
    bytes: Vec<u8>,
    format: Option<OutputFormat>,
}

impl EncodedSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Format of the last successful write.
    pub fn format(&self) -> Option<OutputFormat> {
        self.format
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl RasterSink for EncodedSink {
    #[instrument(skip_all, fields(width = buffer.width(), height = buffer.height(), format = %format))]
    fn write(&mut self, buffer: &RasterBuffer, format: OutputFormat) -> Result<()> {
        if buffer.is_empty() {
            return Err(RasterError::DegenerateInput(
                "cannot encode an empty buffer".to_string(),
            ));
        }
        let mut bytes = Vec::new();
        buffer
            .to_rgb_image()
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::from(format))?;
        debug!(encoded_len = bytes.len(), "buffer encoded");
        self.bytes = bytes;
        self.format = Some(format);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RasterBuffer {
        RasterBuffer::from_fn(6, 4, |x, y| Rgb::new((x * 40) as u8, (y * 60) as u8, 128))
    }

    #[test]
    fn test_rgb_image_source() {
        let img = sample().to_rgb_image();
        assert_eq!(RasterSource::width(&img), 6);
        assert_eq!(RasterSource::get(&img, 2, 1).unwrap(), Rgb::new(80, 60, 128));
        assert!(matches!(
            RasterSource::get(&img, 6, 0),
            Err(RasterError::OutOfBounds { x: 6, .. })
        ));
    }

    #[test]
    fn test_from_rgb_image_matches_from_source() {
        let img = sample().to_rgb_image();
        let a = RasterBuffer::from(&img);
        let b = RasterBuffer::from_source(&img).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, sample());
    }

    #[test]
    fn test_png_sink_is_lossless() {
        let buf = sample();
        let mut sink = EncodedSink::new();
        sink.write(&buf, OutputFormat::Png).unwrap();
        assert_eq!(sink.format(), Some(OutputFormat::Png));

        let decoded = ::image::load_from_memory(sink.bytes()).unwrap().to_rgb8();
        assert_eq!(RasterBuffer::from(&decoded), buf);
    }

    #[test]
    fn test_jpeg_sink_writes_jfif() {
        let mut sink = EncodedSink::new();
        sink.write(&sample(), OutputFormat::Jpeg).unwrap();
        // SOI marker.
        assert_eq!(&sink.bytes()[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_sink_rejects_empty() {
        let mut sink = EncodedSink::new();
        assert!(sink.write(&RasterBuffer::new(0, 0), OutputFormat::Png).is_err());
        assert!(sink.format().is_none());
    }
}
