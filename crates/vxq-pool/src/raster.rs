//! EXR parsing and bitmap encoding.
//!
//! Both operations delegate pixel-format internals to the `image` crate:
//! EXR files decode to 32-bit float pixel buffers, and in-memory RGBA
//! bitmaps encode to PNG through an off-screen image buffer.

use std::io::Cursor;

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};

use crate::error::{Error, Result};

/// Channel layout of a decoded EXR pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Three components per pixel.
    Rgb,
    /// Four components per pixel.
    Rgba,
}

/// Component width of a decoded EXR pixel buffer.
///
/// EXR sources always decode to 32-bit floats here; half-float files are
/// widened by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    F32,
}

/// A decoded EXR image.
#[derive(Debug, Clone, PartialEq)]
pub struct ExrImage {
    /// Pixel components, `width * height * components` long.
    pub pixels: Vec<f32>,
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub component_type: ComponentType,
}

/// An in-memory bitmap to be encoded, 4 bytes per pixel (RGBA).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Encoding used for a rasterized bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitmapEncoding {
    Png,
}

/// An encoded image byte buffer plus its dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBitmap {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub encoding: BitmapEncoding,
}

/// Parse an EXR byte buffer into a float pixel buffer.
///
/// # Errors
///
/// Returns [`Error::Image`] if the bytes are not a decodable EXR file.
pub fn parse_exr(bytes: &[u8]) -> Result<ExrImage> {
    let decoded = image::load_from_memory_with_format(bytes, ImageFormat::OpenExr).map_err(
        |e| Error::Image {
            context: "exr parse",
            message: e.to_string(),
        },
    )?;

    let (pixels, width, height, pixel_format) = match decoded {
        DynamicImage::ImageRgb32F(img) => {
            let (width, height) = img.dimensions();
            (img.into_raw(), width, height, PixelFormat::Rgb)
        }
        DynamicImage::ImageRgba32F(img) => {
            let (width, height) = img.dimensions();
            (img.into_raw(), width, height, PixelFormat::Rgba)
        }
        other => {
            let img = other.to_rgba32f();
            let (width, height) = img.dimensions();
            (img.into_raw(), width, height, PixelFormat::Rgba)
        }
    };

    Ok(ExrImage {
        pixels,
        width,
        height,
        pixel_format,
        component_type: ComponentType::F32,
    })
}

/// Encode an RGBA bitmap as PNG.
///
/// Takes the bitmap by value; its pixel buffer moves into the encoder
/// rather than being copied.
///
/// # Errors
///
/// Returns [`Error::Image`] if the buffer length does not match the
/// dimensions or PNG encoding fails.
pub fn encode_bitmap(bitmap: Bitmap) -> Result<EncodedBitmap> {
    let Bitmap {
        width,
        height,
        rgba,
    } = bitmap;

    let expected = (width as usize) * (height as usize) * 4;
    if rgba.len() != expected {
        return Err(Error::Image {
            context: "bitmap encode",
            message: format!(
                "{width}x{height} bitmap needs {expected} bytes, got {}",
                rgba.len()
            ),
        });
    }

    let img: ImageBuffer<Rgba<u8>, _> =
        ImageBuffer::from_raw(width, height, rgba).ok_or_else(|| Error::Image {
            context: "bitmap encode",
            message: "failed to build image buffer".to_string(),
        })?;

    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| Error::Image {
            context: "bitmap encode",
            message: e.to_string(),
        })?;

    Ok(EncodedBitmap {
        bytes: buffer.into_inner(),
        width,
        height,
        encoding: BitmapEncoding::Png,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba32FImage;

    #[test]
    fn test_encode_bitmap_round_trip() {
        // 2x1: one red pixel, one translucent green pixel.
        let bitmap = Bitmap {
            width: 2,
            height: 1,
            rgba: vec![255, 0, 0, 255, 0, 255, 0, 128],
        };

        let encoded = encode_bitmap(bitmap).unwrap();
        assert_eq!(encoded.encoding, BitmapEncoding::Png);
        assert_eq!((encoded.width, encoded.height), (2, 1));

        // PNG is lossless; decoding must return the original pixels.
        let decoded = image::load_from_memory_with_format(&encoded.bytes, ImageFormat::Png)
            .unwrap()
            .to_rgba8();
        assert_eq!((decoded.width(), decoded.height()), (2, 1));
        assert_eq!(decoded.into_raw(), vec![255, 0, 0, 255, 0, 255, 0, 128]);
    }

    #[test]
    fn test_encode_bitmap_wrong_length() {
        let bitmap = Bitmap {
            width: 2,
            height: 2,
            rgba: vec![0; 7],
        };
        assert!(matches!(
            encode_bitmap(bitmap),
            Err(Error::Image {
                context: "bitmap encode",
                ..
            })
        ));
    }

    #[test]
    fn test_parse_exr_round_trip() {
        let source = Rgba32FImage::from_raw(2, 1, vec![0.5, 0.25, 1.0, 1.0, 0.0, 2.0, 4.0, 1.0])
            .unwrap();
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgba32F(source)
            .write_to(&mut bytes, ImageFormat::OpenExr)
            .unwrap();

        let parsed = parse_exr(&bytes.into_inner()).unwrap();
        assert_eq!((parsed.width, parsed.height), (2, 1));
        assert_eq!(parsed.pixel_format, PixelFormat::Rgba);
        assert_eq!(parsed.component_type, ComponentType::F32);
        assert_eq!(
            parsed.pixels,
            vec![0.5, 0.25, 1.0, 1.0, 0.0, 2.0, 4.0, 1.0]
        );
    }

    #[test]
    fn test_parse_exr_rejects_garbage() {
        assert!(matches!(
            parse_exr(&[0x00, 0x01, 0x02, 0x03]),
            Err(Error::Image {
                context: "exr parse",
                ..
            })
        ));
    }
}
