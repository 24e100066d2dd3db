//! Bounded recompression of uploaded images. Recipe pages only need to be
//! legible for the vision model; dish photos get a little more room.

use anyhow::{anyhow, Result};
use image::DynamicImage;
use recetario::draft::{DishPhoto, PageImage};

/// Longest edge / byte budget for transcription source pages.
const PAGE_MAX_EDGE: u32 = 1280;
const PAGE_MAX_BYTES: usize = 300 * 1024;

/// Longest edge / byte budget for dish photos.
const DISH_MAX_EDGE: u32 = 1200;
const DISH_MAX_BYTES: usize = 500 * 1024;

const QUALITY_STEPS: [f32; 4] = [75.0, 60.0, 45.0, 30.0];

pub const OUTPUT_MIME: &str = "image/webp";
pub const OUTPUT_EXTENSION: &str = "webp";

/// Prepare one captured page for transcription. A failure leaves the
/// caller's already-collected pages untouched.
pub fn prepare_page(bytes: &[u8]) -> Result<PageImage> {
    let compressed = shrink(bytes, PAGE_MAX_EDGE, PAGE_MAX_BYTES)?;
    Ok(PageImage {
        bytes: compressed,
        mime: OUTPUT_MIME.into(),
    })
}

/// Prepare a dish photo, already cropped client-side.
pub fn prepare_dish_photo(bytes: &[u8]) -> Result<DishPhoto> {
    let compressed = shrink(bytes, DISH_MAX_EDGE, DISH_MAX_BYTES)?;
    Ok(DishPhoto {
        bytes: compressed,
        mime: OUTPUT_MIME.into(),
        extension: OUTPUT_EXTENSION.into(),
    })
}

/// Decode, downscale to the edge bound, and re-encode as lossy webp,
/// stepping quality down until the byte budget is met. The lowest-quality
/// attempt wins if even that overshoots.
fn shrink(bytes: &[u8], max_edge: u32, max_bytes: usize) -> Result<Vec<u8>> {
    let mut img = image::load_from_memory(bytes)?;
    if img.width().max(img.height()) > max_edge {
        img = img.resize(max_edge, max_edge, image::imageops::FilterType::Lanczos3);
    }
    // The webp encoder only takes 8-bit RGB/RGBA frames.
    let img = DynamicImage::ImageRgb8(img.to_rgb8());
    let encoder =
        webp::Encoder::from_image(&img).map_err(|st| anyhow!("Webp encoder error: {}", st))?;
    let mut smallest: Option<Vec<u8>> = None;
    for quality in QUALITY_STEPS {
        let encoded = encoder.encode(quality).to_vec();
        if encoded.len() <= max_bytes {
            return Ok(encoded);
        }
        smallest = Some(encoded);
    }
    Ok(smallest.expect("at least one quality step"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;

    fn png_of(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    #[test]
    fn pages_are_bounded_in_size_and_edge() {
        let prepared = prepare_page(&png_of(2600, 1800)).unwrap();
        assert_eq!(prepared.mime, "image/webp");
        assert!(prepared.bytes.len() <= 300 * 1024);
        let out = image::load_from_memory(&prepared.bytes).unwrap();
        assert!(out.width().max(out.height()) <= 1280);
    }

    #[test]
    fn small_images_are_not_upscaled() {
        let prepared = prepare_dish_photo(&png_of(400, 300)).unwrap();
        let out = image::load_from_memory(&prepared.bytes).unwrap();
        assert_eq!((out.width(), out.height()), (400, 300));
    }

    #[test]
    fn garbage_input_is_rejected() {
        assert!(prepare_page(b"definitely not an image").is_err());
    }
}
