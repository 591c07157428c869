// src/tasks/image.rs

//! Image and font optimisation into `dist`.

use std::path::Path;

use anyhow::Context;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageFormat};
use tracing::{debug, info};

use crate::errors::Result;
use crate::tasks::TaskContext;
use crate::tasks::transform::{FileOutput, transform_each};
use crate::types::TaskKind;

/// JPEG is re-encoded lossily at this quality.
const JPEG_QUALITY: u8 = 85;

pub fn run_images(ctx: &TaskContext) -> Result<()> {
    let pattern = ctx.config.build.paths.images.clone();
    optimize_glob(ctx, TaskKind::Image, &pattern)
}

/// Fonts go through the same optimiser; only SVG fonts would change, and
/// those pass through untouched.
pub fn run_fonts(ctx: &TaskContext) -> Result<()> {
    let pattern = ctx.config.build.paths.fonts.clone();
    optimize_glob(ctx, TaskKind::Font, &pattern)
}

fn optimize_glob(ctx: &TaskContext, kind: TaskKind, pattern: &str) -> Result<()> {
    let tool = ctx.config.tools.image.as_deref();
    let mut saved: u64 = 0;

    let written = transform_each(
        ctx,
        kind,
        &ctx.src_dir(),
        pattern,
        &ctx.dist_dir(),
        |src, input| {
            let before = input.len();
            let bytes = match tool {
                Some(cmd) => ctx.pipe_through(cmd, &input, &src.abs)?,
                None => optimize(input, &src.abs)?,
            };
            saved += before.saturating_sub(bytes.len()) as u64;
            Ok(Some(FileOutput::same_path(src, bytes)))
        },
    )?;

    info!(task = %kind, files = written.len(), saved_bytes = saved, "optimized");
    Ok(())
}

/// Recompress PNG losslessly and re-encode JPEG lossily at
/// [`JPEG_QUALITY`]. Either result is kept only when strictly smaller, so a
/// JPEG already at or below that quality is usually left as it was. Every
/// other format is returned unchanged.
pub fn optimize(bytes: Vec<u8>, path: &Path) -> anyhow::Result<Vec<u8>> {
    let format = match ImageFormat::from_path(path) {
        Ok(f @ (ImageFormat::Png | ImageFormat::Jpeg)) => f,
        _ => return Ok(bytes),
    };

    let img = image::load_from_memory_with_format(&bytes, format)
        .with_context(|| format!("decoding {format:?} image"))?;

    let encoded = match format {
        ImageFormat::Png => encode_png(&img)?,
        _ => encode_jpeg(&img)?,
    };

    if encoded.len() < bytes.len() {
        debug!(?path, before = bytes.len(), after = encoded.len(), "recompressed");
        Ok(encoded)
    } else {
        Ok(bytes)
    }
}

fn encode_png(img: &DynamicImage) -> anyhow::Result<Vec<u8>> {
    let mut out = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
    img.write_with_encoder(encoder).context("encoding PNG")?;
    Ok(out)
}

fn encode_jpeg(img: &DynamicImage) -> anyhow::Result<Vec<u8>> {
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    img.write_with_encoder(encoder).context("encoding JPEG")?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    #[test]
    fn svg_passes_through() {
        let svg = b"<svg xmlns='http://www.w3.org/2000/svg'/>".to_vec();
        assert_eq!(optimize(svg.clone(), Path::new("logo.svg")).unwrap(), svg);
    }

    #[test]
    fn output_never_grows() {
        let img = ImageBuffer::from_fn(32, 32, |x, y| Rgba([(x * 8) as u8, (y * 8) as u8, 0, 255]));
        let mut png = Vec::new();
        let encoder = PngEncoder::new_with_quality(&mut png, CompressionType::Fast, FilterType::NoFilter);
        DynamicImage::ImageRgba8(img).write_with_encoder(encoder).unwrap();

        let out = optimize(png.clone(), Path::new("a.png")).unwrap();
        assert!(out.len() <= png.len());
        image::load_from_memory(&out).unwrap();
    }

    #[test]
    fn high_quality_jpeg_is_reencoded_at_fixed_quality() {
        let img = ImageBuffer::from_fn(64, 48, |x, y| image::Rgb([(x * 4) as u8, (y * 5) as u8, 128]));
        let mut jpeg = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut jpeg, 100);
        DynamicImage::ImageRgb8(img).write_with_encoder(encoder).unwrap();

        let out = optimize(jpeg.clone(), Path::new("photo.jpg")).unwrap();
        assert!(out.len() < jpeg.len());
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn corrupt_png_is_an_error() {
        assert!(optimize(b"not a png".to_vec(), Path::new("x.png")).is_err());
    }
}
