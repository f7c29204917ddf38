use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use resvg::tiny_skia::{Pixmap, Transform};

use crate::block::DocumentUri;
use crate::export::filename::export_file_name;
use crate::renderer::{RenderError, parse_svg};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Nothing has been rendered yet")]
    NothingToExport,

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Invalid raster size {width}x{height}")]
    InvalidSize { width: f64, height: f64 },

    #[error("PNG encoding failed: {0}")]
    Encode(#[from] png::EncodingError),

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Clipboard unavailable: {0}")]
    Clipboard(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Svg,
    Png,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Svg => "SVG",
            Self::Png => "PNG",
        }
    }
}

/// Straight (non-premultiplied) RGBA pixels
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Raster dimensions for a diagram: the long edge gets `resolution`
/// pixels, the short edge follows the aspect ratio
pub fn raster_size(width: f64, height: f64, resolution: u32) -> Result<(u32, u32), ExportError> {
    if !(width > 0.0 && height > 0.0) || resolution == 0 {
        return Err(ExportError::InvalidSize { width, height });
    }

    let resolution_f = f64::from(resolution);
    let aspect_ratio = width / height;
    let scaled = |edge: f64| (edge.round() as u32).max(1);

    if aspect_ratio > 1.0 {
        Ok((resolution, scaled(resolution_f / aspect_ratio)))
    } else {
        Ok((scaled(resolution_f * aspect_ratio), resolution))
    }
}

pub fn rasterize(svg: &str, resolution: u32) -> Result<RasterImage, ExportError> {
    let tree = parse_svg(svg)?;
    let size = tree.size();
    let natural_width = f64::from(size.width());
    let natural_height = f64::from(size.height());
    let (width, height) = raster_size(natural_width, natural_height, resolution)?;

    let mut pixmap = Pixmap::new(width, height).ok_or(ExportError::InvalidSize {
        width: f64::from(width),
        height: f64::from(height),
    })?;
    let transform = Transform::from_scale(
        width as f32 / size.width(),
        height as f32 / size.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    let mut rgba = pixmap.data().to_vec();
    unpremultiply_rgba(&mut rgba);
    debug!("Rasterized {natural_width}x{natural_height} diagram to {width}x{height}");
    Ok(RasterImage {
        width,
        height,
        rgba,
    })
}

fn unpremultiply_rgba(data: &mut [u8]) {
    for pixel in data.chunks_mut(4) {
        let alpha = pixel[3];
        if alpha == 0 {
            pixel[0] = 0;
            pixel[1] = 0;
            pixel[2] = 0;
            continue;
        }
        let a = u32::from(alpha);
        for channel in &mut pixel[..3] {
            *channel = ((u32::from(*channel) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

pub fn encode_png(image: &RasterImage) -> Result<Vec<u8>, ExportError> {
    let mut png_data: Vec<u8> = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, image.width, image.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&image.rgba)?;
        writer.finish()?;
    }
    Ok(png_data)
}

fn write_file(path: PathBuf, bytes: &[u8]) -> Result<PathBuf, ExportError> {
    match fs::write(&path, bytes) {
        Ok(()) => {
            info!("Exported diagram to {}", path.display());
            Ok(path)
        }
        Err(source) => Err(ExportError::Write { path, source }),
    }
}

/// Write `svg` as `<document stem>.svg` (or `.png`) inside `dir`
pub fn export_to_dir(
    dir: &Path,
    uri: &DocumentUri,
    svg: &str,
    format: ExportFormat,
    resolution: u32,
) -> Result<PathBuf, ExportError> {
    let path = dir.join(export_file_name(uri, format.extension()));
    match format {
        ExportFormat::Svg => write_file(path, svg.as_bytes()),
        ExportFormat::Png => {
            let png = encode_png(&rasterize(svg, resolution)?)?;
            write_file(path, &png)
        }
    }
}

/// Destination for raster copies
pub trait ImageClipboard {
    fn set_image(&mut self, image: &RasterImage) -> Result<(), ExportError>;
}

/// The system clipboard via `arboard`
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl ImageClipboard for SystemClipboard {
    fn set_image(&mut self, image: &RasterImage) -> Result<(), ExportError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| ExportError::Clipboard(e.to_string()))?;
        clipboard
            .set_image(arboard::ImageData {
                width: image.width as usize,
                height: image.height as usize,
                bytes: Cow::Borrowed(&image.rgba),
            })
            .map_err(|e| ExportError::Clipboard(e.to_string()))
    }
}

pub fn copy_to_clipboard(
    clipboard: &mut dyn ImageClipboard,
    svg: &str,
    resolution: u32,
) -> Result<(), ExportError> {
    let image = rasterize(svg, resolution)?;
    clipboard.set_image(&image)?;
    debug!("Copied {}x{} diagram to clipboard", image.width, image.height);
    Ok(())
}
