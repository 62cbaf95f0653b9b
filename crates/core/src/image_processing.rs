//! Image decoding, cropping, padding and JPEG export.
//!
//! This is the only module that touches pixels. The geometry engine hands
//! it either a [`PixelRect`] (crop mode) or a [`PlacementResult`] (pad
//! mode) in source pixels; this module decodes, applies EXIF orientation,
//! composes and encodes.
//!
//! # Atomic output
//!
//! Every export is encoded into a temporary file in the output directory
//! and renamed onto the final path only after encoding succeeded, so a
//! failed export never leaves a truncated JPEG behind.

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::geometry::{AspectRatioMode, Dimensions, PixelRect, PlacementResult};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageDecoder, ImageError, ImageReader, Rgb, RgbImage, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;

/// Extensions accepted when selecting input files (lowercase).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "tif", "tiff", "heic"];

/// Extensions accepted for selection that have no decoder available.
const UNDECODABLE_EXTENSIONS: &[&str] = &["heic"];

/// JPEG quality used when nothing else is configured.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Background used for padded canvases.
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Whether the output crops to a box or pads onto a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    #[default]
    Crop,
    Pad,
}

impl ExportMode {
    /// Tag used in output file names.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Crop => "crop",
            Self::Pad => "fitted",
        }
    }
}

impl fmt::Display for ExportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Crop => "crop",
            Self::Pad => "pad",
        })
    }
}

impl FromStr for ExportMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "crop" => Ok(Self::Crop),
            "pad" | "fit" | "fitted" => Ok(Self::Pad),
            other => Err(AppError::config(format!(
                "unknown export mode '{}' (expected crop or pad)",
                other
            ))),
        }
    }
}

/// The pixel-level operations the session relies on.
///
/// [`ImageProcessor`] is the real implementation; tests substitute a
/// recording fake.
pub trait ProcessingAdapter {
    /// Returns the display-oriented size of the image at `path`.
    fn decode_metadata(&self, path: &Path) -> Result<Dimensions>;

    /// Extracts `region` from `input` and writes it to `output` as JPEG.
    fn crop_and_encode(&self, input: &Path, region: PixelRect, output: &Path) -> Result<()>;

    /// Composes `input` onto a `background` canvas laid out by `placement`
    /// and writes it to `output` as JPEG.
    fn pad_and_encode(
        &self,
        input: &Path,
        placement: &PlacementResult,
        background: Rgb<u8>,
        output: &Path,
    ) -> Result<()>;
}

/// [`ProcessingAdapter`] backed by the `image` crate.
#[derive(Debug, Clone)]
pub struct ImageProcessor {
    jpeg_quality: u8,
    filter: FilterType,
}

impl Default for ImageProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl ImageProcessor {
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
            filter: FilterType::Lanczos3,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.jpeg_quality)
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    /// Decodes the full image with EXIF orientation applied.
    pub fn load(&self, path: &Path) -> Result<DynamicImage> {
        reject_undecodable(path)?;
        let mut decoder = open_decoder(path)?;
        let orientation = decoder.orientation().map_err(|e| map_decode_error(path, e))?;
        let mut image = DynamicImage::from_decoder(decoder).map_err(|e| map_decode_error(path, e))?;
        image.apply_orientation(orientation);
        Ok(image)
    }

    fn write_jpeg(&self, image: &RgbImage, output: &Path) -> Result<()> {
        let dir = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = temp_file_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            JpegEncoder::new_with_quality(&mut writer, self.jpeg_quality)
                .encode_image(image)
                .map_err(|e| AppError::encode(format!("{}: {}", output.display(), e)))?;
            writer.flush()?;
        }
        tmp.persist(output).map_err(|e| AppError::Io(e.error))?;
        Ok(())
    }
}

impl ProcessingAdapter for ImageProcessor {
    fn decode_metadata(&self, path: &Path) -> Result<Dimensions> {
        reject_undecodable(path)?;
        let mut decoder = open_decoder(path)?;
        let (width, height) = decoder.dimensions();
        let orientation = decoder.orientation().map_err(|e| map_decode_error(path, e))?;
        let (width, height) = if swaps_axes(orientation) {
            (height, width)
        } else {
            (width, height)
        };
        Dimensions::from_pixels(width, height)
    }

    fn crop_and_encode(&self, input: &Path, region: PixelRect, output: &Path) -> Result<()> {
        let image = self.load(input)?;
        if region.x >= image.width() || region.y >= image.height() {
            return Err(AppError::encode(format!(
                "crop origin {},{} is outside {}x{}",
                region.x,
                region.y,
                image.width(),
                image.height()
            )));
        }
        let width = region.width.min(image.width() - region.x);
        let height = region.height.min(image.height() - region.y);
        let cropped = image.crop_imm(region.x, region.y, width, height);

        self.write_jpeg(&flatten(&cropped, WHITE), output)?;
        tracing::info!(
            input = %input.display(),
            output = %output.display(),
            width,
            height,
            "exported crop"
        );
        Ok(())
    }

    fn pad_and_encode(
        &self,
        input: &Path,
        placement: &PlacementResult,
        background: Rgb<u8>,
        output: &Path,
    ) -> Result<()> {
        let image = self.load(input)?;
        let content = if image.width() == placement.image_width
            && image.height() == placement.image_height
        {
            image
        } else {
            image.resize_exact(placement.image_width, placement.image_height, self.filter)
        };

        let [r, g, b] = background.0;
        let mut canvas = RgbaImage::from_pixel(
            placement.canvas_width,
            placement.canvas_height,
            Rgba([r, g, b, 255]),
        );
        imageops::overlay(
            &mut canvas,
            &content.to_rgba8(),
            placement.image_offset_x as i64,
            placement.image_offset_y as i64,
        );

        self.write_jpeg(&DynamicImage::ImageRgba8(canvas).to_rgb8(), output)?;
        tracing::info!(
            input = %input.display(),
            output = %output.display(),
            canvas_width = placement.canvas_width,
            canvas_height = placement.canvas_height,
            "exported padded canvas"
        );
        Ok(())
    }
}

/// Temporary file that ends up with the same mode as a plain `File::create`
/// once renamed: `0o666` filtered by the process umask.
fn temp_file_in(dir: &Path) -> Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(".cropfit-");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    Ok(builder.tempfile_in(dir)?)
}

/// Drops alpha by compositing onto an opaque background.
fn flatten(image: &DynamicImage, background: Rgb<u8>) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }
    let [r, g, b] = background.0;
    let mut canvas = RgbaImage::from_pixel(image.width(), image.height(), Rgba([r, g, b, 255]));
    imageops::overlay(&mut canvas, &image.to_rgba8(), 0, 0);
    DynamicImage::ImageRgba8(canvas).to_rgb8()
}

fn open_decoder(path: &Path) -> Result<impl ImageDecoder> {
    ImageReader::open(path)?
        .with_guessed_format()?
        .into_decoder()
        .map_err(|e| map_decode_error(path, e))
}

fn reject_undecodable(path: &Path) -> Result<()> {
    match extension_of(path) {
        Some(ext) if UNDECODABLE_EXTENSIONS.contains(&ext.as_str()) => {
            Err(AppError::UnsupportedFormat(path.display().to_string()))
        }
        _ => Ok(()),
    }
}

fn map_decode_error(path: &Path, err: ImageError) -> AppError {
    match err {
        ImageError::Unsupported(e) => {
            AppError::UnsupportedFormat(format!("{}: {}", path.display(), e))
        }
        ImageError::IoError(e) => AppError::Io(e),
        other => AppError::decode(format!("{}: {}", path.display(), other)),
    }
}

fn swaps_axes(orientation: image::metadata::Orientation) -> bool {
    use image::metadata::Orientation::*;
    matches!(orientation, Rotate90 | Rotate270 | Rotate90FlipH | Rotate270FlipH)
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Whether `path` has one of the [`SUPPORTED_EXTENSIONS`].
pub fn is_supported_image(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

/// Output file for `input`: `<stem>_crop_<ratio>.jpg` or `<stem>_fitted_<ratio>.jpg`.
pub fn output_path(
    input: &Path,
    out_dir: &Path,
    mode: ExportMode,
    ratio: AspectRatioMode,
) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    out_dir.join(format!("{}_{}_{}.jpg", stem, mode.tag(), ratio.suffix()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::AspectRatio;

    #[test]
    fn output_names_encode_mode_and_ratio() {
        let out = Path::new("/out");
        assert_eq!(
            output_path(Path::new("/in/IMG_001.HEIC"), out, ExportMode::Crop, AspectRatioMode::default()),
            PathBuf::from("/out/IMG_001_crop_4x3.jpg")
        );
        assert_eq!(
            output_path(
                Path::new("photo.png"),
                out,
                ExportMode::Pad,
                AspectRatioMode::Fixed(AspectRatio::SQUARE)
            ),
            PathBuf::from("/out/photo_fitted_1x1.jpg")
        );
        assert_eq!(
            output_path(Path::new("a.b.jpg"), out, ExportMode::Pad, AspectRatioMode::Original),
            PathBuf::from("/out/a.b_fitted_original.jpg")
        );
    }

    #[test]
    fn supported_extensions_are_case_insensitive() {
        assert!(is_supported_image(Path::new("x.JPG")));
        assert!(is_supported_image(Path::new("x.tiff")));
        assert!(is_supported_image(Path::new("x.heic")));
        assert!(!is_supported_image(Path::new("x.gif")));
        assert!(!is_supported_image(Path::new("noext")));
    }

    #[test]
    fn export_mode_parsing() {
        assert_eq!("crop".parse::<ExportMode>().unwrap(), ExportMode::Crop);
        assert_eq!("Fit".parse::<ExportMode>().unwrap(), ExportMode::Pad);
        assert!("stretch".parse::<ExportMode>().is_err());
    }

    #[test]
    fn heic_is_selectable_but_not_decodable() {
        let err = ImageProcessor::default()
            .decode_metadata(Path::new("/nowhere/photo.heic"))
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFormat(_)));
    }

    #[test]
    fn quality_is_clamped() {
        assert_eq!(ImageProcessor::new(0).jpeg_quality(), 1);
        assert_eq!(ImageProcessor::new(200).jpeg_quality(), 100);
    }

    #[test]
    fn flatten_composites_transparency_onto_background() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0])));
        let flat = flatten(&image, WHITE);
        assert_eq!(flat.get_pixel(0, 0), &Rgb([255, 255, 255]));
    }
}
