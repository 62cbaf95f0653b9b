use crate::error::{AppError, Result};
use crate::geometry::Dimensions;
use crate::image_processing::{DEFAULT_JPEG_QUALITY, WHITE};
use dotenvy::dotenv;
use image::Rgb;
use std::env;
use std::path::PathBuf;

/// Viewport used for display geometry when none is configured.
pub const DEFAULT_VIEWPORT: (f64, f64) = (1100.0, 640.0);

#[derive(Clone, Debug)]
pub struct Config {
    pub jpeg_quality: u8,
    pub viewport: Dimensions,
    pub background: Rgb<u8>,
    pub output_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            viewport: Dimensions {
                width: DEFAULT_VIEWPORT.0,
                height: DEFAULT_VIEWPORT.1,
            },
            background: WHITE,
            output_dir: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists, ignore if it doesn't
        let _ = dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup, falling back to
    /// defaults for missing keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup("CROPFIT_JPEG_QUALITY") {
            config.jpeg_quality = raw
                .trim()
                .parse::<u8>()
                .ok()
                .filter(|q| (1..=100).contains(q))
                .ok_or_else(|| {
                    AppError::config(format!("CROPFIT_JPEG_QUALITY must be 1-100, got '{}'", raw))
                })?;
        }
        if let Some(raw) = lookup("CROPFIT_VIEWPORT") {
            config.viewport = parse_size(&raw)
                .map_err(|_| AppError::config(format!("CROPFIT_VIEWPORT must look like 1100x640, got '{}'", raw)))?;
        }
        if let Some(raw) = lookup("CROPFIT_BACKGROUND") {
            config.background = parse_hex_color(&raw)?;
        }
        config.output_dir = lookup("CROPFIT_OUTPUT_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from);

        Ok(config)
    }
}

/// Parses `WIDTHxHEIGHT` into validated dimensions.
pub fn parse_size(raw: &str) -> Result<Dimensions> {
    let invalid = || AppError::config(format!("invalid size '{}'", raw));
    let (w, h) = raw.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
    let w = w.trim().parse::<f64>().map_err(|_| invalid())?;
    let h = h.trim().parse::<f64>().map_err(|_| invalid())?;
    Dimensions::new(w, h)
}

/// Parses `RRGGBB` (optionally prefixed with `#`).
pub fn parse_hex_color(raw: &str) -> Result<Rgb<u8>> {
    let hex = raw.trim().trim_start_matches('#');
    let invalid = || AppError::config(format!("invalid color '{}' (expected RRGGBB)", raw));
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(invalid());
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
    Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
}
