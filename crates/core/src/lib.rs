//! CropFit Core Library
//!
//! This library provides the core functionality for the CropFit batch
//! cropping tool: fixed-ratio crop boxes and "fit with border" canvases
//! exported as JPEG.
//!
//! # Overview
//!
//! A run selects a list of source images, positions a crop box (or plans a
//! padded canvas) for each one and exports the result. The library handles:
//!
//! - **Geometry**: display fit, crop box placement and clamping, source
//!   pixel mapping and padded canvas planning via [`geometry`]
//! - **Image Processing**: decode, crop, pad and atomic JPEG export via
//!   [`image_processing`]
//! - **Session**: file list, navigation and export sequencing via [`session`]
//!
//! # Quick Start
//!
//! The simplest way to use the library is through the [`CropFit`] facade:
//!
//! ```ignore
//! use cropfit_core::CropFit;
//!
//! let mut app = CropFit::new()?;
//! let session = app.session_mut();
//! session.select_files(paths)?;
//! session.set_output_dir("/tmp/out")?;
//! session.drag(12.0, 0.0)?;
//! session.export_current()?;
//! ```
//!
//! # Module Structure
//!
//! - [`config`]: Configuration loading from the environment
//! - [`error`]: Error types and result aliases
//! - [`geometry`]: Pure crop and canvas geometry
//! - [`image_processing`]: Pixel operations behind [`ProcessingAdapter`]
//! - [`logging`]: Tracing subscriber setup
//! - [`session`]: Navigation, crop state and export
//! - [`settings`]: Persisted user preferences

pub mod config;
pub mod error;
pub mod geometry;
pub mod image_processing;
pub mod logging;
pub mod session;
pub mod settings;

// Re-export primary types for convenience
pub use config::Config;
pub use error::{AppError, Result};
pub use image_processing::{ExportMode, ImageProcessor, ProcessingAdapter};
pub use session::Session;
pub use settings::Settings;

/// Main entry point for the CropFit application.
///
/// Bundles configuration with a [`Session`] backed by the real
/// [`ImageProcessor`].
pub struct CropFit {
    config: Config,
    session: Session<ImageProcessor>,
}

impl CropFit {
    /// Creates an instance from environment configuration and the
    /// settings remembered from the last run.
    ///
    /// # Errors
    ///
    /// Returns an error if an environment value is invalid.
    pub fn new() -> Result<Self> {
        let config = Config::load()?;
        Self::with_config(config, Settings::load())
    }

    /// Creates an instance with explicit configuration and settings.
    pub fn with_config(config: Config, settings: Settings) -> Result<Self> {
        let processor = ImageProcessor::from_config(&config);
        let session = Session::from_config(processor, &config, &settings)?;
        Ok(Self { config, session })
    }

    /// Returns a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &Session<ImageProcessor> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<ImageProcessor> {
        &mut self.session
    }

    /// Persists the session's ratio, mode, border and output directory.
    pub fn save_settings(&self) -> Result<()> {
        self.session.settings().save()
    }
}

/// Initializes the library by loading environment variables and
/// installing the tracing subscriber.
///
/// Call this once at application startup before using any other functions.
pub fn init() {
    let _ = dotenvy::dotenv();
    logging::init();
}
