//! Batch session state.
//!
//! A [`Session`] owns everything a front end needs between user actions:
//! the selected files, the current position, the output directory, the
//! ratio/border choices and the geometry of the loaded image. It is
//! created once per run and reset whenever a new file selection is made.
//!
//! # Request serialization
//!
//! Only one load or export may be in flight at a time. Each such request
//! takes the [`OperationSlot`]; a second request while the slot is taken
//! fails with [`AppError::Busy`] instead of being dropped silently. Front
//! ends that dispatch work elsewhere can clone the slot to check it.

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::geometry::{
    compute_fit, drag_crop_box, initial_crop_box_for_mode, plan_padding, AspectRatioMode,
    BorderSpec, Dimensions, Display, FitResult, PixelRect, PlacementResult, Rect,
};
use crate::image_processing::{is_supported_image, output_path, ExportMode, ProcessingAdapter, WHITE};
use crate::settings::Settings;
use image::Rgb;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Kinds of work that occupy the operation slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    SelectFiles,
    Load,
    Export,
    BatchExport,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SelectFiles => "file selection",
            Self::Load => "image load",
            Self::Export => "export",
            Self::BatchExport => "batch export",
        })
    }
}

/// Single-slot in-flight operation token.
#[derive(Debug, Clone, Default)]
pub struct OperationSlot {
    active: Arc<Mutex<Option<Operation>>>,
}

impl OperationSlot {
    fn lock(&self) -> MutexGuard<'_, Option<Operation>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claims the slot for `op`. The slot is released when the returned
    /// guard is dropped.
    ///
    /// # Errors
    /// [`AppError::Busy`] naming the operation that currently holds the slot.
    pub fn try_begin(&self, op: Operation) -> Result<OperationGuard> {
        let mut active = self.lock();
        if let Some(current) = *active {
            tracing::warn!(requested = %op, %current, "rejecting request while busy");
            return Err(AppError::Busy(current.to_string()));
        }
        *active = Some(op);
        Ok(OperationGuard { slot: self.clone() })
    }

    /// The operation currently holding the slot, if any.
    pub fn current(&self) -> Option<Operation> {
        *self.lock()
    }

    pub fn is_busy(&self) -> bool {
        self.current().is_some()
    }
}

/// Releases the [`OperationSlot`] on drop.
#[derive(Debug)]
pub struct OperationGuard {
    slot: OperationSlot,
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        *self.slot.lock() = None;
    }
}

/// Geometry of the image at the current position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadedImage {
    pub path: PathBuf,
    pub source: Dimensions,
    pub fit: FitResult,
    /// Crop box in display space, always inside the placed image.
    pub crop_box: Rect<Display>,
    pub placement: PlacementResult,
}

/// What an export of the current image would do.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ExportAction {
    Crop {
        crop_box: Rect<Display>,
        region: PixelRect,
    },
    Pad {
        placement: PlacementResult,
    },
}

/// A fully resolved export of one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportPlan {
    pub input: PathBuf,
    /// `None` until an output directory is chosen.
    pub output: Option<PathBuf>,
    pub source: Dimensions,
    pub fit: FitResult,
    pub action: ExportAction,
}

/// Result of [`Session::export_current`].
#[derive(Debug)]
pub struct ExportOutcome {
    pub output: PathBuf,
    /// Whether the session moved on to the next image.
    pub advanced: bool,
    /// Set when the export was written but the next image failed to load.
    /// The session then points at that image with no current geometry.
    pub next_error: Option<AppError>,
}

/// Owned state of one cropping run.
pub struct Session<A: ProcessingAdapter> {
    adapter: A,
    files: Vec<PathBuf>,
    index: Option<usize>,
    output_dir: Option<PathBuf>,
    viewport: Dimensions,
    export_mode: ExportMode,
    ratio_mode: AspectRatioMode,
    border: BorderSpec,
    background: Rgb<u8>,
    current: Option<LoadedImage>,
    slot: OperationSlot,
}

impl<A: ProcessingAdapter> Session<A> {
    /// Creates an empty session displaying into `viewport`.
    pub fn new(adapter: A, viewport: Dimensions) -> Result<Self> {
        viewport.validate()?;
        Ok(Self {
            adapter,
            files: Vec::new(),
            index: None,
            output_dir: None,
            viewport,
            export_mode: ExportMode::default(),
            ratio_mode: AspectRatioMode::default(),
            border: BorderSpec::default(),
            background: WHITE,
            current: None,
            slot: OperationSlot::default(),
        })
    }

    /// Creates a session from configuration plus remembered settings.
    /// The configured output directory wins over the remembered one.
    pub fn from_config(adapter: A, config: &Config, settings: &Settings) -> Result<Self> {
        let mut session = Self::new(adapter, config.viewport)?;
        settings.border.validate()?;
        session.export_mode = settings.export_mode;
        session.ratio_mode = settings.ratio_mode;
        session.border = settings.border;
        session.background = config.background;
        session.output_dir = config
            .output_dir
            .clone()
            .or_else(|| settings.output_dir.clone());
        Ok(session)
    }

    /// Snapshot of the choices worth remembering.
    pub fn settings(&self) -> Settings {
        Settings {
            ratio_mode: self.ratio_mode,
            export_mode: self.export_mode,
            border: self.border,
            output_dir: self.output_dir.clone(),
        }
    }

    pub fn slot(&self) -> &OperationSlot {
        &self.slot
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn current(&self) -> Option<&LoadedImage> {
        self.current.as_ref()
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    pub fn viewport(&self) -> Dimensions {
        self.viewport
    }

    pub fn export_mode(&self) -> ExportMode {
        self.export_mode
    }

    pub fn ratio_mode(&self) -> AspectRatioMode {
        self.ratio_mode
    }

    pub fn border(&self) -> BorderSpec {
        self.border
    }

    /// Position label such as `(2/5)`, or `(0/0)` with no files.
    pub fn counter(&self) -> String {
        match self.index {
            Some(i) if !self.files.is_empty() => format!("({}/{})", i + 1, self.files.len()),
            _ => "(0/0)".to_string(),
        }
    }

    pub fn can_go_previous(&self) -> bool {
        matches!(self.index, Some(i) if i > 0)
    }

    pub fn can_go_next(&self) -> bool {
        matches!(self.index, Some(i) if i + 1 < self.files.len())
    }

    pub fn can_export(&self) -> bool {
        self.current.is_some() && self.output_dir.is_some() && !self.slot.is_busy()
    }

    /// Replaces the file list, keeping only supported images, and loads the
    /// first one.
    ///
    /// # Errors
    /// [`AppError::NoImages`] if nothing usable was selected, otherwise any
    /// error from loading the first image.
    pub fn select_files<I>(&mut self, paths: I) -> Result<usize>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let _guard = self.slot.try_begin(Operation::SelectFiles)?;

        let (files, skipped): (Vec<_>, Vec<_>) =
            paths.into_iter().partition(|p| is_supported_image(p));
        for path in &skipped {
            tracing::warn!(path = %path.display(), "skipping unsupported file");
        }

        self.files = files;
        self.index = None;
        self.current = None;
        if self.files.is_empty() {
            return Err(AppError::NoImages);
        }

        tracing::info!(count = self.files.len(), "selected images");
        self.load_index(0)?;
        Ok(self.files.len())
    }

    /// Sets the directory exports are written to.
    pub fn set_output_dir(&mut self, dir: impl Into<PathBuf>) -> Result<()> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(AppError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("output directory {} does not exist", dir.display()),
            )));
        }
        self.output_dir = Some(dir);
        Ok(())
    }

    pub fn next(&mut self) -> Result<()> {
        let _guard = self.slot.try_begin(Operation::Load)?;
        match self.index {
            Some(i) if i + 1 < self.files.len() => self.load_index(i + 1),
            _ => Err(AppError::navigation("already at the last image")),
        }
    }

    pub fn previous(&mut self) -> Result<()> {
        let _guard = self.slot.try_begin(Operation::Load)?;
        match self.index {
            Some(i) if i > 0 => self.load_index(i - 1),
            _ => Err(AppError::navigation("already at the first image")),
        }
    }

    pub fn go_to(&mut self, index: usize) -> Result<()> {
        let _guard = self.slot.try_begin(Operation::Load)?;
        if index >= self.files.len() {
            return Err(AppError::navigation(format!(
                "index {} out of range for {} images",
                index,
                self.files.len()
            )));
        }
        self.load_index(index)
    }

    /// Puts the crop box back at its centered initial position.
    pub fn reset_crop(&mut self) -> Result<Rect<Display>> {
        let mode = self.ratio_mode;
        let loaded = self.current.as_mut().ok_or(AppError::NoImages)?;
        loaded.crop_box = initial_crop_box_for_mode(&loaded.fit, loaded.source, mode);
        Ok(loaded.crop_box)
    }

    /// Moves the crop box by a display-space delta, clamped to the image.
    pub fn drag(&mut self, dx: f64, dy: f64) -> Result<Rect<Display>> {
        let loaded = self.current.as_mut().ok_or(AppError::NoImages)?;
        loaded.crop_box = drag_crop_box(&loaded.crop_box, dx, dy, &loaded.fit);
        Ok(loaded.crop_box)
    }

    /// Changes the target ratio and re-derives the loaded image's geometry.
    pub fn set_ratio_mode(&mut self, mode: AspectRatioMode) -> Result<()> {
        self.ratio_mode = mode;
        self.refresh_geometry()
    }

    pub fn set_export_mode(&mut self, mode: ExportMode) {
        self.export_mode = mode;
    }

    pub fn set_border(&mut self, border: BorderSpec) -> Result<()> {
        border.validate()?;
        self.border = border;
        self.refresh_geometry()
    }

    /// Changes the display area; the crop box is re-derived like on a
    /// fresh load.
    pub fn set_viewport(&mut self, viewport: Dimensions) -> Result<()> {
        viewport.validate()?;
        self.viewport = viewport;
        self.refresh_geometry()
    }

    /// Resolves what exporting the current image would do.
    pub fn plan_current(&self) -> Result<ExportPlan> {
        let loaded = self.current.as_ref().ok_or(AppError::NoImages)?;
        Ok(self.plan_for(loaded))
    }

    /// Exports the current image and, on success, moves to the next one.
    ///
    /// An `Err` means nothing was written. A failure to load the next image
    /// after a successful export is reported in
    /// [`ExportOutcome::next_error`] instead.
    pub fn export_current(&mut self) -> Result<ExportOutcome> {
        let _guard = self.slot.try_begin(Operation::Export)?;
        let output = self.export_loaded()?;

        let mut outcome = ExportOutcome {
            output,
            advanced: false,
            next_error: None,
        };
        if let Some(i) = self.index.filter(|i| i + 1 < self.files.len()) {
            match self.load_index(i + 1) {
                Ok(()) => outcome.advanced = true,
                Err(e) => {
                    tracing::warn!(
                        path = %self.files[i + 1].display(),
                        error = %e,
                        "exported, but the next image failed to load"
                    );
                    outcome.next_error = Some(e);
                }
            }
        }
        Ok(outcome)
    }

    /// Exports every image from the current one to the end of the list.
    ///
    /// The current image keeps any adjustments already made; the rest use
    /// their initial geometry. Stops at the first failure; `on_exported`
    /// is called after each successful export.
    pub fn export_all(
        &mut self,
        mut on_exported: impl FnMut(usize, &Path),
    ) -> Result<Vec<PathBuf>> {
        let _guard = self.slot.try_begin(Operation::BatchExport)?;
        let start = self.index.ok_or(AppError::NoImages)?;

        let mut outputs = Vec::new();
        for i in start..self.files.len() {
            if i != start || self.current.is_none() {
                self.load_index(i)?;
            }
            let output = self.export_loaded()?;
            on_exported(i, output.as_path());
            outputs.push(output);
        }
        Ok(outputs)
    }

    fn export_loaded(&self) -> Result<PathBuf> {
        let out_dir = self.output_dir.as_deref().ok_or(AppError::NoOutputDir)?;
        let loaded = self.current.as_ref().ok_or(AppError::NoImages)?;
        let output = output_path(&loaded.path, out_dir, self.export_mode, self.ratio_mode);
        if output.exists() {
            tracing::warn!(
                input = %loaded.path.display(),
                output = %output.display(),
                "overwriting existing export"
            );
        }

        match self.plan_for(loaded).action {
            ExportAction::Crop { region, .. } => {
                self.adapter.crop_and_encode(&loaded.path, region, &output)?
            }
            ExportAction::Pad { placement } => {
                self.adapter
                    .pad_and_encode(&loaded.path, &placement, self.background, &output)?
            }
        }
        Ok(output)
    }

    fn plan_for(&self, loaded: &LoadedImage) -> ExportPlan {
        let action = match self.export_mode {
            ExportMode::Crop => {
                let source_rect = loaded.fit.to_source_rect(&loaded.crop_box);
                ExportAction::Crop {
                    crop_box: loaded.crop_box,
                    region: PixelRect::from_source_rect(&source_rect, loaded.source),
                }
            }
            ExportMode::Pad => ExportAction::Pad {
                placement: loaded.placement,
            },
        };
        ExportPlan {
            input: loaded.path.clone(),
            output: self
                .output_dir
                .as_deref()
                .map(|dir| output_path(&loaded.path, dir, self.export_mode, self.ratio_mode)),
            source: loaded.source,
            fit: loaded.fit,
            action,
        }
    }

    fn load_index(&mut self, index: usize) -> Result<()> {
        self.index = Some(index);
        self.current = None;

        let path = self.files[index].clone();
        let source = self.adapter.decode_metadata(&path)?;
        let loaded = self.derive(path, source)?;
        tracing::debug!(
            path = %loaded.path.display(),
            source = %loaded.source,
            counter = %format!("({}/{})", index + 1, self.files.len()),
            "loaded image"
        );
        self.current = Some(loaded);
        Ok(())
    }

    fn derive(&self, path: PathBuf, source: Dimensions) -> Result<LoadedImage> {
        let fit = compute_fit(source, self.viewport)?;
        Ok(LoadedImage {
            crop_box: initial_crop_box_for_mode(&fit, source, self.ratio_mode),
            placement: plan_padding(source, self.ratio_mode, self.border)?,
            path,
            source,
            fit,
        })
    }

    fn refresh_geometry(&mut self) -> Result<()> {
        if let Some(loaded) = self.current.take() {
            self.current = Some(self.derive(loaded.path, loaded.source)?);
        }
        Ok(())
    }
}
