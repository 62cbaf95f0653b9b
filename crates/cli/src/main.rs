use anyhow::{bail, Context, Result};
use clap::Parser;
use cropfit_core::{
    config::parse_size,
    geometry::{AspectRatioMode, BorderSpec, Dimensions},
    image_processing::{is_supported_image, output_path},
    init,
    session::{ExportAction, ExportPlan},
    Config, CropFit, ExportMode, ImageProcessor, Session, Settings,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about = "Crop photos to a fixed ratio or fit them onto a bordered canvas", long_about = None)]
struct Args {
    /// Images or directories of images to process
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory (created if missing); remembered between runs
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Target ratio: 4:3, 1:1, any W:H, or "original"
    #[arg(short, long)]
    ratio: Option<AspectRatioMode>,

    /// Export mode: crop to the ratio, or pad onto a canvas
    #[arg(short, long)]
    mode: Option<ExportMode>,

    /// Border percentage for pad mode (0 to below 50)
    #[arg(short, long)]
    border: Option<f64>,

    /// Move the crop box by DX,DY display pixels from its centered position
    #[arg(long, value_parser = parse_drag, allow_hyphen_values = true)]
    drag: Option<(f64, f64)>,

    /// Display area used for crop box geometry, e.g. 1100x640
    #[arg(long, value_parser = parse_viewport)]
    viewport: Option<Dimensions>,

    /// JPEG quality (1-100)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,

    /// Print the planned geometry without writing anything
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// With --dry-run, print plans as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> Result<()> {
    // Setup
    init();
    let args = Args::parse();

    // Load config and apply CLI overrides
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(viewport) = args.viewport {
        config.viewport = viewport;
    }
    if let Some(quality) = args.quality {
        config.jpeg_quality = quality;
    }

    let mut app = CropFit::with_config(config, Settings::load())
        .context("Failed to initialize session")?;
    let session = app.session_mut();

    if let Some(ratio) = args.ratio {
        session.set_ratio_mode(ratio)?;
    }
    if let Some(mode) = args.mode {
        session.set_export_mode(mode);
    }
    if let Some(border) = args.border {
        session.set_border(BorderSpec::new(border)?)?;
    }
    if let Some(out) = &args.out {
        if !args.dry_run {
            fs::create_dir_all(out)
                .with_context(|| format!("Failed to create {}", out.display()))?;
            session.set_output_dir(out)?;
        }
    }

    let files = expand_inputs(&args.inputs)?;
    session
        .select_files(files)
        .context("Failed to load the first image")?;

    if args.dry_run {
        let plans = collect_plans(session, args.drag, args.out.as_deref())?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&plans)?);
        } else {
            for (i, plan) in plans.iter().enumerate() {
                println!("({}/{}) {}", i + 1, plans.len(), describe(plan));
            }
        }
        return Ok(());
    }

    if session.output_dir().is_none() {
        bail!("No output directory. Pass --out or set CROPFIT_OUTPUT_DIR");
    }

    let total = session.files().len() as u64;
    tracing::info!(
        total,
        mode = %session.export_mode(),
        ratio = %session.ratio_mode(),
        "starting export"
    );
    let progress = ProgressBar::new(total);
    progress.set_style(
        ProgressStyle::with_template("{bar:40.green} {pos}/{len} {msg}")?.progress_chars("##-"),
    );

    let exported = match args.drag {
        None => session
            .export_all(|_, output| {
                progress.set_message(file_name(output));
                progress.inc(1);
            })
            .context("Export stopped")?
            .len(),
        Some((dx, dy)) => export_with_drag(session, dx, dy, &progress)?,
    };
    progress.finish_and_clear();

    println!(
        "Exported {} image(s) to {}",
        exported,
        session.output_dir().map(|d| d.display().to_string()).unwrap_or_default()
    );

    if let Err(e) = app.save_settings() {
        eprintln!("Warning: Failed to save settings: {}", e);
    }
    Ok(())
}

/// Exports each image after applying the same drag to its crop box.
fn export_with_drag(
    session: &mut Session<ImageProcessor>,
    dx: f64,
    dy: f64,
    progress: &ProgressBar,
) -> Result<usize> {
    let mut exported = 0;
    loop {
        session.drag(dx, dy)?;
        let current = session.counter();
        let outcome = session
            .export_current()
            .with_context(|| format!("Export stopped at {}", current))?;
        progress.set_message(file_name(&outcome.output));
        progress.inc(1);
        exported += 1;
        if let Some(err) = outcome.next_error {
            progress.abandon();
            bail!(
                "Exported {} image(s), then failed to load {}: {}",
                exported,
                session.counter(),
                err
            );
        }
        if !outcome.advanced {
            return Ok(exported);
        }
    }
}

fn collect_plans(
    session: &mut Session<ImageProcessor>,
    drag: Option<(f64, f64)>,
    out: Option<&Path>,
) -> Result<Vec<ExportPlan>> {
    let mut plans = Vec::new();
    loop {
        if let Some((dx, dy)) = drag {
            session.drag(dx, dy)?;
        }
        let mut plan = session.plan_current()?;
        if let Some(dir) = out {
            plan.output = Some(output_path(
                &plan.input,
                dir,
                session.export_mode(),
                session.ratio_mode(),
            ));
        }
        plans.push(plan);
        if !session.can_go_next() {
            return Ok(plans);
        }
        session.next()?;
    }
}

fn describe(plan: &ExportPlan) -> String {
    let (w, h) = plan.source.to_pixels();
    let action = match &plan.action {
        ExportAction::Crop { region, .. } => format!(
            "crop {}x{} at {},{}",
            region.width, region.height, region.x, region.y
        ),
        ExportAction::Pad { placement } => format!(
            "pad onto {}x{} canvas, image {}x{} at {},{}",
            placement.canvas_width,
            placement.canvas_height,
            placement.image_width,
            placement.image_height,
            placement.image_offset_x,
            placement.image_offset_y
        ),
    };
    let output = plan
        .output
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(no output directory)".to_string());
    format!("{} {}x{}: {} -> {}", plan.input.display(), w, h, action, output)
}

/// Expands directories into their supported images, sorted by name.
fn expand_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut entries: Vec<PathBuf> = fs::read_dir(input)
                .with_context(|| format!("Failed to read {}", input.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.is_file() && is_supported_image(path))
                .collect();
            entries.sort();
            files.extend(entries);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn parse_drag(raw: &str) -> std::result::Result<(f64, f64), String> {
    let (dx, dy) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected DX,DY, got '{}'", raw))?;
    let number = |v: &str| {
        v.trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| format!("'{}' is not a number", v))
    };
    Ok((number(dx)?, number(dy)?))
}

fn parse_viewport(raw: &str) -> std::result::Result<Dimensions, String> {
    parse_size(raw).map_err(|e| e.to_string())
}
