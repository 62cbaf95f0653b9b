//! End-to-end export tests against real encoded images.
//!
//! Source images are synthesized into a temporary directory, exported
//! through a [`Session`] backed by [`ImageProcessor`], and decoded again.

use cropfit_core::geometry::{AspectRatio, AspectRatioMode, BorderSpec, Dimensions, PixelRect};
use cropfit_core::{AppError, ExportMode, ImageProcessor, ProcessingAdapter, Session};
use image::{Rgb, RgbImage, Rgba, RgbaImage};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const RED: Rgb<u8> = Rgb([200, 20, 20]);

fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(width, height, RED).save(&path).unwrap();
    path
}

fn session() -> Session<ImageProcessor> {
    Session::new(
        ImageProcessor::default(),
        Dimensions::new(1100.0, 640.0).unwrap(),
    )
    .unwrap()
}

fn dirs() -> (TempDir, TempDir) {
    (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap())
}

fn near(pixel: &Rgb<u8>, expected: Rgb<u8>) -> bool {
    pixel
        .0
        .iter()
        .zip(expected.0.iter())
        .all(|(a, b)| a.abs_diff(*b) <= 24)
}

fn dir_listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn crop_export_writes_ratio_sized_jpeg() {
    let (input, output) = dirs();
    let src = write_png(input.path(), "landscape.png", 1200, 800);

    let mut s = session();
    s.select_files(vec![src]).unwrap();
    s.set_output_dir(output.path()).unwrap();
    let outcome = s.export_current().unwrap();

    assert_eq!(outcome.output, output.path().join("landscape_crop_4x3.jpg"));
    let exported = image::open(&outcome.output).unwrap();
    assert!((1066..=1067).contains(&exported.width()), "width {}", exported.width());
    assert!((799..=800).contains(&exported.height()), "height {}", exported.height());
}

#[test]
fn dragged_crop_reaches_the_image_edge() {
    let (input, output) = dirs();
    let src = write_png(input.path(), "edge.png", 1200, 800);

    let mut s = session();
    s.select_files(vec![src]).unwrap();
    s.set_output_dir(output.path()).unwrap();
    s.set_ratio_mode(AspectRatioMode::Fixed(AspectRatio::SQUARE)).unwrap();
    s.drag(10_000.0, 0.0).unwrap();

    let plan = s.plan_current().unwrap();
    match plan.action {
        cropfit_core::session::ExportAction::Crop { region, .. } => {
            assert!(region.x + region.width >= 1199);
            assert!((799..=800).contains(&region.height));
        }
        other => panic!("expected crop, got {:?}", other),
    }
    s.export_current().unwrap();
}

#[test]
fn original_padding_adds_white_margin() {
    let (input, output) = dirs();
    let src = write_png(input.path(), "wide.png", 100, 50);

    let mut s = session();
    s.select_files(vec![src]).unwrap();
    s.set_output_dir(output.path()).unwrap();
    s.set_export_mode(ExportMode::Pad);
    s.set_ratio_mode(AspectRatioMode::Original).unwrap();
    s.set_border(BorderSpec::new(5.0).unwrap()).unwrap();
    let outcome = s.export_current().unwrap();

    assert_eq!(outcome.output, output.path().join("wide_fitted_original.jpg"));
    let exported = image::open(&outcome.output).unwrap().to_rgb8();
    assert_eq!(exported.dimensions(), (110, 60));
    assert!(near(exported.get_pixel(1, 1), Rgb([255, 255, 255])));
    assert!(near(exported.get_pixel(55, 30), RED));
}

#[test]
fn square_padding_letterboxes_wide_image() {
    let (input, output) = dirs();
    let src = write_png(input.path(), "banner.png", 200, 100);

    let mut s = session();
    s.select_files(vec![src]).unwrap();
    s.set_output_dir(output.path()).unwrap();
    s.set_export_mode(ExportMode::Pad);
    s.set_ratio_mode(AspectRatioMode::Fixed(AspectRatio::SQUARE)).unwrap();
    let outcome = s.export_current().unwrap();

    assert_eq!(outcome.output, output.path().join("banner_fitted_1x1.jpg"));
    let exported = image::open(&outcome.output).unwrap().to_rgb8();
    assert_eq!(exported.dimensions(), (200, 200));
    assert!(near(exported.get_pixel(100, 10), Rgb([255, 255, 255])));
    assert!(near(exported.get_pixel(100, 100), RED));
    assert!(near(exported.get_pixel(100, 190), Rgb([255, 255, 255])));
}

#[test]
fn transparent_png_is_flattened_onto_white() {
    let (input, output) = dirs();
    let path = input.path().join("alpha.png");
    RgbaImage::from_pixel(40, 30, Rgba([0, 0, 0, 0])).save(&path).unwrap();

    let processor = ImageProcessor::default();
    let out = output.path().join("alpha.jpg");
    processor
        .crop_and_encode(&path, PixelRect { x: 0, y: 0, width: 40, height: 30 }, &out)
        .unwrap();
    let exported = image::open(&out).unwrap().to_rgb8();
    assert!(near(exported.get_pixel(20, 15), Rgb([255, 255, 255])));
}

#[test]
fn batch_export_leaves_only_final_files() {
    let (input, output) = dirs();
    write_png(input.path(), "a.png", 64, 48);
    write_png(input.path(), "b.png", 48, 64);

    let mut s = session();
    s.select_files(vec![input.path().join("a.png"), input.path().join("b.png")])
        .unwrap();
    s.set_output_dir(output.path()).unwrap();
    let outputs = s.export_all(|_, _| {}).unwrap();

    assert_eq!(outputs.len(), 2);
    assert_eq!(
        dir_listing(output.path()),
        vec!["a_crop_4x3.jpg".to_string(), "b_crop_4x3.jpg".to_string()]
    );
}

#[test]
fn corrupt_input_fails_without_creating_output() {
    let (input, output) = dirs();
    let bad = input.path().join("broken.jpg");
    fs::write(&bad, b"definitely not a jpeg").unwrap();

    let processor = ImageProcessor::default();
    let err = processor
        .crop_and_encode(&bad, PixelRect { x: 0, y: 0, width: 1, height: 1 }, &output.path().join("x.jpg"))
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Decode(_) | AppError::UnsupportedFormat(_) | AppError::Io(_)
    ));
    assert!(dir_listing(output.path()).is_empty());

    let mut s = session();
    assert!(s.select_files(vec![bad]).is_err());
    assert!(s.current().is_none());
}

#[test]
fn metadata_reports_pixel_size() {
    let (input, _output) = dirs();
    let src = write_png(input.path(), "size.png", 321, 123);
    let dims = ImageProcessor::default().decode_metadata(&src).unwrap();
    assert_eq!(dims.to_pixels(), (321, 123));
}

#[test]
fn same_stem_exports_share_one_target() {
    let (input, output) = dirs();
    let jpg = input.path().join("shot.jpg");
    RgbImage::from_pixel(64, 48, RED).save(&jpg).unwrap();
    let png = write_png(input.path(), "shot.png", 48, 64);

    let mut s = session();
    s.select_files(vec![jpg, png]).unwrap();
    s.set_output_dir(output.path()).unwrap();
    let outputs = s.export_all(|_, _| {}).unwrap();

    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(dir_listing(output.path()), vec!["shot_crop_4x3.jpg".to_string()]);
    // The later export wins: 48x64 at 4:3 keeps the full width.
    let exported = image::open(&outputs[1]).unwrap();
    assert!((47..=48).contains(&exported.width()), "width {}", exported.width());
}

#[cfg(unix)]
#[test]
fn exported_files_get_default_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let (input, output) = dirs();
    let src = write_png(input.path(), "perm.png", 40, 30);

    let mut s = session();
    s.select_files(vec![src]).unwrap();
    s.set_output_dir(output.path()).unwrap();
    let outcome = s.export_current().unwrap();

    let plain = output.path().join("plain.txt");
    fs::write(&plain, b"x").unwrap();
    let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode(&outcome.output), mode(&plain));
}

#[test]
fn export_reports_next_image_load_failure_separately() {
    let (input, output) = dirs();
    let good = write_png(input.path(), "a.png", 40, 30);
    let bad = input.path().join("b.png");
    fs::write(&bad, b"not a png").unwrap();

    let mut s = session();
    s.select_files(vec![good, bad]).unwrap();
    s.set_output_dir(output.path()).unwrap();
    let outcome = s.export_current().unwrap();

    assert!(outcome.output.exists());
    assert!(!outcome.advanced);
    assert!(outcome.next_error.is_some());
    assert_eq!(dir_listing(output.path()), vec!["a_crop_4x3.jpg".to_string()]);
}
