use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::GenericImageView;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::fetch::progress_bar;
use crate::tiling::TileGrid;

/// Multi-crop configuration.
#[derive(Debug)]
pub struct CropConfig {
    /// Folder holding the full-resolution sources.
    pub input_folder: PathBuf,

    /// Folder the tiles are written to.
    pub output_folder: PathBuf,

    /// Side length of every output tile.
    pub tile_size: u32,

    /// Whether to overwrite tiles that already exist.
    pub overwrite: bool,
}

/// Batch resize configuration.
#[derive(Debug)]
pub struct ResizeConfig {
    /// Folder holding the square sources.
    pub input_folder: PathBuf,

    /// Folder the resized images are written to.
    pub output_folder: PathBuf,

    /// Target width and height of the square output.
    pub size: u32,

    /// Whether to overwrite outputs that already exist.
    pub overwrite: bool,
}

/// Counts reported by a [`crop_images`] run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CropSummary {
    pub images: usize,
    pub written: usize,
    pub skipped_existing: usize,
    pub skipped_unfit: usize,
}

/// Counts reported by a [`resize_images`] run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ResizeSummary {
    pub images: usize,
    pub written: usize,
    pub skipped_existing: usize,
    pub skipped_non_square: usize,
}

/// Splits every `*.jpg` in the input folder into overlapping square tiles.
///
/// Tiles already on disk are kept, so an interrupted run can be resumed.
/// Sources too small to fit a single tile are reported and skipped.
pub fn crop_images(cfg: &CropConfig) -> Result<CropSummary> {
    crop_images_with(cfg, |path| path.exists())
}

fn crop_images_with(cfg: &CropConfig, exists: impl Fn(&Path) -> bool) -> Result<CropSummary> {
    fs::create_dir_all(&cfg.output_folder).with_context(|| {
        format!(
            "failed creating output directory {}",
            cfg.output_folder.display()
        )
    })?;

    let sources = jpg_files(&cfg.input_folder)?;
    let pb = progress_bar(sources.len() as u64);
    let mut summary = CropSummary::default();

    for source in pb.wrap_iter(sources.into_iter()) {
        summary.images += 1;

        let img = image::open(&source)
            .with_context(|| format!("failed opening image {}", source.display()))?;
        let (width, height) = img.dimensions();

        let grid = TileGrid::new(width, height, cfg.tile_size);
        if grid.is_empty() {
            eprintln!(
                "image {} ({}x{}) cannot fit a {} px tile, skipping",
                source.display(),
                width,
                height,
                cfg.tile_size,
            );
            summary.skipped_unfit += 1;
            continue;
        }

        let stem = file_stem(&source);
        for crop in grid.crops() {
            let output_file = cfg.output_folder.join(crop_file_name(&stem, crop.index));
            if !cfg.overwrite && exists(&output_file) {
                summary.skipped_existing += 1;
                continue;
            }

            img.crop_imm(crop.left, crop.top, crop.size(), crop.size())
                .save(&output_file)
                .with_context(|| format!("failed saving tile {}", output_file.display()))?;
            summary.written += 1;
        }
    }

    pb.finish_and_clear();

    Ok(summary)
}

/// Resizes every square `*.jpg` in the input folder to `size` x `size`.
///
/// Outputs already on disk are kept. Non-square sources are reported and
/// skipped; multi-crop them first.
pub fn resize_images(cfg: &ResizeConfig) -> Result<ResizeSummary> {
    resize_images_with(cfg, |path| path.exists())
}

fn resize_images_with(
    cfg: &ResizeConfig,
    exists: impl Fn(&Path) -> bool,
) -> Result<ResizeSummary> {
    fs::create_dir_all(&cfg.output_folder).with_context(|| {
        format!(
            "failed creating output directory {}",
            cfg.output_folder.display()
        )
    })?;

    let sources = jpg_files(&cfg.input_folder)?;
    let pb = progress_bar(sources.len() as u64);
    let mut summary = ResizeSummary::default();

    for source in pb.wrap_iter(sources.into_iter()) {
        summary.images += 1;

        let stem = file_stem(&source);
        let output_file = cfg
            .output_folder
            .join(resized_file_name(&stem, cfg.size));
        if !cfg.overwrite && exists(&output_file) {
            summary.skipped_existing += 1;
            continue;
        }

        let img = image::open(&source)
            .with_context(|| format!("failed opening image {}", source.display()))?;
        let (width, height) = img.dimensions();
        if width != height {
            eprintln!(
                "image {} is not square ({}x{}), skipping",
                source.display(),
                width,
                height,
            );
            summary.skipped_non_square += 1;
            continue;
        }

        img.resize_exact(cfg.size, cfg.size, FilterType::Triangle)
            .save(&output_file)
            .with_context(|| format!("failed saving image {}", output_file.display()))?;
        summary.written += 1;
    }

    pb.finish_and_clear();

    Ok(summary)
}

/// Output file name for tile `index` of the image `stem`.
fn crop_file_name(stem: &str, index: u32) -> String {
    format!("{}_{}.jpg", stem, index)
}

/// Output file name for the resized copy of the image `stem`.
fn resized_file_name(stem: &str, size: u32) -> String {
    format!("{}_resized{}.jpg", stem, size)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// The `*.jpg` files directly inside `folder`, sorted for a stable
/// processing order.
fn jpg_files(folder: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(folder)
        .with_context(|| format!("failed reading input directory {}", folder.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("failed reading input directory {}", folder.display()))?
            .path();

        let is_jpg = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("jpg"))
            .unwrap_or(false);
        if is_jpg && path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn write_test_image(path: &Path, width: u32, height: u32) {
        RgbImage::new(width, height).save(path).unwrap();
    }

    fn crop_config(dir: &Path, tile_size: u32) -> CropConfig {
        CropConfig {
            input_folder: dir.join("full_resolution"),
            output_folder: dir.join("cropped"),
            tile_size,
            overwrite: false,
        }
    }

    #[test]
    fn output_file_names() {
        assert_eq!(crop_file_name("1003", 2), "1003_2.jpg");
        assert_eq!(resized_file_name("1003_2", 512), "1003_2_resized512.jpg");
    }

    #[test]
    fn jpg_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        write_test_image(&dir.path().join("b.jpg"), 4, 4);
        write_test_image(&dir.path().join("a.jpg"), 4, 4);
        write_test_image(&dir.path().join("c.png"), 4, 4);
        fs::create_dir(dir.path().join("nested.jpg")).unwrap();

        let files = jpg_files(dir.path()).unwrap();

        assert_eq!(
            files,
            vec![dir.path().join("a.jpg"), dir.path().join("b.jpg")]
        );
    }

    #[test]
    fn cropping_tiles_an_image_and_resumes() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = crop_config(dir.path(), 32);
        fs::create_dir_all(&cfg.input_folder).unwrap();
        // 64/32 -> 2 extra columns, 48/32 -> 2 extra rows (1.5 ties to even)
        write_test_image(&cfg.input_folder.join("1003.jpg"), 64, 48);

        let summary = crop_images(&cfg).unwrap();
        assert_eq!(summary.images, 1);
        assert_eq!(summary.written, 9);
        for index in 0..9 {
            assert!(cfg.output_folder.join(crop_file_name("1003", index)).is_file());
        }

        let resumed = crop_images(&cfg).unwrap();
        assert_eq!(resumed.written, 0);
        assert_eq!(resumed.skipped_existing, 9);
    }

    #[test]
    fn cropping_skips_sources_too_small_for_a_tile() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = crop_config(dir.path(), 32);
        fs::create_dir_all(&cfg.input_folder).unwrap();
        write_test_image(&cfg.input_folder.join("tiny.jpg"), 16, 16);

        let summary = crop_images(&cfg).unwrap();

        assert_eq!(summary.written, 0);
        assert_eq!(summary.skipped_unfit, 1);
    }

    #[test]
    fn cropping_consults_the_existence_predicate() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = crop_config(dir.path(), 32);
        fs::create_dir_all(&cfg.input_folder).unwrap();
        write_test_image(&cfg.input_folder.join("1003.jpg"), 64, 48);

        let summary = crop_images_with(&cfg, |_| true).unwrap();

        assert_eq!(summary.written, 0);
        assert_eq!(summary.skipped_existing, 9);
    }

    #[test]
    fn resizing_handles_square_and_non_square_sources() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ResizeConfig {
            input_folder: dir.path().join("cropped"),
            output_folder: dir.path().join("resized"),
            size: 16,
            overwrite: false,
        };
        fs::create_dir_all(&cfg.input_folder).unwrap();
        write_test_image(&cfg.input_folder.join("square.jpg"), 64, 64);
        write_test_image(&cfg.input_folder.join("wide.jpg"), 64, 48);

        let summary = resize_images(&cfg).unwrap();

        assert_eq!(summary.images, 2);
        assert_eq!(summary.written, 1);
        assert_eq!(summary.skipped_non_square, 1);

        let resized = cfg.output_folder.join(resized_file_name("square", 16));
        let (width, height) = image::open(resized).unwrap().dimensions();
        assert_eq!((width, height), (16, 16));

        let resumed = resize_images(&cfg).unwrap();
        assert_eq!(resumed.written, 0);
        assert_eq!(resumed.skipped_existing, 1);
        assert_eq!(resumed.skipped_non_square, 1);
    }
}
