mod validators;

use anyhow::Result;
use clap::{
    app_from_crate, crate_authors, crate_description, crate_name, crate_version,
    App, AppSettings, Arg, ArgMatches, SubCommand,
};
use std::{path::PathBuf, time::Duration};

use earthview_downloader::*;
use validators::*;

const BY_COUNTRY_ARG: &str = "BY_COUNTRY";
const DRY_RUN_ARG: &str = "DRY_RUN";
const FETCH_EXISTING_ARG: &str = "FETCH_EXISTING";
const INDEX_DIR_ARG: &str = "INDEX_DIR";
const INPUT_ARG: &str = "INPUT";
const MAX_INDEX_ARG: &str = "MAX_INDEX";
const OUTPUT_ARG: &str = "OUTPUT";
const OVERWRITE_ARG: &str = "OVERWRITE";
const RATE_ARG: &str = "RATE";
const RETRIES_ARG: &str = "RETRIES";
const SIZE_ARG: &str = "SIZE";
const STATIC_JSON_ARG: &str = "STATIC_JSON";
const TILE_SIZE_ARG: &str = "TILE_SIZE";
const TIMEOUT_ARG: &str = "TIMEOUT";
const ZIP_ARG: &str = "ZIP";

#[tokio::main]
async fn main() -> Result<()> {
    let matches = app_from_crate!()
        .setting(AppSettings::GlobalVersion)
        .setting(AppSettings::VersionlessSubcommands)
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(build_index_command())
        .subcommand(download_command())
        .subcommand(crop_command())
        .subcommand(resize_command())
        .get_matches();

    match matches.subcommand() {
        ("build-index", Some(sub)) => run_build_index(sub).await,
        ("download", Some(sub)) => run_download(sub).await,
        ("crop", Some(sub)) => run_crop(sub),
        ("resize", Some(sub)) => run_resize(sub),
        _ => unreachable!("a subcommand is required"),
    }
}

fn rate_arg() -> Arg<'static, 'static> {
    Arg::with_name(RATE_ARG)
        .help("The amount of requests run in parallel.")
        .validator(is_positive_u8)
        .default_value("10")
        .takes_value(true)
        .short("r")
        .long("rate")
}

fn retries_arg() -> Arg<'static, 'static> {
    Arg::with_name(RETRIES_ARG)
        .help("The amount of times to retry a failed HTTP request.")
        .validator(is_positive_u8)
        .default_value("3")
        .takes_value(true)
        .long("retries")
}

fn timeout_arg() -> Arg<'static, 'static> {
    Arg::with_name(TIMEOUT_ARG)
        .help("The timeout (in seconds) for a single request. Pass 0 for no timeout.")
        .validator(is_numeric::<u64>)
        .default_value("10")
        .takes_value(true)
        .short("t")
        .long("timeout")
}

fn build_index_command() -> App<'static, 'static> {
    SubCommand::with_name("build-index")
        .about("Sweep the Earth View listing and write the earthview.json index")
        .arg(
            Arg::with_name(MAX_INDEX_ARG)
                .help("Highest page id to probe (increase as the collection grows).")
                .validator(is_positive_u32)
                .default_value("20000")
                .takes_value(true)
                .short("i")
                .long("max-index"),
        )
        .arg(rate_arg())
        .arg(retries_arg())
        .arg(timeout_arg())
        .arg(
            Arg::with_name(OUTPUT_ARG)
                .help("The folder to write the earthview.json index to.")
                .default_value(".")
                .takes_value(true)
                .short("o")
                .long("output"),
        )
}

fn download_command() -> App<'static, 'static> {
    SubCommand::with_name("download")
        .about("Download the full-resolution images referenced by the index")
        .arg(
            Arg::with_name(BY_COUNTRY_ARG)
                .help("Group the downloaded images into one directory per country.")
                .takes_value(false)
                .long("by-country"),
        )
        .arg(
            Arg::with_name(INDEX_DIR_ARG)
                .help("The folder holding the earthview.json index.")
                .default_value(".")
                .takes_value(true)
                .long("index-dir"),
        )
        .arg(
            Arg::with_name(STATIC_JSON_ARG)
                .help("Re-fetch the static index snapshot instead of using the local index.")
                .takes_value(false)
                .long("static-json"),
        )
        .arg(
            Arg::with_name(OUTPUT_ARG)
                .help("The root folder to output the images to.")
                .default_value("images")
                .takes_value(true)
                .short("o")
                .long("output"),
        )
        .arg(rate_arg())
        .arg(retries_arg())
        .arg(timeout_arg())
        .arg(
            Arg::with_name(FETCH_EXISTING_ARG)
                .help("Fetch images that we've already downloaded (this usually isn't required).")
                .takes_value(false)
                .long("fetch-existing"),
        )
        .arg(
            Arg::with_name(ZIP_ARG)
                .help("Make a ZIP file with the downloaded tree, saved under zip_files.")
                .takes_value(false)
                .short("z")
                .long("zip"),
        )
        .arg(
            Arg::with_name(DRY_RUN_ARG)
                .help("Don't actually fetch anything, just determine how many images would be fetched.")
                .takes_value(false)
                .long("dry-run"),
        )
}

fn crop_command() -> App<'static, 'static> {
    SubCommand::with_name("crop")
        .about("Split the full-resolution images into overlapping square tiles")
        .arg(
            Arg::with_name(INPUT_ARG)
                .help("The folder holding the full-resolution images.")
                .default_value("images/all/full_resolution")
                .takes_value(true)
                .short("i")
                .long("input"),
        )
        .arg(
            Arg::with_name(OUTPUT_ARG)
                .help("The folder to output the tiles to.")
                .default_value("images/all/cropped")
                .takes_value(true)
                .short("o")
                .long("output"),
        )
        .arg(
            Arg::with_name(TILE_SIZE_ARG)
                .help("Side length (in pixels) of every output tile.")
                .validator(is_positive_u32)
                .default_value("1024")
                .takes_value(true)
                .short("s")
                .long("tile-size"),
        )
        .arg(overwrite_arg())
}

fn resize_command() -> App<'static, 'static> {
    SubCommand::with_name("resize")
        .about("Resize the cropped square tiles to a target size")
        .arg(
            Arg::with_name(INPUT_ARG)
                .help("The folder holding the square source images.")
                .default_value("images/all/cropped")
                .takes_value(true)
                .short("i")
                .long("input"),
        )
        .arg(
            Arg::with_name(OUTPUT_ARG)
                .help("The folder to output the resized images to.")
                .default_value("images/all/resized")
                .takes_value(true)
                .short("o")
                .long("output"),
        )
        .arg(
            Arg::with_name(SIZE_ARG)
                .help("Target width and height (in pixels) of the square output.")
                .validator(is_positive_u32)
                .default_value("1024")
                .takes_value(true)
                .short("s")
                .long("size"),
        )
        .arg(overwrite_arg())
}

fn overwrite_arg() -> Arg<'static, 'static> {
    Arg::with_name(OVERWRITE_ARG)
        .help("Overwrite outputs that already exist instead of skipping them.")
        .takes_value(false)
        .long("overwrite")
}

async fn run_build_index(matches: &ArgMatches<'_>) -> Result<()> {
    let cfg = ScrapeConfig {
        max_index: matches.value_of(MAX_INDEX_ARG).unwrap().parse().unwrap(),
        fetch_rate: matches.value_of(RATE_ARG).unwrap().parse().unwrap(),
        request_retries_amount: matches.value_of(RETRIES_ARG).unwrap().parse().unwrap(),
        timeout: Duration::from_secs(
            matches.value_of(TIMEOUT_ARG).unwrap().parse().unwrap(),
        ),
        page_url: UrlFormat::from_str(PAGE_URL.to_owned()),
        image_url: UrlFormat::from_str(IMAGE_URL.to_owned()),
        output_folder: PathBuf::from(matches.value_of(OUTPUT_ARG).unwrap()),
    };

    let records = build_index(&cfg).await?;
    let path = save_index(&cfg.output_folder, &records)?;
    eprintln!("saved index of {} images at {}", records.len(), path.display());

    Ok(())
}

async fn run_download(matches: &ArgMatches<'_>) -> Result<()> {
    let index_dir = PathBuf::from(matches.value_of(INDEX_DIR_ARG).unwrap());

    let records = if matches.is_present(STATIC_JSON_ARG) {
        eprintln!("using the static index...");
        download_static_index(&index_dir).await?
    } else {
        load_or_fetch_index(&index_dir).await?
    };

    let grouping = if matches.is_present(BY_COUNTRY_ARG) {
        Grouping::ByCountry
    } else {
        Grouping::Flat
    };
    let output_folder = PathBuf::from(matches.value_of(OUTPUT_ARG).unwrap());

    let config = DownloadConfig {
        index: records,
        grouping,
        fetch_existing: matches.is_present(FETCH_EXISTING_ARG),
        fetch_rate: matches.value_of(RATE_ARG).unwrap().parse().unwrap(),
        output_folder: output_folder.clone(),
        request_retries_amount: matches.value_of(RETRIES_ARG).unwrap().parse().unwrap(),
        timeout: Duration::from_secs(
            matches.value_of(TIMEOUT_ARG).unwrap().parse().unwrap(),
        ),
    };

    if matches.is_present(DRY_RUN_ARG) {
        let image_count = config.targets().count();
        eprintln!(
            "would download {} images (approx {}, assuming 300 kb per image)",
            image_count,
            pretty_bytes::converter::convert((image_count as f64) * 300_000f64)
        );

        return Ok(());
    }

    fetch(config).await?;

    if matches.is_present(ZIP_ARG) {
        eprintln!("making ZIP file...");
        let (tree, zip_name) = match grouping {
            Grouping::Flat => ("all", "all_imgs_full_resolution"),
            Grouping::ByCountry => ("countries", "imgs_by_country_full_resolution"),
        };

        let zip_path = zip_dir(
            &output_folder.join(tree),
            "full_resolution",
            zip_name,
            &output_folder.join("zip_files"),
        )?;
        eprintln!("ZIP file saved at {}", zip_path.display());
    }

    Ok(())
}

fn run_crop(matches: &ArgMatches<'_>) -> Result<()> {
    let cfg = CropConfig {
        input_folder: PathBuf::from(matches.value_of(INPUT_ARG).unwrap()),
        output_folder: PathBuf::from(matches.value_of(OUTPUT_ARG).unwrap()),
        tile_size: matches.value_of(TILE_SIZE_ARG).unwrap().parse().unwrap(),
        overwrite: matches.is_present(OVERWRITE_ARG),
    };

    let summary = crop_images(&cfg)?;
    eprintln!(
        "cropped {} images: {} tiles written, {} already present, {} sources too small",
        summary.images, summary.written, summary.skipped_existing, summary.skipped_unfit,
    );

    Ok(())
}

fn run_resize(matches: &ArgMatches<'_>) -> Result<()> {
    let cfg = ResizeConfig {
        input_folder: PathBuf::from(matches.value_of(INPUT_ARG).unwrap()),
        output_folder: PathBuf::from(matches.value_of(OUTPUT_ARG).unwrap()),
        size: matches.value_of(SIZE_ARG).unwrap().parse().unwrap(),
        overwrite: matches.is_present(OVERWRITE_ARG),
    };

    let summary = resize_images(&cfg)?;
    eprintln!(
        "resized {} images: {} written, {} already present, {} not square",
        summary.images, summary.written, summary.skipped_existing, summary.skipped_non_square,
    );

    Ok(())
}
