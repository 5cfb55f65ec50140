use anyhow::{Context, Result};
use clap::crate_version;
use futures::{prelude::*, stream};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::fs;

use crate::config::{DownloadConfig, Grouping};

pub(crate) const BACKOFF_DELAY: Duration = Duration::from_secs(10);
const ZERO_DURATION: Duration = Duration::from_secs(0);

/// Asynchronously fetch the images referenced by the index in `cfg` and
/// save them to the file system.
///
/// Creates the required directories recursively. Images that are already
/// on disk are skipped unless `cfg.fetch_existing` is set, and grouped
/// downloads reuse images from the flat tree instead of re-fetching them.
///
/// # Example
/// ```rust,no_run
/// use earthview_downloader::{fetch, load_index, DownloadConfig, Grouping};
/// use std::{path::Path, time::Duration};
///
/// # #[tokio::main]
/// # async fn main() {
/// let config = DownloadConfig {
///     index: load_index(Path::new(".")).expect("failed loading index"),
///     grouping: Grouping::ByCountry,
///     fetch_existing: false,
///     fetch_rate: 10,
///     output_folder: "./images".into(),
///     request_retries_amount: 3,
///     timeout: Duration::from_secs(30),
/// };
///
/// fetch(config).await.expect("failed fetching images");
/// # }
/// ```
///
/// # Panics
/// Panics if the output tree root exists and is not a folder but a file.
pub async fn fetch(cfg: DownloadConfig) -> Result<()> {
    let tree_root = cfg.tree_root();

    assert!(
        !tree_root.exists() || tree_root.is_dir(),
        "output must be a directory",
    );

    if !tree_root.exists() {
        fs::create_dir_all(&tree_root)
            .await
            .context("failed to create root output directory")?;
    }

    let pb = progress_bar(cfg.targets().count() as u64);

    let client = build_client(cfg.timeout)?;

    let num_retries = cfg.request_retries_amount;
    let fetch_existing = cfg.fetch_existing;

    // grouped downloads copy images the flat tree already holds
    let flat_root = match cfg.grouping {
        Grouping::ByCountry => Some(cfg.flat_tree_root()),
        Grouping::Flat => None,
    };

    let tree_root = &tree_root;
    let flat_root = &flat_root;

    let progress_bar = pb.wrap_iter(cfg.targets());
    let s = stream::iter(progress_bar);
    s.for_each_concurrent(cfg.fetch_rate as usize, |target| {
        let http_client = client.clone();

        async move {
            let dest_dir = match target.subdir.as_ref() {
                Some(subdir) => tree_root.join(subdir),
                None => tree_root.clone(),
            };

            let mut res = Ok(());

            for _ in 0..num_retries {
                res = target
                    .fetch_into(&http_client, &dest_dir, flat_root.as_deref(), fetch_existing)
                    .await;

                if res.is_ok() {
                    return;
                }

                tokio::time::delay_for(BACKOFF_DELAY).await;
            }

            eprintln!(
                "Failed fetching image {}: {:?}",
                target.file_name(),
                res.unwrap_err(),
            );
        }
    })
    .await;

    pb.finish_and_clear();

    Ok(())
}

pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if timeout > ZERO_DURATION {
        builder = builder.timeout(timeout);
    }

    let mut headers = reqwest::header::HeaderMap::new();
    headers.append(
        reqwest::header::USER_AGENT,
        format!("earthview-downloader_rs_{}", crate_version!())
            .parse()
            .unwrap(),
    );

    builder
        .default_headers(headers)
        .build()
        .with_context(|| "failed creating HTTP client")
}

pub(crate) fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:60.cyan/blue} {pos:>7}/{len:7} ETA: {eta} {msg}")
            .progress_chars("##-"),
    );

    pb
}
