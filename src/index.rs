use anyhow::{Context, Result};
use futures::{future, prelude::*, stream};
use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use crate::config::ScrapeConfig;
use crate::fetch::{build_client, progress_bar, BACKOFF_DELAY};
use crate::record::ImageRecord;

/// File name of the JSON index inside its directory.
pub const INDEX_FILE: &str = "earthview.json";

/// Fallback copy of the index hosted in the upstream repository. More
/// images may exist than this snapshot knows about; a fresh scrape is the
/// authoritative source.
pub const STATIC_INDEX_URL: &str =
    "https://raw.githubusercontent.com/PDillis/earthview/master/earthview.json";

/// Path of the index file inside `dir`.
pub fn index_path(dir: &Path) -> PathBuf {
    dir.join(INDEX_FILE)
}

/// Loads the JSON index from `dir`.
pub fn load_index(dir: &Path) -> Result<Vec<ImageRecord>> {
    let path = index_path(dir);

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed reading index {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed parsing index {}", path.display()))
}

/// Writes the JSON index into `dir`, creating it if needed, and returns the
/// path of the written file.
pub fn save_index(dir: &Path, records: &[ImageRecord]) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed creating index directory {}", dir.display()))?;
    let path = index_path(dir);

    let raw = serde_json::to_string_pretty(records).context("failed serializing index")?;
    fs::write(&path, raw)
        .with_context(|| format!("failed writing index {}", path.display()))?;

    Ok(path)
}

/// Downloads the static index snapshot and persists it into `dir`.
pub async fn download_static_index(dir: &Path) -> Result<Vec<ImageRecord>> {
    let client = reqwest::Client::builder()
        .build()
        .context("failed creating HTTP client")?;

    let raw = client
        .get(STATIC_INDEX_URL)
        .send()
        .await
        .context("failed fetching the static index")?
        .error_for_status()
        .context("received invalid status code fetching the static index")?
        .text()
        .await
        .context("failed reading the static index")?;

    let records: Vec<ImageRecord> =
        serde_json::from_str(&raw).context("failed parsing the static index")?;
    save_index(dir, &records)?;

    Ok(records)
}

/// Loads the local index from `dir`, falling back to the static snapshot
/// when no local file exists.
pub async fn load_or_fetch_index(dir: &Path) -> Result<Vec<ImageRecord>> {
    if index_path(dir).is_file() {
        return load_index(dir);
    }

    eprintln!(
        "local index {} does not exist, fetching the static copy...",
        index_path(dir).display()
    );
    download_static_index(dir).await
}

/// The deduplicated image URLs of an index, in deterministic order.
pub fn image_urls(records: &[ImageRecord]) -> Vec<String> {
    records
        .iter()
        .map(|record| record.image.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// The deduplicated `(image URL, country directory)` pairs of an index, in
/// deterministic order.
pub fn images_by_country(records: &[ImageRecord]) -> Vec<(String, String)> {
    records
        .iter()
        .map(|record| (record.image.clone(), record.country_dir().to_owned()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Asynchronously sweeps the listing pages up to `cfg.max_index` and
/// returns the records of every page that exists, in ascending id order.
///
/// Individual pages that keep failing after the configured retries are
/// reported and skipped; the sweep itself only fails on setup errors.
pub async fn build_index(cfg: &ScrapeConfig) -> Result<Vec<ImageRecord>> {
    let client = build_client(cfg.timeout)?;

    let pb = progress_bar(u64::from(cfg.max_index));

    let page_url = &cfg.page_url;
    let image_url = &cfg.image_url;
    let num_retries = cfg.request_retries_amount;

    let mut records: Vec<(u32, ImageRecord)> = stream::iter(0..cfg.max_index)
        .map(|id| {
            let http_client = client.clone();
            let pb = pb.clone();

            async move {
                let mut res = Ok(None);

                for _ in 0..num_retries {
                    res = ImageRecord::scrape(&http_client, page_url, image_url, id).await;

                    if res.is_ok() {
                        break;
                    }

                    tokio::time::delay_for(BACKOFF_DELAY).await;
                }

                pb.inc(1);

                match res {
                    Ok(found) => found.map(|record| (id, record)),
                    Err(err) => {
                        eprintln!("Failed scraping page {}: {:?}", id, err);
                        None
                    }
                }
            }
        })
        .buffer_unordered(cfg.fetch_rate as usize)
        .filter_map(future::ready)
        .collect()
        .await;

    pb.finish_and_clear();

    records.sort_unstable_by_key(|(id, _)| *id);
    eprintln!("found {} images", records.len());

    Ok(records.into_iter().map(|(_, record)| record).collect())
}
