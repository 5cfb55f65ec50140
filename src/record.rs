use anyhow::{Context, Result};
use futures::prelude::*;
use reqwest::StatusCode;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};
use tokio::fs;

use crate::fetch::BACKOFF_DELAY;
use crate::url::UrlFormat;

/// A single Earth View image together with the metadata scraped from its
/// listing page.
///
/// Fields are kept in alphabetical order so the serialized index matches
/// the upstream `earthview.json` layout.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ImageRecord {
    pub country: String,
    pub image: String,
    pub map: String,
    pub region: String,
}

impl ImageRecord {
    /// The image's file name, taken from the final segment of its URL
    /// (`.../full/1003.jpg` -> `1003.jpg`).
    pub fn file_name(&self) -> &str {
        url_file_name(&self.image)
    }

    /// The directory the image lands in when grouping by country.
    ///
    /// Some images carry no country at all; those are grouped under `None`.
    pub fn country_dir(&self) -> &str {
        if self.country.is_empty() {
            "None"
        } else {
            &self.country
        }
    }

    /// Scrapes the listing page with the given id.
    ///
    /// The listing is sparse, so missing pages are expected: any
    /// non-success status (or a page without the metadata nodes) yields
    /// `Ok(None)` and the id is skipped.
    pub async fn scrape(
        client: &reqwest::Client,
        page_url: &UrlFormat,
        image_url: &UrlFormat,
        id: u32,
    ) -> Result<Option<Self>> {
        let page = page_url.url_for(id)?;

        let response = client
            .get(&page)
            .send()
            .await
            .with_context(|| format!("failed fetching page {}", page))?;

        if !response.status().is_success() {
            return Ok(None);
        }

        let html = response
            .text()
            .await
            .with_context(|| format!("failed reading page {}", page))?;

        Ok(Self::from_page_html(&html, image_url.url_for(id)?))
    }

    fn from_page_html(html: &str, image: String) -> Option<Self> {
        let document = Html::parse_document(html);

        let region = select_text(&document, "div.location__region")?;
        let country = select_text(&document, "div.location__country")?;
        let map = document
            .select(&Selector::parse("a[href]").ok()?)
            .filter_map(|element| element.value().attr("href"))
            .next()?
            .to_owned();

        Some(Self {
            country,
            image,
            map,
            region,
        })
    }
}

/// A single image to download, with the subdirectory it lands in relative
/// to the download tree root.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DownloadTarget {
    pub url: String,
    pub subdir: Option<String>,
}

impl DownloadTarget {
    pub fn file_name(&self) -> &str {
        url_file_name(&self.url)
    }

    /// Fetches the target into `dest_dir` using the given HTTP client.
    ///
    /// Creates `dest_dir` if needed. When the output file already exists it
    /// is skipped (unless `fetch_existing`), and when `copy_from` already
    /// holds the file it is copied instead of re-downloaded.
    pub async fn fetch_into(
        &self,
        client: &reqwest::Client,
        dest_dir: &Path,
        copy_from: Option<&Path>,
        fetch_existing: bool,
    ) -> Result<()> {
        let file_name = self.file_name();

        fs::create_dir_all(dest_dir).await.with_context(|| {
            format!("failed creating output directory for image {}", file_name)
        })?;
        let output_file = dest_dir.join(file_name);

        // if the image's already been downloaded, skip it
        if !fetch_existing && output_file.exists() {
            return Ok(());
        }

        // already present in the flat tree, so copy instead of re-fetching
        if let Some(source_dir) = copy_from {
            let source = source_dir.join(file_name);
            if source.is_file() {
                fs::copy(&source, &output_file).await.with_context(|| {
                    format!(
                        "failed copying image {} from {}",
                        file_name,
                        source_dir.display()
                    )
                })?;
                return Ok(());
            }
        }

        let mut response_reader = loop {
            let raw_response = client
                .get(&self.url)
                .send()
                .await
                .with_context(|| format!("failed fetching image {}", file_name))?;

            if raw_response.status() == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = raw_response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|val| val.parse::<u64>().ok())
                    .map(Duration::from_secs)
                    .unwrap_or(BACKOFF_DELAY);

                tokio::time::delay_for(retry_after).await;
                continue;
            }

            let response_stream = raw_response
                .error_for_status()
                .with_context(|| {
                    format!(
                        "received invalid status code fetching image {}",
                        file_name
                    )
                })?
                .bytes_stream()
                .map_err(|e| tokio::io::Error::new(tokio::io::ErrorKind::Other, e));

            break tokio::io::stream_reader(response_stream);
        };

        let mut output_file = fs::File::create(output_file).await?;
        tokio::io::copy(&mut response_reader, &mut output_file)
            .await
            .with_context(|| format!("failed streaming image {} to disk", file_name))?;

        Ok(())
    }
}

fn select_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    let element = document.select(&selector).next()?;

    Some(element.text().collect::<String>().trim().to_owned())
}

pub(crate) fn url_file_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}
