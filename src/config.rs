use std::{fmt::Debug, path::PathBuf, time::Duration};

use crate::index;
use crate::record::{DownloadTarget, ImageRecord};
use crate::url::UrlFormat;

/// How downloaded images are laid out on disk.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Grouping {
    /// Everything under `all/full_resolution`.
    Flat,
    /// One directory per country under `countries/full_resolution`.
    ByCountry,
}

/// Listing scrape configuration.
#[derive(Debug)]
pub struct ScrapeConfig {
    /// Highest page id to probe (exclusive). The listing is sparse, so
    /// this is an upper bound to sweep, not an exact image count.
    pub max_index: u32,

    /// Maximum number of parallel page fetches.
    pub fetch_rate: u8,

    /// How many times to retry a failed HTTP request.
    pub request_retries_amount: u8,

    /// Timeout for fetching a single page.
    ///
    /// Pass the zero duration to disable the timeout.
    pub timeout: Duration,

    /// The URL to fetch listing pages from, including the replacement
    /// specifier `{id}`.
    pub page_url: UrlFormat,

    /// The URL the full-resolution images live at, including the
    /// replacement specifier `{id}`.
    pub image_url: UrlFormat,

    /// The folder the JSON index is written to.
    pub output_folder: PathBuf,
}

/// Image download configuration.
#[derive(Debug)]
pub struct DownloadConfig {
    /// The scraped records to download images for.
    pub index: Vec<ImageRecord>,

    /// Output tree layout.
    pub grouping: Grouping,

    /// Whether to re-fetch images that are already downloaded.
    pub fetch_existing: bool,

    /// Maximum number of parallel downloads.
    pub fetch_rate: u8,

    /// The root folder to output the images to.
    pub output_folder: PathBuf,

    /// How many times to retry a failed HTTP request.
    pub request_retries_amount: u8,

    /// Timeout for fetching a single image.
    ///
    /// Pass the zero duration to disable the timeout.
    pub timeout: Duration,
}

impl DownloadConfig {
    /// Root of the output tree for the configured grouping.
    pub fn tree_root(&self) -> PathBuf {
        match self.grouping {
            Grouping::Flat => self.flat_tree_root(),
            Grouping::ByCountry => {
                self.output_folder.join("countries").join("full_resolution")
            }
        }
    }

    /// Root of the ungrouped tree, which grouped downloads reuse as a local
    /// image source before going to the network.
    pub fn flat_tree_root(&self) -> PathBuf {
        self.output_folder.join("all").join("full_resolution")
    }

    /// Creates an iterator over the deduplicated download targets.
    pub fn targets(&self) -> impl Iterator<Item = DownloadTarget> + Debug {
        let targets: Vec<DownloadTarget> = match self.grouping {
            Grouping::Flat => index::image_urls(&self.index)
                .into_iter()
                .map(|url| DownloadTarget { url, subdir: None })
                .collect(),
            Grouping::ByCountry => index::images_by_country(&self.index)
                .into_iter()
                .map(|(url, country)| DownloadTarget {
                    url,
                    subdir: Some(country),
                })
                .collect(),
        };

        targets.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(image: &str, country: &str) -> ImageRecord {
        ImageRecord {
            country: country.to_owned(),
            image: image.to_owned(),
            map: String::new(),
            region: String::new(),
        }
    }

    fn config(grouping: Grouping) -> DownloadConfig {
        DownloadConfig {
            index: vec![
                record("https://img.example/2.jpg", "Chad"),
                record("https://img.example/1.jpg", "Brazil"),
                record("https://img.example/1.jpg", "Brazil"),
            ],
            grouping,
            fetch_existing: false,
            fetch_rate: 5,
            output_folder: PathBuf::from("images"),
            request_retries_amount: 3,
            timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn flat_targets_are_deduplicated_and_sorted() {
        let targets: Vec<_> = config(Grouping::Flat).targets().collect();

        assert_eq!(
            targets,
            vec![
                DownloadTarget {
                    url: "https://img.example/1.jpg".to_owned(),
                    subdir: None,
                },
                DownloadTarget {
                    url: "https://img.example/2.jpg".to_owned(),
                    subdir: None,
                },
            ]
        );
    }

    #[test]
    fn grouped_targets_carry_their_country() {
        let subdirs: Vec<_> = config(Grouping::ByCountry)
            .targets()
            .map(|t| t.subdir)
            .collect();

        assert_eq!(
            subdirs,
            vec![Some("Brazil".to_owned()), Some("Chad".to_owned())]
        );
    }

    #[test]
    fn tree_roots_follow_the_grouping() {
        assert_eq!(
            config(Grouping::Flat).tree_root(),
            PathBuf::from("images/all/full_resolution")
        );
        assert_eq!(
            config(Grouping::ByCountry).tree_root(),
            PathBuf::from("images/countries/full_resolution")
        );
    }
}
