//! Build a local image dataset from Google's Earth View collection.
//!
//! The toolkit scrapes the Earth View listing into a JSON index, downloads
//! the full-resolution images the index references (flat or grouped by
//! country), and post-processes them locally: splitting every source into
//! a grid of overlapping square tiles and batch-resizing the results to a
//! training-friendly size.
//!
//! **Use with absolute caution.** A full sweep of the listing issues tens
//! of thousands of requests. Keep the fetch rate modest.
//!
//! # Usage
//!
//! This tool is available on [crates.io](https://crates.io) and can be
//! installed via `cargo install earthview-downloader`. It features a
//! helpful CLI you can access via `-h` / `--help`.
//!
//! It is also available as a library.
//!
//! # CLI Example
//!
//! ```bash
//! earthview-downloader build-index --max-index 20000 --output .
//! earthview-downloader download --by-country --output ./images --rate 10
//! earthview-downloader crop --tile-size 1024
//! earthview-downloader resize --size 1024
//! ```
//!
//! # Library Example
//! ```rust,no_run
//! use earthview_downloader::{fetch, load_index, DownloadConfig, Grouping};
//! use std::{path::Path, time::Duration};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = DownloadConfig {
//!     index: load_index(Path::new(".")).expect("failed loading index"),
//!     grouping: Grouping::Flat,
//!     fetch_existing: false,
//!     fetch_rate: 10,
//!     output_folder: "./images".into(),
//!     request_retries_amount: 3,
//!     timeout: Duration::from_secs(30),
//! };
//!
//! fetch(config).await.expect("failed fetching images");
//! # }
//! ```

mod archive;
mod augment;
mod config;
mod fetch;
mod index;
mod record;
mod tiling;
mod url;

pub use archive::zip_dir;
pub use augment::{
    crop_images, resize_images, CropConfig, CropSummary, ResizeConfig, ResizeSummary,
};
pub use config::{DownloadConfig, Grouping, ScrapeConfig};
pub use fetch::fetch;
pub use index::{
    build_index, download_static_index, image_urls, images_by_country, index_path,
    load_index, load_or_fetch_index, save_index, INDEX_FILE, STATIC_INDEX_URL,
};
pub use record::{DownloadTarget, ImageRecord};
pub use tiling::{Crop, TileGrid};
pub use url::{UrlFormat, IMAGE_URL, PAGE_URL};
