use anyhow::{Context, Result};
use maplit::hashmap;
use std::fmt;
use strfmt::strfmt;

/// Listing page URL template of the Earth View collection.
pub const PAGE_URL: &str = "https://earthview.withgoogle.com/{id}";

/// Full-resolution image URL template of the Earth View collection.
pub const IMAGE_URL: &str = "https://www.gstatic.com/prettyearth/assets/full/{id}.jpg";

/// A URL template with the replacement specifier `{id}`.
pub struct UrlFormat {
    format_str: String,
}

impl UrlFormat {
    pub fn from_str(format_str: String) -> Self {
        Self { format_str }
    }

    pub fn url_for(&self, id: u32) -> Result<String> {
        let vars = hashmap! {
            "id".to_owned() => id.to_string(),
        };

        strfmt(&self.format_str, &vars).context("failed formatting URL")
    }
}

impl PartialEq for UrlFormat {
    fn eq(&self, other: &Self) -> bool {
        self.format_str == other.format_str
    }
}

impl fmt::Debug for UrlFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlFormat")
            .field("format_str", &self.format_str)
            .finish()
    }
}
