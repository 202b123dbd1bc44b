//! Directory listing module
//!
//! Renders the HTML index served for directories that have no index file.

use std::io;
use std::path::Path;
use tokio::fs;

use super::path::{escape_html, percent_encode};

/// One row of a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// Text shown to the user: `name/` for directories, `name@` for symlinks
    pub display: String,
    /// Relative link target, `name/` for directories
    pub link: String,
}

/// Read `dir` and return its entries sorted case-insensitively by name
pub async fn read_entries(dir: &Path) -> io::Result<Vec<ListingEntry>> {
    let mut reader = fs::read_dir(dir).await?;
    let mut entries: Vec<(String, ListingEntry)> = Vec::new();

    while let Some(entry) = reader.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let file_type = entry.file_type().await?;
        // Follows links, so a link to a directory still gets a trailing slash
        let is_dir = fs::metadata(entry.path())
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);

        let (mut display, link) = if is_dir {
            (format!("{name}/"), format!("{name}/"))
        } else {
            (name.clone(), name.clone())
        };
        if file_type.is_symlink() {
            display = format!("{name}@");
        }

        entries.push((name, ListingEntry { display, link }));
    }

    // Bare name, so `a/` sorts before `a.txt`
    entries.sort_by_cached_key(|(name, _)| name.to_lowercase());
    Ok(entries.into_iter().map(|(_, entry)| entry).collect())
}

/// Render the listing page for the (decoded) URL path `url_path`
pub fn render_listing(url_path: &str, entries: &[ListingEntry]) -> String {
    let title = format!("Directory listing for {}", escape_html(url_path));
    let mut html = String::with_capacity(512 + entries.len() * 64);

    html.push_str("<!DOCTYPE HTML>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{title}</title>\n</head>\n<body>\n"));
    html.push_str(&format!("<h1>{title}</h1>\n<hr>\n<ul>\n"));
    for entry in entries {
        html.push_str(&format!(
            "<li><a href=\"{}\">{}</a></li>\n",
            escape_html(&percent_encode(&entry.link)),
            escape_html(&entry.display),
        ));
    }
    html.push_str("</ul>\n<hr>\n</body>\n</html>\n");
    html
}
