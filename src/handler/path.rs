//! URL path translation module
//!
//! Turns the request path into a filesystem path under the served root and
//! provides the escaping helpers used by directory listings.

use std::path::{Path, PathBuf};

/// Decode `%XX` escapes
///
/// A `%` not followed by two hex digits is kept as a literal character.
/// Returns `None` only when the decoded bytes are not UTF-8.
pub fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let Some(byte) = bytes.get(i + 1..i + 3).and_then(hex_pair) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8(out).ok()
}

fn hex_pair(pair: &[u8]) -> Option<u8> {
    let hi = char::from(pair[0]).to_digit(16)?;
    let lo = char::from(pair[1]).to_digit(16)?;
    u8::try_from(hi * 16 + lo).ok()
}

/// Percent-encode a path for use in an `href`, keeping `/` and unreserved characters
pub fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(char::from(byte));
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Escape text for HTML element content and quoted attributes
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Map a URL path onto `root`
///
/// The decoded path is normalized first: empty and `.` segments vanish and
/// `..` removes the previous segment, never climbing above `root`. Segments
/// that still contain a platform separator (`\\` on Windows) are skipped.
/// Symlinks are handled by the caller's canonical-prefix check.
///
/// # Examples
/// ```
/// use std::path::Path;
/// use coi_server::handler::path::translate_path;
/// let p = translate_path(Path::new("/srv"), "/a/../b/%63.txt").unwrap();
/// assert_eq!(p, Path::new("/srv/b/c.txt"));
/// ```
pub fn translate_path(root: &Path, url_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode(url_path)?;
    let mut segments: Vec<&str> = Vec::new();

    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut path = root.to_path_buf();
    for segment in segments {
        if segment.contains(std::path::MAIN_SEPARATOR) || segment.contains('\0') {
            continue;
        }
        path.push(segment);
    }

    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("/a%20b").as_deref(), Some("/a b"));
        assert_eq!(percent_decode("/caf%C3%A9").as_deref(), Some("/café"));
        assert_eq!(percent_decode("/plain").as_deref(), Some("/plain"));
        assert_eq!(percent_decode("/%FF"), None);
    }

    #[test]
    fn test_percent_decode_keeps_invalid_escapes() {
        assert_eq!(percent_decode("/100%.txt").as_deref(), Some("/100%.txt"));
        assert_eq!(percent_decode("/a%zz").as_deref(), Some("/a%zz"));
        assert_eq!(percent_decode("/bad%2").as_deref(), Some("/bad%2"));
        assert_eq!(percent_decode("/bad%+1").as_deref(), Some("/bad%+1"));
        assert_eq!(percent_decode("/%").as_deref(), Some("/%"));
        assert_eq!(percent_decode("/50%%41").as_deref(), Some("/50%A"));
    }

    #[test]
    fn test_translate_literal_percent() {
        let root = Path::new("/srv/www");
        assert_eq!(
            translate_path(root, "/reports/100%.txt").unwrap(),
            Path::new("/srv/www/reports/100%.txt")
        );
    }

    #[test]
    fn test_percent_encode() {
        assert_eq!(percent_encode("a b/c&d.txt"), "a%20b/c%26d.txt");
        assert_eq!(percent_encode("café"), "caf%C3%A9");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<a href=\"x\">'&'</a>"),
            "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_translate_root() {
        let root = Path::new("/srv/www");
        assert_eq!(translate_path(root, "/").unwrap(), root);
        assert_eq!(translate_path(root, "").unwrap(), root);
    }

    #[test]
    fn test_translate_traversal_dropped() {
        let root = Path::new("/srv/www");
        assert_eq!(
            translate_path(root, "/../../etc/passwd").unwrap(),
            Path::new("/srv/www/etc/passwd")
        );
        assert_eq!(
            translate_path(root, "/%2e%2e/%2e%2e/etc/passwd").unwrap(),
            Path::new("/srv/www/etc/passwd")
        );
    }

    #[test]
    fn test_translate_encoded_separator_normalized() {
        let root = Path::new("/srv/www");
        assert_eq!(
            translate_path(root, "/a/..%2F..%2Fsecret/b").unwrap(),
            Path::new("/srv/www/secret/b")
        );
    }

    #[test]
    fn test_translate_parent_pops_segment() {
        let root = Path::new("/srv/www");
        assert_eq!(
            translate_path(root, "/docs/api/../guide.html").unwrap(),
            Path::new("/srv/www/docs/guide.html")
        );
    }

    #[test]
    fn test_translate_keeps_trailing_dir() {
        let root = Path::new("/srv/www");
        assert_eq!(
            translate_path(root, "/assets//js/./app.js").unwrap(),
            Path::new("/srv/www/assets/js/app.js")
        );
    }
}
