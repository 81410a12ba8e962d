use std::fmt::Write;
use std::path::{Path, PathBuf};

use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

use crate::types::ResourceKind;

/// Extensions re-encoded to JPEG when conversion is enabled.
pub const CONVERTIBLE_EXTENSIONS: &[&str] = &["png", "webp", "bmp"];

const MAX_FOLDER_NAME_CHARS: usize = 200;

static POST_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2})/(\d{2})/(\d{2})").expect("valid date regex"));

/// Filename for a media URL: last path segment, or a hash when that is
/// empty or too short to be meaningful.
pub fn media_filename(url: &str) -> String {
    match last_segment(url) {
        Some(name) => name,
        None => short_hash(url, 16),
    }
}

/// Filename for a stylesheet or script URL. Segments without any extension
/// get the resource extension appended.
pub fn resource_filename(url: &str, kind: ResourceKind) -> String {
    let ext = kind.extension();
    match last_segment(url) {
        Some(name) if name.contains('.') => name,
        Some(name) => format!("{name}.{ext}"),
        None => format!("{}.{ext}", short_hash(url, 12)),
    }
}

fn last_segment(url: &str) -> Option<String> {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
    };
    let segment = path.rsplit('/').next().unwrap_or("");
    let segment = segment.split('?').next().unwrap_or("");
    if segment.chars().count() < 3 {
        None
    } else {
        Some(segment.to_string())
    }
}

/// Rename `name` so that it can coexist with an identically named file from
/// another URL: `<stem>_<hash>.<ext>`.
pub fn disambiguate(name: &str, url: &str) -> String {
    let hash = short_hash(url, 8);
    match split_extension(name) {
        (stem, Some(ext)) => format!("{stem}_{hash}.{ext}"),
        (stem, None) => format!("{stem}_{hash}"),
    }
}

pub fn is_convertible(filename: &str) -> bool {
    match split_extension(filename) {
        (_, Some(ext)) => CONVERTIBLE_EXTENSIONS
            .iter()
            .any(|c| c.eq_ignore_ascii_case(ext)),
        (_, None) => false,
    }
}

/// `.jpg` variant of a convertible filename; other names are returned as is.
pub fn jpeg_name(filename: &str) -> String {
    if is_convertible(filename) {
        let (stem, _) = split_extension(filename);
        format!("{stem}.jpg")
    } else {
        filename.to_string()
    }
}

/// Locate an already materialized copy of `filename` in `dir`, under either
/// its own name or its `.jpg` variant.
pub fn existing_variant(dir: &Path, filename: &str) -> Option<PathBuf> {
    let original = dir.join(filename);
    if original.is_file() {
        return Some(original);
    }
    if is_convertible(filename) {
        let converted = dir.join(jpeg_name(filename));
        if converted.is_file() {
            return Some(converted);
        }
    }
    None
}

fn split_extension(filename: &str) -> (&str, Option<&str>) {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => (&filename[..idx], Some(&filename[idx + 1..])),
        _ => (filename, None),
    }
}

/// Strip the last extension, if any: `abc.mp4` -> `abc`.
pub fn file_stem(filename: &str) -> &str {
    split_extension(filename).0
}

/// Folder for a thread: `DD.MM.YY_<id>` from a `DD/MM/YY ...` timestamp,
/// `thread_<id>` when the date cannot be read.
pub fn thread_folder_name(post_date: &str, thread_id: &str) -> String {
    match POST_DATE.captures(post_date) {
        Some(caps) => format!("{}.{}.{}_{thread_id}", &caps[1], &caps[2], &caps[3]),
        None => format!("thread_{thread_id}"),
    }
}

/// Make a folder name safe on every platform we run on.
pub fn sanitize_folder_name(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let trimmed = cleaned.trim_matches(&[' ', '.'][..]);
    if trimmed.is_empty() {
        return "thread".to_string();
    }
    let mut final_name: String = trimmed.chars().take(MAX_FOLDER_NAME_CHARS).collect();
    if is_reserved_windows_name(&final_name) {
        final_name.push('_');
    }
    final_name
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

/// First `hex_len` hex characters of the SHA-256 of `input`.
pub fn short_hash(input: &str, hex_len: usize) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut hex = String::with_capacity(hex_len + 1);
    for byte in digest.iter() {
        if hex.len() >= hex_len {
            break;
        }
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex.truncate(hex_len);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_filename_uses_last_segment_without_query() {
        assert_eq!(
            media_filename("https://arhivach.vc/storage/a/bb/abcdef.png?x=1"),
            "abcdef.png"
        );
    }

    #[test]
    fn short_segments_fall_back_to_hash() {
        let name = media_filename("https://arhivach.vc/storage/a/");
        assert_eq!(name.len(), 16);
        assert!(name.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(name, media_filename("https://arhivach.vc/storage/a/"));
    }

    #[test]
    fn resource_names_get_extension_when_missing() {
        assert_eq!(
            resource_filename("https://arhivach.vc/css/main.css?v=3", ResourceKind::Stylesheet),
            "main.css"
        );
        assert_eq!(
            resource_filename("https://arhivach.vc/js/bundle", ResourceKind::Script),
            "bundle.js"
        );
        let hashed = resource_filename("https://arhivach.vc/", ResourceKind::Script);
        assert!(hashed.ends_with(".js"));
        assert_eq!(hashed.len(), 12 + ".js".len());
    }

    #[test]
    fn jpeg_name_only_touches_convertible_extensions() {
        assert_eq!(jpeg_name("a.PNG"), "a.jpg");
        assert_eq!(jpeg_name("a.webp"), "a.jpg");
        assert_eq!(jpeg_name("a.bmp"), "a.jpg");
        assert_eq!(jpeg_name("a.gif"), "a.gif");
        assert_eq!(jpeg_name("a.mp4"), "a.mp4");
        assert_eq!(jpeg_name("png"), "png");
    }

    #[test]
    fn disambiguate_keeps_extension() {
        let renamed = disambiguate("image.png", "https://x/1/image.png");
        assert!(renamed.starts_with("image_"));
        assert!(renamed.ends_with(".png"));
        assert_ne!(renamed, disambiguate("image.png", "https://x/2/image.png"));
    }

    #[test]
    fn folder_name_from_post_time() {
        assert_eq!(
            thread_folder_name("20/01/25 Пнд 16:33:14", "1122323"),
            "20.01.25_1122323"
        );
        assert_eq!(thread_folder_name("вчера", "1122323"), "thread_1122323");
        assert_eq!(thread_folder_name("", "1122323"), "thread_1122323");
    }

    #[test]
    fn sanitize_replaces_illegal_and_trims() {
        assert_eq!(sanitize_folder_name(" a<b>c:d. "), "a_b_c_d");
        assert_eq!(sanitize_folder_name("..."), "thread");
        assert_eq!(sanitize_folder_name("nul"), "nul_");
        let long = "я".repeat(300);
        assert_eq!(sanitize_folder_name(&long).chars().count(), 200);
    }

    #[test]
    fn existing_variant_sees_converted_copy() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(existing_variant(dir.path(), "x.png").is_none());
        std::fs::write(dir.path().join("x.jpg"), b"jpg").unwrap();
        assert_eq!(
            existing_variant(dir.path(), "x.png"),
            Some(dir.path().join("x.jpg"))
        );
        assert!(existing_variant(dir.path(), "x.gif").is_none());
    }
}
