//! Content-Type lookup for file parts.
//!
//! A small built-in table answers first. On Unix the system `mime.types`
//! files fill in everything else, without overriding built-in entries.
//! Text types carry `charset=utf-8`.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// Fallback type for files with unknown extensions.
pub const OCTET_STREAM: &str = "application/octet-stream";

static BUILTIN_TYPES: &[(&str, &str)] = &[
    (".avif", "image/avif"),
    (".css", "text/css; charset=utf-8"),
    (".csv", "text/csv; charset=utf-8"),
    (".gif", "image/gif"),
    (".htm", "text/html; charset=utf-8"),
    (".html", "text/html; charset=utf-8"),
    (".jpeg", "image/jpeg"),
    (".jpg", "image/jpeg"),
    (".js", "text/javascript; charset=utf-8"),
    (".json", "application/json"),
    (".mjs", "text/javascript; charset=utf-8"),
    (".pdf", "application/pdf"),
    (".png", "image/png"),
    (".svg", "image/svg+xml"),
    (".txt", "text/plain; charset=utf-8"),
    (".wasm", "application/wasm"),
    (".webp", "image/webp"),
    (".xml", "text/xml; charset=utf-8"),
    (".zip", "application/zip"),
];

#[cfg(unix)]
const SYSTEM_TYPE_FILES: &[&str] = &[
    "/etc/mime.types",
    "/etc/apache2/mime.types",
    "/etc/apache/mime.types",
    "/etc/httpd/conf/mime.types",
];

#[derive(Default)]
struct Table {
    /// Exact-case extension, e.g. ".Z"
    exact: HashMap<String, String>,
    /// Lower-cased extension
    lower: HashMap<String, String>,
}

impl Table {
    fn insert(&mut self, ext: &str, mime_type: String, keep_existing: bool) {
        let lower = ext.to_lowercase();
        if keep_existing && self.lower.contains_key(&lower) {
            return;
        }
        self.exact.insert(ext.to_string(), mime_type.clone());
        self.lower.insert(lower, mime_type);
    }
}

static TYPES: Lazy<RwLock<Table>> = Lazy::new(|| {
    let mut table = Table::default();
    for (ext, mime_type) in BUILTIN_TYPES {
        table.insert(ext, mime_type.to_string(), false);
    }

    #[cfg(unix)]
    for path in SYSTEM_TYPE_FILES {
        if let Ok(contents) = std::fs::read_to_string(path) {
            let loaded = load_mime_types(&mut table, &contents);
            debug!(path, loaded, "loaded system mime types");
        }
    }

    RwLock::new(table)
});

/// Parses `type ext1 ext2 ...` lines, returning how many entries were added.
#[cfg_attr(not(unix), allow(dead_code))]
fn load_mime_types(table: &mut Table, contents: &str) -> usize {
    let mut loaded = 0;
    for line in contents.lines() {
        let mut fields = line.split_whitespace();
        let mime_type = match fields.next() {
            Some(t) if !t.starts_with('#') => t,
            _ => continue,
        };

        for ext in fields.take_while(|ext| !ext.starts_with('#')) {
            let ext = if ext.starts_with('.') {
                ext.to_string()
            } else {
                format!(".{}", ext)
            };
            table.insert(&ext, with_charset(mime_type), true);
            loaded += 1;
        }
    }
    loaded
}

fn with_charset(mime_type: &str) -> String {
    if mime_type.starts_with("text/") && !mime_type.contains("charset=") {
        format!("{}; charset=utf-8", mime_type)
    } else {
        mime_type.to_string()
    }
}

/// Returns the MIME type associated with the file extension `ext`.
///
/// The extension should begin with a leading dot, as in ".html". Lookups are
/// case-sensitive first, then case-insensitive.
///
/// # Examples
///
/// ```
/// use tokio_mpstream::mime_type::type_by_extension;
///
/// assert_eq!(type_by_extension(".png"), Some("image/png".to_string()));
/// assert_eq!(type_by_extension(".JSON"), Some("application/json".to_string()));
/// assert_eq!(type_by_extension(".no-such-ext"), None);
/// ```
pub fn type_by_extension(ext: &str) -> Option<String> {
    let table = TYPES.read().unwrap_or_else(PoisonError::into_inner);
    table
        .exact
        .get(ext)
        .or_else(|| table.lower.get(&ext.to_lowercase()))
        .cloned()
}

/// Content-Type for a file path, falling back to `application/octet-stream`.
pub fn type_by_path(path: &std::path::Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| type_by_extension(&format!(".{}", ext)))
        .unwrap_or_else(|| OCTET_STREAM.to_string())
}

/// Sets the MIME type associated with the extension `ext`.
///
/// The extension must begin with a leading dot, as in ".html".
pub fn add_extension_type(ext: &str, mime_type: &str) -> Result<()> {
    if !ext.starts_with('.') {
        return Err(Error::MimeType(format!(
            "extension {:?} missing leading dot",
            ext
        )));
    }
    if mime_type.is_empty() {
        return Err(Error::MimeType("empty mime type".to_string()));
    }

    let mut table = TYPES.write().unwrap_or_else(PoisonError::into_inner);
    table.insert(ext, with_charset(mime_type), false);
    Ok(())
}
