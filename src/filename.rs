//! Local filename derivation for incoming images
//!
//! Uploads contribute their declared filename, URLs contribute the last
//! segment of their percent-decoded path. Either way the result is reduced to
//! a single, allow-listed path component before it touches the filesystem.

use crate::error::{OutpaintError, Result};
use std::path::{Path, PathBuf};
use url::Url;

/// Name used when no usable filename can be derived
pub const FALLBACK_FILENAME: &str = "default_filename";

/// Derive the local filename for a request
///
/// An upload's declared name wins over a URL. Supplying neither is an
/// `InvalidInput` error.
pub fn resolve_filename(upload_name: Option<&str>, url: Option<&str>) -> Result<String> {
    if let Some(name) = upload_name {
        return Ok(sanitize_filename(name));
    }
    if let Some(url) = url {
        return filename_from_url(url);
    }
    Err(OutpaintError::invalid_input(
        "Either file or URL must be provided",
    ))
}

/// Resolve the full incoming path under `incoming_dir`
pub fn resolve_incoming_path(
    incoming_dir: &Path,
    upload_name: Option<&str>,
    url: Option<&str>,
) -> Result<PathBuf> {
    Ok(incoming_dir.join(resolve_filename(upload_name, url)?))
}

/// Extract a filename from the URL's decoded path
///
/// ```
/// use outpaint_prep::filename::filename_from_url;
///
/// assert_eq!(filename_from_url("https://x/a%20b.png").unwrap(), "a b.png");
/// assert_eq!(filename_from_url("https://x/").unwrap(), "default_filename");
/// ```
pub fn filename_from_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url.trim())
        .map_err(|e| OutpaintError::invalid_input(format!("Invalid URL '{}': {}", url, e)))?;

    let decoded = urlencoding::decode_binary(parsed.path().as_bytes());
    let decoded = String::from_utf8_lossy(&decoded);

    Ok(sanitize_filename(&decoded))
}

/// Reduce an untrusted name to one safe path component
///
/// Keeps only the final `/` or `\` separated segment, replaces characters
/// outside `[A-Za-z0-9 ._()-]` with `_` and strips leading dots.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let last = name.rsplit(['/', '\\']).next().unwrap_or("");

    let cleaned: String = last
        .chars()
        .map(|c| if is_allowed(c) { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.');

    if cleaned.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        cleaned.to_string()
    }
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ' ' | '.' | '_' | '-' | '(' | ')')
}
