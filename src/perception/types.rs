use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

/// One observed profile. Owns its transient snapshot: the file is removed
/// when the view is dropped, on every exit path.
#[derive(Debug)]
pub struct ProfileView {
    pub key: String,
    pub snapshot_path: PathBuf,
    pub captured_at: DateTime<Utc>,
}

impl ProfileView {
    pub fn new(key: String, snapshot_path: PathBuf) -> Self {
        Self {
            key,
            snapshot_path,
            captured_at: Utc::now(),
        }
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }
}

impl Drop for ProfileView {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.snapshot_path) {
            Ok(()) => {
                tracing::debug!(path = %self.snapshot_path.display(), "transient snapshot removed");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    path = %self.snapshot_path.display(),
                    error = %e,
                    "failed to remove transient snapshot"
                );
            }
        }
    }
}

/// Identity key for a page address: fragment dropped, trailing slash trimmed.
/// Unparseable input is used as-is.
pub fn canonical_address(raw: &str) -> String {
    match url::Url::parse(raw.trim()) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            let s = parsed.to_string();
            match s.strip_suffix('/') {
                Some(stripped) if parsed.path() != "/" => stripped.to_string(),
                _ => s,
            }
        }
        Err(_) => raw.trim().to_string(),
    }
}

/// File stem for a profile's artifacts, taken from the last path segment of
/// its address and reduced to filename-safe characters.
pub fn artifact_stem(address: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let unsafe_chars =
        UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("filename pattern is valid"));

    let tail = match url::Url::parse(address) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segs| segs.rfind(|s| !s.is_empty()))
            .unwrap_or_default()
            .to_string(),
        Err(_) => address
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    let cleaned = unsafe_chars.replace_all(&tail, "_");
    let cleaned = cleaned.trim_matches(|c| c == '_' || c == '.');
    if cleaned.is_empty() {
        "profile".to_string()
    } else {
        cleaned.to_string()
    }
}
