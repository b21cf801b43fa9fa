//! Shared types passed between pipeline stages.
//!
//! The scan stage produces these, the inline stage consumes them. Paths are
//! always root-relative with `/` separators, regardless of host platform.

use serde::Serialize;
use std::path::Path;

/// What kind of file an asset is, decided by extension during the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Font,
    Image,
    Style,
    Script,
    Binary,
}

impl AssetKind {
    /// Classify a file by its extension. Returns `None` for pages and for
    /// files the bundler does not inline (source maps, JSON payloads, text).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "css" => Some(Self::Style),
            "js" | "mjs" => Some(Self::Script),
            "woff2" | "woff" | "ttf" | "otf" | "eot" => Some(Self::Font),
            "svg" | "png" | "jpg" | "jpeg" | "gif" | "webp" | "ico" | "avif" => Some(Self::Image),
            _ => None,
        }
    }
}

/// A single non-page file read from the export, keyed by its logical path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    /// Root-relative path as found in the source tree, e.g. `/_next/static/media/a.woff2`.
    pub logical_path: String,
    pub kind: AssetKind,
    pub payload: Vec<u8>,
}

impl AssetRecord {
    /// Build a record, classifying it by the extension of `logical_path`.
    /// Files the scan would not pick up are kept as opaque binaries.
    pub fn new(logical_path: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        let logical_path = logical_path.into();
        let kind = AssetKind::from_path(Path::new(&logical_path)).unwrap_or(AssetKind::Binary);
        Self {
            logical_path,
            kind,
            payload: payload.into(),
        }
    }
}

/// A page from the export: its route and the full HTML as written by the framework.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRoute {
    /// Route path derived from the file name (`blog/index.html` → `/blog`).
    pub path: String,
    /// Root-relative path of the HTML file it came from.
    pub html_file: String,
    pub html_content: String,
}
