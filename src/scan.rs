//! Export directory scanning.
//!
//! Stage 1 of the bundling pipeline. Walks the output of `next build` with
//! `output: "export"` and sorts every file into one of five buckets:
//!
//! ```text
//! out/                                   # Export root
//! ├── index.html                         # page  → route /
//! ├── about.html                         # page  → route /about
//! ├── blog/
//! │   ├── index.html                     # page  → route /blog
//! │   └── first-post.html                # page  → route /blog/first-post
//! ├── 404.html                           # page  → route /404
//! ├── favicon.ico                        # image
//! └── _next/static/
//!     ├── <build-id>/                    # names the build, contents ignored
//!     ├── chunks/app-4f1c.js             # script
//!     ├── css/app-9a2b.css               # stylesheet
//!     └── media/inter-latin.woff2        # font
//! ```
//!
//! Anything else (RSC `.txt` payloads, source maps, JSON) is skipped: none of
//! it is reachable from a document opened without a server.
//!
//! Pages and text assets are read as UTF-8 because the rewriter operates on
//! them as strings; fonts and images are kept as raw bytes.

use crate::types::{AssetKind, AssetRecord, SourceRoute};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Input is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Text file is not valid UTF-8: {path}")]
    InvalidUtf8 { path: String },
}

/// Directory names under `_next/static/` that hold assets rather than
/// naming the build.
const STATIC_ASSET_DIRS: &[&str] = &["chunks", "media", "css"];

/// Everything the rewriter needs from the export, keyed by logical path.
#[derive(Debug, Default)]
pub struct SourceTree {
    pub build_id: String,
    pub routes: Vec<SourceRoute>,
    pub font_files: BTreeMap<String, Vec<u8>>,
    pub image_files: BTreeMap<String, Vec<u8>>,
    pub css_files: BTreeMap<String, String>,
    pub js_files: BTreeMap<String, String>,
}

impl SourceTree {
    /// All assets in table insertion order: fonts, images, stylesheets, scripts.
    pub fn asset_records(&self) -> Vec<AssetRecord> {
        let binary = |kind: AssetKind, files: &BTreeMap<String, Vec<u8>>| {
            files
                .iter()
                .map(move |(path, bytes)| AssetRecord {
                    logical_path: path.clone(),
                    kind,
                    payload: bytes.clone(),
                })
                .collect::<Vec<_>>()
        };
        let text = |kind: AssetKind, files: &BTreeMap<String, String>| {
            files
                .iter()
                .map(move |(path, content)| AssetRecord {
                    logical_path: path.clone(),
                    kind,
                    payload: content.as_bytes().to_vec(),
                })
                .collect::<Vec<_>>()
        };

        let mut records = binary(AssetKind::Font, &self.font_files);
        records.extend(binary(AssetKind::Image, &self.image_files));
        records.extend(text(AssetKind::Style, &self.css_files));
        records.extend(text(AssetKind::Script, &self.js_files));
        records
    }

    pub fn asset_count(&self) -> usize {
        self.font_files.len() + self.image_files.len() + self.css_files.len() + self.js_files.len()
    }

    pub fn index_route(&self) -> Option<&SourceRoute> {
        self.routes.iter().find(|r| r.path == "/")
    }
}

pub fn scan(root: &Path) -> Result<SourceTree, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    let mut tree = SourceTree {
        build_id: find_build_id(root),
        ..SourceTree::default()
    };

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let rel = relative_path(path, root);
        let logical = format!("/{rel}");

        if has_extension(path, "html") {
            let html_content = read_text(path, &logical)?;
            let route = html_path_to_route(&rel);
            debug!(route = %route, file = %rel, "found page");
            tree.routes.push(SourceRoute {
                path: route,
                html_file: rel,
                html_content,
            });
            continue;
        }

        match AssetKind::from_path(path) {
            Some(AssetKind::Style) => {
                tree.css_files.insert(logical.clone(), read_text(path, &logical)?);
            }
            Some(AssetKind::Script) => {
                tree.js_files.insert(logical.clone(), read_text(path, &logical)?);
            }
            Some(AssetKind::Font) => {
                tree.font_files.insert(logical.clone(), fs::read(path)?);
            }
            Some(AssetKind::Image) => {
                tree.image_files.insert(logical.clone(), fs::read(path)?);
            }
            Some(AssetKind::Binary) | None => {
                debug!(file = %rel, "skipping unrecognized file");
                continue;
            }
        }
        debug!(asset = %logical, "found asset");
    }

    info!(
        build_id = %tree.build_id,
        routes = tree.routes.len(),
        assets = tree.asset_count(),
        "scan complete"
    );
    Ok(tree)
}

/// Map an export-relative HTML file to the route it serves.
///
/// - `index.html` → `/`
/// - `about.html` → `/about`
/// - `blog/index.html` → `/blog`
/// - `blog/first-post.html` → `/blog/first-post`
pub fn html_path_to_route(rel_path: &str) -> String {
    let normalized = rel_path.replace('\\', "/");
    let stem = normalized.strip_suffix(".html").unwrap_or(&normalized);
    let stem = stem.strip_suffix("/index").unwrap_or(stem);
    if stem == "index" {
        return "/".to_string();
    }
    if stem.starts_with('/') {
        stem.to_string()
    } else {
        format!("/{stem}")
    }
}

/// The build id is the name of the one directory under `_next/static/`
/// that isn't an asset directory.
fn find_build_id(root: &Path) -> String {
    let static_dir = root.join("_next").join("static");
    let Ok(entries) = fs::read_dir(&static_dir) else {
        return "unknown".to_string();
    };

    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|name| !name.starts_with('.') && !STATIC_ASSET_DIRS.contains(&name.as_str()))
        .collect();
    names.sort();
    names.into_iter().next().unwrap_or_else(|| "unknown".to_string())
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

fn relative_path(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn read_text(path: &Path, logical: &str) -> Result<String, ScanError> {
    let bytes = fs::read(path)?;
    String::from_utf8(bytes).map_err(|_| ScanError::InvalidUtf8 {
        path: logical.to_string(),
    })
}
