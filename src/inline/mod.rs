//! Asset inlining.
//!
//! Stage 2 of the bundling pipeline. Turns every asset into a data URI and
//! rewrites references to those assets everywhere they occur.
//!
//! ## Two passes
//!
//! ```text
//! 1. stylesheets + scripts   (rewritten in parallel, then joined)
//! 2. pages                   (rewritten, then split into head/body)
//! ```
//!
//! Stylesheets and scripts go first so font and image references inside
//! them are resolved before they're concatenated into the shared bundles.
//! Pages go second, against the same table, so `<link>` and `<script src>`
//! tags pointing at those bundles resolve too.
//!
//! | Module | Role |
//! |--------|------|
//! | [`table`] | Data URI encoding and the path → data URI table |
//! | [`rewrite`] | Delimiter-framed reference matching and replacement |

pub mod rewrite;
pub mod table;

pub use rewrite::{Rewriter, rewrite};
pub use table::{AssetEntry, AssetTable, mime_for_path, to_data_uri};

use crate::config::InlineConfig;
use crate::scan::SourceTree;
use rayon::prelude::*;
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use tracing::{debug, info};

static HEAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<head(?:\s[^>]*)?>(.*?)</head\s*>").unwrap());

static BODY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<body(?:\s[^>]*)?>(.*?)</body\s*>").unwrap());

static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style(?:\s[^>]*)?>(.*?)</style\s*>").unwrap());

/// `<link ... rel="preload" ...>` in either quote style.
static PRELOAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<link[^>]+rel=["']preload["'][^>]*>"#).unwrap());

/// A page after rewriting, split for the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlinedRoute {
    pub path: String,
    /// Inner HTML of `<head>`, empty when the page has none.
    pub head: String,
    /// Inner HTML of `<body>`, empty when the page has none.
    pub body: String,
    /// The whole rewritten page.
    pub html: String,
}

#[derive(Debug)]
pub struct InlinedOutput {
    pub build_id: String,
    pub routes: Vec<InlinedRoute>,
    /// Every stylesheet plus every page's `<style>` blocks, rewritten.
    pub css: String,
    /// Every script, rewritten.
    pub js: String,
    pub table: AssetTable,
}

pub fn inline_assets(tree: &SourceTree, config: &InlineConfig) -> InlinedOutput {
    let table = AssetTable::from_records(&tree.asset_records());
    info!(
        assets = table.len(),
        encoded_bytes = table.encoded_size(),
        "encoded assets"
    );
    let rewriter = Rewriter::new(&table, config);

    // Pass 1: stylesheet and script bodies
    let css_files: Vec<&String> = tree.css_files.values().collect();
    let js_files: Vec<&String> = tree.js_files.values().collect();
    let rewritten_css: Vec<String> = css_files.par_iter().map(|c| rewriter.rewrite(c)).collect();
    let rewritten_js: Vec<String> = js_files.par_iter().map(|j| rewriter.rewrite(j)).collect();
    let mut css = rewritten_css.join("\n");
    let js = rewritten_js.join("\n");

    // Pass 2: pages
    let routes: Vec<InlinedRoute> = tree
        .routes
        .par_iter()
        .map(|route| {
            let rewritten = rewriter.rewrite(&route.html_content);
            let html = if config.strip_preloads {
                strip_preloads(&rewritten).into_owned()
            } else {
                rewritten
            };
            debug!(route = %route.path, bytes = html.len(), "inlined page");
            InlinedRoute {
                path: route.path.clone(),
                head: extract_head(&html).to_string(),
                body: extract_body(&html).to_string(),
                html,
            }
        })
        .collect();

    for route in &routes {
        css.push('\n');
        css.push_str(&extract_styles(&route.html));
    }

    InlinedOutput {
        build_id: tree.build_id.clone(),
        routes,
        css,
        js,
        table,
    }
}

pub fn extract_head(html: &str) -> &str {
    HEAD_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map_or("", |m| m.as_str())
}

pub fn extract_body(html: &str) -> &str {
    BODY_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map_or("", |m| m.as_str())
}

/// Contents of every `<style>` block, each followed by a newline.
pub fn extract_styles(html: &str) -> String {
    STYLE_RE
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| format!("{}\n", m.as_str()))
        .collect()
}

/// Remove `<link rel="preload">` tags. Whatever they point at has either been
/// inlined already or doesn't exist next to the document.
pub fn strip_preloads(html: &str) -> Cow<'_, str> {
    PRELOAD_RE.replace_all(html, "")
}
