//! The whole build in one call: scan → inline → router → compose.

use crate::compose::{self, ComposeError};
use crate::config::BundleConfig;
use crate::inline::inline_assets;
use crate::router::{self, RouteTable, RouterError};
use crate::scan::{self, ScanError, SourceTree};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),
    #[error("Router generation failed: {0}")]
    Router(#[from] RouterError),
    #[error("Compose failed: {0}")]
    Compose(#[from] ComposeError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssetCounts {
    pub fonts: usize,
    pub images: usize,
    pub styles: usize,
    pub scripts: usize,
}

impl AssetCounts {
    pub fn of(tree: &SourceTree) -> Self {
        Self {
            fonts: tree.font_files.len(),
            images: tree.image_files.len(),
            styles: tree.css_files.len(),
            scripts: tree.js_files.len(),
        }
    }

    pub fn total(&self) -> usize {
        self.fonts + self.images + self.styles + self.scripts
    }
}

#[derive(Debug)]
pub struct BuildOutput {
    pub document: String,
    pub build_id: String,
    /// Canonical route paths embedded in the document, sorted.
    pub routes: Vec<String>,
    pub assets: AssetCounts,
    /// Bytes of data URIs produced for the assets.
    pub encoded_asset_bytes: usize,
}

impl BuildOutput {
    /// Document size in bytes.
    pub fn size(&self) -> usize {
        self.document.len()
    }
}

/// Bundle the export at `source` into a single document.
pub fn build(source: &Path, config: &BundleConfig) -> Result<BuildOutput, PipelineError> {
    let tree = scan::scan(source)?;
    let inlined = inline_assets(&tree, &config.inline);

    let table = RouteTable::from_routes(&inlined.routes);
    let router_shim = router::generate(&table, &config.router)?;
    let document = compose::compose(&inlined, &router_shim, config)?;

    info!(
        routes = table.len(),
        bytes = document.len(),
        "bundle complete"
    );
    Ok(BuildOutput {
        document,
        build_id: inlined.build_id,
        routes: table.paths().map(str::to_string).collect(),
        assets: AssetCounts::of(&tree),
        encoded_asset_bytes: inlined.table.encoded_size(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::extract_route_table;
    use crate::test_helpers::*;

    const ASSET_PATHS: &[&str] = &[
        "/_next/static/css/app.css",
        "/_next/static/chunks/main.js",
        "/_next/static/media/inter.woff2",
        "/images/logo.png",
        "media/inter.woff2",
    ];

    #[test]
    fn fixture_site_bundles_to_one_document() {
        let tmp = setup_fixtures();
        let output = build(tmp.path(), &BundleConfig::default()).unwrap();

        assert_eq!(
            output.routes,
            vec!["/", "/404", "/about", "/blog", "/blog/first-post"]
        );
        assert_eq!(output.build_id, "fixture-build");
        assert_eq!(
            output.assets,
            AssetCounts {
                fonts: 1,
                images: 1,
                styles: 1,
                scripts: 1
            }
        );
        assert_eq!(output.assets.total(), 4);
        assert_eq!(output.size(), output.document.len());
    }

    #[test]
    fn no_asset_path_survives_anywhere() {
        let tmp = setup_fixtures();
        let output = build(tmp.path(), &BundleConfig::default()).unwrap();
        let table = extract_route_table(&output.document).unwrap();

        for path in ASSET_PATHS {
            assert!(!output.document.contains(path), "document still references {path}");
            for (route, entry) in table.iter() {
                assert!(!entry.head.contains(path), "{route} head still references {path}");
                assert!(!entry.body.contains(path), "{route} body still references {path}");
            }
        }
    }

    #[test]
    fn embedded_table_matches_pages() {
        let tmp = setup_fixtures();
        let tree = scan::scan(tmp.path()).unwrap();
        let output = build(tmp.path(), &BundleConfig::default()).unwrap();
        let table = extract_route_table(&output.document).unwrap();

        assert_eq!(table.paths().collect::<Vec<_>>(), output.routes);
        let about = find_route(&tree, "/about");
        assert!(about.html_content.contains(&table.get("/about").unwrap().body));
        assert!(table.get("/blog/first-post").unwrap().body.contains("日本語"));
        assert!(table.get("/404").unwrap().head.contains("<title>"));
    }

    #[test]
    fn index_body_is_mounted_and_matches_table() {
        let tmp = setup_fixtures();
        let output = build(tmp.path(), &BundleConfig::default()).unwrap();
        let table = extract_route_table(&output.document).unwrap();

        assert!(output.document.contains(r#"<div id="__next">"#));
        assert!(output.document.contains(r#"id="page-title""#));
        assert!(table.get("/").unwrap().body.contains(r#"<h1 id="page-title">Home</h1>"#));
        assert!(output.document.contains("<title>Home | Fixture Site</title>"));
        assert!(output.document.contains(r#"<html lang="en" class="__variable_inter">"#));
        assert!(output.document.contains(r#"<body class="antialiased">"#));
    }

    #[test]
    fn bundles_are_inlined_into_head() {
        let tmp = setup_fixtures();
        let output = build(tmp.path(), &BundleConfig::default()).unwrap();
        assert!(output.document.contains("url(data:font/woff2;base64,"));
        assert!(output.document.contains("window.__mainRuns"));
        assert!(!output.document.contains(r#"rel="preload""#));
    }

    #[test]
    fn site_without_index_fails() {
        let tmp = write_tree(&[("about.html", page("About", "a").as_str())]);
        let err = build(tmp.path(), &BundleConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Compose(ComposeError::MissingIndexRoute)));
    }

    #[test]
    fn missing_source_fails() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = build(&tmp.path().join("nope"), &BundleConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Scan(ScanError::NotADirectory(_))));
    }

    #[test]
    fn minimal_site_without_assets() {
        let tmp = write_tree(&[("index.html", page("Only", "<p>just text</p>").as_str())]);
        let output = build(tmp.path(), &BundleConfig::default()).unwrap();
        assert_eq!(output.routes, vec!["/"]);
        assert_eq!(output.assets.total(), 0);
        assert_eq!(output.build_id, "unknown");
        assert!(output.document.contains("<p>just text</p>"));
    }

    #[test]
    fn table_extracts_when_index_quotes_the_marker() {
        let body = r#"<pre>const ROUTE_MAP_BASE64 = "...";</pre>"#;
        let tmp = write_tree(&[
            ("index.html", page("Docs", body).as_str()),
            ("about.html", page("About", "a").as_str()),
        ]);
        let output = build(tmp.path(), &BundleConfig::default()).unwrap();

        let table = extract_route_table(&output.document).unwrap();
        assert_eq!(table.paths().collect::<Vec<_>>(), vec!["/", "/about"]);
        assert_eq!(table.get("/").unwrap().body, body);
    }
}
