//! Navigation engine generation.
//!
//! Stage 3 of the bundling pipeline. Produces the source of the client-side
//! router that ships inside the output document: a self-executing script
//! carrying every page's head/body fragments, which swaps the mount node's
//! content on hash changes instead of loading another file.
//!
//! The script itself lives in `static/router.js`; generation only fills in
//! the encoded [`RouteTable`] and the configured names.
//!
//! ## Runtime behavior
//!
//! - `#/about` renders `/about`; an empty hash leaves the delivered index page
//! - unknown paths fall back to `/404`, then `/_not-found`, else nothing changes
//! - root-relative link clicks and `history.pushState`/`replaceState` calls
//!   become hash assignments
//! - `window[global_name]` exposes `navigate`, `getCurrentRoute`,
//!   `getRouteMap` and `renderRoute`

pub mod table;

pub use table::{ROUTE_TABLE_MARKER, RouteEntry, RouteTable, canonicalize_route, extract_route_table};

use crate::config::RouterConfig;
use thiserror::Error;
use tracing::debug;

const ROUTER_TEMPLATE: &str = include_str!("../../static/router.js");

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("no embedded route table found")]
    MissingRouteTable,
    #[error("route table is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("route table is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("route table JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Source of the navigation engine with `routes` embedded.
pub fn generate(routes: &RouteTable, config: &RouterConfig) -> Result<String, RouterError> {
    let encoded = routes.encode()?;
    debug!(
        routes = routes.len(),
        encoded_bytes = encoded.len(),
        "generated navigation engine"
    );
    Ok(ROUTER_TEMPLATE
        .replace("{{ROUTE_TABLE}}", &encoded)
        .replace("{{MOUNT_ID}}", &config.mount_id)
        .replace("{{ROUTER_GLOBAL}}", &config.global_name)
        .replace("{{ROUTE_EVENT}}", &config.event_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> RouteTable {
        let mut table = RouteTable::new();
        table.insert(
            "/",
            RouteEntry {
                head: "<title>Home</title>".into(),
                body: "<h1>Home</h1>".into(),
            },
        );
        table.insert(
            "/about",
            RouteEntry {
                head: "<title>About</title>".into(),
                body: "<h1>About</h1><script>window.x = 1;</script>".into(),
            },
        );
        table
    }

    #[test]
    fn template_carries_every_placeholder() {
        for placeholder in ["{{ROUTE_TABLE}}", "{{MOUNT_ID}}", "{{ROUTER_GLOBAL}}", "{{ROUTE_EVENT}}"] {
            assert!(ROUTER_TEMPLATE.contains(placeholder), "missing {placeholder}");
        }
        assert!(ROUTER_TEMPLATE.contains(ROUTE_TABLE_MARKER));
    }

    #[test]
    fn generated_source_has_no_placeholders_left() {
        let source = generate(&sample_table(), &RouterConfig::default()).unwrap();
        assert!(!source.contains("{{"));
        assert!(source.contains(r#"const MOUNT_ID = "__next";"#));
        assert!(source.contains(r#"const GLOBAL_NAME = "__NEXT_SINGLE_FILE_ROUTER__";"#));
        assert!(source.contains(r#"const ROUTE_EVENT = "routeChange";"#));
    }

    #[test]
    fn generated_source_round_trips_table() {
        let table = sample_table();
        let source = generate(&table, &RouterConfig::default()).unwrap();
        assert_eq!(extract_route_table(&source).unwrap(), table);
    }

    #[test]
    fn route_markup_never_appears_raw() {
        let source = generate(&sample_table(), &RouterConfig::default()).unwrap();
        assert!(!source.contains("<h1>About</h1>"));
        assert!(!source.contains("</script>"));
    }

    #[test]
    fn configured_names_are_substituted() {
        let config = RouterConfig {
            mount_id: "app".into(),
            global_name: "SiteRouter".into(),
            event_name: "pagechange".into(),
        };
        let source = generate(&RouteTable::new(), &config).unwrap();
        assert!(source.contains(r#"const MOUNT_ID = "app";"#));
        assert!(source.contains(r#"const GLOBAL_NAME = "SiteRouter";"#));
        assert!(source.contains(r#"const ROUTE_EVENT = "pagechange";"#));
    }
}
