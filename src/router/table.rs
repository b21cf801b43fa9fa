//! Route table: canonical path → head/body fragments.
//!
//! Serialized as a JSON object `{"/about": {"head": "…", "body": "…"}}` and
//! embedded base64-encoded, so the payload can never close the `<script>`
//! element it lives in.

use super::RouterError;
use crate::inline::InlinedRoute;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// The assignment the navigation engine carries its table in.
pub const ROUTE_TABLE_MARKER: &str = "const ROUTE_MAP_BASE64 = \"";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub head: String,
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteTable {
    routes: BTreeMap<String, RouteEntry>,
}

/// Canonical form of a route path.
///
/// Empty becomes `/`, a leading `/` is added when missing, and one trailing
/// `/` is removed everywhere but the root.
///
/// ```
/// use next_single_file::router::canonicalize_route;
///
/// assert_eq!(canonicalize_route("/about/"), "/about");
/// assert_eq!(canonicalize_route("blog"), "/blog");
/// assert_eq!(canonicalize_route("/"), "/");
/// ```
pub fn canonicalize_route(path: &str) -> String {
    let mut canonical = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    if canonical.len() > 1 && canonical.ends_with('/') {
        canonical.pop();
    }
    canonical
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// One entry per inlined page. A later page landing on an existing
    /// canonical key replaces the earlier one.
    pub fn from_routes(routes: &[InlinedRoute]) -> Self {
        let mut table = Self::new();
        for route in routes {
            let entry = RouteEntry {
                head: route.head.clone(),
                body: route.body.clone(),
            };
            if table.insert(&route.path, entry).is_some() {
                warn!(route = %canonicalize_route(&route.path), "duplicate route, keeping the later page");
            }
        }
        table
    }

    /// Insert under the canonical form of `path`, returning the replaced
    /// entry if there was one.
    pub fn insert(&mut self, path: &str, entry: RouteEntry) -> Option<RouteEntry> {
        self.routes.insert(canonicalize_route(path), entry)
    }

    pub fn get(&self, path: &str) -> Option<&RouteEntry> {
        self.routes.get(&canonicalize_route(path))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Canonical paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RouteEntry)> {
        self.routes.iter().map(|(path, entry)| (path.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn to_json(&self) -> Result<String, RouterError> {
        Ok(serde_json::to_string(self)?)
    }

    /// base64 of the JSON form, as embedded in the document.
    pub fn encode(&self) -> Result<String, RouterError> {
        Ok(BASE64.encode(self.to_json()?))
    }

    /// Inverse of [`encode`](Self::encode): base64 → bytes → UTF-8 → JSON.
    pub fn decode(encoded: &str) -> Result<Self, RouterError> {
        let bytes = BASE64.decode(encoded.trim())?;
        let json = String::from_utf8(bytes)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Read the route table back out of a produced document without running it.
///
/// The navigation engine is the last script in the document, so the last
/// marker is the real one. Page content or bundled scripts may quote it.
pub fn extract_route_table(document: &str) -> Result<RouteTable, RouterError> {
    let start = document
        .rfind(ROUTE_TABLE_MARKER)
        .ok_or(RouterError::MissingRouteTable)?
        + ROUTE_TABLE_MARKER.len();
    let len = document[start..]
        .find('"')
        .ok_or(RouterError::MissingRouteTable)?;
    RouteTable::decode(&document[start..start + len])
}
