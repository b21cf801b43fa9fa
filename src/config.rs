//! Bundler configuration.
//!
//! Every option has a default that matches a stock `next build` export, so
//! most runs need no configuration at all. When a config file is passed with
//! `--config`, its values are merged on top of the stock defaults:
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [inline]
//! relative_dirs = ["media", "chunks", "css"]  # Dirs whose files may be referenced by name
//! static_prefix = "/_next/static/"            # Prefix allowed before a relative dir
//! strip_preloads = true                       # Drop <link rel="preload"> tags
//!
//! [router]
//! mount_id = "__next"                         # Element whose content is swapped per route
//! global_name = "__NEXT_SINGLE_FILE_ROUTER__" # window property exposing the router
//! event_name = "routeChange"                  # Event dispatched after each render
//!
//! [output]
//! minify = true                               # Compact whitespace in markup
//! build_comment = true                        # Keep <!--build-id--> after the doctype
//!
//! [processing]
//! max_processes = 4                           # Rewrite workers (omit for auto = CPU cores)
//! ```
//!
//! Config files are sparse: override just the values you need. Unknown keys
//! are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Bundler configuration. All fields have defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BundleConfig {
    /// Reference rewriting settings.
    pub inline: InlineConfig,
    /// Settings baked into the generated navigation engine.
    pub router: RouterConfig,
    /// Final document settings.
    pub output: OutputConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl BundleConfig {
    /// Validate values that would otherwise produce a broken document.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inline.relative_dirs.is_empty() {
            return Err(ConfigError::Validation(
                "inline.relative_dirs must not be empty".into(),
            ));
        }
        if let Some(dir) = self
            .inline
            .relative_dirs
            .iter()
            .find(|d| d.is_empty() || d.contains('/'))
        {
            return Err(ConfigError::Validation(format!(
                "inline.relative_dirs entry {dir:?} must be a single path segment"
            )));
        }
        let prefix = &self.inline.static_prefix;
        if !prefix.is_empty() && !(prefix.starts_with('/') && prefix.ends_with('/')) {
            return Err(ConfigError::Validation(
                "inline.static_prefix must be empty or start and end with '/'".into(),
            ));
        }
        if self.router.mount_id.is_empty() || !is_attribute_safe(&self.router.mount_id) {
            return Err(ConfigError::Validation(
                "router.mount_id must be a non-empty id without quotes or whitespace".into(),
            ));
        }
        if !is_js_identifier(&self.router.global_name) {
            return Err(ConfigError::Validation(
                "router.global_name must be a valid JavaScript identifier".into(),
            ));
        }
        if self.router.event_name.is_empty() || !is_attribute_safe(&self.router.event_name) {
            return Err(ConfigError::Validation(
                "router.event_name must be non-empty without quotes or whitespace".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn is_attribute_safe(value: &str) -> bool {
    !value
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '\\' | '<' | '>'))
}

fn is_js_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// How asset references are recognized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InlineConfig {
    /// Directory names whose files are also matched as `<dir>/<filename>`,
    /// catching references relative to the referring chunk.
    pub relative_dirs: Vec<String>,
    /// Prefix that may precede `<dir>/<filename>` in a relative reference.
    pub static_prefix: String,
    /// Remove `<link rel="preload">` tags after rewriting.
    pub strip_preloads: bool,
}

impl Default for InlineConfig {
    fn default() -> Self {
        Self {
            relative_dirs: vec!["media".into(), "chunks".into(), "css".into()],
            static_prefix: "/_next/static/".into(),
            strip_preloads: true,
        }
    }
}

/// Names baked into the navigation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouterConfig {
    pub mount_id: String,
    pub global_name: String,
    pub event_name: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            mount_id: "__next".into(),
            global_name: "__NEXT_SINGLE_FILE_ROUTER__".into(),
            event_name: "routeChange".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Strip comments and collapse whitespace in markup.
    pub minify: bool,
    /// Emit the build id as a comment right after the doctype.
    pub build_comment: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            minify: true,
            build_comment: true,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel rewrite workers.
    /// When absent, defaults to the number of CPU cores.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// The stock defaults as a `toml::Value::Table`, the base layer for merging.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(BundleConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<BundleConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: BundleConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the configuration, reading `path` when one is given.
///
/// An explicitly named file that doesn't exist is an error; no path at all
/// yields the validated stock defaults.
pub fn load_config(path: Option<&Path>) -> Result<BundleConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = match path {
        Some(p) => {
            debug!(path = %p.display(), "loading config");
            let content = fs::read_to_string(p)?;
            Some(toml::from_str::<toml::Value>(&content)?)
        }
        None => None,
    };
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock config file with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# next-single-file configuration
# ==============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Pass this file with --config. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Reference rewriting
# ---------------------------------------------------------------------------
[inline]
# Directories whose files are also matched by "<dir>/<filename>" alone.
# Bundled chunks often reference siblings relative to their own location.
relative_dirs = ["media", "chunks", "css"]

# Prefix that may precede "<dir>/<filename>" in such a relative reference.
static_prefix = "/_next/static/"

# Remove <link rel="preload"> tags; they would point at files that no
# longer exist next to the document.
strip_preloads = true

# ---------------------------------------------------------------------------
# Navigation engine
# ---------------------------------------------------------------------------
[router]
# id of the element whose content is replaced on every route change.
# Falls back to <body> when no such element exists.
mount_id = "__next"

# window property exposing navigate/getCurrentRoute/getRouteMap/renderRoute.
global_name = "__NEXT_SINGLE_FILE_ROUTER__"

# Name of the event dispatched on document after each render.
event_name = "routeChange"

# ---------------------------------------------------------------------------
# Output document
# ---------------------------------------------------------------------------
[output]
# Strip comments and collapse whitespace between tags.
# Script and style contents are never touched.
minify = true

# Keep the build id as an HTML comment right after the doctype.
build_comment = true

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel rewrite workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
