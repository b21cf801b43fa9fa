//! Shared test utilities.
//!
//! Fixture setup on temp directories plus lookups that panic with a useful
//! message instead of a bare `unwrap` failure.
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let tree = scan(tmp.path()).unwrap();
//! let about = find_route(&tree, "/about");
//! assert!(about.html_content.contains("About"));
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::scan::SourceTree;
use crate::types::SourceRoute;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to a temp directory and return it.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

/// Build an export tree from `(relative path, contents)` pairs.
pub fn write_tree(files: &[(&str, &str)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for (rel, contents) in files {
        write_file(tmp.path(), rel, contents.as_bytes());
    }
    tmp
}

/// Write one file below `root`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, contents: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Lookups
// =========================================================================

/// Find a scanned route by path. Panics if not found.
pub fn find_route<'a>(tree: &'a SourceTree, path: &str) -> &'a SourceRoute {
    tree.routes
        .iter()
        .find(|r| r.path == path)
        .unwrap_or_else(|| panic!("route '{path}' not found. Available: {:?}", route_paths(tree)))
}

/// All scanned route paths, in scan order.
pub fn route_paths(tree: &SourceTree) -> Vec<&str> {
    tree.routes.iter().map(|r| r.path.as_str()).collect()
}

/// A minimal full page with the given title and body.
pub fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\"><title>{title}</title></head><body>{body}</body></html>"
    )
}
