//! # next-single-file
//!
//! Packs the static export of a Next.js site into one self-contained HTML
//! document. The result opens straight from disk, with no server and no
//! network: every asset is a data URI and every page is carried inside a
//! small client-side router that swaps content on hash changes.
//!
//! # Architecture: Four-Stage Pipeline
//!
//! ```text
//! 1. Scan     out/          →  SourceTree      (files → routes + assets)
//! 2. Inline   SourceTree    →  InlinedOutput   (references → data URIs)
//! 3. Router   routes        →  router source   (route table + navigation engine)
//! 4. Compose  everything    →  index.html      (one document around the index page)
//! ```
//!
//! Each stage is a plain function over the previous stage's output, so tests
//! can exercise any stage on hand-built input. [`pipeline::build`] runs all
//! four.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Stage 1: walks the export directory, classifies pages and assets |
//! | [`inline`] | Stage 2: data URI table and delimiter-framed reference rewriting |
//! | [`router`] | Stage 3: route table, its embedded encoding, navigation engine source |
//! | [`compose`] | Stage 4: the output document, script escaping, whitespace compaction |
//! | [`pipeline`] | All four stages in one call, plus build statistics |
//! | [`config`] | TOML configuration merged over stock defaults |
//! | [`types`] | Shared data model (`AssetKind`, `AssetRecord`, `SourceRoute`) |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Hash Routing
//!
//! A document opened from `file://` can't serve `/about`. Routes live in the
//! fragment instead (`index.html#/about`), which never triggers a load. Link
//! clicks and `history.pushState` calls from framework code are redirected
//! into the fragment, so the site's own navigation keeps working unmodified.
//!
//! ## Base64 Route Table
//!
//! Page fragments are full of `</script>`, quotes and newlines. Embedding
//! them as base64 JSON means nothing inside can end the script element it
//! sits in, and any tool can pull the table back out without executing the
//! document ([`router::extract_route_table`]).
//!
//! ## Scanning Instead of Parsing
//!
//! References are found by scanning for known asset paths framed by quote,
//! parenthesis, whitespace or comma characters, not by parsing HTML, CSS
//! and JavaScript. The same scan handles `src="…"`, `url(…)`, `srcset`
//! lists and paths in string literals inside minified chunks.

pub mod compose;
pub mod config;
pub mod inline;
pub mod output;
pub mod pipeline;
pub mod router;
pub mod scan;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
