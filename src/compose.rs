//! Single-document assembly.
//!
//! Stage 4 of the bundling pipeline. Wraps the inlined bundles and the
//! navigation engine into one HTML document shaped around the index page:
//!
//! ```text
//! <!DOCTYPE html><!--build-id-->
//! <html …index page attributes…>
//! <head>
//!   <meta charset>                 always first
//!   <script>runtime shims</script> before any framework code
//!   <meta viewport>
//!   …index page <meta> tags…
//!   <title>
//!   <style>stylesheet bundle</style>
//!   <script>script bundle</script>
//! </head>
//! <body …index page attributes…>
//!   <div id="__next">index body</div>
//!   <script>navigation engine</script>
//! </body>
//! </html>
//! ```
//!
//! Raw text is spliced in with `PreEscaped`, so every inline script gets
//! `</script` escaped and every inline style gets `</style` escaped before it
//! goes in.

use crate::config::BundleConfig;
use crate::inline::{InlinedOutput, InlinedRoute};
use crate::router::canonicalize_route;
use maud::{DOCTYPE, PreEscaped, html};
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

const RUNTIME_SHIMS: &str = include_str!("../static/runtime-shims.js");
const VIEWPORT: &str = "width=device-width, initial-scale=1";
const DEFAULT_HTML_ATTRS: &str = r#" lang="en""#;
const DEFAULT_TITLE: &str = "App";

static HTML_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<html(\s[^>]*)?>").unwrap());

static BODY_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<body(\s[^>]*)?>").unwrap());

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title(?:\s[^>]*)?>(.*?)</title\s*>").unwrap());

static META_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<meta\b[^>]*>").unwrap());

/// Metas the shell writes itself.
static SHELL_META_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bcharset\s*=|\bname\s*=\s*["']?viewport\b"#).unwrap()
});

static SCRIPT_CLOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</(script)").unwrap());

static STYLE_CLOSE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</(style)").unwrap());

/// A comment, or the opening tag of an element whose text is kept verbatim.
static VERBATIM_OR_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<!--|<(script|style|pre|textarea)\b[^>]*>").unwrap()
});

static BETWEEN_TAGS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">\s+<").unwrap());

static WHITESPACE_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());

#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("No index route found: the export has no page for '/'")]
    MissingIndexRoute,
}

/// Assemble the final document.
pub fn compose(
    inlined: &InlinedOutput,
    router_shim: &str,
    config: &BundleConfig,
) -> Result<String, ComposeError> {
    let index = find_index(&inlined.routes).ok_or(ComposeError::MissingIndexRoute)?;

    let html_attrs = html_attrs(&index.html);
    let body_attrs = body_attrs(&index.html);
    let title = extract_title(&index.head).unwrap_or(DEFAULT_TITLE);
    let metas = extract_metas(&index.head);

    let markup = html! {
        (PreEscaped(format!("<html{html_attrs}>")))
        head {
            meta charset="utf-8";
            script { (PreEscaped(escape_script(RUNTIME_SHIMS))) }
            meta name="viewport" content=(VIEWPORT);
            @for tag in &metas {
                (PreEscaped(*tag))
            }
            title { (PreEscaped(title)) }
            style { (PreEscaped(escape_style(&inlined.css))) }
            script { (PreEscaped(escape_script(&inlined.js))) }
        }
        (PreEscaped(format!("<body{body_attrs}>")))
        div id=(config.router.mount_id) { (PreEscaped(&index.body)) }
        script { (PreEscaped(escape_script(router_shim))) }
        (PreEscaped("</body></html>"))
    }
    .into_string();

    let markup = if config.output.minify {
        minify_html(&markup)
    } else {
        markup
    };

    let mut document = html! { (DOCTYPE) }.into_string();
    if config.output.build_comment {
        document.push_str(&build_comment(&inlined.build_id));
    }
    document.push_str(&markup);
    debug!(bytes = document.len(), metas = metas.len(), "composed document");
    Ok(document)
}

fn find_index(routes: &[InlinedRoute]) -> Option<&InlinedRoute> {
    routes.iter().find(|r| canonicalize_route(&r.path) == "/")
}

/// Attributes of the page's `<html>` tag with their leading whitespace,
/// `lang="en"` when it has none.
pub fn html_attrs(html: &str) -> &str {
    HTML_TAG_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|attrs| !attrs.trim().is_empty())
        .unwrap_or(DEFAULT_HTML_ATTRS)
}

/// Attributes of the page's `<body>` tag with their leading whitespace.
pub fn body_attrs(html: &str) -> &str {
    BODY_TAG_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map_or("", |m| m.as_str())
}

/// Raw (still entity-encoded) title text.
pub fn extract_title(head: &str) -> Option<&str> {
    TITLE_RE
        .captures(head)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|t| !t.is_empty())
}

/// `<meta>` tags from a head fragment, minus charset and viewport, exact
/// duplicates dropped.
pub fn extract_metas(head: &str) -> Vec<&str> {
    let mut metas: Vec<&str> = Vec::new();
    for tag in META_RE.find_iter(head).map(|m| m.as_str()) {
        if SHELL_META_RE.is_match(tag) || metas.contains(&tag) {
            continue;
        }
        metas.push(tag);
    }
    metas
}

pub fn escape_script(js: &str) -> Cow<'_, str> {
    SCRIPT_CLOSE_RE.replace_all(js, r"<\/${1}")
}

pub fn escape_style(css: &str) -> Cow<'_, str> {
    STYLE_CLOSE_RE.replace_all(css, r"<\/${1}")
}

fn build_comment(build_id: &str) -> String {
    format!("<!--{}-->", build_id.replace("--", "-").replace('>', ""))
}

/// Drop comments and compact whitespace in markup.
///
/// The text of `<script>`, `<style>`, `<pre>` and `<textarea>` elements is
/// copied untouched: joining lines inside a script would turn a `//` comment
/// into one that swallows the code after it.
pub fn minify_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut pending = String::new();
    let mut rest = html;

    while let Some(caps) = VERBATIM_OR_COMMENT_RE.captures(rest) {
        let Some(token) = caps.get(0) else { break };
        pending.push_str(&rest[..token.start()]);

        match caps.get(1) {
            None => {
                let after = &rest[token.end()..];
                rest = after.find("-->").map_or("", |i| &after[i + 3..]);
            }
            Some(name) => {
                let text_start = token.end();
                let end = closing_tag_end(&rest[text_start..], name.as_str())
                    .map_or(rest.len(), |e| text_start + e);
                push_compacted(&mut out, &pending, true);
                pending.clear();
                out.push_str(&rest[token.start()..end]);
                rest = &rest[end..];
            }
        }
    }
    pending.push_str(rest);
    push_compacted(&mut out, &pending, false);
    out.trim().to_string()
}

/// Offset just past the `</name …>` that closes a verbatim element.
fn closing_tag_end(text: &str, name: &str) -> Option<usize> {
    text.match_indices("</").find_map(|(i, _)| {
        let after = &text[i + 2..];
        let tag = after.get(..name.len())?;
        if !tag.eq_ignore_ascii_case(name) {
            return None;
        }
        let next = after[name.len()..].chars().next()?;
        if next != '>' && !next.is_whitespace() {
            return None;
        }
        let close = after.find('>')?;
        Some(i + 2 + close + 1)
    })
}

fn push_compacted(out: &mut String, markup: &str, before_tag: bool) {
    let tight = BETWEEN_TAGS_RE.replace_all(markup, "><");
    let collapsed = WHITESPACE_RUN_RE.replace_all(&tight, " ");
    let mut text: &str = &collapsed;

    let starts_with_tag = text.trim_start().starts_with('<') || text.trim().is_empty();
    if out.ends_with('>') && starts_with_tag {
        text = text.trim_start();
    }
    if before_tag && text.trim_end().ends_with('>') {
        text = text.trim_end();
    }
    out.push_str(text);
}
