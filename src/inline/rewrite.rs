//! Reference rewriting.
//!
//! Replaces every recognized reference to an asset with that asset's data
//! URI. The text may be markup, a stylesheet or script source; nothing is
//! parsed. A reference is a path occurrence framed by delimiters:
//!
//! ```text
//!   "https://example.com/_next/static/media/a.woff2?v=3"
//!   ^ ------------------ ---------------------------- -- ^
//!   |  optional host      logical path                 |  trailing delimiter
//!   leading delimiter                  optional query --+
//! ```
//!
//! Three shapes are tried for each asset, in this order:
//!
//! 1. **Absolute**: the logical path, optionally host-qualified.
//! 2. **Root-relative omitted**: the logical path without its leading `/`.
//! 3. **Relative**: `<dir>/<filename>` for assets living under one of the
//!    configured relative directories, optionally preceded by `./`, `../` or
//!    the static prefix. Commas don't delimit this shape.
//!
//! Leading delimiters are `"` `'` `(` whitespace and `,`; trailing ones are
//! `"` `'` `)` whitespace and `,`. Either may be preceded by a backslash so
//! references inside escaped JSON strings are found. The delimiters are
//! copied through verbatim; the host, path and query between them become the
//! data URI.
//!
//! Matching works in two phases per candidate: find the path substring, then
//! validate the characters around it. Matches never overlap: the trailing
//! delimiter consumed by one match can't lead the next.

use super::table::{AssetEntry, AssetTable};
use crate::config::InlineConfig;
use tracing::trace;

const SCHEMES: &[&str] = &["http://", "https://"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    /// Absolute or slash-less path; commas delimit, a host may precede.
    Path,
    /// `<dir>/<filename>`; commas don't delimit, a relative prefix may precede.
    Relative,
}

/// Whitespace as a JavaScript `\s` class sees it.
fn is_space(c: char) -> bool {
    matches!(
        c,
        '\t'
            | '\n'
            | '\u{0b}'
            | '\u{0c}'
            | '\r'
            | ' '
            | '\u{a0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200a}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202f}'
            | '\u{205f}'
            | '\u{3000}'
            | '\u{feff}'
    )
}

fn is_leading(c: char, shape: Shape) -> bool {
    matches!(c, '"' | '\'' | '(') || is_space(c) || (shape == Shape::Path && c == ',')
}

fn is_trailing(c: char, shape: Shape) -> bool {
    matches!(c, '"' | '\'' | ')') || is_space(c) || (shape == Shape::Path && c == ',')
}

fn ends_query(c: char, shape: Shape) -> bool {
    c == '\\' || is_trailing(c, shape)
}

/// One needle to search for, with the shape that says how to frame it.
#[derive(Debug)]
struct Candidate<'t> {
    needle: String,
    shape: Shape,
    data_uri: &'t str,
}

/// Precomputed rewrite plan for an asset table.
///
/// Candidates are ordered longest logical path first, each asset contributing
/// its shapes in order. Build once and reuse it across all texts.
#[derive(Debug)]
pub struct Rewriter<'t> {
    candidates: Vec<Candidate<'t>>,
    relative_prefixes: Vec<String>,
}

impl<'t> Rewriter<'t> {
    pub fn new(table: &'t AssetTable, config: &InlineConfig) -> Self {
        let mut candidates = Vec::new();
        for entry in table.match_order() {
            push_candidates(&mut candidates, entry, &config.relative_dirs);
        }

        let mut relative_prefixes = Vec::new();
        if !config.static_prefix.is_empty() {
            relative_prefixes.push(config.static_prefix.clone());
        }
        relative_prefixes.extend(["../".to_string(), "./".to_string()]);

        Self {
            candidates,
            relative_prefixes,
        }
    }

    /// Rewrite every recognized reference in `text`. Text without any
    /// reference comes back unchanged.
    pub fn rewrite(&self, text: &str) -> String {
        let mut result = text.to_string();
        for candidate in &self.candidates {
            if let Some(rewritten) = self.replace_all(&result, candidate) {
                trace!(needle = %candidate.needle, "rewrote references");
                result = rewritten;
            }
        }
        result
    }

    /// Returns `None` when nothing matched, so callers can skip the copy.
    fn replace_all(&self, text: &str, candidate: &Candidate<'_>) -> Option<String> {
        let needle = candidate.needle.as_str();
        let mut out: Option<String> = None;
        // Everything before `cursor` has been emitted (or consumed by a match).
        let mut cursor = 0;
        let mut from = 0;

        while let Some(offset) = text[from..].find(needle) {
            let pos = from + offset;
            let after = pos + needle.len();

            let framed = self
                .leading_delimiter(text, pos, cursor, candidate.shape)
                .zip(trailing_delimiter(text, after, candidate.shape));

            let Some((lead_end, (trail_start, trail_end))) = framed else {
                from = next_char_boundary(text, pos);
                continue;
            };

            let buf = out.get_or_insert_with(|| String::with_capacity(text.len()));
            buf.push_str(&text[cursor..lead_end]);
            buf.push_str(candidate.data_uri);
            buf.push_str(&text[trail_start..trail_end]);
            cursor = trail_end;
            from = trail_end;
        }

        out.map(|mut buf| {
            buf.push_str(&text[cursor..]);
            buf
        })
    }

    /// End of the leading delimiter for a needle found at `pos`, if the
    /// occurrence is properly framed. Of all framings the leftmost wins,
    /// which is the one that swallows a host or relative prefix.
    fn leading_delimiter(&self, text: &str, pos: usize, cursor: usize, shape: Shape) -> Option<usize> {
        let delimiter_at = |start: usize| -> Option<usize> {
            let c = text[..start].chars().next_back()?;
            let lead = start - c.len_utf8();
            (lead >= cursor && is_leading(c, shape)).then_some(start)
        };

        let prefixed = match shape {
            Shape::Path => host_start(text, pos).and_then(delimiter_at),
            Shape::Relative => self
                .relative_prefixes
                .iter()
                .filter(|p| text[..pos].ends_with(p.as_str()))
                .filter_map(|p| delimiter_at(pos - p.len()))
                .min(),
        };

        prefixed.or_else(|| delimiter_at(pos))
    }
}

/// Start of a `scheme://host` run ending exactly at `pos`.
fn host_start(text: &str, pos: usize) -> Option<usize> {
    let before = &text[..pos];
    let host_begin = before.rfind('/')? + 1;
    if host_begin == pos {
        return None;
    }
    SCHEMES
        .iter()
        .find(|scheme| before[..host_begin].ends_with(*scheme))
        .map(|scheme| host_begin - scheme.len())
}

/// Span of the trailing delimiter (with its optional backslash), after an
/// optional query string that starts at `at`.
fn trailing_delimiter(text: &str, at: usize, shape: Shape) -> Option<(usize, usize)> {
    let mut i = at;
    if text[i..].starts_with('?') {
        let query_start = i + 1;
        let query_end = text[query_start..]
            .char_indices()
            .find(|&(_, c)| ends_query(c, shape))
            .map_or(text.len(), |(n, _)| query_start + n);
        if query_end == query_start {
            return None;
        }
        i = query_end;
    }

    let mut rest = text[i..].chars();
    match rest.next()? {
        '\\' => {
            let next = rest.next()?;
            is_trailing(next, shape).then_some((i, i + 1 + next.len_utf8()))
        }
        c if is_trailing(c, shape) => Some((i, i + c.len_utf8())),
        _ => None,
    }
}

fn next_char_boundary(text: &str, pos: usize) -> usize {
    let mut next = pos + 1;
    while next < text.len() && !text.is_char_boundary(next) {
        next += 1;
    }
    next
}

fn push_candidates<'t>(out: &mut Vec<Candidate<'t>>, entry: &'t AssetEntry, relative_dirs: &[String]) {
    let path = entry.logical_path.as_str();
    if path.is_empty() {
        return;
    }
    let data_uri = entry.data_uri.as_str();

    out.push(Candidate {
        needle: path.to_string(),
        shape: Shape::Path,
        data_uri,
    });

    if let Some(stripped) = path.strip_prefix('/').filter(|s| !s.is_empty()) {
        out.push(Candidate {
            needle: stripped.to_string(),
            shape: Shape::Path,
            data_uri,
        });
    }

    let (parent, file_name) = path.rsplit_once('/').unwrap_or(("", path));
    let under_relative_dir = parent
        .split('/')
        .any(|segment| relative_dirs.iter().any(|d| d == segment));
    if file_name.is_empty() || !under_relative_dir {
        return;
    }
    for dir in relative_dirs {
        out.push(Candidate {
            needle: format!("{dir}/{file_name}"),
            shape: Shape::Relative,
            data_uri,
        });
    }
}

/// Rewrite `text` against `table` with the stock matching rules.
pub fn rewrite(text: &str, table: &AssetTable) -> String {
    Rewriter::new(table, &InlineConfig::default()).rewrite(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inline::table::to_data_uri;
    use crate::types::AssetRecord;

    fn table(assets: &[(&str, &str)]) -> AssetTable {
        let records: Vec<AssetRecord> = assets
            .iter()
            .map(|(path, body)| AssetRecord::new(*path, body.as_bytes().to_vec()))
            .collect();
        AssetTable::from_records(&records)
    }

    fn uri(path: &str, body: &str) -> String {
        to_data_uri(body.as_bytes(), path)
    }

    #[test]
    fn text_without_references_is_unchanged() {
        let t = table(&[("/img/a.png", "PNG")]);
        let text = "body { color: red; } /* nothing here */ <p>a.png alone</p>";
        assert_eq!(rewrite(text, &t), text);
    }

    #[test]
    fn empty_table_is_a_no_op() {
        let t = AssetTable::default();
        assert_eq!(rewrite(r#"<img src="/img/a.png">"#, &t), r#"<img src="/img/a.png">"#);
    }

    #[test]
    fn double_quoted_absolute_path() {
        let t = table(&[("/img/a.png", "PNG")]);
        let out = rewrite(r#"<img src="/img/a.png">"#, &t);
        assert_eq!(out, format!(r#"<img src="{}">"#, uri("/img/a.png", "PNG")));
    }

    #[test]
    fn url_inside_quotes_keeps_every_delimiter() {
        let t = table(&[("/img/a.png", "PNG")]);
        let out = rewrite(r#"background: "url(/img/a.png)";"#, &t);
        assert_eq!(
            out,
            format!(r#"background: "url({})";"#, uri("/img/a.png", "PNG"))
        );
        assert!(out.contains("url(data:image/png;base64,"));
        assert_eq!(out.matches('"').count(), 2);
        assert_eq!(out.matches('(').count(), 1);
        assert_eq!(out.matches(')').count(), 1);
    }

    #[test]
    fn single_quotes_and_whitespace_delimit() {
        let t = table(&[("/a.js", "JS")]);
        let out = rewrite("load('/a.js') and\t/a.js\n", &t);
        let u = uri("/a.js", "JS");
        assert_eq!(out, format!("load('{u}') and\t{u}\n"));
    }

    #[test]
    fn comma_delimits_path_shapes() {
        let t = table(&[("/a.png", "P")]);
        let out = rewrite("srcset=\"x.png 1x,/a.png 2x\"", &t);
        assert_eq!(out, format!("srcset=\"x.png 1x,{} 2x\"", uri("/a.png", "P")));
    }

    #[test]
    fn host_qualified_reference() {
        let t = table(&[("/img/a.png", "PNG")]);
        let out = rewrite(r#"<img src="https://cdn.example.com/img/a.png">"#, &t);
        assert_eq!(out, format!(r#"<img src="{}">"#, uri("/img/a.png", "PNG")));

        let out = rewrite(r#"<img src="http://localhost:3000/img/a.png">"#, &t);
        assert_eq!(out, format!(r#"<img src="{}">"#, uri("/img/a.png", "PNG")));
    }

    #[test]
    fn query_string_is_dropped() {
        let t = table(&[("/media/f.woff2", "F")]);
        let out = rewrite(r#"src: url("/media/f.woff2?v=12#iefix")"#, &t);
        assert_eq!(out, format!(r#"src: url("{}")"#, uri("/media/f.woff2", "F")));
    }

    #[test]
    fn bare_question_mark_is_not_a_reference() {
        let t = table(&[("/a.js", "JS")]);
        let text = r#"x = "/a.js?""#;
        assert_eq!(rewrite(text, &t), text);
    }

    #[test]
    fn path_without_leading_slash() {
        let t = table(&[("/_next/static/chunks/app.js", "JS")]);
        let out = rewrite(r#"["_next/static/chunks/app.js"]"#, &t);
        assert_eq!(out, format!(r#"["{}"]"#, uri("/_next/static/chunks/app.js", "JS")));
    }

    #[test]
    fn relative_reference_under_known_dir() {
        let t = table(&[("/_next/static/media/inter.woff2", "F")]);
        let u = uri("/_next/static/media/inter.woff2", "F");
        assert_eq!(
            rewrite("src:url(../media/inter.woff2)", &t),
            format!("src:url({u})")
        );
        assert_eq!(
            rewrite("src:url(./media/inter.woff2)", &t),
            format!("src:url({u})")
        );
        assert_eq!(
            rewrite("src:url(media/inter.woff2)", &t),
            format!("src:url({u})")
        );
    }

    #[test]
    fn relative_reference_may_name_a_sibling_dir() {
        let t = table(&[("/_next/static/chunks/a.js", "A")]);
        let out = rewrite(r#"p("media/a.js")"#, &t);
        assert_eq!(out, format!(r#"p("{}")"#, uri("/_next/static/chunks/a.js", "A")));
    }

    #[test]
    fn relative_shape_requires_known_dir() {
        let t = table(&[("/images/logo.png", "P")]);
        let text = r#"<img src="media/logo.png">"#;
        assert_eq!(rewrite(text, &t), text);
    }

    #[test]
    fn relative_shape_does_not_split_on_commas() {
        let t = table(&[("/_next/static/media/a.woff2", "F")]);
        let text = "x,media/a.woff2,y";
        assert_eq!(rewrite(text, &t), text);
    }

    #[test]
    fn escaped_quotes_in_serialized_payloads() {
        let t = table(&[("/_next/static/css/app.css", "C")]);
        let out = rewrite(r#"self.__next_f.push([1,"HL[\"/_next/static/css/app.css\",\"style\"]"])"#, &t);
        assert_eq!(
            out,
            format!(
                r#"self.__next_f.push([1,"HL[\"{}\",\"style\"]"])"#,
                uri("/_next/static/css/app.css", "C")
            )
        );
    }

    #[test]
    fn longest_path_wins() {
        let t = table(&[("/x/a.js", "SHORT"), ("/x/longer/a.js", "LONG")]);
        let out = rewrite(r#"<script src="/x/longer/a.js"></script>"#, &t);
        assert!(out.contains(&uri("/x/longer/a.js", "LONG")));
        assert!(!out.contains(&uri("/x/a.js", "SHORT")));
    }

    #[test]
    fn shorter_path_still_matches_its_own_reference() {
        let t = table(&[("/x/a.js", "SHORT"), ("/x/longer/a.js", "LONG")]);
        let out = rewrite(r#""/x/longer/a.js" "/x/a.js""#, &t);
        assert_eq!(
            out,
            format!(
                r#""{}" "{}""#,
                uri("/x/longer/a.js", "LONG"),
                uri("/x/a.js", "SHORT")
            )
        );
    }

    #[test]
    fn suffix_of_a_longer_path_is_not_a_reference() {
        let t = table(&[("/a.js", "JS")]);
        let text = r#"<script src="/vendor/a.js"></script>"#;
        assert_eq!(rewrite(text, &t), text);
    }

    #[test]
    fn longer_file_name_is_not_a_reference() {
        let t = table(&[("/a.js", "JS")]);
        let text = r#"<script src="/a.js.map"></script> "/a.jsx""#;
        assert_eq!(rewrite(text, &t), text);
    }

    #[test]
    fn rewriting_twice_changes_nothing_more() {
        let t = table(&[
            ("/_next/static/media/f.woff2", "FONT"),
            ("/img/a.png", "PNG"),
            ("/_next/static/chunks/app.js", "JS"),
        ]);
        let text = r#"<img src="/img/a.png"><script src="/_next/static/chunks/app.js"></script>
            <style>@font-face{src:url(../media/f.woff2)}</style>"#;
        let once = rewrite(text, &t);
        let twice = rewrite(&once, &t);
        assert_eq!(once, twice);
        assert!(!once.contains("/img/a.png"));
    }

    #[test]
    fn adjacent_references_share_no_delimiter() {
        let t = table(&[("/a.js", "JS")]);
        let u = uri("/a.js", "JS");
        // The consumed space can't lead the second reference.
        assert_eq!(rewrite("(/a.js /a.js)", &t), format!("({u} /a.js)"));
        assert_eq!(
            rewrite(r#"["/a.js","/a.js"]"#, &t),
            format!(r#"["{u}","{u}"]"#)
        );
    }

    #[test]
    fn reference_at_text_edges_needs_delimiters() {
        let t = table(&[("/a.js", "JS")]);
        assert_eq!(rewrite("/a.js", &t), "/a.js");
        assert_eq!(rewrite(" /a.js", &t), " /a.js");
    }

    #[test]
    fn multibyte_text_around_references() {
        let t = table(&[("/img/a.png", "PNG")]);
        let out = rewrite("« “/img/a.png” » '/img/a.png' ✓", &t);
        assert_eq!(out, format!("« “/img/a.png” » '{}' ✓", uri("/img/a.png", "PNG")));
    }

    #[test]
    fn unicode_spaces_delimit() {
        let t = table(&[("/a.js", "JS")]);
        let u = uri("/a.js", "JS");
        assert_eq!(rewrite("x\u{a0}/a.js\u{a0}y", &t), format!("x\u{a0}{u}\u{a0}y"));
        assert_eq!(rewrite("\u{3000}/a.js\u{2028}", &t), format!("\u{3000}{u}\u{2028}"));
        assert_eq!(rewrite("\u{feff}/a.js?v=1\u{feff}", &t), format!("\u{feff}{u}\u{feff}"));
    }

    #[test]
    fn custom_relative_dirs() {
        let t = table(&[("/assets/img/a.png", "P")]);
        let config = InlineConfig {
            relative_dirs: vec!["img".into()],
            static_prefix: "/assets/".into(),
            strip_preloads: true,
        };
        let rewriter = Rewriter::new(&t, &config);
        let u = uri("/assets/img/a.png", "P");
        assert_eq!(rewriter.rewrite("url(../img/a.png)"), format!("url({u})"));
        assert_eq!(rewriter.rewrite("url(img/a.png)"), format!("url({u})"));
    }
}
