//! Asset table: logical path → data URI.
//!
//! Built once per run from the scanned asset records and never mutated
//! afterwards. Iteration follows insertion order (fonts, images, stylesheets,
//! scripts); the order the rewriter tries candidates in is derived on demand
//! by [`AssetTable::match_order`].

use crate::types::AssetRecord;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rayon::prelude::*;
use std::cmp::Reverse;
use std::collections::HashMap;

const FALLBACK_MIME: &str = "application/octet-stream";

/// Mime type for a logical path, by extension.
pub fn mime_for_path(path: &str) -> &'static str {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let Some((_, ext)) = file_name.rsplit_once('.') else {
        return FALLBACK_MIME;
    };
    match ext.to_ascii_lowercase().as_str() {
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "ico" => "image/x-icon",
        "woff2" => "font/woff2",
        "woff" => "font/woff",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",
        "js" | "mjs" => "application/javascript",
        "css" => "text/css",
        _ => FALLBACK_MIME,
    }
}

/// Encode a payload as `data:<mime>;base64,<payload>`.
pub fn to_data_uri(payload: &[u8], path: &str) -> String {
    format!("data:{};base64,{}", mime_for_path(path), BASE64.encode(payload))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEntry {
    pub logical_path: String,
    pub data_uri: String,
}

#[derive(Debug, Clone, Default)]
pub struct AssetTable {
    entries: Vec<AssetEntry>,
    index: HashMap<String, usize>,
}

impl AssetTable {
    /// Encode every record. Encoding runs in parallel; insertion order is
    /// the order of `records`. A repeated path keeps its first position and
    /// takes the later payload.
    pub fn from_records(records: &[AssetRecord]) -> Self {
        let encoded: Vec<AssetEntry> = records
            .par_iter()
            .map(|record| AssetEntry {
                logical_path: record.logical_path.clone(),
                data_uri: to_data_uri(&record.payload, &record.logical_path),
            })
            .collect();

        let mut table = Self::default();
        for entry in encoded {
            match table.index.get(&entry.logical_path) {
                Some(&pos) => table.entries[pos] = entry,
                None => {
                    table
                        .index
                        .insert(entry.logical_path.clone(), table.entries.len());
                    table.entries.push(entry);
                }
            }
        }
        table
    }

    pub fn get(&self, logical_path: &str) -> Option<&str> {
        self.index
            .get(logical_path)
            .map(|&pos| self.entries[pos].data_uri.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &AssetEntry> {
        self.entries.iter()
    }

    /// Entries by descending logical-path length, ties in insertion order.
    ///
    /// Longest first means `/x/longer/a.js` is replaced before `a.js` ever
    /// gets a chance to match inside it.
    pub fn match_order(&self) -> Vec<&AssetEntry> {
        let mut ordered: Vec<&AssetEntry> = self.entries.iter().collect();
        ordered.sort_by_key(|e| Reverse(e.logical_path.len()));
        ordered
    }

    /// Total size of all data URIs, for reporting.
    pub fn encoded_size(&self) -> usize {
        self.entries.iter().map(|e| e.data_uri.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_for_known_extensions() {
        assert_eq!(mime_for_path("/a/logo.svg"), "image/svg+xml");
        assert_eq!(mime_for_path("/a/photo.JPG"), "image/jpeg");
        assert_eq!(mime_for_path("/favicon.ico"), "image/x-icon");
        assert_eq!(mime_for_path("/media/inter.woff2"), "font/woff2");
        assert_eq!(mime_for_path("/chunks/app.js"), "application/javascript");
        assert_eq!(mime_for_path("/css/app.css"), "text/css");
    }

    #[test]
    fn mime_falls_back_for_unknown() {
        assert_eq!(mime_for_path("/data/blob.bin"), FALLBACK_MIME);
        assert_eq!(mime_for_path("/LICENSE"), FALLBACK_MIME);
        assert_eq!(mime_for_path("/dir.d/LICENSE"), FALLBACK_MIME);
    }

    #[test]
    fn data_uri_format() {
        assert_eq!(
            to_data_uri(b"hello", "/a.css"),
            "data:text/css;base64,aGVsbG8="
        );
    }

    #[test]
    fn data_uri_handles_binary_payload() {
        assert_eq!(
            to_data_uri(&[0xff, 0x00, 0xfe], "/a.png"),
            "data:image/png;base64,/wD+"
        );
    }

    #[test]
    fn table_preserves_insertion_order() {
        let table = AssetTable::from_records(&[
            AssetRecord::new("/b.woff2", b"b".to_vec()),
            AssetRecord::new("/a.png", b"a".to_vec()),
        ]);
        let paths: Vec<&str> = table.iter().map(|e| e.logical_path.as_str()).collect();
        assert_eq!(paths, vec!["/b.woff2", "/a.png"]);
        assert_eq!(table.len(), 2);
        assert!(!table.is_empty());
    }

    #[test]
    fn match_order_is_longest_first_and_stable() {
        let table = AssetTable::from_records(&[
            AssetRecord::new("/x/a.js", b"1".to_vec()),
            AssetRecord::new("/x/longer/a.js", b"2".to_vec()),
            AssetRecord::new("/y/b.js", b"3".to_vec()),
        ]);
        let order: Vec<&str> = table
            .match_order()
            .into_iter()
            .map(|e| e.logical_path.as_str())
            .collect();
        assert_eq!(order, vec!["/x/longer/a.js", "/x/a.js", "/y/b.js"]);
    }

    #[test]
    fn duplicate_path_keeps_position_takes_last_payload() {
        let table = AssetTable::from_records(&[
            AssetRecord::new("/a.css", b"old".to_vec()),
            AssetRecord::new("/b.css", b"b".to_vec()),
            AssetRecord::new("/a.css", b"new".to_vec()),
        ]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("/a.css"), Some(to_data_uri(b"new", "/a.css").as_str()));
        assert_eq!(table.iter().next().unwrap().logical_path, "/a.css");
    }

    #[test]
    fn encoded_size_sums_uris() {
        let table = AssetTable::from_records(&[AssetRecord::new("/a.css", b"hello".to_vec())]);
        assert_eq!(table.encoded_size(), "data:text/css;base64,aGVsbG8=".len());
    }
}
