//! Source-list loading and normalization.
//!
//! The input is a JSON list of source objects. Each object names one or more
//! URLs plus the extraction rules to apply to them; normalization flattens it
//! into one [`SourceDescriptor`] per (source, url) pair.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::warn;

use crate::types::IngestError;

/// A single fetchable source: one URL plus its extraction rules.
///
/// Immutable after normalization. Fields of the source object other than
/// `url`, `tags`, and `selectors` ride along untouched in `extra`.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceDescriptor {
    pub url: String,
    /// Tag names matched in document order (e.g. `p`, `article`).
    pub tags: Vec<String>,
    /// CSS selectors matched in document order.
    pub selectors: Vec<String>,
    /// Remaining source fields, carried through verbatim.
    pub extra: Map<String, Value>,
}

/// Reads and normalizes the source list at `path`.
///
/// Unreadable files, malformed JSON, and a non-list root are all fatal; a
/// source with a missing or invalid `url` field is skipped with a warning.
pub fn load_sources(path: impl AsRef<Path>) -> Result<Vec<SourceDescriptor>, IngestError> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)
        .map_err(|err| IngestError::SourceLoad(format!("{}: {err}", path.display())))?;
    let root: Value = serde_json::from_str(&data)
        .map_err(|err| IngestError::SourceLoad(format!("{}: {err}", path.display())))?;
    parse_sources(&root)
}

/// Normalizes an already-parsed source list.
///
/// A `url` field holding a list of strings expands into one descriptor per
/// element; every element of a list yields a descriptor, never a partial
/// expansion. Sources that are not objects, or whose `url` is neither a
/// string nor a list, are dropped with a warning and processing continues.
pub fn parse_sources(root: &Value) -> Result<Vec<SourceDescriptor>, IngestError> {
    let entries = root
        .as_array()
        .ok_or_else(|| IngestError::SourceLoad("JSON root must be a list of objects".to_string()))?;

    let mut descriptors = Vec::new();
    for entry in entries {
        let Some(source) = entry.as_object() else {
            warn!("skipping source that is not an object: {entry}");
            continue;
        };

        let urls: Vec<String> = match source.get("url") {
            Some(Value::String(url)) => vec![url.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(url) => Some(url.clone()),
                    other => {
                        warn!("skipping non-string url entry: {other}");
                        None
                    }
                })
                .collect(),
            Some(other) => {
                warn!("skipping source: 'url' must be a string or list, got {other}");
                continue;
            }
            None => {
                warn!("skipping source missing 'url' field: {entry}");
                continue;
            }
        };

        let tags = string_list(source.get("tags"));
        let selectors = string_list(source.get("selectors"));
        let extra: Map<String, Value> = source
            .iter()
            .filter(|(key, _)| !matches!(key.as_str(), "url" | "tags" | "selectors"))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        for url in urls {
            descriptors.push(SourceDescriptor {
                url,
                tags: tags.clone(),
                selectors: selectors.clone(),
                extra: extra.clone(),
            });
        }
    }

    Ok(descriptors)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_url_yields_one_descriptor() {
        let descriptors = parse_sources(&json!([
            {"url": "http://a.test", "tags": ["p"], "selectors": [".post"]}
        ]))
        .unwrap();

        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].url, "http://a.test");
        assert_eq!(descriptors[0].tags, vec!["p"]);
        assert_eq!(descriptors[0].selectors, vec![".post"]);
    }

    #[test]
    fn url_list_expands_with_fields_copied() {
        let descriptors = parse_sources(&json!([
            {"url": ["http://a.test", "http://b.test"], "tags": ["h1"], "label": "docs"}
        ]))
        .unwrap();

        assert_eq!(descriptors.len(), 2);
        for descriptor in &descriptors {
            assert_eq!(descriptor.tags, vec!["h1"]);
            assert_eq!(descriptor.extra.get("label"), Some(&json!("docs")));
        }
        assert_eq!(descriptors[0].url, "http://a.test");
        assert_eq!(descriptors[1].url, "http://b.test");
    }

    #[test]
    fn descriptor_count_matches_url_arity() {
        let descriptors = parse_sources(&json!([
            {"url": "http://one.test"},
            {"url": ["http://two.test", "http://three.test", "http://four.test"]},
            {"tags": ["p"]},
            {"url": 42}
        ]))
        .unwrap();

        // 1 + 3, the last two sources are dropped.
        assert_eq!(descriptors.len(), 4);
    }

    #[test]
    fn invalid_sources_do_not_abort_the_rest() {
        let descriptors = parse_sources(&json!([
            "not an object",
            {"url": "http://ok.test"}
        ]))
        .unwrap();

        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].url, "http://ok.test");
    }

    #[test]
    fn non_list_root_is_fatal() {
        let err = parse_sources(&json!({"url": "http://a.test"})).unwrap_err();
        assert!(matches!(err, IngestError::SourceLoad(_)));
    }
}
