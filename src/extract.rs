//! Rule-driven text extraction from fetched pages.
//!
//! Tag rules run first, then selector rules, all accumulating into one list
//! in document order; the whole-page fallback fires only when no rule
//! produced anything. Empty text never yields a block.

use scraper::{ElementRef, Html, Selector};

use crate::sources::SourceDescriptor;
use crate::types::{ExtractMethod, IngestError};

/// One non-empty text block pulled out of a page.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractedBlock {
    pub text: String,
    pub method: ExtractMethod,
    pub pattern: String,
}

/// Applies the descriptor's rules to a fetched page.
///
/// An unparseable tag or selector rule fails the whole page with an
/// [`IngestError::Extract`]; the caller treats that as zero blocks for the
/// page without affecting other tasks.
pub fn extract_blocks(
    raw: &str,
    descriptor: &SourceDescriptor,
) -> Result<Vec<ExtractedBlock>, IngestError> {
    let document = Html::parse_document(raw);
    let mut blocks = Vec::new();

    for tag in &descriptor.tags {
        let selector = parse_rule(tag, &descriptor.url)?;
        for element in document.select(&selector) {
            push_non_empty(&mut blocks, visible_text(element), ExtractMethod::Tag, tag);
        }
    }

    for pattern in &descriptor.selectors {
        let selector = parse_rule(pattern, &descriptor.url)?;
        for element in document.select(&selector) {
            push_non_empty(
                &mut blocks,
                visible_text(element),
                ExtractMethod::Selector,
                pattern,
            );
        }
    }

    if blocks.is_empty() {
        let text = body_text(&document);
        if !text.is_empty() {
            blocks.push(ExtractedBlock {
                text,
                method: ExtractMethod::Fallback,
                pattern: "body".to_string(),
            });
        }
    }

    Ok(blocks)
}

fn parse_rule(rule: &str, url: &str) -> Result<Selector, IngestError> {
    Selector::parse(rule).map_err(|err| IngestError::Extract {
        url: url.to_string(),
        message: format!("invalid rule '{rule}': {err}"),
    })
}

fn push_non_empty(
    blocks: &mut Vec<ExtractedBlock>,
    text: String,
    method: ExtractMethod,
    pattern: &str,
) {
    if !text.is_empty() {
        blocks.push(ExtractedBlock {
            text,
            method,
            pattern: pattern.to_string(),
        });
    }
}

/// Whitespace-collapsed visible text of one element.
fn visible_text(element: ElementRef<'_>) -> String {
    normalize_whitespace(element.text())
}

/// Visible text of the document body, or of the whole document if there is
/// no body element.
fn body_text(document: &Html) -> String {
    if let Ok(selector) = Selector::parse("body") {
        if let Some(body) = document.select(&selector).next() {
            return visible_text(body);
        }
    }
    normalize_whitespace(document.root_element().text())
}

fn normalize_whitespace<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for word in parts.into_iter().flat_map(str::split_whitespace) {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn descriptor(tags: &[&str], selectors: &[&str]) -> SourceDescriptor {
        SourceDescriptor {
            url: "http://page.test/".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            selectors: selectors.iter().map(|s| s.to_string()).collect(),
            extra: Map::new(),
        }
    }

    #[test]
    fn tag_rule_collects_blocks_in_document_order() {
        let html = "<html><body><p>Hello</p><div>skip</div><p>World</p></body></html>";
        let blocks = extract_blocks(html, &descriptor(&["p"], &[])).unwrap();

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "Hello");
        assert_eq!(blocks[1].text, "World");
        for block in &blocks {
            assert_eq!(block.method, ExtractMethod::Tag);
            assert_eq!(block.pattern, "p");
        }
    }

    #[test]
    fn selector_rules_accumulate_after_tag_rules() {
        let html = r#"<html><body>
            <h2>Title</h2>
            <div class="note">First note</div>
            <div class="note">Second note</div>
        </body></html>"#;
        let blocks = extract_blocks(html, &descriptor(&["h2"], &["div.note"])).unwrap();

        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].method, ExtractMethod::Tag);
        assert_eq!(blocks[0].text, "Title");
        assert_eq!(blocks[1].method, ExtractMethod::Selector);
        assert_eq!(blocks[1].pattern, "div.note");
        assert_eq!(blocks[2].text, "Second note");
    }

    #[test]
    fn fallback_fires_only_when_rules_miss() {
        let html = "<html><body><span>Body text here</span></body></html>";

        let missed = extract_blocks(html, &descriptor(&["p"], &[])).unwrap();
        assert_eq!(missed.len(), 1);
        assert_eq!(missed[0].method, ExtractMethod::Fallback);
        assert_eq!(missed[0].pattern, "body");
        assert_eq!(missed[0].text, "Body text here");

        let matched = extract_blocks(html, &descriptor(&["span"], &[])).unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].method, ExtractMethod::Tag);
    }

    #[test]
    fn empty_page_yields_zero_blocks() {
        let html = "<html><body>   \n\t  </body></html>";
        let blocks = extract_blocks(html, &descriptor(&["p"], &[])).unwrap();
        assert!(blocks.is_empty());
    }

    #[test]
    fn empty_rule_matches_are_discarded() {
        let html = "<html><body><p></p><p>kept</p></body></html>";
        let blocks = extract_blocks(html, &descriptor(&["p"], &[])).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "kept");
    }

    #[test]
    fn nested_markup_is_whitespace_collapsed() {
        let html = "<html><body><p>  Hello \n <b>big</b>\t world </p></body></html>";
        let blocks = extract_blocks(html, &descriptor(&["p"], &[])).unwrap();
        assert_eq!(blocks[0].text, "Hello big world");
    }

    #[test]
    fn invalid_selector_fails_the_page() {
        let html = "<html><body><p>text</p></body></html>";
        let err = extract_blocks(html, &descriptor(&[], &["[unclosed"])).unwrap_err();
        assert!(matches!(err, IngestError::Extract { .. }));
    }
}
