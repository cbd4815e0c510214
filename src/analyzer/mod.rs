//! Turns a raw HTML document into a weighted, stemmed token stream, a
//! duplicate-detection fingerprint, and normalized term frequencies
//! (spec.md §4.1).

mod simhash;
mod synonyms;

use crate::error::{IndexError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::collections::{HashMap, HashSet};

pub use simhash::hamming_distance;

/// One (stemmed term, weight) pair emitted by [`analyze`].
pub type WeightedToken = (String, f64);

const WEIGHT_ANCHOR: f64 = 5.0;
const WEIGHT_TITLE: f64 = 5.0;
const WEIGHT_HEADER: f64 = 3.0;
const WEIGHT_BOLD: f64 = 2.0;
const WEIGHT_OTHER: f64 = 1.0;

const BIGRAM_FACTOR: f64 = 1.25;
const TRIGRAM_FACTOR: f64 = 1.5;

static WORD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9]+").expect("static token regex is valid"));

fn stemmer() -> &'static Stemmer {
    use std::sync::OnceLock;
    static STEMMER: OnceLock<Stemmer> = OnceLock::new();
    STEMMER.get_or_init(|| Stemmer::create(Algorithm::English))
}

/// Tokenizes one field's text at a given field weight, producing unigram,
/// bigram and trigram (term, weight) pairs. Returns `Ok(vec![])` for empty
/// input, and `Err(LowEntropyContent)` when the field looks like repetitive
/// boilerplate (spec.md §4.1 step 4).
pub fn tokenize(text: &str, weight: f64) -> Result<Vec<WeightedToken>> {
    let raw_tokens: Vec<String> = WORD_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .map(|t| synonyms::apply(&t))
        .filter(|t| !(t.len() <= 2 || (t.chars().all(|c| c.is_ascii_digit()) && t.len() > 5)))
        .collect();

    if raw_tokens.is_empty() {
        return Ok(Vec::new());
    }

    let unique: HashSet<&str> = raw_tokens.iter().map(|t| t.as_str()).collect();
    let entropy = unique.len() as f64 / raw_tokens.len() as f64;
    if entropy < 0.05 {
        return Err(IndexError::LowEntropyContent {
            field: field_name_for_weight(weight),
        });
    }

    let stems: Vec<String> = raw_tokens.iter().map(|t| stemmer().stem(t).into_owned()).collect();

    let mut out: Vec<WeightedToken> = Vec::with_capacity(stems.len() * 2);
    for stem in &stems {
        out.push((stem.clone(), weight));
    }
    for pair in stems.windows(2) {
        let term = format!("{}_{}", pair[0], pair[1]);
        let w = ((weight + weight) / 2.0) * BIGRAM_FACTOR;
        out.push((term, w));
    }
    for triple in stems.windows(3) {
        let term = format!("{}_{}_{}", triple[0], triple[1], triple[2]);
        // Preserved as specified: divides the sum of three weights by 2, not 3.
        let w = ((weight + weight + weight) / 2.0) * TRIGRAM_FACTOR;
        out.push((term, w));
    }

    Ok(out)
}

fn field_name_for_weight(weight: f64) -> &'static str {
    if weight == WEIGHT_ANCHOR || weight == WEIGHT_TITLE {
        "anchor_or_title"
    } else if weight == WEIGHT_HEADER {
        "header"
    } else if weight == WEIGHT_BOLD {
        "bold"
    } else {
        "other"
    }
}

static FIELD_SELECTORS: Lazy<(Selector, Selector, Selector, Selector)> = Lazy::new(|| {
    (
        Selector::parse("a[href]").unwrap(),
        Selector::parse("title").unwrap(),
        Selector::parse("h1, h2, h3").unwrap(),
        Selector::parse("b, strong").unwrap(),
    )
});

fn element_text(el: ElementRef) -> String {
    el.text().collect::<Vec<_>>().join(" ")
}

/// Collects whole-document visible text, independent of field weighting —
/// used to detect a document with no visible text at all.
fn whole_document_text(doc: &Html) -> String {
    let mut out = String::new();
    for node in doc.tree.root().descendants() {
        if let Node::Text(text) = node.value() {
            out.push_str(text);
            out.push(' ');
        }
    }
    out
}

/// Collects text from all text nodes that are not descendants of any of the
/// already-extracted field elements, forming the disjoint "other" field.
fn other_field_text(doc: &Html, excluded: &HashSet<ego_tree::NodeId>) -> String {
    let mut out = String::new();
    for node in doc.tree.root().descendants() {
        if let Node::Text(text) = node.value() {
            let under_excluded = node.ancestors().any(|a| excluded.contains(&a.id()));
            if !under_excluded {
                out.push_str(text);
                out.push(' ');
            }
        }
    }
    out
}

fn excluded_ids<'a>(doc: &'a Html, selector: &Selector) -> impl Iterator<Item = ego_tree::NodeId> + 'a {
    doc.select(selector).map(|e| e.id())
}

/// Parses `html_bytes` and extracts a weighted token stream across the four
/// disjoint field classes plus "everything else" (spec.md §4.1). `scraper`'s
/// HTML5 parser never fails outright (it repairs malformed markup rather
/// than rejecting it), so `HtmlParseFailed` is reserved for input that isn't
/// markup at all — no `<` anywhere — which the parser would otherwise treat
/// as one giant text node. Fails with `EmptyDocument` if the document parses
/// but has no visible text at all. A field whose text is rejected as
/// low-entropy simply contributes no tokens; it does not abort the whole
/// document.
pub fn analyze(html_bytes: &str) -> Result<Vec<WeightedToken>> {
    if !html_bytes.contains('<') {
        return Err(IndexError::HtmlParseFailed);
    }

    let doc = Html::parse_document(html_bytes);

    if whole_document_text(&doc).trim().is_empty() {
        return Err(IndexError::EmptyDocument);
    }

    let (anchor_sel, title_sel, header_sel, bold_sel) = &*FIELD_SELECTORS;

    let mut excluded: HashSet<ego_tree::NodeId> = HashSet::new();
    excluded.extend(excluded_ids(&doc, anchor_sel));
    excluded.extend(excluded_ids(&doc, title_sel));
    excluded.extend(excluded_ids(&doc, header_sel));
    excluded.extend(excluded_ids(&doc, bold_sel));

    let anchor_text = doc
        .select(anchor_sel)
        .map(element_text)
        .collect::<Vec<_>>()
        .join(" ");
    let title_text = doc
        .select(title_sel)
        .map(element_text)
        .collect::<Vec<_>>()
        .join(" ");
    let header_text = doc
        .select(header_sel)
        .map(element_text)
        .collect::<Vec<_>>()
        .join(" ");
    let bold_text = doc
        .select(bold_sel)
        .map(element_text)
        .collect::<Vec<_>>()
        .join(" ");
    let other_text = other_field_text(&doc, &excluded);

    let fields: [(&str, f64); 5] = [
        (anchor_text.as_str(), WEIGHT_ANCHOR),
        (title_text.as_str(), WEIGHT_TITLE),
        (header_text.as_str(), WEIGHT_HEADER),
        (bold_text.as_str(), WEIGHT_BOLD),
        (other_text.as_str(), WEIGHT_OTHER),
    ];

    let mut stream = Vec::new();
    for (text, weight) in fields {
        match tokenize(text, weight) {
            Ok(tokens) => stream.extend(tokens),
            Err(IndexError::LowEntropyContent { .. }) => continue,
            Err(other) => return Err(other),
        }
    }

    Ok(stream)
}

/// Computes a 64-bit SimHash fingerprint over the unweighted multiset of
/// unigram stems in `stream` (n-grams, which carry an underscore, are
/// excluded).
pub fn fingerprint(stream: &[WeightedToken]) -> u64 {
    simhash::fingerprint(
        stream
            .iter()
            .filter(|(term, _)| !term.contains('_'))
            .map(|(term, _)| term.as_str()),
    )
}

/// Sums weights per term, then normalizes to `[0, 100]` by dividing by the
/// maximum summed weight, rounded to 3 decimals. Empty input yields an empty
/// mapping.
pub fn term_frequencies(stream: &[WeightedToken]) -> HashMap<String, f64> {
    let mut sums: HashMap<String, f64> = HashMap::new();
    for (term, weight) in stream {
        *sums.entry(term.clone()).or_insert(0.0) += weight;
    }

    let max = sums.values().cloned().fold(0.0_f64, f64::max);
    if max <= 0.0 {
        return HashMap::new();
    }

    for value in sums.values_mut() {
        *value = round3((*value / max) * 100.0);
    }
    sums
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}
