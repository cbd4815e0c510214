//! Shared data types flowing between the analyzer, indexer, merger and
//! searcher: corpus records, postings, and the on-disk artifact shapes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Internal document identifier, assigned densely from 0 in first-seen order.
pub type DocumentId = u32;

/// One record from the corpus: `<root>/<domain>/<any>.json`.
///
/// Additional fields beyond `url` and `content` are accepted and ignored, per
/// the corpus layout contract.
#[derive(Debug, Clone, Deserialize)]
pub struct CorpusRecord {
    pub url: String,
    pub content: String,
}

/// A posting before merge: raw (weighted, normalized) term frequency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub document_id: DocumentId,
    pub tf: f64,
}

/// A posting after merge: raw term frequency plus the final TF-IDF score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredPosting {
    pub document_id: DocumentId,
    pub tf: f64,
    #[serde(rename = "tf-idf score")]
    pub tf_idf: f64,
}

/// In-memory partial index: term -> posting list. A `BTreeMap` keeps terms in
/// ascending lexicographic order so serialization satisfies the "keys sorted
/// lexicographically" contract on `partial_index_<k>.json` without a separate
/// sort pass.
pub type PartialIndex = BTreeMap<String, Vec<Posting>>;

/// Final index: term -> posting list, sorted by descending TF-IDF.
pub type FinalIndex = BTreeMap<String, Vec<ScoredPosting>>;

/// Offset directory ("bookkeeping"): term -> byte offset into the final
/// index file, plus the reserved `total_docs` key.
pub type OffsetDirectory = std::collections::HashMap<String, u64>;

/// Reserved key in the offset directory carrying the total document count.
pub const TOTAL_DOCS_KEY: &str = "total_docs";

/// URL -> document-id map, persisted as `doc_id_mapping.json`.
pub type DocIdMap = std::collections::HashMap<String, DocumentId>;
