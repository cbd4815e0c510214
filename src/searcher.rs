//! Resolves a query string against the final index and offset directory,
//! ranking candidate documents by cosine similarity (spec.md §4.4).

use crate::analyzer;
use crate::config::WebIndexConfig;
use crate::error::{IndexError, Result};
use crate::models::{DocIdMap, OffsetDirectory, ScoredPosting, TOTAL_DOCS_KEY};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Holds the two sidecar structures kept in memory for the life of the
/// searcher, plus a handle to the final index kept on disk (spec.md §4.4
/// startup: "Load the URL->id map and the offset directory into memory;
/// leave the final index on disk").
pub struct Searcher {
    config: WebIndexConfig,
    final_index_path: PathBuf,
    offsets: OffsetDirectory,
    total_docs: u64,
    url_by_doc_id: HashMap<u32, String>,
}

impl Searcher {
    /// Loads `bookkeeping.json` and `doc_id_mapping.json` from `index_dir`.
    /// Fatal (`MissingSidecar`) if either is absent, per spec.md §7.
    pub fn load(config: WebIndexConfig, index_dir: &Path) -> Result<Self> {
        let bookkeeping_path = index_dir.join("bookkeeping.json");
        let doc_id_map_path = index_dir.join("doc_id_mapping.json");

        if !bookkeeping_path.exists() {
            return Err(IndexError::MissingSidecar(bookkeeping_path));
        }
        if !doc_id_map_path.exists() {
            return Err(IndexError::MissingSidecar(doc_id_map_path));
        }

        let offsets: OffsetDirectory =
            serde_json::from_reader(BufReader::new(File::open(&bookkeeping_path)?))?;
        let doc_id_map: DocIdMap =
            serde_json::from_reader(BufReader::new(File::open(&doc_id_map_path)?))?;

        let total_docs = offsets.get(TOTAL_DOCS_KEY).copied().unwrap_or(0);
        let url_by_doc_id = doc_id_map.into_iter().map(|(url, id)| (id, url)).collect();

        Ok(Searcher {
            config,
            final_index_path: index_dir.join("final_index.json"),
            offsets,
            total_docs,
            url_by_doc_id,
        })
    }

    /// Reads one term's posting list from the final index via its recorded
    /// byte offset, truncated to the top `truncation_fraction` of the list
    /// (never truncated below `truncation_floor` entries). Absent terms
    /// yield an empty list (spec.md §4.4).
    pub fn postings_of(&self, term: &str) -> Result<Vec<ScoredPosting>> {
        let Some(&offset) = self.offsets.get(term) else {
            return Ok(Vec::new());
        };

        let mut file = File::open(&self.final_index_path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut reader = BufReader::new(file);
        let mut line = String::new();
        reader.read_line(&mut line)?;

        let trimmed = line.trim_end().trim_end_matches(',');
        let wrapped = format!("{{{trimmed}}}");
        let parsed: HashMap<String, Vec<ScoredPosting>> =
            serde_json::from_str(&wrapped).map_err(|_| {
                IndexError::IndexIntegrityError(format!(
                    "offset for term {term:?} at byte {offset} did not yield valid JSON"
                ))
            })?;

        let postings = parsed.get(term).cloned().ok_or_else(|| {
            IndexError::IndexIntegrityError(format!(
                "offset for term {term:?} pointed at a different term"
            ))
        })?;

        let cutoff = if postings.len() < self.config.truncation_floor {
            postings.len()
        } else {
            ((postings.len() as f64) * self.config.truncation_fraction).ceil() as usize
        };
        Ok(postings.into_iter().take(cutoff.max(1).min(postings.len())).collect())
    }

    /// Answers one query: tokenize, intersect, vectorize, rank, return up to
    /// `top_k` canonical URLs (spec.md §4.4). A query that stems to zero
    /// unigrams returns `[]` without touching the index.
    pub fn search(&self, query: &str) -> Result<Vec<String>> {
        let stream = match analyzer::tokenize(query, 1.0) {
            Ok(tokens) => tokens,
            Err(IndexError::LowEntropyContent { .. }) => Vec::new(),
            Err(other) => return Err(other),
        };

        let unigrams: Vec<&str> = stream
            .iter()
            .map(|(t, _)| t.as_str())
            .filter(|t| !t.contains('_'))
            .collect();
        if unigrams.is_empty() {
            return Ok(Vec::new());
        }

        let mut query_tf: HashMap<&str, f64> = HashMap::new();
        for term in &unigrams {
            *query_tf.entry(term).or_insert(0.0) += 1.0;
        }
        let query_terms: Vec<&str> = query_tf.keys().copied().collect();

        let mut cache: HashMap<&str, Vec<ScoredPosting>> = HashMap::new();
        for &term in &query_terms {
            let postings = self.postings_of(term)?;
            debug!(term, hits = postings.len(), "fetched posting list");
            cache.insert(term, postings);
        }

        // Conjunctive filter: intersect document-id sets across all query terms.
        let mut candidates: Option<std::collections::HashSet<u32>> = None;
        for &term in &query_terms {
            let doc_ids: std::collections::HashSet<u32> =
                cache[term].iter().map(|p| p.document_id).collect();
            candidates = Some(match candidates {
                None => doc_ids,
                Some(prev) => prev.intersection(&doc_ids).copied().collect(),
            });
        }
        let candidates = candidates.unwrap_or_default();
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        // Query vector: q_t = (1 + ln(qtf_t)) * ln((N+1)/(df_t+1)).
        let mut query_vector: Vec<f64> = Vec::with_capacity(query_terms.len());
        for &term in &query_terms {
            let qtf = query_tf[term];
            let df = cache[term].len() as f64;
            let idf = ((self.total_docs as f64 + 1.0) / (df + 1.0)).ln();
            query_vector.push((1.0 + qtf.ln()) * idf);
        }

        let mut doc_vectors: HashMap<u32, Vec<f64>> = HashMap::new();
        for &doc_id in &candidates {
            let mut vector = Vec::with_capacity(query_terms.len());
            for &term in &query_terms {
                let score = cache[term]
                    .iter()
                    .find(|p| p.document_id == doc_id)
                    .map(|p| p.tf_idf)
                    .unwrap_or(0.0);
                vector.push(score);
            }
            doc_vectors.insert(doc_id, vector);
        }

        let mut scored: Vec<(u32, f64)> = doc_vectors
            .into_iter()
            .map(|(doc_id, vector)| (doc_id, cosine_similarity(&query_vector, &vector)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));
        scored.truncate(self.config.top_k);

        Ok(scored
            .into_iter()
            .filter_map(|(doc_id, _)| {
                let url = self.url_by_doc_id.get(&doc_id).cloned();
                if url.is_none() {
                    warn!(doc_id, "ranked document has no entry in the url->id map");
                }
                url
            })
            .collect())
    }
}

/// Hand-written dot-product / norm cosine similarity; the vectors are short
/// (bounded by the number of distinct query terms), so no numeric library is
/// warranted (spec.md §9).
fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
