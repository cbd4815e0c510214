//! Walks the corpus, applies the URL filter, calls the analyzer, accumulates
//! an in-memory partial index, and spills it to disk when the document
//! threshold is crossed (spec.md §4.2).

use crate::analyzer::{self, hamming_distance};
use crate::config::WebIndexConfig;
use crate::error::{CorpusRecordError, IndexError, Result};
use crate::models::{CorpusRecord, DocIdMap, DocumentId, PartialIndex, Posting};
use crate::urlfilter;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Per-run rejection counts, surfaced for diagnostics and tests. Every field
/// counts an expected, non-fatal per-document rejection (spec.md §7); none
/// of them abort the build.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IndexerStats {
    pub documents_accepted: usize,
    pub documents_oversize: usize,
    pub records_unreadable: usize,
    pub urls_rejected: usize,
    pub documents_empty: usize,
    pub documents_html_parse_failed: usize,
    pub documents_low_entropy: usize,
    pub documents_near_duplicate: usize,
}

/// Owns the in-memory partial index, the document-id allocation, and the
/// fingerprint set for the duration of a build. An explicit value instead of
/// process-global mutable state (spec.md §9).
pub struct IndexBuilder {
    config: WebIndexConfig,
    output_dir: PathBuf,
    partial: PartialIndex,
    docs_since_flush: usize,
    next_flush_index: usize,
    doc_ids: DocIdMap,
    next_doc_id: DocumentId,
    fingerprints: Vec<u64>,
    stats: IndexerStats,
}

impl IndexBuilder {
    pub fn new(config: WebIndexConfig, output_dir: impl Into<PathBuf>) -> Self {
        IndexBuilder {
            config,
            output_dir: output_dir.into(),
            partial: PartialIndex::new(),
            docs_since_flush: 0,
            next_flush_index: 0,
            doc_ids: DocIdMap::new(),
            next_doc_id: 0,
            fingerprints: Vec::new(),
            stats: IndexerStats::default(),
        }
    }

    pub fn stats(&self) -> IndexerStats {
        self.stats
    }

    /// Walks `<corpus_root>/<domain>/<record>.json`, indexing every
    /// acceptable document, flushing partial indexes every `MAX_DOCS`
    /// accepted documents, then flushing the remainder and the URL->id map.
    pub fn build(&mut self, corpus_root: &Path) -> Result<()> {
        fs::create_dir_all(self.output_dir.join("partial_indexes"))?;

        for domain_entry in sorted_dir_entries(corpus_root)? {
            if !domain_entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            for record_entry in sorted_dir_entries(&domain_entry.path())? {
                if !record_entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                    continue;
                }
                self.index_one(&record_entry.path());
            }
        }

        if !self.partial.is_empty() {
            self.flush()?;
        }

        self.write_doc_id_map()?;
        info!(
            accepted = self.stats.documents_accepted,
            rejected_oversize = self.stats.documents_oversize,
            rejected_unreadable = self.stats.records_unreadable,
            rejected_url = self.stats.urls_rejected,
            rejected_empty = self.stats.documents_empty,
            rejected_html_parse_failed = self.stats.documents_html_parse_failed,
            rejected_low_entropy = self.stats.documents_low_entropy,
            rejected_duplicate = self.stats.documents_near_duplicate,
            "build complete"
        );
        Ok(())
    }

    fn index_one(&mut self, path: &Path) {
        match self.try_index_one(path) {
            Ok(()) => {}
            Err(IndexError::DocumentOversize { size }) => {
                self.stats.documents_oversize += 1;
                debug!(?path, size, "skipped: oversize");
            }
            Err(IndexError::CorpusRecordUnreadable { .. }) => {
                self.stats.records_unreadable += 1;
                debug!(?path, "skipped: unreadable record");
            }
            Err(IndexError::InvalidUrl(reason)) => {
                self.stats.urls_rejected += 1;
                debug!(?path, reason, "skipped: url rejected");
            }
            Err(IndexError::EmptyDocument) => {
                self.stats.documents_empty += 1;
                debug!(?path, "skipped: empty document");
            }
            Err(IndexError::HtmlParseFailed) => {
                self.stats.documents_html_parse_failed += 1;
                debug!(?path, "skipped: not HTML");
            }
            Err(IndexError::LowEntropyContent { .. }) => {
                self.stats.documents_low_entropy += 1;
                debug!(?path, "skipped: low-entropy content");
            }
            Err(IndexError::NearDuplicate { distance }) => {
                self.stats.documents_near_duplicate += 1;
                debug!(?path, distance, "skipped: near-duplicate");
            }
            Err(other) => {
                warn!(?path, error = %other, "skipped: unexpected error");
            }
        }
    }

    fn try_index_one(&mut self, path: &Path) -> Result<()> {
        let metadata = fs::metadata(path)?;
        if metadata.len() > self.config.max_file_size_bytes {
            return Err(IndexError::DocumentOversize { size: metadata.len() });
        }

        let raw = fs::read_to_string(path).map_err(CorpusRecordError::Io).map_err(|source| {
            IndexError::CorpusRecordUnreadable { path: path.to_path_buf(), source }
        })?;
        let record: CorpusRecord = serde_json::from_str(&raw).map_err(CorpusRecordError::Json).map_err(|source| {
            IndexError::CorpusRecordUnreadable { path: path.to_path_buf(), source }
        })?;

        let url = urlfilter::canonicalize(&record.url)
            .ok_or_else(|| IndexError::InvalidUrl(record.url.clone()))?;
        if urlfilter::is_blocked(&url) {
            return Err(IndexError::InvalidUrl("blocked by url filter".to_string()));
        }

        let stream = analyzer::analyze(&record.content)?;
        if stream.is_empty() {
            return Err(IndexError::LowEntropyContent { field: "all" });
        }

        let fingerprint = analyzer::fingerprint(&stream);
        if let Some(distance) = self.nearest_fingerprint_distance(fingerprint) {
            if distance <= self.config.hamming_distance {
                return Err(IndexError::NearDuplicate { distance });
            }
        }
        self.fingerprints.push(fingerprint);

        let term_freqs = analyzer::term_frequencies(&stream);

        let canonical = url.as_str().to_string();
        let document_id = *self.doc_ids.entry(canonical).or_insert_with(|| {
            let id = self.next_doc_id;
            self.next_doc_id += 1;
            id
        });

        for (term, tf) in term_freqs {
            self.partial.entry(term).or_default().push(Posting { document_id, tf });
        }

        self.stats.documents_accepted += 1;
        self.docs_since_flush += 1;
        if self.docs_since_flush >= self.config.max_docs {
            self.flush()?;
        }
        Ok(())
    }

    fn nearest_fingerprint_distance(&self, fingerprint: u64) -> Option<u32> {
        self.fingerprints
            .iter()
            .map(|&existing| hamming_distance(existing, fingerprint))
            .min()
    }

    fn flush(&mut self) -> Result<()> {
        let path = self
            .output_dir
            .join("partial_indexes")
            .join(format!("partial_index_{}.json", self.next_flush_index));
        let file = fs::File::create(&path)?;
        serde_json::to_writer(std::io::BufWriter::new(file), &self.partial)?;
        debug!(?path, terms = self.partial.len(), "flushed partial index");

        self.partial.clear();
        self.docs_since_flush = 0;
        self.next_flush_index += 1;
        Ok(())
    }

    fn write_doc_id_map(&self) -> Result<()> {
        let path = self.output_dir.join("doc_id_mapping.json");
        let mut file = std::io::BufWriter::new(fs::File::create(&path)?);
        serde_json::to_writer(&mut file, &self.doc_ids)?;
        file.flush()?;
        Ok(())
    }
}

fn sorted_dir_entries(dir: &Path) -> Result<Vec<fs::DirEntry>> {
    let mut entries: Vec<fs::DirEntry> = fs::read_dir(dir)?.collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|e| e.file_name());
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_record(dir: &Path, domain: &str, name: &str, url: &str, content: &str) {
        let domain_dir = dir.join(domain);
        fs::create_dir_all(&domain_dir).unwrap();
        let body = serde_json::json!({ "url": url, "content": content });
        fs::write(domain_dir.join(name), serde_json::to_string(&body).unwrap()).unwrap();
    }

    #[test]
    fn indexes_two_documents_and_flushes_remainder() {
        let corpus = tempdir().unwrap();
        let out = tempdir().unwrap();
        write_record(
            corpus.path(),
            "example.com",
            "a.json",
            "https://example.com/a",
            "<html><head><title>Machine Learning</title></head><body><p>intro text here</p></body></html>",
        );
        write_record(
            corpus.path(),
            "example.com",
            "b.json",
            "https://example.com/b",
            "<html><body><p>machine learning course content today</p></body></html>",
        );

        let mut config = WebIndexConfig::default();
        config.hamming_distance = 0;
        let mut builder = IndexBuilder::new(config, out.path());
        builder.build(corpus.path()).unwrap();

        assert_eq!(builder.stats().documents_accepted, 2);
        assert_eq!(builder.doc_ids.len(), 2);
        assert!(out.path().join("doc_id_mapping.json").exists());
        assert!(out.path().join("partial_indexes").join("partial_index_0.json").exists());
    }

    #[test]
    fn rejects_blocked_extension() {
        let corpus = tempdir().unwrap();
        let out = tempdir().unwrap();
        write_record(
            corpus.path(),
            "example.com",
            "a.json",
            "https://example.com/file.pdf",
            "<html><body><p>hello world this is text</p></body></html>",
        );

        let mut builder = IndexBuilder::new(WebIndexConfig::default(), out.path());
        builder.build(corpus.path()).unwrap();
        assert_eq!(builder.stats().documents_accepted, 0);
        assert_eq!(builder.stats().urls_rejected, 1);
    }

    #[test]
    fn rejects_content_with_no_markup_as_parse_failure() {
        let corpus = tempdir().unwrap();
        let out = tempdir().unwrap();
        write_record(
            corpus.path(),
            "example.com",
            "a.json",
            "https://example.com/a",
            "just plain text, no tags anywhere in this payload at all",
        );

        let mut builder = IndexBuilder::new(WebIndexConfig::default(), out.path());
        builder.build(corpus.path()).unwrap();
        assert_eq!(builder.stats().documents_accepted, 0);
        assert_eq!(builder.stats().documents_html_parse_failed, 1);
    }

    #[test]
    fn near_duplicate_is_suppressed() {
        let corpus = tempdir().unwrap();
        let out = tempdir().unwrap();
        let body = "<html><body><p>the quick brown fox jumps over the lazy dog today</p></body></html>";
        write_record(corpus.path(), "example.com", "a.json", "https://example.com/a", body);
        write_record(corpus.path(), "example.com", "b.json", "https://example.com/b", body);

        let mut builder = IndexBuilder::new(WebIndexConfig::default(), out.path());
        builder.build(corpus.path()).unwrap();
        assert_eq!(builder.stats().documents_accepted, 1);
        assert_eq!(builder.stats().documents_near_duplicate, 1);
    }

    #[test]
    fn flushes_exactly_at_max_docs_threshold() {
        let corpus = tempdir().unwrap();
        let out = tempdir().unwrap();
        for i in 0..5 {
            write_record(
                corpus.path(),
                "example.com",
                &format!("{i}.json"),
                &format!("https://example.com/page-{i}"),
                &format!("<html><body><p>unique content number {i} about topic {i}</p></body></html>"),
            );
        }

        let mut config = WebIndexConfig::default();
        config.max_docs = 2;
        let mut builder = IndexBuilder::new(config, out.path());
        builder.build(corpus.path()).unwrap();

        assert_eq!(builder.stats().documents_accepted, 5);
        // 5 docs at max_docs=2: flushes after doc 2 and doc 4, remainder (1 doc) flushed at the end.
        let partials = fs::read_dir(out.path().join("partial_indexes")).unwrap().count();
        assert_eq!(partials, 3);
    }
}
