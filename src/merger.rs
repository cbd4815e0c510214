//! Externally sorts each spilled partial index in chunks, k-way merges them
//! by term into one final index file, computes smoothed TF-IDF per posting,
//! and emits a term->byte-offset directory (spec.md §4.3).

use crate::config::WebIndexConfig;
use crate::error::Result;
use crate::models::{
    DocIdMap, FinalIndex, OffsetDirectory, PartialIndex, Posting, ScoredPosting, TOTAL_DOCS_KEY,
};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Seek, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct Merger {
    config: WebIndexConfig,
    output_dir: PathBuf,
}

impl Merger {
    pub fn new(config: WebIndexConfig, output_dir: impl Into<PathBuf>) -> Self {
        Merger { config, output_dir: output_dir.into() }
    }

    /// Runs all three merge phases, writing `final_index.json` and
    /// `bookkeeping.json`, and deleting the intermediate chunk files.
    /// Partial index files are left in place for debugging, per spec.md §4.3.
    pub fn merge(&self) -> Result<()> {
        let doc_id_map_path = self.output_dir.join("doc_id_mapping.json");
        let doc_id_map: DocIdMap = if doc_id_map_path.exists() {
            serde_json::from_reader(BufReader::new(fs::File::open(&doc_id_map_path)?))?
        } else {
            DocIdMap::new()
        };
        let total_docs = doc_id_map.len() as u64;

        let partial_files = self.partial_index_files()?;

        let doc_freqs = self.accumulate_document_frequencies(&partial_files)?;
        info!(terms = doc_freqs.len(), total_docs, "phase A complete: document frequencies accumulated");

        let mut chunk_files = Vec::new();
        for file in &partial_files {
            chunk_files.extend(self.chunk_sort_and_save(file)?);
        }
        info!(chunks = chunk_files.len(), "phase B complete: chunked sort written");

        let bookkeeping = self.k_way_merge(&chunk_files, &doc_freqs, total_docs)?;
        info!(terms = bookkeeping.len() - 1, "phase C complete: final index merged");

        let bookkeeping_path = self.output_dir.join("bookkeeping.json");
        serde_json::to_writer_pretty(
            BufWriter::new(fs::File::create(&bookkeeping_path)?),
            &bookkeeping,
        )?;

        for chunk_file in &chunk_files {
            let _ = fs::remove_file(chunk_file);
        }

        Ok(())
    }

    fn partial_index_files(&self) -> Result<Vec<PathBuf>> {
        let dir = self.output_dir.join("partial_indexes");
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut files: Vec<PathBuf> = fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with("partial_index_") && n.ends_with(".json"))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();
        Ok(files)
    }

    /// Phase A: streams every partial index once, counting postings per term
    /// (`df_t`) without holding every posting list in memory simultaneously.
    fn accumulate_document_frequencies(&self, files: &[PathBuf]) -> Result<HashMap<String, usize>> {
        let mut doc_freqs: HashMap<String, usize> = HashMap::new();
        for file in files {
            let index: PartialIndex = serde_json::from_reader(BufReader::new(fs::File::open(file)?))?;
            for (term, postings) in index {
                *doc_freqs.entry(term).or_insert(0) += postings.len();
            }
        }
        Ok(doc_freqs)
    }

    /// Phase B: loads one partial index, splits it into chunks of
    /// `chunk_size` terms, sorts each chunk independently, and writes it as a
    /// JSON-lines file (one `{"term": [postings]}` object per line).
    fn chunk_sort_and_save(&self, file: &Path) -> Result<Vec<PathBuf>> {
        let index: PartialIndex = serde_json::from_reader(BufReader::new(fs::File::open(file)?))?;
        let terms: Vec<(String, Vec<Posting>)> = index.into_iter().collect();

        let mut chunk_paths = Vec::new();
        for (i, chunk) in terms.chunks(self.config.chunk_size).enumerate() {
            let mut sorted_chunk = chunk.to_vec();
            sorted_chunk.sort_by(|a, b| a.0.cmp(&b.0));

            let chunk_path = file.with_file_name(format!(
                "{}_chunk_{}.jsonl",
                file.file_stem().and_then(|s| s.to_str()).unwrap_or("partial"),
                i
            ));
            let mut writer = BufWriter::new(fs::File::create(&chunk_path)?);
            for (term, postings) in &sorted_chunk {
                let mut line_obj = serde_json::Map::new();
                line_obj.insert(term.clone(), serde_json::to_value(postings)?);
                serde_json::to_writer(&mut writer, &serde_json::Value::Object(line_obj))?;
                writer.write_all(b"\n")?;
            }
            chunk_paths.push(chunk_path);
        }
        debug!(?file, chunks = chunk_paths.len(), "chunk-sorted partial index");
        Ok(chunk_paths)
    }

    /// Phase C: k-way streaming merge of all chunk files by ascending term,
    /// via a min-heap keyed on each stream's next term. Accumulates postings
    /// for the currently open term group, computes smoothed IDF and
    /// TF-IDF once the term boundary closes, and writes `final_index.json`
    /// while recording each term's byte offset.
    fn k_way_merge(
        &self,
        chunk_files: &[PathBuf],
        doc_freqs: &HashMap<String, usize>,
        total_docs: u64,
    ) -> Result<OffsetDirectory> {
        let mut bookkeeping = OffsetDirectory::new();
        bookkeeping.insert(TOTAL_DOCS_KEY.to_string(), total_docs);

        let final_index_path = self.output_dir.join("final_index.json");
        let mut out = BufWriter::new(fs::File::create(&final_index_path)?);
        out.write_all(b"{\n")?;

        let mut streams: Vec<ChunkStream> =
            chunk_files.iter().map(|p| ChunkStream::open(p)).collect::<Result<_>>()?;

        let mut heap: BinaryHeap<Reverse<(String, usize)>> = BinaryHeap::new();
        for (idx, stream) in streams.iter().enumerate() {
            if let Some((term, _)) = &stream.peeked {
                heap.push(Reverse((term.clone(), idx)));
            }
        }

        let mut first_entry = true;
        let mut pending: Option<(String, Vec<Posting>)> = None;

        while let Some(Reverse((term, idx))) = heap.pop() {
            let (_, postings) = streams[idx].peeked.take().expect("heap entry implies a peeked value");

            match &mut pending {
                Some((pending_term, pending_postings)) if *pending_term == term => {
                    pending_postings.extend(postings);
                }
                _ => {
                    if let Some((done_term, done_postings)) = pending.take() {
                        self.write_term_group(
                            &mut out,
                            &mut bookkeeping,
                            &mut first_entry,
                            &done_term,
                            done_postings,
                            doc_freqs,
                            total_docs,
                        )?;
                    }
                    pending = Some((term.clone(), postings));
                }
            }

            streams[idx].advance()?;
            if let Some((next_term, _)) = &streams[idx].peeked {
                heap.push(Reverse((next_term.clone(), idx)));
            }
        }

        if let Some((done_term, done_postings)) = pending.take() {
            self.write_term_group(
                &mut out,
                &mut bookkeeping,
                &mut first_entry,
                &done_term,
                done_postings,
                doc_freqs,
                total_docs,
            )?;
        }

        out.write_all(b"\n}")?;
        out.flush()?;
        Ok(bookkeeping)
    }

    #[allow(clippy::too_many_arguments)]
    fn write_term_group(
        &self,
        out: &mut BufWriter<fs::File>,
        bookkeeping: &mut OffsetDirectory,
        first_entry: &mut bool,
        term: &str,
        postings: Vec<Posting>,
        doc_freqs: &HashMap<String, usize>,
        total_docs: u64,
    ) -> Result<()> {
        if !*first_entry {
            out.write_all(b",\n")?;
        }
        *first_entry = false;

        let offset = out.stream_position()?;
        bookkeeping.insert(term.to_string(), offset);

        let df_t = *doc_freqs.get(term).unwrap_or(&0) as f64;
        // Smoothed IDF uniformly for every term, resolving the Open Question
        // in spec.md §9 in favor of the deterministic variant.
        let idf = ((total_docs as f64 + 1.0) / (df_t + 1.0)).ln() + 1.0;

        let mut scored: Vec<ScoredPosting> = postings
            .into_iter()
            .map(|p| ScoredPosting { document_id: p.document_id, tf: p.tf, tf_idf: round2(p.tf * idf) })
            .collect();
        // tf-idf descending; ties broken by document_id ascending for determinism.
        scored.sort_by(|a, b| {
            b.tf_idf
                .partial_cmp(&a.tf_idf)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.document_id.cmp(&b.document_id))
        });

        out.write_all(format!("\"{term}\": ").as_bytes())?;
        serde_json::to_writer(&mut *out, &scored)?;
        Ok(())
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// A lazy, single-pass, non-restartable sequence of `(term, postings)` over
/// one JSON-lines chunk file, with one entry peeked ahead for the merge heap.
struct ChunkStream {
    lines: std::io::Lines<BufReader<fs::File>>,
    peeked: Option<(String, Vec<Posting>)>,
}

impl ChunkStream {
    fn open(path: &Path) -> Result<Self> {
        let lines = BufReader::new(fs::File::open(path)?).lines();
        let mut stream = ChunkStream { lines, peeked: None };
        stream.advance()?;
        Ok(stream)
    }

    fn advance(&mut self) -> Result<()> {
        self.peeked = match self.lines.next() {
            Some(line) => {
                let line = line?;
                let mut map: HashMap<String, Vec<Posting>> = serde_json::from_str(&line)?;
                let term = map
                    .keys()
                    .next()
                    .cloned()
                    .expect("chunk line has exactly one key");
                let postings = map.remove(&term).unwrap();
                Some((term, postings))
            }
            None => None,
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PartialIndex;
    use std::fs;
    use tempfile::tempdir;

    fn write_partial(dir: &Path, idx: usize, entries: &[(&str, Vec<Posting>)]) {
        let path = dir.join("partial_indexes").join(format!("partial_index_{idx}.json"));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut index = PartialIndex::new();
        for (term, postings) in entries {
            index.insert(term.to_string(), postings.clone());
        }
        fs::write(&path, serde_json::to_string(&index).unwrap()).unwrap();
    }

    fn write_doc_map(dir: &Path, n: usize) {
        let mut map = DocIdMap::new();
        for i in 0..n {
            map.insert(format!("https://example.com/{i}"), i as u32);
        }
        fs::write(dir.join("doc_id_mapping.json"), serde_json::to_string(&map).unwrap()).unwrap();
    }

    #[test]
    fn merges_two_partial_indexes_and_records_valid_offsets() {
        let out = tempdir().unwrap();
        write_doc_map(out.path(), 3);
        write_partial(
            out.path(),
            0,
            &[
                ("alpha", vec![Posting { document_id: 0, tf: 10.0 }]),
                ("beta", vec![Posting { document_id: 0, tf: 5.0 }]),
            ],
        );
        write_partial(
            out.path(),
            1,
            &[("alpha", vec![Posting { document_id: 1, tf: 20.0 }])],
        );

        let merger = Merger::new(WebIndexConfig::default(), out.path());
        merger.merge().unwrap();

        let bookkeeping: OffsetDirectory =
            serde_json::from_reader(fs::File::open(out.path().join("bookkeeping.json")).unwrap()).unwrap();
        assert_eq!(bookkeeping[TOTAL_DOCS_KEY], 3);
        assert!(bookkeeping.contains_key("alpha"));
        assert!(bookkeeping.contains_key("beta"));

        let mut index_file = fs::File::open(out.path().join("final_index.json")).unwrap();
        for (term, &offset) in &bookkeeping {
            if term == TOTAL_DOCS_KEY {
                continue;
            }
            use std::io::{BufRead, Seek, SeekFrom};
            index_file.seek(SeekFrom::Start(offset)).unwrap();
            let mut reader = BufReader::new(&index_file);
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let trimmed = line.trim_end().trim_end_matches(',');
            let wrapped = format!("{{{trimmed}}}");
            let parsed: HashMap<String, Vec<ScoredPosting>> = serde_json::from_str(&wrapped).unwrap();
            assert!(parsed.contains_key(term));
        }

        // alpha has df=2 postings merged from both partial indexes.
        let alpha_offset = bookkeeping["alpha"];
        let mut index_file = fs::File::open(out.path().join("final_index.json")).unwrap();
        use std::io::{Seek, SeekFrom};
        index_file.seek(SeekFrom::Start(alpha_offset)).unwrap();
        let mut reader = BufReader::new(&index_file);
        let mut line = String::new();
        use std::io::BufRead;
        reader.read_line(&mut line).unwrap();
        let trimmed = line.trim_end().trim_end_matches(',');
        let wrapped = format!("{{{trimmed}}}");
        let parsed: HashMap<String, Vec<ScoredPosting>> = serde_json::from_str(&wrapped).unwrap();
        assert_eq!(parsed["alpha"].len(), 2);
    }

    #[test]
    fn empty_corpus_yields_empty_final_index() {
        let out = tempdir().unwrap();
        write_doc_map(out.path(), 0);
        fs::create_dir_all(out.path().join("partial_indexes")).unwrap();

        let merger = Merger::new(WebIndexConfig::default(), out.path());
        merger.merge().unwrap();

        let bookkeeping: OffsetDirectory =
            serde_json::from_reader(fs::File::open(out.path().join("bookkeeping.json")).unwrap()).unwrap();
        assert_eq!(bookkeeping.len(), 1);
        assert_eq!(bookkeeping[TOTAL_DOCS_KEY], 0);

        let content = fs::read_to_string(out.path().join("final_index.json")).unwrap();
        assert_eq!(content, "{\n\n}");
    }

    #[test]
    fn tf_idf_formula_is_smoothed_and_rounded() {
        let out = tempdir().unwrap();
        write_doc_map(out.path(), 1);
        write_partial(out.path(), 0, &[("alpha", vec![Posting { document_id: 0, tf: 4.0 }])]);

        let merger = Merger::new(WebIndexConfig::default(), out.path());
        merger.merge().unwrap();

        let bookkeeping: OffsetDirectory =
            serde_json::from_reader(fs::File::open(out.path().join("bookkeeping.json")).unwrap()).unwrap();
        let offset = bookkeeping["alpha"];

        let mut index_file = fs::File::open(out.path().join("final_index.json")).unwrap();
        use std::io::{BufRead, Seek, SeekFrom};
        index_file.seek(SeekFrom::Start(offset)).unwrap();
        let mut reader = BufReader::new(&index_file);
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        let trimmed = line.trim_end().trim_end_matches(',');
        let wrapped = format!("{{{trimmed}}}");
        let parsed: HashMap<String, Vec<ScoredPosting>> = serde_json::from_str(&wrapped).unwrap();

        let idf = ((1.0_f64 + 1.0) / (1.0 + 1.0)).ln() + 1.0;
        let expected = round2(4.0 * idf);
        assert_eq!(parsed["alpha"][0].tf_idf, expected);
    }
}
