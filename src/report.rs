//! Regenerates `report.txt` from the final index and offset directory,
//! standing in for the spec's external statistics reporter (spec.md §6,
//! SPEC_FULL.md §1 delivery shape).

use crate::error::Result;
use crate::models::{DocIdMap, OffsetDirectory, TOTAL_DOCS_KEY};
use std::fs;
use std::io::BufReader;
use std::path::Path;

/// The three counts the spec's `report.txt` contract requires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Report {
    pub num_documents: u64,
    pub num_unique_tokens: usize,
    pub total_index_size_kb: f64,
}

impl Report {
    /// Reads `doc_id_mapping.json`, `bookkeeping.json` and `final_index.json`
    /// under `index_dir` and computes the three report lines.
    pub fn compute(index_dir: &Path) -> Result<Self> {
        let doc_id_map_path = index_dir.join("doc_id_mapping.json");
        let doc_id_map: DocIdMap = if doc_id_map_path.exists() {
            serde_json::from_reader(BufReader::new(fs::File::open(&doc_id_map_path)?))?
        } else {
            DocIdMap::new()
        };

        let bookkeeping_path = index_dir.join("bookkeeping.json");
        let offsets: OffsetDirectory = if bookkeeping_path.exists() {
            serde_json::from_reader(BufReader::new(fs::File::open(&bookkeeping_path)?))?
        } else {
            OffsetDirectory::new()
        };
        let num_unique_tokens = offsets.len().saturating_sub(if offsets.contains_key(TOTAL_DOCS_KEY) {
            1
        } else {
            0
        });

        let final_index_path = index_dir.join("final_index.json");
        let total_index_size_kb = if final_index_path.exists() {
            fs::metadata(&final_index_path)?.len() as f64 / 1024.0
        } else {
            0.0
        };

        Ok(Report {
            num_documents: doc_id_map.len() as u64,
            num_unique_tokens,
            total_index_size_kb,
        })
    }

    /// Renders the three-line `report.txt` contract verbatim.
    pub fn render(&self) -> String {
        format!(
            "Number of Documents: {}\nNumber of Unique Tokens: {}\nTotal Index Size (KB): {:.2}\n",
            self.num_documents, self.num_unique_tokens, self.total_index_size_kb
        )
    }

    /// Writes `report.txt` into `index_dir`.
    pub fn write(&self, index_dir: &Path) -> Result<()> {
        fs::write(index_dir.join("report.txt"), self.render())?;
        Ok(())
    }
}
