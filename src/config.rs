//! Tunables for the indexing and search pipeline.
//!
//! Mirrors the teacher's layered config pattern: every field is optional so a
//! partially-specified TOML file can be merged over built-in defaults, and a
//! handful of fields are further overridable by environment variables (useful
//! for CI runs that want a tiny `MAX_DOCS` without writing a config file).

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Resolved tunables, always fully populated (defaults filled in).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WebIndexConfig {
    /// Flush the partial index to disk after this many accepted documents.
    pub max_docs: usize,
    /// Two fingerprints within this many bits are the same document.
    pub hamming_distance: u32,
    /// Corpus records larger than this are skipped before parsing.
    pub max_file_size_bytes: u64,
    /// Terms per chunk during the merger's chunked sort phase.
    pub chunk_size: usize,
    /// Number of ranked results `search` returns.
    pub top_k: usize,
    /// Fraction of a posting list kept at read time (floor of 100 entries).
    pub truncation_fraction: f64,
    /// Posting lists shorter than this are never truncated.
    pub truncation_floor: usize,
}

impl Default for WebIndexConfig {
    fn default() -> Self {
        WebIndexConfig {
            max_docs: 10_000,
            hamming_distance: 4,
            max_file_size_bytes: 1000 * 1024,
            chunk_size: 10_000,
            top_k: 5,
            truncation_fraction: 0.25,
            truncation_floor: 100,
        }
    }
}

/// On-disk / partially-specified form of [`WebIndexConfig`], as loaded from a
/// TOML file. Every field is optional so a config file only needs to mention
/// the tunables it wants to override.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebIndexConfigFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_docs: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hamming_distance: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_file_size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncation_fraction: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncation_floor: Option<usize>,
}

impl WebIndexConfigFile {
    /// Loads a config file if it exists; returns defaults (all `None`) otherwise.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Merges this file's overrides onto the built-in defaults, then applies
    /// environment variable overrides (`WEBINDEX_MAX_DOCS`,
    /// `WEBINDEX_HAMMING_DISTANCE`, `WEBINDEX_MAX_FILE_SIZE_BYTES`,
    /// `WEBINDEX_CHUNK_SIZE`, `WEBINDEX_TOP_K`).
    pub fn resolve(&self) -> WebIndexConfig {
        let defaults = WebIndexConfig::default();
        let mut resolved = WebIndexConfig {
            max_docs: self.max_docs.unwrap_or(defaults.max_docs),
            hamming_distance: self.hamming_distance.unwrap_or(defaults.hamming_distance),
            max_file_size_bytes: self
                .max_file_size_bytes
                .unwrap_or(defaults.max_file_size_bytes),
            chunk_size: self.chunk_size.unwrap_or(defaults.chunk_size),
            top_k: self.top_k.unwrap_or(defaults.top_k),
            truncation_fraction: self
                .truncation_fraction
                .unwrap_or(defaults.truncation_fraction),
            truncation_floor: self.truncation_floor.unwrap_or(defaults.truncation_floor),
        };

        if let Some(v) = env_usize("WEBINDEX_MAX_DOCS") {
            resolved.max_docs = v;
        }
        if let Some(v) = env_u32("WEBINDEX_HAMMING_DISTANCE") {
            resolved.hamming_distance = v;
        }
        if let Some(v) = env_u64("WEBINDEX_MAX_FILE_SIZE_BYTES") {
            resolved.max_file_size_bytes = v;
        }
        if let Some(v) = env_usize("WEBINDEX_CHUNK_SIZE") {
            resolved.chunk_size = v;
        }
        if let Some(v) = env_usize("WEBINDEX_TOP_K") {
            resolved.top_k = v;
        }

        resolved
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok()?.parse().ok()
}

fn env_u32(key: &str) -> Option<u32> {
    std::env::var(key).ok()?.parse().ok()
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok()?.parse().ok()
}
