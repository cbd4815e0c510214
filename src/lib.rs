//! # webindex
//!
//! A disk-backed inverted index and TF-IDF search engine for a corpus of web
//! pages delivered as one record per file (URL + raw HTML body).
//!
//! Four components, leaves first:
//!
//! - [`analyzer`] turns a raw document into a weighted, stemmed token stream
//!   and a SimHash duplicate-detection fingerprint.
//! - [`indexer`] walks a corpus directory, applies the URL filter, and spills
//!   a memory-bounded partial index to disk.
//! - [`merger`] externally sorts and k-way merges the partial indexes into a
//!   single final index plus a term -> byte-offset directory.
//! - [`searcher`] resolves a query against the merged index and ranks
//!   candidates by cosine similarity over TF-IDF vectors.
//!
//! ## Example
//!
//! ```no_run
//! use webindex::config::WebIndexConfig;
//! use webindex::indexer::IndexBuilder;
//! use webindex::merger::Merger;
//! use webindex::searcher::Searcher;
//! use std::path::Path;
//!
//! let config = WebIndexConfig::default();
//! let mut builder = IndexBuilder::new(config, "index_out");
//! builder.build(Path::new("corpus")).unwrap();
//! Merger::new(config, "index_out").merge().unwrap();
//!
//! let searcher = Searcher::load(config, Path::new("index_out")).unwrap();
//! let urls = searcher.search("machine learning").unwrap();
//! ```

pub mod analyzer;
pub mod config;
pub mod error;
pub mod indexer;
pub mod merger;
pub mod models;
pub mod report;
pub mod searcher;
pub mod urlfilter;

pub use config::WebIndexConfig;
pub use error::{IndexError, Result};
