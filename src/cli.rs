use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "webindex")]
#[command(author, version, about = "Disk-backed inverted index and TF-IDF search engine for web corpora", long_about = None)]
pub struct Cli {
    /// Directory holding index artifacts (partial indexes, final index, bookkeeping, doc map)
    #[arg(long = "index-dir", global = true, default_value = "index_out")]
    pub index_dir: PathBuf,

    /// Optional TOML config file overriding the built-in tunable defaults
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a partial-index-then-merge index from a corpus directory
    BuildIndex {
        /// Root of the `<root>/<domain>/<record>.json` corpus layout
        #[arg(value_name = "CORPUS_ROOT")]
        corpus_root: PathBuf,
    },
    /// Answer a single query against an already-built index
    Search {
        /// Query string
        #[arg(value_name = "QUERY")]
        query: String,
    },
    /// Recompute `report.txt` from an already-built index
    Report,
}
