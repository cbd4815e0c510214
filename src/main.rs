use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Command};
use webindex::config::WebIndexConfigFile;
use webindex::indexer::IndexBuilder;
use webindex::merger::Merger;
use webindex::report::Report;
use webindex::searcher::Searcher;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => WebIndexConfigFile::load(path)?.resolve(),
        None => WebIndexConfigFile::default().resolve(),
    };

    match cli.command {
        Command::BuildIndex { corpus_root } => {
            std::fs::create_dir_all(&cli.index_dir)
                .with_context(|| format!("creating index directory {}", cli.index_dir.display()))?;
            let mut builder = IndexBuilder::new(config, &cli.index_dir);
            builder.build(&corpus_root).context("indexing corpus")?;
            let stats = builder.stats();
            tracing::info!(?stats, "indexing complete");

            Merger::new(config, &cli.index_dir).merge().context("merging partial indexes")?;
            let report = Report::compute(&cli.index_dir)?;
            report.write(&cli.index_dir)?;
            println!("{}", report.render());
        }
        Command::Search { query } => {
            let searcher = Searcher::load(config, &cli.index_dir).context("loading index")?;
            let urls = searcher.search(&query).context("evaluating query")?;
            if urls.is_empty() {
                println!("No results found.");
            } else {
                for url in urls {
                    println!("{url}");
                }
            }
        }
        Command::Report => {
            let report = Report::compute(&cli.index_dir).context("computing report")?;
            report.write(&cli.index_dir)?;
            print!("{}", report.render());
        }
    }

    Ok(())
}
