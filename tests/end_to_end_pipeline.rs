use std::fs;
use std::path::Path;

use tempfile::tempdir;
use webindex::config::WebIndexConfig;
use webindex::indexer::IndexBuilder;
use webindex::merger::Merger;
use webindex::report::Report;
use webindex::searcher::Searcher;

fn write_record(dir: &Path, domain: &str, name: &str, url: &str, content: &str) {
    let domain_dir = dir.join(domain);
    fs::create_dir_all(&domain_dir).unwrap();
    let body = serde_json::json!({ "url": url, "content": content });
    fs::write(domain_dir.join(name), serde_json::to_string(&body).unwrap()).unwrap();
}

fn build(corpus: &Path, out: &Path, config: WebIndexConfig) {
    let mut builder = IndexBuilder::new(config, out);
    builder.build(corpus).unwrap();
    Merger::new(config, out).merge().unwrap();
}

#[test]
fn scenario_title_weight_outranks_body_text() {
    let corpus = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_record(
        corpus.path(),
        "a.edu",
        "a.json",
        "https://a.edu/ml",
        "<html><head><title>Machine Learning</title></head><body><p>intro page</p></body></html>",
    );
    write_record(
        corpus.path(),
        "b.edu",
        "b.json",
        "https://b.edu/ml",
        "<html><body><p>machine learning course</p></body></html>",
    );

    let mut config = WebIndexConfig::default();
    config.hamming_distance = 0;
    build(corpus.path(), out.path(), config);

    let searcher = Searcher::load(config, out.path()).unwrap();
    let results = searcher.search("machine learning").unwrap();
    assert_eq!(results, vec!["https://a.edu/ml".to_string(), "https://b.edu/ml".to_string()]);
}

#[test]
fn scenario_near_duplicate_documents_are_suppressed() {
    let corpus = tempdir().unwrap();
    let out = tempdir().unwrap();
    let body = "<html><body><p>the annual report covers revenue growth and expenses</p></body></html>";
    write_record(corpus.path(), "a.edu", "1.json", "https://a.edu/r1", body);
    write_record(corpus.path(), "a.edu", "2.json", "https://a.edu/r2", body);
    write_record(corpus.path(), "a.edu", "3.json", "https://a.edu/r3", body);

    build(corpus.path(), out.path(), WebIndexConfig::default());

    let searcher = Searcher::load(WebIndexConfig::default(), out.path()).unwrap();
    let results = searcher.search("revenue growth").unwrap();
    assert_eq!(results, vec!["https://a.edu/r1".to_string()]);
}

#[test]
fn scenario_blocked_extension_never_reaches_the_index() {
    let corpus = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_record(
        corpus.path(),
        "a.edu",
        "doc.json",
        "https://a.edu/files/report.pdf",
        "<html><body><p>confidential financial statement contents</p></body></html>",
    );

    build(corpus.path(), out.path(), WebIndexConfig::default());

    let searcher = Searcher::load(WebIndexConfig::default(), out.path()).unwrap();
    assert!(searcher.search("financial statement").unwrap().is_empty());
}

#[test]
fn scenario_unknown_term_returns_empty() {
    let corpus = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_record(
        corpus.path(),
        "a.edu",
        "doc.json",
        "https://a.edu/home",
        "<html><body><p>welcome to the department homepage</p></body></html>",
    );

    build(corpus.path(), out.path(), WebIndexConfig::default());

    let searcher = Searcher::load(WebIndexConfig::default(), out.path()).unwrap();
    assert!(searcher.search("zxqvbn").unwrap().is_empty());
}

#[test]
fn scenario_conjunctive_intersection_with_absent_term_is_empty() {
    let corpus = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_record(
        corpus.path(),
        "a.edu",
        "1.json",
        "https://a.edu/one",
        "<html><body><p>alpha appears in this document about topics</p></body></html>",
    );
    write_record(
        corpus.path(),
        "a.edu",
        "2.json",
        "https://a.edu/two",
        "<html><body><p>alpha shows up again in another document here</p></body></html>",
    );

    build(corpus.path(), out.path(), WebIndexConfig::default());

    let searcher = Searcher::load(WebIndexConfig::default(), out.path()).unwrap();
    // "beta" never occurs anywhere in the corpus, so the conjunctive filter collapses.
    assert!(searcher.search("alpha beta").unwrap().is_empty());
}

#[test]
fn empty_corpus_produces_empty_artifacts_and_zeroed_report() {
    let corpus = tempdir().unwrap();
    let out = tempdir().unwrap();
    fs::create_dir_all(corpus.path()).unwrap();

    build(corpus.path(), out.path(), WebIndexConfig::default());

    let report = Report::compute(out.path()).unwrap();
    assert_eq!(report.num_documents, 0);
    assert_eq!(report.num_unique_tokens, 0);

    let searcher = Searcher::load(WebIndexConfig::default(), out.path()).unwrap();
    assert!(searcher.search("anything").unwrap().is_empty());
}

#[test]
fn offset_directory_entries_round_trip_to_single_key_json() {
    let corpus = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_record(
        corpus.path(),
        "a.edu",
        "1.json",
        "https://a.edu/one",
        "<html><body><p>galaxies stars planets orbit distant suns</p></body></html>",
    );
    write_record(
        corpus.path(),
        "a.edu",
        "2.json",
        "https://a.edu/two",
        "<html><body><p>oceans tides currents move beneath the moon</p></body></html>",
    );

    build(corpus.path(), out.path(), WebIndexConfig::default());

    let bookkeeping: webindex::models::OffsetDirectory = serde_json::from_reader(
        std::io::BufReader::new(fs::File::open(out.path().join("bookkeeping.json")).unwrap()),
    )
    .unwrap();

    let mut index_file = fs::File::open(out.path().join("final_index.json")).unwrap();
    use std::io::{BufRead, Seek, SeekFrom};
    for (term, &offset) in &bookkeeping {
        if term == webindex::models::TOTAL_DOCS_KEY {
            continue;
        }
        index_file.seek(SeekFrom::Start(offset)).unwrap();
        let mut reader = std::io::BufReader::new(&index_file);
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        let trimmed = line.trim_end().trim_end_matches(',');
        let wrapped = format!("{{{trimmed}}}");
        let parsed: serde_json::Value = serde_json::from_str(&wrapped).unwrap();
        let obj = parsed.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert!(obj.contains_key(term));
    }
}
