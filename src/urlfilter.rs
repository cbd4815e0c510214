//! URL canonicalization and the closed-set blocklist filter (spec.md §6).

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Extensions rejected when they appear as the final path/query suffix,
/// case-insensitively. Closed set, matches spec.md §6 verbatim.
const BLOCKED_EXTENSIONS: &[&str] = &[
    "css", "js", "bmp", "gif", "jpg", "jpeg", "ico", "img", "png", "tif", "tiff", "mid", "mp2",
    "mp3", "mp4", "wav", "avi", "mov", "mpeg", "ram", "m4v", "mkv", "ogg", "ogv", "pdf", "ps",
    "eps", "tex", "ppt", "pptx", "doc", "docx", "xls", "xlsx", "names", "data", "dat", "exe",
    "bz2", "tar", "msi", "bin", "7z", "psd", "dmg", "iso", "epub", "dll", "cnf", "tgz", "sha1",
    "thmx", "mso", "arff", "rtf", "jar", "csv", "rm", "smil", "wmv", "swf", "wma", "zip", "rar",
    "gz", "war", "apk", "mpg", "bam", "emx", "bib", "shar", "lif", "ppsx", "wvx", "odc", "pps",
    "xml", "fig", "dtd", "sql", "java", "cp", "sh", "svg", "conf", "ipynb", "json", "scm", "ff",
    "py", "log", "model", "cc", "sas", "tsv", "map", "ds_store",
];

static EXTENSION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let alternation = BLOCKED_EXTENSIONS.join("|");
    Regex::new(&format!(r"(?i)\.({alternation})$")).expect("static blocklist regex is valid")
});

/// Low-value personal/staging path patterns, case-insensitive.
static LOW_VALUE_PATH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(~wjohnson|~babaks|~jacobson|bibtex|~stasio|~kay|~seal).*\.txt$")
        .expect("static low-value-path regex is valid")
});

/// Returns true if the URL's path or query matches the closed blocklist, the
/// low-value personal-path patterns, or contains `raw-attachment` /
/// `public_data`.
pub fn is_blocked(url: &Url) -> bool {
    let path = url.path();
    let query = url.query().unwrap_or("");
    let path_and_query = format!("{path}?{query}");

    if EXTENSION_PATTERN.is_match(path) || EXTENSION_PATTERN.is_match(query) {
        return true;
    }
    if LOW_VALUE_PATH_PATTERN.is_match(path) {
        return true;
    }
    let lower = path_and_query.to_lowercase();
    lower.contains("raw-attachment") || lower.contains("public_data")
}

/// Canonicalizes a URL: keeps scheme, host, path, query; drops the fragment.
pub fn canonicalize(raw_url: &str) -> Option<Url> {
    let mut url = Url::parse(raw_url).ok()?;
    url.set_fragment(None);
    Some(url)
}
