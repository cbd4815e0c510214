use std::path::PathBuf;

/// Errors recognized by the indexing and search core.
///
/// Per-document rejections (`DocumentOversize`, `InvalidUrl`, `HtmlParseFailed`,
/// `EmptyDocument`, `LowEntropyContent`, `NearDuplicate`, `CorpusRecordUnreadable`)
/// are expected outcomes: callers in [`crate::indexer`] catch and count them,
/// they never abort a build. `IndexIntegrityError` and `MissingSidecar` are
/// fatal to the caller that hits them.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("corpus record unreadable: {path}: {source}")]
    CorpusRecordUnreadable {
        path: PathBuf,
        #[source]
        source: CorpusRecordError,
    },

    #[error("document exceeds max file size ({size} bytes)")]
    DocumentOversize { size: u64 },

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("html parse failed")]
    HtmlParseFailed,

    #[error("document has no visible text after parsing")]
    EmptyDocument,

    #[error("field content rejected as low-entropy: {field}")]
    LowEntropyContent { field: &'static str },

    #[error("document is a near-duplicate of an earlier one (hamming distance {distance})")]
    NearDuplicate { distance: u32 },

    #[error("index integrity error: {0}")]
    IndexIntegrityError(String),

    #[error("missing sidecar file: {0}")]
    MissingSidecar(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Why a corpus record could not be read (wrapped inside `CorpusRecordUnreadable`).
#[derive(Debug, thiserror::Error)]
pub enum CorpusRecordError {
    #[error("file missing or unreadable: {0}")]
    Io(#[from] std::io::Error),

    #[error("not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IndexError>;
