use thiserror::Error;

/// Failures while reading a persisted mind-map document.
///
/// Geometry degeneracies and exhausted searches are not errors anywhere in
/// this crate; they fall back to guarded defaults. Only malformed input from
/// outside the process surfaces here.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read document: {0}")]
    Io(#[from] std::io::Error),

    #[error("document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("node id {0:?} is not an integer")]
    InvalidNodeId(String),
}
