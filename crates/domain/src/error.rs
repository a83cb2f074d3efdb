use thiserror::Error;

/// Crate-wide error type for failures that cross the domain boundary
/// (serialization and the like). Component-specific failures — parse
/// failures, action errors, invoker errors — live in their own crates as
/// their own `thiserror` enums; this type is deliberately small.
#[derive(Debug, Error)]
pub enum Error {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Other(String),
}
