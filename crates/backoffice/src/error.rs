use thiserror::Error;

/// The three error shapes the core distinguishes between. Not-found is
/// used by link validation to drop employee links; validation errors are
/// surfaced to the model as-is; transport errors count as action failures
/// but never abort the task.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("transport error: {0}")]
    Transport(String),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
