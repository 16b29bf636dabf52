use thiserror::Error;

/// Bad user input. Recovered locally, no write is ever attempted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("monthly amount must be a positive number, got {0:?}")]
    InvalidAmount(String),

    #[error("a submission is already in flight")]
    SubmissionPending,

    #[error("a pledge was already submitted in this session")]
    AlreadySubmitted,
}

/// The persistence adapter failed or refused to persist a write.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WriteError {
    #[error("backend offline")]
    Offline,

    #[error("write rejected: {0}")]
    Rejected(String),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Loading or subscribing failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("backend offline")]
    Offline,

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt data: {0}")]
    Corrupt(String),

    #[error("backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Write(#[from] WriteError),
}
