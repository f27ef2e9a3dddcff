use thiserror::Error;

/// Failures of the tracker operations.
///
/// Every variant reaches HTTP clients as a 400 with a short string; the
/// `Display` form is what ends up in the logs.
#[derive(Debug, Error)]
pub enum Error {
    #[error("missing required field '{0}'")]
    Validation(&'static str),

    #[error("{0} not found")]
    NotFound(String),

    #[error("password does not match for '{0}'")]
    Unauthorized(String),

    #[error("store failure: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("password task did not finish: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// The human-readable string sent back over the wire when a handler has
    /// no more specific wording for the failure.
    pub fn wire_message(&self) -> &'static str {
        match self {
            Error::Validation(_) => "incorrect form submission",
            Error::NotFound(_) => "not found",
            Error::Unauthorized(_) => "wrong cridentials",
            Error::Store(_) | Error::Hash(_) | Error::Task(_) => "unable to complete request",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Returns the value of a required request field, treating an empty string
/// the same as an absent one.
pub fn require<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::Validation(field)),
    }
}
