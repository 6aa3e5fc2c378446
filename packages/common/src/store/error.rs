use std::fmt;

/// Errors surfaced by a document store.
#[derive(Debug)]
pub enum StoreError {
    /// No document exists under the requested id.
    NotFound(String),
    /// An insert targeted an id that already holds a document.
    Conflict(String),
    /// The supplied fields could not be encoded as a document.
    InvalidDocument(String),
    /// Transient backend failure.
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(what) => write!(f, "document not found: {what}"),
            Self::Conflict(what) => write!(f, "document already exists: {what}"),
            Self::InvalidDocument(msg) => write!(f, "invalid document: {msg}"),
            Self::Unavailable(msg) => write!(f, "store unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors surfaced by a media store.
#[derive(Debug)]
pub enum MediaError {
    /// No object exists under the requested key.
    NotFound(String),
    /// The key is not a valid relative object path.
    InvalidKey(String),
    /// An I/O error occurred.
    Io(std::io::Error),
    /// The object exceeds the configured size limit.
    SizeLimitExceeded { actual: u64, limit: u64 },
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(key) => write!(f, "media object not found: {key}"),
            Self::InvalidKey(msg) => write!(f, "invalid media key: {msg}"),
            Self::Io(err) => write!(f, "media IO error: {err}"),
            Self::SizeLimitExceeded { actual, limit } => {
                write!(f, "media object exceeds size limit ({actual} > {limit} bytes)")
            }
        }
    }
}

impl std::error::Error for MediaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MediaError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
