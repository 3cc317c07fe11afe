//! Client error types for the Fedora client

/// Error type for datastream and repository operations
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("can't change values on older versions: {dsid} is pinned to {as_of}")]
    ReadOnly { dsid: String, as_of: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("malformed location '{location}': {reason}")]
    MalformedLocation { location: String, reason: String },

    #[error("unknown datastream attribute: {0}")]
    UnknownAttribute(String),

    #[error("attribute '{0}' is read-only")]
    ReadOnlyAttribute(&'static str),

    #[error("datastream {0} is not attached to a repository")]
    Detached(String),

    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("request failed with status {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl ClientError {
    /// The repository has no such resource (yet)
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_))
    }

    /// Mutation attempted on a version-pinned datastream
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            ClientError::ReadOnly { .. } | ClientError::ReadOnlyAttribute(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
