/// Result alias that carries the custom [`BlobVizError`] type.
pub type Result<T> = std::result::Result<T, BlobVizError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum BlobVizError {
    /// Free-form failure, mostly raised by collaborators that have no
    /// richer error of their own.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Configuration or material pack that failed to parse.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    /// The material manager has no entry for the requested id.
    #[error("material not found: `{0}`")]
    MaterialNotFound(String),
    /// A non-immediate material change arrived while the transition cap
    /// was already reached.
    #[error("transition limit reached ({active}/{limit} active)")]
    TransitionLimit { active: usize, limit: usize },
    /// A required collaborator was absent at initialisation time.
    #[error("missing required collaborator: {0}")]
    MissingCollaborator(&'static str),
    /// The component was used before `initialize` succeeded.
    #[error("component has not been initialised")]
    NotInitialized,
    /// Failure raised by one subsystem stage during a frame update.
    #[error("{context} stage failed: {message}")]
    Subsystem {
        context: &'static str,
        message: String,
    },
}

impl BlobVizError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// Whether this error rejected a request without mutating any state.
    pub fn is_rejected_request(&self) -> bool {
        matches!(
            self,
            Self::MaterialNotFound(_) | Self::TransitionLimit { .. }
        )
    }
}

impl From<&str> for BlobVizError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for BlobVizError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
