#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Comment text cannot be empty")]
    EmptyComment,

    #[error("Post {0} is not in the feed")]
    UnknownPost(String),

    /// The server answered with `success: false` or an error status.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl SyncError {
    /// Text suitable for a user-facing notification.
    pub fn user_message(&self) -> String {
        match self {
            SyncError::Network(_) => "Network error, please try again".to_string(),
            other => other.to_string(),
        }
    }

    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, SyncError::Rejected { status: 401, .. })
    }
}
