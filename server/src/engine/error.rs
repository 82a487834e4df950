use thiserror::Error;

/// Errors surfaced to the session that triggered them. One session's failure
/// never affects another session's state or in-flight operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    /// Invalid input (empty username, over-long message, bad room name).
    /// Rejected before any side effect takes place.
    #[error("{0}")]
    Validation(String),

    /// An action requiring room membership was attempted by a session that
    /// never joined a room, already left it, or is closed.
    #[error("not joined to a room")]
    NotJoined,
}

impl ChatError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
