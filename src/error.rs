//! Error types for the message board
//!
//! Provides a unified error type for all operations. Variants are grouped by
//! the four failure classes the service distinguishes: malformed messages,
//! domain rejections, transport failures and storage failures.

use std::io;

use thiserror::Error;

/// Result type alias using BoardError
pub type Result<T> = std::result::Result<T, BoardError>;

/// Unified error type for message board operations
#[derive(Debug, Error)]
pub enum BoardError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors (fatal to the current exchange)
    // -------------------------------------------------------------------------
    #[error("Malformed message: {0}")]
    Malformed(String),

    // -------------------------------------------------------------------------
    // Transport Errors (fatal to the connection)
    // -------------------------------------------------------------------------
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timed out waiting for peer")]
    Timeout,

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    // -------------------------------------------------------------------------
    // Domain Rejections (reported as a status token)
    // -------------------------------------------------------------------------
    #[error("User already registered")]
    Duplicate,

    #[error("Unknown user")]
    UnknownUser,

    #[error("Wrong password")]
    WrongPassword,

    #[error("User is not logged in")]
    NotLoggedIn,

    #[error("Unknown group")]
    UnknownGroup,

    #[error("Group name does not match")]
    GroupNameMismatch,

    #[error("Group name already in use")]
    GroupNameTaken,

    #[error("Maximum number of groups reached")]
    StoreFull,

    #[error("Group message limit reached")]
    MessageLimit,

    #[error("User is not subscribed to the group")]
    NotSubscribed,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BoardError {
    /// Build a Malformed error from anything printable
    pub fn malformed(reason: impl Into<String>) -> Self {
        BoardError::Malformed(reason.into())
    }

    /// True for business-rule failures that are reported to the peer as a
    /// status token rather than tearing down the exchange
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            BoardError::Duplicate
                | BoardError::UnknownUser
                | BoardError::WrongPassword
                | BoardError::NotLoggedIn
                | BoardError::UnknownGroup
                | BoardError::GroupNameMismatch
                | BoardError::GroupNameTaken
                | BoardError::StoreFull
                | BoardError::MessageLimit
                | BoardError::NotSubscribed
        )
    }

    /// True when the error is a socket read/write timeout
    pub fn is_timeout(&self) -> bool {
        match self {
            BoardError::Timeout => true,
            BoardError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    /// True when the peer went away (EOF, reset, abort, broken pipe)
    pub fn is_disconnect(&self) -> bool {
        match self {
            BoardError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}
