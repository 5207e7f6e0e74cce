//! CLI error types.

use crate::config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// CLI errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The database file does not exist.
    ///
    /// This typically means no content has been added yet.
    #[error("database not found at {path}. Run 'picoblog tag add' or 'picoblog post add' first")]
    DatabaseNotFound { path: PathBuf },

    /// No post was found matching the given prefix.
    ///
    /// Drafts hidden from the viewer report this too.
    #[error("no post found matching '{prefix}'")]
    PostNotFound { prefix: String },

    /// Multiple posts match the given prefix.
    ///
    /// The user should provide a longer prefix to disambiguate.
    #[error("multiple posts match '{prefix}': {matches:?}")]
    AmbiguousPost {
        prefix: String,
        matches: Vec<String>,
    },

    #[error("no tag named '{name}'")]
    TagNotFound { name: String },

    #[error("no user named '{name}'")]
    UserNotFound { name: String },

    /// The viewer must sign in before the post can be shown or commented on.
    #[error("sign in required: {reason}")]
    SignInRequired { reason: String },

    /// The viewer is signed in but may not see the post.
    #[error("access denied: {reason}")]
    Forbidden { reason: String },

    #[error("comments are disabled on '{title}'")]
    CommentsDisabled { title: String },

    /// Configuration is invalid.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// The log subscriber could not be installed.
    #[error("failed to initialize logging: {0}")]
    Logging(String),

    /// An error occurred in the storage layer.
    #[error(transparent)]
    Storage(#[from] storage::Error),

    /// An error occurred in the policy layer.
    #[error(transparent)]
    Policy(#[from] policy::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
