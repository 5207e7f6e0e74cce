//! Policy error types.
//!
//! Access decisions themselves never fail. These errors come from validating
//! tag names and kinds at the edges of the crate.

use thiserror::Error;

/// Policy errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A tag name failed validation.
    #[error("invalid tag name: {0}")]
    InvalidTagName(String),

    /// A tag kind could not be parsed.
    #[error("invalid tag: {0}")]
    InvalidTag(String),
}

pub type Result<T> = std::result::Result<T, Error>;
