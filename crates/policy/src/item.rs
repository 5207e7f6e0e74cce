//! Content items as the policy sees them.

use crate::Tag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Anything whose visibility is decided by tags and a draft flag.
///
/// The listing layer implements this for whatever it renders; the policy only
/// ever reads these three fields.
pub trait Gated {
    fn is_draft(&self) -> bool;

    /// Tags currently attached to the item, already resolved to their kinds.
    fn tags(&self) -> &[Tag];

    /// Recency key used for newest-first ordering.
    fn published_at(&self) -> DateTime<Utc>;
}

/// A unique identifier for a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostId(pub Uuid);

impl PostId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PostId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Minimal gated item carrying only what the policy reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    pub id: PostId,
    pub draft: bool,
    pub tags: Vec<Tag>,
    pub published_at: DateTime<Utc>,
}

impl ContentItem {
    pub fn new(published_at: DateTime<Utc>) -> Self {
        Self {
            id: PostId::new(),
            draft: false,
            tags: Vec::new(),
            published_at,
        }
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags.extend(tags);
        self
    }

    pub fn draft(mut self) -> Self {
        self.draft = true;
        self
    }
}

impl Gated for ContentItem {
    fn is_draft(&self) -> bool {
        self.draft
    }

    fn tags(&self) -> &[Tag] {
        &self.tags
    }

    fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }
}

impl<T: Gated + ?Sized> Gated for &T {
    fn is_draft(&self) -> bool {
        (**self).is_draft()
    }

    fn tags(&self) -> &[Tag] {
        (**self).tags()
    }

    fn published_at(&self) -> DateTime<Utc> {
        (**self).published_at()
    }
}
