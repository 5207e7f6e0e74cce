//! Stored records: users, posts and comments.

use chrono::{DateTime, Utc};
use policy::{Gated, PostId, Tag, TagId};
use serde::Serialize;
use uuid::Uuid;

/// A unique identifier for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A principal known to the store. Credentials live elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub is_admin: bool,
}

/// A published or draft post with its tags resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub body: String,
    pub author: Option<String>,
    pub draft: bool,
    pub comments_enabled: bool,
    pub published_at: DateTime<Utc>,
    pub tags: Vec<Tag>,
}

impl Gated for Post {
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

/// A unique identifier for a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CommentId(pub Uuid);

impl CommentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CommentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CommentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A comment left on a post by a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub post: PostId,
    /// Name of the commenting user.
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// A post to be inserted.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub body: String,
    pub author: Option<String>,
    pub draft: bool,
    pub comments_enabled: bool,
    pub published_at: DateTime<Utc>,
    pub tags: Vec<TagId>,
}

impl NewPost {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: String::new(),
            author: None,
            draft: false,
            comments_enabled: true,
            published_at: Utc::now(),
            tags: Vec::new(),
        }
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn draft(mut self, draft: bool) -> Self {
        self.draft = draft;
        self
    }

    pub fn comments_enabled(mut self, enabled: bool) -> Self {
        self.comments_enabled = enabled;
        self
    }

    pub fn published_at(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = at;
        self
    }

    pub fn tag(mut self, tag: TagId) -> Self {
        self.tags.push(tag);
        self
    }
}
