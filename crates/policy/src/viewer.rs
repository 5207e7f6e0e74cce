//! The principal whose access is being evaluated.

use crate::TagId;
use std::collections::HashSet;

/// Who is looking.
///
/// Anonymous viewers hold no tags and are never admins. Admins carry no tag
/// set because it is never consulted for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    Admin,
    Authenticated { tags: HashSet<TagId> },
    Anonymous,
}

impl Viewer {
    /// An authenticated, non-admin viewer holding the given tags.
    pub fn with_tags(tags: impl IntoIterator<Item = TagId>) -> Self {
        Viewer::Authenticated {
            tags: tags.into_iter().collect(),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Viewer::Admin)
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Viewer::Anonymous)
    }

    /// Tags held by an authenticated non-admin viewer.
    pub fn held_tags(&self) -> Option<&HashSet<TagId>> {
        match self {
            Viewer::Authenticated { tags } => Some(tags),
            Viewer::Admin | Viewer::Anonymous => None,
        }
    }
}

impl std::fmt::Display for Viewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Viewer::Admin => f.write_str("admin"),
            Viewer::Authenticated { tags } => write!(f, "member ({} tags)", tags.len()),
            Viewer::Anonymous => f.write_str("anonymous"),
        }
    }
}
