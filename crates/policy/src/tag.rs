//! Tag taxonomy.
//!
//! Tags come in two kinds. A viewer needs *every* master tag on an item but
//! only *one* of its regular tags.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::warn;
use uuid::Uuid;

pub const MAX_TAG_NAME_CHARS: usize = 64;

/// A unique identifier for a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TagId(pub Uuid);

impl TagId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TagId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TagId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a tag combines with the other tags of its kind on an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKind {
    /// Conjunctive: the viewer must hold all master tags on the item.
    Master,
    /// Disjunctive: the viewer must hold at least one regular tag on the item.
    #[default]
    Regular,
}

impl TagKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagKind::Master => "master",
            TagKind::Regular => "regular",
        }
    }
}

impl std::fmt::Display for TagKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TagKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "master" => Ok(TagKind::Master),
            "regular" => Ok(TagKind::Regular),
            other => Err(Error::InvalidTag(format!(
                "unknown tag kind '{other}' (expected 'master' or 'regular')"
            ))),
        }
    }
}

/// A tag as seen at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub kind: TagKind,
}

impl Tag {
    pub fn new(name: impl Into<String>, kind: TagKind) -> Self {
        Self {
            id: TagId::new(),
            name: name.into(),
            kind,
        }
    }

    pub fn master(name: impl Into<String>) -> Self {
        Self::new(name, TagKind::Master)
    }

    pub fn regular(name: impl Into<String>) -> Self {
        Self::new(name, TagKind::Regular)
    }

    pub fn is_master(&self) -> bool {
        self.kind == TagKind::Master
    }
}

/// Validate a tag name and return its trimmed form.
pub fn normalize_tag_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidTagName("tag name is required".to_string()));
    }
    if trimmed.chars().count() > MAX_TAG_NAME_CHARS {
        return Err(Error::InvalidTagName(format!(
            "tag name must be at most {MAX_TAG_NAME_CHARS} characters"
        )));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::InvalidTagName(format!(
            "'{trimmed}' contains invalid characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Lookup from tag id to the tag's current definition.
///
/// Built fresh from whatever tag snapshot the caller fetched; it is not meant
/// to outlive a single request.
#[derive(Debug, Clone, Default)]
pub struct TagIndex {
    tags: HashMap<TagId, Tag>,
}

impl TagIndex {
    pub fn new(tags: impl IntoIterator<Item = Tag>) -> Self {
        Self {
            tags: tags.into_iter().map(|tag| (tag.id, tag)).collect(),
        }
    }

    pub fn kind(&self, id: &TagId) -> Option<TagKind> {
        self.tags.get(id).map(|tag| tag.kind)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Resolve tag ids into tags, keeping input order.
    ///
    /// Ids with no matching tag are dropped, so they take part in neither the
    /// master nor the regular check.
    pub fn resolve<'a>(&self, ids: impl IntoIterator<Item = &'a TagId>) -> Vec<Tag> {
        ids.into_iter()
            .filter_map(|id| {
                let tag = self.tags.get(id);
                if tag.is_none() {
                    warn!(tag_id = %id, "dropping unresolved tag");
                }
                tag.cloned()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_trims() {
        assert_eq!(normalize_tag_name("  drawing ").unwrap(), "drawing");
        assert_eq!(normalize_tag_name("top_secret-2").unwrap(), "top_secret-2");
    }

    #[test]
    fn test_normalize_rejects_bad_names() {
        assert!(normalize_tag_name("").is_err());
        assert!(normalize_tag_name("   ").is_err());
        assert!(normalize_tag_name("has space").is_err());
        assert!(normalize_tag_name("semi;colon").is_err());
        assert!(normalize_tag_name(&"x".repeat(MAX_TAG_NAME_CHARS + 1)).is_err());
        assert!(normalize_tag_name(&"x".repeat(MAX_TAG_NAME_CHARS)).is_ok());
    }

    #[test]
    fn test_kind_round_trips_through_str() {
        assert_eq!("master".parse::<TagKind>().unwrap(), TagKind::Master);
        assert_eq!("regular".parse::<TagKind>().unwrap(), TagKind::Regular);
        assert!("Master".parse::<TagKind>().is_err());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&Tag::master("secret")).unwrap();
        assert!(json.contains(r#""kind":"master""#));
    }

    #[test]
    fn test_resolve_drops_unknown_ids() {
        let secret = Tag::master("secret");
        let drawing = Tag::regular("drawing");
        let index = TagIndex::new([secret.clone(), drawing.clone()]);
        let unknown = TagId::new();

        let resolved = index.resolve([&drawing.id, &unknown, &secret.id]);
        assert_eq!(resolved, vec![drawing, secret]);
        assert_eq!(index.kind(&unknown), None);
    }
}
