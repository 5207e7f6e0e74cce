//! Tag-based visibility policy for published content.
//!
//! Core principle: **every item is hidden unless a rule lets the viewer in.**
//!
//! # Overview
//!
//! Visibility is decided per (viewer, item) pair from a handful of inputs:
//!
//! - the [`Viewer`]: admin, authenticated with a set of held tags, or anonymous
//! - the item's draft flag and its [`Tag`]s, each either [`TagKind::Master`]
//!   or [`TagKind::Regular`]
//! - the site-wide `require_login` flag from [`AccessSettings`]
//!
//! [`check`] evaluates the rules and says which one rejected the viewer;
//! [`can_view`] is its boolean form. [`visible_items`] builds the newest-first
//! listing a viewer may browse, and [`feed_items`] the capped feed.
//!
//! Everything here is pure: no I/O, no caching, no shared state. The caller
//! fetches viewers and items and hands them over as plain values.
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use policy::{ContentItem, Tag, Viewer, can_view, visible_items};
//!
//! let secret = Tag::master("secret");
//! let drawing = Tag::regular("drawing");
//!
//! let post = ContentItem::new(Utc::now()).with_tags([secret.clone(), drawing.clone()]);
//!
//! // Master tag alone is not enough when the post also has a regular tag.
//! assert!(!can_view(&Viewer::with_tags([secret.id]), &post, true));
//! assert!(can_view(&Viewer::with_tags([secret.id, drawing.id]), &post, true));
//!
//! assert!(visible_items(&Viewer::Anonymous, vec![post], true).is_empty());
//! ```

mod access;
mod error;
mod item;
mod listing;
mod settings;
mod tag;
mod viewer;

pub use access::{Decision, Denial, Outcome, can_view, check};
pub use error::{Error, Result};
pub use item::{ContentItem, Gated, PostId};
pub use listing::{FEED_LIMIT, feed_items, visible_items};
pub use settings::AccessSettings;
pub use tag::{MAX_TAG_NAME_CHARS, Tag, TagId, TagIndex, TagKind, normalize_tag_name};
pub use viewer::Viewer;
