//! SQLite-backed content store for picoblog.
//!
//! This crate persists tags, users, posts, and comments, and hands them to the
//! visibility policy as plain values. It never decides visibility itself.
//!
//! # Overview
//!
//! The store answers the three questions the policy needs answered before it
//! can run:
//!
//! 1. **Who is looking?** [`Store::viewer`] turns a principal name (or none)
//!    into a [`policy::Viewer`] with its held tags.
//! 2. **What could they see?** [`Store::candidate_posts`] returns posts, drafts
//!    optionally included, newest first, with tags resolved to their current kind.
//! 3. **What kind is each tag?** [`Store::tag_kinds`] looks up tag kinds by id.
//!
//! Tags, users, posts, and comments are created and edited through the
//! remaining methods; there is no credential handling here. Whether a viewer
//! may read or comment on a post is for the caller to check first.
//!
//! # Example
//!
//! ```no_run
//! use policy::{TagKind, visible_items};
//! use storage::{NewPost, Store};
//!
//! let store = Store::open("picoblog.db")?;
//!
//! let secret = store.create_tag("secret", TagKind::Master)?;
//! let reader = store.create_user("reader", false)?;
//! store.grant_tag(reader.id, secret.id)?;
//! store.create_post(NewPost::new("Hello").tag(secret.id))?;
//!
//! let viewer = store.viewer(Some("reader"))?;
//! let posts = store.candidate_posts(viewer.is_admin())?;
//! for post in visible_items(&viewer, posts, true) {
//!     println!("{}: {}", post.published_at, post.title);
//! }
//! # Ok::<(), storage::Error>(())
//! ```

mod error;
mod post;
mod store;

pub use error::{Error, Result};
pub use post::{Comment, CommentId, NewPost, Post, User, UserId};
pub use store::Store;
