//! Visible-set builder.

use crate::{Gated, Viewer, can_view};
use tracing::debug;

/// Maximum number of items in a feed.
pub const FEED_LIMIT: usize = 20;

/// Items `viewer` may browse, newest first.
///
/// Admins get everything including drafts. Everyone else gets the non-draft
/// items the predicate allows. Items with equal recency keep their input order.
pub fn visible_items<T: Gated>(viewer: &Viewer, items: Vec<T>, require_login: bool) -> Vec<T> {
    let candidates = items.len();

    let mut visible = match viewer {
        Viewer::Admin => items,
        // Every item would be rejected by the login rule anyway.
        Viewer::Anonymous if require_login => {
            debug!(candidates, "login required, skipping evaluation");
            return Vec::new();
        }
        _ => items
            .into_iter()
            .filter(|item| !item.is_draft())
            .filter(|item| can_view(viewer, item, require_login))
            .collect(),
    };

    newest_first(&mut visible);
    debug!(%viewer, candidates, visible = visible.len(), "built visible set");
    visible
}

/// Items for a syndication feed: the visible set without drafts, capped at
/// `limit`. Drafts stay out even for admins.
pub fn feed_items<T: Gated>(
    viewer: &Viewer,
    items: Vec<T>,
    require_login: bool,
    limit: usize,
) -> Vec<T> {
    visible_items(viewer, items, require_login)
        .into_iter()
        .filter(|item| !item.is_draft())
        .take(limit)
        .collect()
}

// `sort_by` is stable, so ties keep store order.
fn newest_first<T: Gated>(items: &mut [T]) {
    items.sort_by(|a, b| b.published_at().cmp(&a.published_at()));
}
