//! The visibility predicate.
//!
//! Rules are evaluated strictly in order and the first one that applies
//! decides:
//!
//! 1. Admins see everything, drafts included.
//! 2. Nobody else sees drafts.
//! 3. Anonymous viewers see nothing while login is required.
//! 4. Untagged items are visible to anyone who got this far.
//! 5. Anonymous viewers never satisfy a tag requirement.
//! 6. Every master tag on the item must be held (AND).
//! 7. At least one regular tag on the item must be held (OR).

use crate::{Gated, Tag, TagId, Viewer};

/// Result of a visibility check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn denial(&self) -> Option<&Denial> {
        match self {
            Decision::Allow => None,
            Decision::Deny(denial) => Some(denial),
        }
    }
}

/// The rule that rejected a viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// The item is a draft and the viewer is not an admin.
    Draft,
    /// The viewer is anonymous and the site requires login.
    LoginRequired,
    /// The viewer is anonymous and the item is tagged.
    MembersOnly,
    /// The viewer lacks these master tags.
    MissingMasterTags(Vec<TagId>),
    /// The viewer holds none of the item's regular tags.
    NoMatchingTag,
}

/// How a request for a single denied item should be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Send the viewer to sign in first.
    SignIn,
    /// Pretend the item does not exist.
    NotFound,
    /// The item exists but the viewer may not see it.
    Forbidden,
}

impl Denial {
    /// How to answer `viewer` when this denial blocks a single-item request.
    ///
    /// Anonymous viewers are always sent to sign in, drafts included. Signed-in
    /// viewers get `NotFound` for drafts so their existence stays hidden.
    pub fn outcome(&self, viewer: &Viewer) -> Outcome {
        if viewer.is_anonymous() {
            return Outcome::SignIn;
        }
        match self {
            Denial::LoginRequired | Denial::MembersOnly => Outcome::SignIn,
            Denial::Draft => Outcome::NotFound,
            Denial::MissingMasterTags(_) | Denial::NoMatchingTag => Outcome::Forbidden,
        }
    }
}

impl std::fmt::Display for Denial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Denial::Draft => f.write_str("drafts are only visible to admins"),
            Denial::LoginRequired => f.write_str("login is required"),
            Denial::MembersOnly => f.write_str("tagged content requires login"),
            Denial::MissingMasterTags(missing) => {
                write!(f, "missing {} required master tag(s)", missing.len())
            }
            Denial::NoMatchingTag => f.write_str("none of the item's tags are held"),
        }
    }
}

/// Decide whether `viewer` may see `item`.
pub fn check<T: Gated + ?Sized>(viewer: &Viewer, item: &T, require_login: bool) -> Decision {
    let held = match viewer {
        Viewer::Admin => return Decision::Allow,
        _ if item.is_draft() => return Decision::Deny(Denial::Draft),
        Viewer::Anonymous if require_login => return Decision::Deny(Denial::LoginRequired),
        Viewer::Anonymous => None,
        Viewer::Authenticated { tags } => Some(tags),
    };

    let tags = item.tags();
    if tags.is_empty() {
        return Decision::Allow;
    }

    let Some(held) = held else {
        return Decision::Deny(Denial::MembersOnly);
    };

    // Partition is recomputed per call; tag kinds may change between requests.
    let (master, regular): (Vec<&Tag>, Vec<&Tag>) = tags.iter().partition(|tag| tag.is_master());

    let mut missing: Vec<TagId> = master
        .iter()
        .map(|tag| tag.id)
        .filter(|id| !held.contains(id))
        .collect();
    if !missing.is_empty() {
        missing.sort();
        missing.dedup();
        return Decision::Deny(Denial::MissingMasterTags(missing));
    }

    if !regular.is_empty() && !regular.iter().any(|tag| held.contains(&tag.id)) {
        return Decision::Deny(Denial::NoMatchingTag);
    }

    Decision::Allow
}

/// Boolean form of [`check`].
pub fn can_view<T: Gated + ?Sized>(viewer: &Viewer, item: &T, require_login: bool) -> bool {
    check(viewer, item, require_login).is_allowed()
}
