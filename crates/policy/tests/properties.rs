use chrono::{DateTime, Duration, TimeZone, Utc};
use policy::{ContentItem, Tag, TagId, TagKind, Viewer, can_view, check, visible_items};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::HashSet;
use uuid::Uuid;

const UNIVERSE: usize = 6;

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

fn universe(kinds: &[bool]) -> Vec<Tag> {
    kinds
        .iter()
        .enumerate()
        .map(|(i, master)| Tag {
            id: TagId(Uuid::from_u128(i as u128 + 1)),
            name: format!("tag{i}"),
            kind: if *master {
                TagKind::Master
            } else {
                TagKind::Regular
            },
        })
        .collect()
}

fn pick(tags: &[Tag], mask: &[bool]) -> Vec<Tag> {
    tags.iter()
        .zip(mask)
        .filter(|(_, on)| **on)
        .map(|(tag, _)| tag.clone())
        .collect()
}

fn item(tags: &[Tag], mask: &[bool], draft: bool, minutes: i64) -> ContentItem {
    ContentItem {
        draft,
        ..ContentItem::new(epoch() + Duration::minutes(minutes)).with_tags(pick(tags, mask))
    }
}

fn member(tags: &[Tag], mask: &[bool]) -> Viewer {
    Viewer::with_tags(pick(tags, mask).into_iter().map(|tag| tag.id))
}

fn viewer_strategy() -> impl Strategy<Value = (u8, Vec<bool>)> {
    (0u8..3, vec(any::<bool>(), UNIVERSE))
}

fn build_viewer(tags: &[Tag], (variant, mask): &(u8, Vec<bool>)) -> Viewer {
    match variant {
        0 => Viewer::Admin,
        1 => Viewer::Anonymous,
        _ => member(tags, mask),
    }
}

/// Straightforward restatement of the tag rules for authenticated viewers.
fn expected_for_member(item: &ContentItem, held: &HashSet<TagId>) -> bool {
    let masters_held = item
        .tags
        .iter()
        .filter(|tag| tag.kind == TagKind::Master)
        .all(|tag| held.contains(&tag.id));
    let regular: Vec<&Tag> = item
        .tags
        .iter()
        .filter(|tag| tag.kind == TagKind::Regular)
        .collect();
    let regular_ok = regular.is_empty() || regular.iter().any(|tag| held.contains(&tag.id));
    masters_held && regular_ok
}

proptest! {
    #[test]
    fn admin_sees_everything(
        kinds in vec(any::<bool>(), UNIVERSE),
        on_item in vec(any::<bool>(), UNIVERSE),
        draft in any::<bool>(),
        require_login in any::<bool>(),
    ) {
        let tags = universe(&kinds);
        prop_assert!(can_view(&Viewer::Admin, &item(&tags, &on_item, draft, 0), require_login));
    }

    #[test]
    fn drafts_hidden_from_non_admins(
        kinds in vec(any::<bool>(), UNIVERSE),
        on_item in vec(any::<bool>(), UNIVERSE),
        viewer in viewer_strategy(),
        require_login in any::<bool>(),
    ) {
        let tags = universe(&kinds);
        let viewer = build_viewer(&tags, &viewer);
        prop_assume!(!viewer.is_admin());
        prop_assert!(!can_view(&viewer, &item(&tags, &on_item, true, 0), require_login));
    }

    #[test]
    fn anonymous_sees_nothing_when_login_required(
        kinds in vec(any::<bool>(), UNIVERSE),
        on_item in vec(any::<bool>(), UNIVERSE),
        draft in any::<bool>(),
    ) {
        let tags = universe(&kinds);
        prop_assert!(!can_view(&Viewer::Anonymous, &item(&tags, &on_item, draft, 0), true));
    }

    #[test]
    fn untagged_published_items_are_public(
        held in vec(any::<bool>(), UNIVERSE),
        require_login in any::<bool>(),
    ) {
        let tags = universe(&[false; UNIVERSE]);
        let public = item(&tags, &[false; UNIVERSE], false, 0);
        prop_assert!(can_view(&member(&tags, &held), &public, require_login));
        prop_assert!(can_view(&Viewer::Anonymous, &public, false));
    }

    #[test]
    fn anonymous_never_satisfies_tags(
        kinds in vec(any::<bool>(), UNIVERSE),
        on_item in vec(any::<bool>(), UNIVERSE),
    ) {
        prop_assume!(on_item.iter().any(|on| *on));
        let tags = universe(&kinds);
        prop_assert!(!can_view(&Viewer::Anonymous, &item(&tags, &on_item, false, 0), false));
    }

    #[test]
    fn members_follow_and_or_rules(
        kinds in vec(any::<bool>(), UNIVERSE),
        on_item in vec(any::<bool>(), UNIVERSE),
        held in vec(any::<bool>(), UNIVERSE),
        require_login in any::<bool>(),
    ) {
        let tags = universe(&kinds);
        let post = item(&tags, &on_item, false, 0);
        let viewer = member(&tags, &held);
        let held_ids = viewer.held_tags().cloned().unwrap_or_default();
        prop_assert_eq!(
            can_view(&viewer, &post, require_login),
            expected_for_member(&post, &held_ids)
        );
    }

    #[test]
    fn checks_are_repeatable(
        kinds in vec(any::<bool>(), UNIVERSE),
        on_item in vec(any::<bool>(), UNIVERSE),
        viewer in viewer_strategy(),
        draft in any::<bool>(),
        require_login in any::<bool>(),
    ) {
        let tags = universe(&kinds);
        let viewer = build_viewer(&tags, &viewer);
        let post = item(&tags, &on_item, draft, 0);
        let first = check(&viewer, &post, require_login);
        for _ in 0..3 {
            prop_assert_eq!(&check(&viewer, &post, require_login), &first);
        }
    }

    #[test]
    fn listing_is_filtered_and_newest_first(
        kinds in vec(any::<bool>(), UNIVERSE),
        posts in vec((vec(any::<bool>(), UNIVERSE), any::<bool>(), 0i64..500), 0..12),
        viewer in viewer_strategy(),
        require_login in any::<bool>(),
    ) {
        let tags = universe(&kinds);
        let viewer = build_viewer(&tags, &viewer);
        let items: Vec<ContentItem> = posts
            .iter()
            .map(|(mask, draft, minutes)| item(&tags, mask, *draft, *minutes))
            .collect();

        let listed = visible_items(&viewer, items.clone(), require_login);

        prop_assert!(listed.windows(2).all(|pair| pair[0].published_at >= pair[1].published_at));

        let listed_ids: HashSet<_> = listed.iter().map(|item| item.id).collect();
        let expected_ids: HashSet<_> = items
            .iter()
            .filter(|item| can_view(&viewer, *item, require_login))
            .map(|item| item.id)
            .collect();
        prop_assert_eq!(listed_ids, expected_ids);
        if !viewer.is_admin() {
            prop_assert!(listed.iter().all(|item| !item.draft));
        }
    }
}
