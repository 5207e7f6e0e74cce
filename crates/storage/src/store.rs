//! SQLite store implementation.

use crate::{Comment, CommentId, Error, NewPost, Post, Result, User, UserId};
use chrono::{DateTime, SecondsFormat, Utc};
use policy::{PostId, Tag, TagId, TagIndex, TagKind, Viewer, normalize_tag_name};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

const POST_COLUMNS: &str = "id, title, body, author, draft, comments_enabled, published_at";

/// SQLite-backed content store.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        info!(path = %path.as_ref().display(), "opened content store");
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS tags (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                kind TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                is_admin INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS user_tags (
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                tag_id TEXT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                PRIMARY KEY (user_id, tag_id)
            );

            CREATE TABLE IF NOT EXISTS posts (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                author TEXT,
                draft INTEGER NOT NULL DEFAULT 0,
                comments_enabled INTEGER NOT NULL DEFAULT 1,
                published_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_posts_recency
                ON posts(draft, published_at);

            CREATE TABLE IF NOT EXISTS post_tags (
                post_id TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                tag_id TEXT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                PRIMARY KEY (post_id, tag_id)
            );

            CREATE TABLE IF NOT EXISTS comments (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                post_id TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                author_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                body TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_comments_post
                ON comments(post_id, created_at);
            "#,
        )?;
        Ok(())
    }

    // --- tags ---

    /// Create a tag. Names are normalized and must be unique.
    pub fn create_tag(&self, name: &str, kind: TagKind) -> Result<Tag> {
        let name = normalize_tag_name(name)?;
        if self.tag_by_name(&name)?.is_some() {
            return Err(Error::Conflict(format!("tag '{name}'")));
        }

        let tag = Tag::new(name, kind);
        self.conn.execute(
            "INSERT INTO tags (id, name, kind) VALUES (?1, ?2, ?3)",
            params![tag.id.to_string(), tag.name, tag.kind.as_str()],
        )?;
        debug!(tag = %tag.name, kind = %tag.kind, "created tag");
        Ok(tag)
    }

    /// Change whether a tag is a master or a regular tag.
    pub fn set_tag_kind(&self, id: TagId, kind: TagKind) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE tags SET kind = ?1 WHERE id = ?2",
            params![kind.as_str(), id.to_string()],
        )?;
        expect_row(changed, || format!("tag {id}"))
    }

    /// Delete a tag, detaching it from every user and post.
    pub fn delete_tag(&self, id: TagId) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tags WHERE id = ?1", [id.to_string()])?;
        expect_row(changed, || format!("tag {id}"))
    }

    /// All tags, ordered by name.
    pub fn tags(&self) -> Result<Vec<Tag>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, kind FROM tags ORDER BY name")?;
        let rows = stmt
            .query_map([], raw_tag)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(parse_tag).collect()
    }

    pub fn tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, kind FROM tags WHERE name = ?1",
                [name.trim()],
                raw_tag,
            )
            .optional()?;
        row.map(parse_tag).transpose()
    }

    /// Current kinds of the given tags. Unknown ids are simply absent.
    pub fn tag_kinds(&self, ids: &[TagId]) -> Result<TagIndex> {
        if ids.is_empty() {
            return Ok(TagIndex::default());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT id, name, kind FROM tags WHERE id IN ({placeholders})");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(ids.iter().map(|id| id.to_string())), raw_tag)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let tags = rows
            .into_iter()
            .map(parse_tag)
            .collect::<Result<Vec<_>>>()?;
        Ok(TagIndex::new(tags))
    }

    // --- users ---

    /// Create a user. Names must be non-empty and unique.
    pub fn create_user(&self, name: &str, is_admin: bool) -> Result<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Invalid("user name is required".to_string()));
        }
        if self.user_by_name(name)?.is_some() {
            return Err(Error::Conflict(format!("user '{name}'")));
        }

        let user = User {
            id: UserId::new(),
            name: name.to_string(),
            is_admin,
        };
        self.conn.execute(
            "INSERT INTO users (id, name, is_admin) VALUES (?1, ?2, ?3)",
            params![user.id.to_string(), user.name, user.is_admin],
        )?;
        debug!(user = %user.name, is_admin, "created user");
        Ok(user)
    }

    pub fn users(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, is_admin FROM users ORDER BY name")?;
        let rows = stmt
            .query_map([], raw_user)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(parse_user).collect()
    }

    pub fn user_by_name(&self, name: &str) -> Result<Option<User>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, is_admin FROM users WHERE name = ?1",
                [name.trim()],
                raw_user,
            )
            .optional()?;
        row.map(parse_user).transpose()
    }

    /// Allow a user to unlock content carrying `tag`. Granting twice is a no-op.
    pub fn grant_tag(&self, user: UserId, tag: TagId) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO user_tags (user_id, tag_id) VALUES (?1, ?2)",
            params![user.to_string(), tag.to_string()],
        )?;
        Ok(())
    }

    pub fn revoke_tag(&self, user: UserId, tag: TagId) -> Result<()> {
        let changed = self.conn.execute(
            "DELETE FROM user_tags WHERE user_id = ?1 AND tag_id = ?2",
            params![user.to_string(), tag.to_string()],
        )?;
        expect_row(changed, || format!("grant of tag {tag} to user {user}"))
    }

    /// Tags held by a user, ordered by name.
    pub fn held_tags(&self, user: UserId) -> Result<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            "SELECT tags.id, tags.name, tags.kind FROM user_tags
             JOIN tags ON tags.id = user_tags.tag_id
             WHERE user_tags.user_id = ?1 ORDER BY tags.name",
        )?;
        let rows = stmt
            .query_map([user.to_string()], raw_tag)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(parse_tag).collect()
    }

    /// Resolve the viewing context for a principal.
    ///
    /// `None` is the anonymous viewer.
    pub fn viewer(&self, principal: Option<&str>) -> Result<Viewer> {
        let Some(name) = principal else {
            return Ok(Viewer::Anonymous);
        };
        let user = self
            .user_by_name(name)?
            .ok_or_else(|| Error::NotFound(format!("user '{name}'")))?;
        if user.is_admin {
            return Ok(Viewer::Admin);
        }

        let tags = self.held_tags(user.id)?.into_iter().map(|tag| tag.id);
        Ok(Viewer::with_tags(tags))
    }

    // --- posts ---

    /// Insert a post together with its tags.
    pub fn create_post(&self, new: NewPost) -> Result<Post> {
        let id = PostId::new();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO posts (id, title, body, author, draft, comments_enabled, published_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id.to_string(),
                new.title,
                new.body,
                new.author,
                new.draft,
                new.comments_enabled,
                format_timestamp(&new.published_at),
            ],
        )?;
        for tag in &new.tags {
            tx.execute(
                "INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?1, ?2)",
                params![id.to_string(), tag.to_string()],
            )?;
        }
        tx.commit()?;

        debug!(post = %id, title = %new.title, draft = new.draft, "created post");
        self.post(id)
    }

    pub fn tag_post(&self, post: PostId, tag: TagId) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?1, ?2)",
            params![post.to_string(), tag.to_string()],
        )?;
        Ok(())
    }

    pub fn untag_post(&self, post: PostId, tag: TagId) -> Result<()> {
        let changed = self.conn.execute(
            "DELETE FROM post_tags WHERE post_id = ?1 AND tag_id = ?2",
            params![post.to_string(), tag.to_string()],
        )?;
        expect_row(changed, || format!("tag {tag} on post {post}"))
    }

    pub fn set_draft(&self, post: PostId, draft: bool) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE posts SET draft = ?1 WHERE id = ?2",
            params![draft, post.to_string()],
        )?;
        expect_row(changed, || format!("post {post}"))
    }

    pub fn post(&self, id: PostId) -> Result<Post> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1");
        let row = self
            .conn
            .query_row(&sql, [id.to_string()], raw_post)
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("post {id}")))?;

        let links = self.tag_links(Some(id))?;
        let index = self.tag_kinds(&link_ids(&links))?;
        parse_post(row, &links, &index)
    }

    /// Posts to be filtered by the visibility policy, newest first.
    ///
    /// Posts with the same timestamp come out newest insertion first.
    pub fn candidate_posts(&self, include_drafts: bool) -> Result<Vec<Post>> {
        let filter = if include_drafts { "" } else { "WHERE draft = 0" };
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts {filter} ORDER BY published_at DESC, seq DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], raw_post)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let links = self.tag_links(None)?;
        let index = self.tag_kinds(&link_ids(&links))?;
        let posts = rows
            .into_iter()
            .map(|row| parse_post(row, &links, &index))
            .collect::<Result<Vec<_>>>()?;
        debug!(count = posts.len(), include_drafts, "fetched candidate posts");
        Ok(posts)
    }

    // --- comments ---

    /// Record a comment by `author` on `post`.
    ///
    /// The body is trimmed and must be non-empty. Read access and the post's
    /// comment setting are not checked here.
    pub fn add_comment(&self, post: PostId, author: UserId, body: &str) -> Result<Comment> {
        let body = body.trim();
        if body.is_empty() {
            return Err(Error::Invalid("comment body is required".to_string()));
        }
        if !self.exists("posts", &post.to_string())? {
            return Err(Error::NotFound(format!("post {post}")));
        }
        if !self.exists("users", &author.to_string())? {
            return Err(Error::NotFound(format!("user {author}")));
        }

        let id = CommentId::new();
        self.conn.execute(
            "INSERT INTO comments (id, post_id, author_id, body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id.to_string(),
                post.to_string(),
                author.to_string(),
                body,
                format_timestamp(&Utc::now()),
            ],
        )?;
        debug!(comment = %id, post = %post, "added comment");

        let row = self.conn.query_row(
            "SELECT comments.id, comments.post_id, users.name, comments.body, comments.created_at
             FROM comments JOIN users ON users.id = comments.author_id
             WHERE comments.id = ?1",
            [id.to_string()],
            raw_comment,
        )?;
        parse_comment(row)
    }

    /// Comments on a post, oldest first.
    pub fn comments(&self, post: PostId) -> Result<Vec<Comment>> {
        let mut stmt = self.conn.prepare(
            "SELECT comments.id, comments.post_id, users.name, comments.body, comments.created_at
             FROM comments JOIN users ON users.id = comments.author_id
             WHERE comments.post_id = ?1
             ORDER BY comments.created_at, comments.seq",
        )?;
        let rows = stmt
            .query_map([post.to_string()], raw_comment)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(parse_comment).collect()
    }

    fn exists(&self, table: &str, id: &str) -> Result<bool> {
        let sql = format!("SELECT 1 FROM {table} WHERE id = ?1");
        let found = self.conn.query_row(&sql, [id], |_| Ok(())).optional()?;
        Ok(found.is_some())
    }

    /// Tag ids attached to one post, or to every post.
    fn tag_links(&self, post: Option<PostId>) -> Result<HashMap<String, Vec<TagId>>> {
        let rows = match post {
            Some(id) => {
                let mut stmt = self.conn.prepare(
                    "SELECT post_id, tag_id FROM post_tags WHERE post_id = ?1 ORDER BY rowid",
                )?;
                stmt.query_map([id.to_string()], raw_link)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt = self
                    .conn
                    .prepare("SELECT post_id, tag_id FROM post_tags ORDER BY rowid")?;
                stmt.query_map([], raw_link)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
        };

        let mut links: HashMap<String, Vec<TagId>> = HashMap::new();
        for (post_id, tag_id) in rows {
            let tag_id = TagId(parse_uuid(&tag_id, "tag id")?);
            links.entry(post_id).or_default().push(tag_id);
        }
        Ok(links)
    }
}

type RawTag = (String, String, String);
type RawUser = (String, String, bool);
type RawPost = (String, String, String, Option<String>, bool, bool, String);
type RawComment = (String, String, String, String, String);

fn raw_tag(row: &Row<'_>) -> rusqlite::Result<RawTag> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn raw_user(row: &Row<'_>) -> rusqlite::Result<RawUser> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn raw_post(row: &Row<'_>) -> rusqlite::Result<RawPost> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn raw_comment(row: &Row<'_>) -> rusqlite::Result<RawComment> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn raw_link(row: &Row<'_>) -> rusqlite::Result<(String, String)> {
    Ok((row.get(0)?, row.get(1)?))
}

fn parse_tag((id, name, kind): RawTag) -> Result<Tag> {
    Ok(Tag {
        id: TagId(parse_uuid(&id, "tag id")?),
        name,
        kind: kind.parse()?,
    })
}

fn parse_user((id, name, is_admin): RawUser) -> Result<User> {
    Ok(User {
        id: UserId(parse_uuid(&id, "user id")?),
        name,
        is_admin,
    })
}

fn parse_post(
    (id, title, body, author, draft, comments_enabled, published_at): RawPost,
    links: &HashMap<String, Vec<TagId>>,
    index: &TagIndex,
) -> Result<Post> {
    let tag_ids = links.get(&id).map(Vec::as_slice).unwrap_or_default();
    Ok(Post {
        id: PostId(parse_uuid(&id, "post id")?),
        title,
        body,
        author,
        draft,
        comments_enabled,
        published_at: parse_timestamp(&published_at)?,
        tags: index.resolve(tag_ids),
    })
}

fn parse_comment((id, post, author, body, created_at): RawComment) -> Result<Comment> {
    Ok(Comment {
        id: CommentId(parse_uuid(&id, "comment id")?),
        post: PostId(parse_uuid(&post, "post id")?),
        author,
        body,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn link_ids(links: &HashMap<String, Vec<TagId>>) -> Vec<TagId> {
    let unique: HashSet<TagId> = links.values().flatten().copied().collect();
    unique.into_iter().collect()
}

fn parse_uuid(value: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| Error::Corrupt(format!("{what} '{value}': {e}")))
}

// Fixed width so that text order matches time order.
fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| Error::Corrupt(format!("timestamp '{value}': {e}")))
}

fn expect_row(changed: usize, what: impl FnOnce() -> String) -> Result<()> {
    if changed == 0 {
        Err(Error::NotFound(what()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use policy::{Denial, check, visible_items};

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn titles(posts: &[Post]) -> Vec<&str> {
        posts.iter().map(|post| post.title.as_str()).collect()
    }

    /// Four tags, an admin plus three members, and five posts.
    fn seeded() -> Store {
        let store = Store::in_memory().unwrap();
        let secret = store.create_tag("secret", TagKind::Master).unwrap();
        let drawing = store.create_tag("drawing", TagKind::Regular).unwrap();
        let tech = store.create_tag("tech", TagKind::Regular).unwrap();

        store.create_user("admin", true).unwrap();
        let a = store.create_user("a", false).unwrap();
        let b = store.create_user("b", false).unwrap();
        let c = store.create_user("c", false).unwrap();
        store.grant_tag(a.id, drawing.id).unwrap();
        store.grant_tag(a.id, tech.id).unwrap();
        store.grant_tag(b.id, secret.id).unwrap();
        store.grant_tag(c.id, secret.id).unwrap();
        store.grant_tag(c.id, drawing.id).unwrap();

        store
            .create_post(NewPost::new("public").published_at(at(5)))
            .unwrap();
        store
            .create_post(NewPost::new("drawing").published_at(at(4)).tag(drawing.id))
            .unwrap();
        store
            .create_post(NewPost::new("secret").published_at(at(3)).tag(secret.id))
            .unwrap();
        store
            .create_post(
                NewPost::new("secret+drawing")
                    .published_at(at(2))
                    .tag(secret.id)
                    .tag(drawing.id),
            )
            .unwrap();
        store
            .create_post(NewPost::new("draft").published_at(at(1)).draft(true))
            .unwrap();
        store
    }

    fn visible_to(store: &Store, principal: Option<&str>, require_login: bool) -> Vec<String> {
        let viewer = store.viewer(principal).unwrap();
        let posts = store.candidate_posts(viewer.is_admin()).unwrap();
        visible_items(&viewer, posts, require_login)
            .into_iter()
            .map(|post| post.title)
            .collect()
    }

    #[test]
    fn test_visibility_matrix_from_store() {
        let store = seeded();
        assert_eq!(
            visible_to(&store, Some("admin"), true),
            ["public", "drawing", "secret", "secret+drawing", "draft"]
        );
        assert_eq!(visible_to(&store, Some("a"), true), ["public", "drawing"]);
        assert_eq!(visible_to(&store, Some("b"), true), ["public", "secret"]);
        assert_eq!(
            visible_to(&store, Some("c"), true),
            ["public", "drawing", "secret", "secret+drawing"]
        );
        assert!(visible_to(&store, None, true).is_empty());
        assert_eq!(visible_to(&store, None, false), ["public"]);
    }

    #[test]
    fn test_candidate_posts_exclude_drafts() {
        let store = seeded();
        assert_eq!(store.candidate_posts(true).unwrap().len(), 5);
        let published = store.candidate_posts(false).unwrap();
        assert_eq!(
            titles(&published),
            ["public", "drawing", "secret", "secret+drawing"]
        );
    }

    #[test]
    fn test_same_timestamp_newest_insert_first() {
        let store = Store::in_memory().unwrap();
        store
            .create_post(NewPost::new("older").published_at(at(0)))
            .unwrap();
        store
            .create_post(NewPost::new("newer").published_at(at(0)))
            .unwrap();
        assert_eq!(
            titles(&store.candidate_posts(false).unwrap()),
            ["newer", "older"]
        );
    }

    #[test]
    fn test_viewer_resolution() {
        let store = seeded();
        assert_eq!(store.viewer(None).unwrap(), Viewer::Anonymous);
        assert_eq!(store.viewer(Some("admin")).unwrap(), Viewer::Admin);

        let secret = store.tag_by_name("secret").unwrap().unwrap();
        assert_eq!(
            store.viewer(Some("b")).unwrap(),
            Viewer::with_tags([secret.id])
        );
        assert!(matches!(
            store.viewer(Some("nobody")),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_tag_name_conflicts() {
        let store = Store::in_memory().unwrap();
        store.create_tag("secret", TagKind::Master).unwrap();
        assert!(matches!(
            store.create_tag(" secret ", TagKind::Regular),
            Err(Error::Conflict(_))
        ));
        assert!(matches!(
            store.create_tag("bad name", TagKind::Regular),
            Err(Error::Policy(_))
        ));
    }

    #[test]
    fn test_duplicate_user_conflicts() {
        let store = Store::in_memory().unwrap();
        store.create_user("a", false).unwrap();
        assert!(matches!(
            store.create_user("a", true),
            Err(Error::Conflict(_))
        ));
        assert!(matches!(store.create_user("  ", false), Err(Error::Invalid(_))));
    }

    #[test]
    fn test_kind_change_applies_to_next_fetch() {
        let store = seeded();
        let secret = store.tag_by_name("secret").unwrap().unwrap();
        assert_eq!(visible_to(&store, Some("b"), true), ["public", "secret"]);

        store.set_tag_kind(secret.id, TagKind::Regular).unwrap();
        assert_eq!(
            visible_to(&store, Some("b"), true),
            ["public", "secret", "secret+drawing"]
        );
        assert_eq!(
            visible_to(&store, Some("a"), true),
            ["public", "drawing", "secret+drawing"]
        );
    }

    #[test]
    fn test_revoked_tag_reports_missing_master() {
        let store = seeded();
        let secret = store.tag_by_name("secret").unwrap().unwrap();
        let c = store.user_by_name("c").unwrap().unwrap();
        store.revoke_tag(c.id, secret.id).unwrap();
        assert_eq!(visible_to(&store, Some("c"), true), ["public", "drawing"]);

        let post = store
            .candidate_posts(false)
            .unwrap()
            .into_iter()
            .find(|post| post.title == "secret+drawing")
            .unwrap();
        let viewer = store.viewer(Some("c")).unwrap();
        assert_eq!(
            check(&viewer, &post, true).denial(),
            Some(&Denial::MissingMasterTags(vec![secret.id]))
        );
    }

    #[test]
    fn test_deleting_tag_detaches_it() {
        let store = seeded();
        let secret = store.tag_by_name("secret").unwrap().unwrap();
        store.delete_tag(secret.id).unwrap();

        assert_eq!(
            visible_to(&store, Some("a"), true),
            ["public", "drawing", "secret", "secret+drawing"]
        );
        assert!(matches!(
            store.delete_tag(secret.id),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_tag_and_publish_post() {
        let store = seeded();
        let tech = store.tag_by_name("tech").unwrap().unwrap();
        let draft = store
            .candidate_posts(true)
            .unwrap()
            .into_iter()
            .find(|post| post.draft)
            .unwrap();

        store.tag_post(draft.id, tech.id).unwrap();
        store.set_draft(draft.id, false).unwrap();
        assert_eq!(
            visible_to(&store, Some("a"), true),
            ["public", "drawing", "draft"]
        );

        store.untag_post(draft.id, tech.id).unwrap();
        let post = store.post(draft.id).unwrap();
        assert!(post.tags.is_empty());
        assert!(!post.draft);
    }

    #[test]
    fn test_removing_missing_links_not_found() {
        let store = seeded();
        let tech = store.tag_by_name("tech").unwrap().unwrap();
        let b = store.user_by_name("b").unwrap().unwrap();
        let public = store.candidate_posts(false).unwrap()[0].id;

        assert!(matches!(
            store.revoke_tag(b.id, tech.id),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            store.untag_post(public, tech.id),
            Err(Error::NotFound(_))
        ));

        let a = store.user_by_name("a").unwrap().unwrap();
        store.revoke_tag(a.id, tech.id).unwrap();
        assert!(matches!(
            store.revoke_tag(a.id, tech.id),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_comments_listed_oldest_first() {
        let store = seeded();
        let a = store.user_by_name("a").unwrap().unwrap();
        let c = store.user_by_name("c").unwrap().unwrap();
        let posts = store.candidate_posts(false).unwrap();
        let (public, other) = (posts[0].id, posts[1].id);

        let first = store.add_comment(public, a.id, "  first  ").unwrap();
        store.add_comment(public, c.id, "second").unwrap();
        store.add_comment(other, a.id, "elsewhere").unwrap();

        assert_eq!(first.body, "first");
        assert_eq!(first.author, "a");
        assert_eq!(first.post, public);

        let comments = store.comments(public).unwrap();
        let bodies: Vec<_> = comments.iter().map(|c| c.body.as_str()).collect();
        assert_eq!(bodies, ["first", "second"]);
        assert_eq!(comments[1].author, "c");
        assert!(comments[0].created_at <= comments[1].created_at);
        assert_eq!(comments[0], first);
    }

    #[test]
    fn test_add_comment_rejects_bad_input() {
        let store = seeded();
        let a = store.user_by_name("a").unwrap().unwrap();
        let public = store.candidate_posts(false).unwrap()[0].id;

        assert!(matches!(
            store.add_comment(public, a.id, "   "),
            Err(Error::Invalid(_))
        ));
        assert!(matches!(
            store.add_comment(PostId::new(), a.id, "hi"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            store.add_comment(public, UserId::new(), "hi"),
            Err(Error::NotFound(_))
        ));
        assert!(store.comments(public).unwrap().is_empty());
    }

    #[test]
    fn test_tag_kinds_skips_unknown_ids() {
        let store = seeded();
        let secret = store.tag_by_name("secret").unwrap().unwrap();
        let index = store.tag_kinds(&[secret.id, TagId::new()]).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.kind(&secret.id), Some(TagKind::Master));
        assert!(store.tag_kinds(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_missing_post_not_found() {
        let store = Store::in_memory().unwrap();
        assert!(matches!(store.post(PostId::new()), Err(Error::NotFound(_))));
        assert!(matches!(
            store.set_draft(PostId::new(), true),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_round_trip_fields_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("content.db");
        let id = {
            let store = Store::open(&path).unwrap();
            let tag = store.create_tag("notes", TagKind::Regular).unwrap();
            store
                .create_post(
                    NewPost::new("hello")
                        .body("*hi*")
                        .author("admin")
                        .comments_enabled(false)
                        .published_at(at(7))
                        .tag(tag.id),
                )
                .unwrap()
                .id
        };

        let store = Store::open(&path).unwrap();
        let post = store.post(id).unwrap();
        assert_eq!(post.title, "hello");
        assert_eq!(post.body, "*hi*");
        assert_eq!(post.author.as_deref(), Some("admin"));
        assert!(!post.comments_enabled);
        assert_eq!(post.published_at, at(7));
        assert_eq!(titles(&store.candidate_posts(false).unwrap()), ["hello"]);
        assert_eq!(post.tags.len(), 1);
        assert_eq!(post.tags[0].name, "notes");
    }
}
