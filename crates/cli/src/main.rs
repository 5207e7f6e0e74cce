mod config;
mod error;
mod logging;

use std::path::{Path, PathBuf};

use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use policy::{
    Decision, Denial, FEED_LIMIT, Outcome, TagId, TagKind, Viewer, can_view, check, feed_items,
    visible_items,
};
use storage::{Comment, NewPost, Post, Store};
use tracing::debug;

use config::{Config, REQUIRE_LOGIN_ENV};
use error::{Error, Result};

const CONFIG_FILE: &str = "picoblog.toml";

#[derive(Parser)]
#[command(name = "picoblog")]
#[command(about = "A small publishing tool with tag-based visibility", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage tags
    Tag {
        #[command(subcommand)]
        command: TagCommand,
    },
    /// Manage users and the tags they hold
    User {
        #[command(subcommand)]
        command: UserCommand,
    },
    /// Manage posts
    Post {
        #[command(subcommand)]
        command: PostCommand,
    },
    /// List posts visible to a viewer, newest first
    List {
        /// View as this user (anonymous if omitted)
        #[arg(long = "as", value_name = "USER")]
        viewer: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show the feed a viewer would receive
    Feed {
        /// View as this user (anonymous if omitted)
        #[arg(long = "as", value_name = "USER")]
        viewer: Option<String>,
        /// Maximum number of entries
        #[arg(short, long, default_value_t = FEED_LIMIT)]
        limit: usize,
    },
    /// Show a single post
    Show {
        /// Post ID (prefix match supported)
        post: String,
        /// View as this user (anonymous if omitted)
        #[arg(long = "as", value_name = "USER")]
        viewer: Option<String>,
    },
    /// Print which viewers can see which posts
    Matrix,
}

#[derive(Subcommand)]
enum TagCommand {
    /// Create a tag
    Add {
        name: String,
        /// Viewers need every master tag on a post
        #[arg(long)]
        master: bool,
    },
    /// List all tags
    List,
    /// Change a tag's kind (master or regular)
    Kind { name: String, kind: String },
    /// Delete a tag
    Rm { name: String },
}

#[derive(Subcommand)]
enum UserCommand {
    /// Create a user
    Add {
        name: String,
        #[arg(long)]
        admin: bool,
        /// Tags the user holds
        #[arg(short, long = "tag", value_name = "TAG")]
        tags: Vec<String>,
    },
    /// Let a user unlock posts carrying a tag
    Grant { user: String, tag: String },
    /// Take a tag away from a user
    Revoke { user: String, tag: String },
    /// List users and their tags
    List,
}

#[derive(Subcommand)]
enum PostCommand {
    /// Create a post
    Add {
        title: String,
        #[arg(short, long, default_value = "")]
        body: String,
        #[arg(short, long)]
        author: Option<String>,
        #[arg(short, long = "tag", value_name = "TAG")]
        tags: Vec<String>,
        /// Keep the post hidden from everyone but admins
        #[arg(long)]
        draft: bool,
        /// Do not accept comments on this post
        #[arg(long)]
        no_comments: bool,
    },
    /// Publish a draft
    Publish { post: String },
    /// Attach a tag to a post
    Tag { post: String, tag: String },
    /// Detach a tag from a post
    Untag { post: String, tag: String },
    /// Comment on a post the user can view
    Comment {
        /// Post ID (prefix match supported)
        post: String,
        /// Comment as this user
        #[arg(long = "as", value_name = "USER")]
        viewer: Option<String>,
        #[arg(short, long)]
        body: String,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let env_override = std::env::var(REQUIRE_LOGIN_ENV).ok();
    let config =
        Config::load_or_default(&cli.config)?.with_require_login_override(env_override.as_deref())?;
    logging::init(&config.log)?;
    debug!(?config, "loaded configuration");

    let require_login = config.access.require_login;
    let db_path = config.storage.path.as_path();

    match cli.command {
        Commands::Tag { command } => cmd_tag(&create_store(db_path)?, command),
        Commands::User { command } => cmd_user(&create_store(db_path)?, command),
        Commands::Post { command } => cmd_post(&create_store(db_path)?, command, require_login),
        Commands::List { viewer, json } => {
            cmd_list(&open_store(db_path)?, viewer.as_deref(), require_login, json)
        }
        Commands::Feed { viewer, limit } => {
            cmd_feed(&open_store(db_path)?, viewer.as_deref(), require_login, limit)
        }
        Commands::Show { post, viewer } => {
            cmd_show(&open_store(db_path)?, &post, viewer.as_deref(), require_login)
        }
        Commands::Matrix => cmd_matrix(&open_store(db_path)?, require_login),
    }
}

fn cmd_tag(store: &Store, command: TagCommand) -> Result<()> {
    match command {
        TagCommand::Add { name, master } => {
            let kind = if master {
                TagKind::Master
            } else {
                TagKind::Regular
            };
            let tag = store.create_tag(&name, kind)?;
            println!("Created {} tag '{}' ({})", tag.kind, tag.name, tag.id);
        }
        TagCommand::List => {
            let tags = store.tags()?;
            if tags.is_empty() {
                println!("No tags found.");
                return Ok(());
            }
            println!("{:<24}  {:<8}  ID", "NAME", "KIND");
            println!("{}", "-".repeat(72));
            for tag in tags {
                println!("{:<24}  {:<8}  {}", tag.name, tag.kind, tag.id);
            }
        }
        TagCommand::Kind { name, kind } => {
            let kind: TagKind = kind.parse()?;
            let tag = find_tag(store, &name)?;
            store.set_tag_kind(tag, kind)?;
            println!("Tag '{name}' is now {kind}");
        }
        TagCommand::Rm { name } => {
            store.delete_tag(find_tag(store, &name)?)?;
            println!("Deleted tag '{name}'");
        }
    }
    Ok(())
}

fn cmd_user(store: &Store, command: UserCommand) -> Result<()> {
    match command {
        UserCommand::Add { name, admin, tags } => {
            let tag_ids = find_tags(store, &tags)?;
            let user = store.create_user(&name, admin)?;
            for tag in tag_ids {
                store.grant_tag(user.id, tag)?;
            }
            println!(
                "Created {} '{}'",
                if user.is_admin { "admin" } else { "user" },
                user.name
            );
        }
        UserCommand::Grant { user, tag } => {
            let user_id = find_user(store, &user)?;
            store.grant_tag(user_id, find_tag(store, &tag)?)?;
            println!("Granted '{tag}' to '{user}'");
        }
        UserCommand::Revoke { user, tag } => {
            let user_id = find_user(store, &user)?;
            store.revoke_tag(user_id, find_tag(store, &tag)?)?;
            println!("Revoked '{tag}' from '{user}'");
        }
        UserCommand::List => {
            let users = store.users()?;
            if users.is_empty() {
                println!("No users found.");
                return Ok(());
            }
            println!("{:<24}  {:<6}  TAGS", "NAME", "ADMIN");
            println!("{}", "-".repeat(72));
            for user in users {
                let tags: Vec<String> = store
                    .held_tags(user.id)?
                    .into_iter()
                    .map(|tag| tag.name)
                    .collect();
                println!(
                    "{:<24}  {:<6}  {}",
                    user.name,
                    if user.is_admin { "yes" } else { "" },
                    tags.join(", ")
                );
            }
        }
    }
    Ok(())
}

fn cmd_post(store: &Store, command: PostCommand, require_login: bool) -> Result<()> {
    match command {
        PostCommand::Add {
            title,
            body,
            author,
            tags,
            draft,
            no_comments,
        } => {
            let mut new = NewPost::new(title)
                .body(body)
                .draft(draft)
                .comments_enabled(!no_comments);
            if let Some(author) = author {
                new = new.author(author);
            }
            for tag in find_tags(store, &tags)? {
                new = new.tag(tag);
            }
            let post = store.create_post(new)?;
            println!("Created post {}", post.id);
        }
        PostCommand::Publish { post } => {
            let post = find_post(&store.candidate_posts(true)?, &post)?;
            store.set_draft(post.id, false)?;
            println!("Published '{}'", post.title);
        }
        PostCommand::Tag { post, tag } => {
            let post = find_post(&store.candidate_posts(true)?, &post)?;
            store.tag_post(post.id, find_tag(store, &tag)?)?;
            println!("Tagged '{}' with '{tag}'", post.title);
        }
        PostCommand::Untag { post, tag } => {
            let post = find_post(&store.candidate_posts(true)?, &post)?;
            store.untag_post(post.id, find_tag(store, &tag)?)?;
            println!("Removed '{tag}' from '{}'", post.title);
        }
        PostCommand::Comment { post, viewer, body } => {
            let comment = comment_on(store, viewer.as_deref(), &post, &body, require_login)?;
            println!("Commented on post {} as '{}'", comment.post, comment.author);
        }
    }
    Ok(())
}

fn cmd_list(store: &Store, viewer: Option<&str>, require_login: bool, json: bool) -> Result<()> {
    let viewer = resolve_viewer(store, viewer)?;
    let posts = visible_items(&viewer, store.candidate_posts(viewer.is_admin())?, require_login);

    if json {
        println!("{}", serde_json::to_string_pretty(&posts)?);
        return Ok(());
    }
    print_posts(&posts);
    Ok(())
}

fn cmd_feed(store: &Store, viewer: Option<&str>, require_login: bool, limit: usize) -> Result<()> {
    let viewer = resolve_viewer(store, viewer)?;
    let posts = feed_items(&viewer, store.candidate_posts(false)?, require_login, limit);
    print_posts(&posts);
    Ok(())
}

fn cmd_show(store: &Store, prefix: &str, viewer: Option<&str>, require_login: bool) -> Result<()> {
    let viewer = resolve_viewer(store, viewer)?;
    let post = open_post(store, &viewer, prefix, require_login)?;

    println!("{}", post.title);
    println!("{}", "=".repeat(post.title.chars().count().max(3)));
    println!("ID:     {}", post.id);
    println!("Date:   {}", local_time(&post));
    if let Some(author) = &post.author {
        println!("Author: {author}");
    }
    if !post.tags.is_empty() {
        println!("Tags:   {}", tag_names(&post));
    }
    if post.draft {
        println!("Status: draft");
    }
    println!("\n{}", post.body);

    let comments = store.comments(post.id)?;
    if !comments.is_empty() {
        println!("\nComments ({}):", comments.len());
        for comment in comments {
            let at = Local.from_utc_datetime(&comment.created_at.naive_utc());
            println!("  {} on {}", comment.author, at.format("%Y-%m-%d %H:%M"));
            println!("    {}", comment.body);
        }
    }
    Ok(())
}

fn cmd_matrix(store: &Store, require_login: bool) -> Result<()> {
    let posts = store.candidate_posts(true)?;
    if posts.is_empty() {
        println!("No posts found.");
        return Ok(());
    }

    let mut viewers = vec![("(anonymous)".to_string(), Viewer::Anonymous)];
    for user in store.users()? {
        let viewer = store.viewer(Some(&user.name))?;
        viewers.push((user.name, viewer));
    }

    print!("{:<32}", "POST");
    for (name, _) in &viewers {
        print!("  {name:^12}");
    }
    println!();
    println!("{}", "-".repeat(32 + viewers.len() * 14));

    for post in &posts {
        let mut label = truncate(&post.title, 24);
        if post.draft {
            label.push_str(" [draft]");
        }
        print!("{label:<32}");
        for (_, viewer) in &viewers {
            let mark = if can_view(viewer, post, require_login) {
                "x"
            } else {
                "-"
            };
            print!("  {mark:^12}");
        }
        println!();
    }
    Ok(())
}

/// Look up a post for a single-post request and apply the visibility policy.
///
/// Anonymous viewers are sent to sign in before any lookup when login is
/// required, and on every denial otherwise. Drafts hidden from a signed-in
/// viewer are reported exactly like missing posts.
fn open_post(store: &Store, viewer: &Viewer, prefix: &str, require_login: bool) -> Result<Post> {
    if require_login && viewer.is_anonymous() {
        return Err(Error::SignInRequired {
            reason: "this site is members-only".to_string(),
        });
    }

    let post = find_post(&store.candidate_posts(true)?, prefix)?;
    let denial = match check(viewer, &post, require_login) {
        Decision::Allow => return Ok(post),
        Decision::Deny(denial) => denial,
    };

    debug!(post = %post.id, %viewer, %denial, "post hidden from viewer");
    match denial.outcome(viewer) {
        // Do not tell an anonymous viewer that a draft exists.
        Outcome::SignIn if denial == Denial::Draft => Err(Error::SignInRequired {
            reason: Denial::LoginRequired.to_string(),
        }),
        Outcome::SignIn => Err(Error::SignInRequired {
            reason: denial.to_string(),
        }),
        Outcome::NotFound => Err(Error::PostNotFound {
            prefix: prefix.to_string(),
        }),
        Outcome::Forbidden => Err(Error::Forbidden {
            reason: denial.to_string(),
        }),
    }
}

/// Leave a comment as `principal` on a post they can view.
///
/// Commenting always needs a signed-in user, whatever the login setting.
fn comment_on(
    store: &Store,
    principal: Option<&str>,
    prefix: &str,
    body: &str,
    require_login: bool,
) -> Result<Comment> {
    let Some(name) = principal else {
        return Err(Error::SignInRequired {
            reason: "comments need a signed-in user".to_string(),
        });
    };
    let viewer = resolve_viewer(store, Some(name))?;
    let post = open_post(store, &viewer, prefix, require_login)?;
    if !post.comments_enabled {
        return Err(Error::CommentsDisabled { title: post.title });
    }

    let author = find_user(store, name)?;
    Ok(store.add_comment(post.id, author, body)?)
}

fn find_post(posts: &[Post], prefix: &str) -> Result<Post> {
    let matching: Vec<_> = posts
        .iter()
        .filter(|p| p.id.to_string().starts_with(prefix))
        .collect();

    match matching.as_slice() {
        [] => Err(Error::PostNotFound {
            prefix: prefix.to_string(),
        }),
        [post] => Ok((*post).clone()),
        _ => Err(Error::AmbiguousPost {
            prefix: prefix.to_string(),
            matches: matching.iter().map(|p| p.id.to_string()).collect(),
        }),
    }
}

fn find_tag(store: &Store, name: &str) -> Result<TagId> {
    store
        .tag_by_name(name)?
        .map(|tag| tag.id)
        .ok_or_else(|| Error::TagNotFound {
            name: name.to_string(),
        })
}

fn find_tags(store: &Store, names: &[String]) -> Result<Vec<TagId>> {
    names.iter().map(|name| find_tag(store, name)).collect()
}

fn find_user(store: &Store, name: &str) -> Result<storage::UserId> {
    store
        .user_by_name(name)?
        .map(|user| user.id)
        .ok_or_else(|| Error::UserNotFound {
            name: name.to_string(),
        })
}

fn resolve_viewer(store: &Store, name: Option<&str>) -> Result<Viewer> {
    match store.viewer(name) {
        Err(storage::Error::NotFound(_)) => Err(Error::UserNotFound {
            name: name.unwrap_or_default().to_string(),
        }),
        other => Ok(other?),
    }
}

fn print_posts(posts: &[Post]) {
    if posts.is_empty() {
        println!("No posts found.");
        return;
    }

    println!("{:<8}  {:<16}  {:<32}  TAGS", "ID", "DATE", "TITLE");
    println!("{}", "-".repeat(80));
    for post in posts {
        let title = if post.draft {
            format!("{} [draft]", truncate(&post.title, 24))
        } else {
            truncate(&post.title, 32)
        };
        let id = post.id.to_string();
        println!(
            "{:<8}  {:<16}  {:<32}  {}",
            &id[..8],
            local_time(post),
            title,
            tag_names(post)
        );
    }
}

fn local_time(post: &Post) -> String {
    Local
        .from_utc_datetime(&post.published_at.naive_utc())
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

fn tag_names(post: &Post) -> String {
    post.tags
        .iter()
        .map(|tag| {
            if tag.is_master() {
                format!("{}*", tag.name)
            } else {
                tag.name.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max - 3).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

/// Open an existing store for reading.
fn open_store(path: &Path) -> Result<Store> {
    if !path.exists() {
        return Err(Error::DatabaseNotFound {
            path: path.to_path_buf(),
        });
    }

    Ok(Store::open(path)?)
}

/// Open the store, creating it and its directory if needed.
fn create_store(path: &Path) -> Result<Store> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    Ok(Store::open(path)?)
}
