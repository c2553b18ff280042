//! Community board: posts, comments, replies, and up/down votes.

use chrono::Utc;
use rusqlite::{Connection, TransactionBehavior};
use thiserror::Error;
use uuid::Uuid;

use crate::db::{repository, DatabaseError};
use crate::models::*;

#[derive(Error, Debug)]
pub enum CommunityError {
    #[error("Please write something before posting")]
    EmptyContent,

    #[error("Post not found: {0}")]
    PostNotFound(Uuid),

    #[error("Comment not found: {0}")]
    CommentNotFound(Uuid),

    #[error("Nothing to vote on: {kind} {id}")]
    VoteTargetNotFound { kind: VoteTarget, id: Uuid },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<rusqlite::Error> for CommunityError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(DatabaseError::from(e))
    }
}

fn author_of(user: &User) -> Author {
    Author {
        id: user.id,
        name: user.name.clone(),
        role: user.role,
    }
}

fn clean_content(raw: &str) -> Result<String, CommunityError> {
    let content = raw.trim();
    if content.is_empty() {
        return Err(CommunityError::EmptyContent);
    }
    Ok(content.to_string())
}

/// Lowercase tag; blank means the default category.
pub fn normalize_category(raw: Option<&str>) -> String {
    match raw.map(str::trim).filter(|c| !c.is_empty()) {
        Some(c) => c.to_lowercase(),
        None => DEFAULT_CATEGORY.to_string(),
    }
}

// ─── Posts ───────────────────────────────────────────────

pub fn create_post(
    conn: &Connection,
    author: &User,
    content: &str,
    category: Option<&str>,
) -> Result<CommunityPost, CommunityError> {
    let post = CommunityPost {
        id: Uuid::new_v4(),
        author: author_of(author),
        content: clean_content(content)?,
        category: normalize_category(category),
        comment_count: 0,
        votes: VoteTally::default(),
        created_at: Utc::now(),
    };
    repository::insert_post(conn, &post)?;
    tracing::info!(post_id = %post.id, category = %post.category, "Post created");
    Ok(post)
}

/// Newest first. `category` of `None` (or "all") lists every post.
pub fn list_posts(
    conn: &Connection,
    category: Option<&str>,
    viewer: Option<&Uuid>,
) -> Result<Vec<CommunityPost>, CommunityError> {
    let filter = category
        .map(str::trim)
        .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
        .map(str::to_lowercase);
    Ok(repository::list_posts(conn, filter.as_deref(), viewer)?)
}

pub fn get_post(
    conn: &Connection,
    id: &Uuid,
    viewer: Option<&Uuid>,
) -> Result<CommunityPost, CommunityError> {
    repository::get_post(conn, id, viewer)?.ok_or(CommunityError::PostNotFound(*id))
}

// ─── Comments and replies ────────────────────────────────

/// Add a comment and bump the post's counter in one transaction.
pub fn add_comment(
    conn: &mut Connection,
    author: &User,
    post_id: &Uuid,
    content: &str,
) -> Result<Comment, CommunityError> {
    let content = clean_content(content)?;
    let tx = conn.transaction()?;
    if !repository::increment_comment_count(&tx, post_id)? {
        return Err(CommunityError::PostNotFound(*post_id));
    }
    let comment = Comment {
        id: Uuid::new_v4(),
        post_id: *post_id,
        author: author_of(author),
        content,
        votes: VoteTally::default(),
        created_at: Utc::now(),
    };
    repository::insert_comment(&tx, &comment)?;
    tx.commit()?;
    Ok(comment)
}

pub fn list_comments(
    conn: &Connection,
    post_id: &Uuid,
    viewer: Option<&Uuid>,
) -> Result<Vec<Comment>, CommunityError> {
    if !repository::vote_target_exists(conn, VoteTarget::Post, post_id)? {
        return Err(CommunityError::PostNotFound(*post_id));
    }
    Ok(repository::list_comments(conn, post_id, viewer)?)
}

/// Reply to a comment. Also returns the id of the post the thread hangs off.
pub fn add_reply(
    conn: &Connection,
    author: &User,
    comment_id: &Uuid,
    content: &str,
) -> Result<(Reply, Uuid), CommunityError> {
    let content = clean_content(content)?;
    let post_id = repository::get_comment_post_id(conn, comment_id)?
        .ok_or(CommunityError::CommentNotFound(*comment_id))?;
    let reply = Reply {
        id: Uuid::new_v4(),
        comment_id: *comment_id,
        author: author_of(author),
        content,
        votes: VoteTally::default(),
        created_at: Utc::now(),
    };
    repository::insert_reply(conn, &reply)?;
    Ok((reply, post_id))
}

pub fn list_replies(
    conn: &Connection,
    comment_id: &Uuid,
    viewer: Option<&Uuid>,
) -> Result<Vec<Reply>, CommunityError> {
    if repository::get_comment_post_id(conn, comment_id)?.is_none() {
        return Err(CommunityError::CommentNotFound(*comment_id));
    }
    Ok(repository::list_replies(conn, comment_id, viewer)?)
}

// ─── Votes ───────────────────────────────────────────────

/// The user's vote after pressing `pressed`: the same direction again
/// clears it, the other direction moves it.
pub fn next_vote(current: Option<VoteDirection>, pressed: VoteDirection) -> Option<VoteDirection> {
    if current == Some(pressed) {
        None
    } else {
        Some(pressed)
    }
}

/// Toggle a vote and return the recomputed tally.
pub fn toggle_vote(
    conn: &mut Connection,
    user_id: &Uuid,
    kind: VoteTarget,
    target_id: &Uuid,
    pressed: VoteDirection,
) -> Result<VoteTally, CommunityError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    if !repository::vote_target_exists(&tx, kind, target_id)? {
        return Err(CommunityError::VoteTargetNotFound { kind, id: *target_id });
    }

    let current = repository::get_user_vote(&tx, kind, target_id, user_id)?;
    match next_vote(current, pressed) {
        Some(direction) => repository::upsert_vote(&tx, kind, target_id, user_id, direction)?,
        None => repository::delete_vote(&tx, kind, target_id, user_id)?,
    }
    let tally = repository::get_vote_tally(&tx, kind, target_id, Some(user_id))?;
    tx.commit()?;

    tracing::debug!(
        target = kind.as_str(),
        target_id = %target_id,
        score = tally.score,
        "Vote toggled"
    );
    Ok(tally)
}
