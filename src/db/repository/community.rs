use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{timestamp_from_db, timestamp_to_db, uuid_from_db};
use crate::db::DatabaseError;
use crate::models::*;

// ═══════════════════════════════════════════════════════════
// Posts
// ═══════════════════════════════════════════════════════════

pub fn insert_post(conn: &Connection, post: &CommunityPost) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO community_posts (id, author_id, author_name, author_role, content, category,
         comment_count, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            post.id.to_string(),
            post.author.id.to_string(),
            post.author.name,
            post.author.role.as_str(),
            post.content,
            post.category,
            post.comment_count,
            timestamp_to_db(&post.created_at),
        ],
    )?;
    Ok(())
}

/// Posts newest first, optionally restricted to one category. Vote tallies
/// carry `viewer`'s own vote when given.
pub fn list_posts(
    conn: &Connection,
    category: Option<&str>,
    viewer: Option<&Uuid>,
) -> Result<Vec<CommunityPost>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, author_id, author_name, author_role, content, category, comment_count,
                created_at
         FROM community_posts
         WHERE ?1 IS NULL OR category = ?1
         ORDER BY created_at DESC, rowid DESC",
    )?;
    let rows = stmt.query_map(params![category], post_row_from_rusqlite)?;

    let mut posts = Vec::new();
    for row in rows {
        posts.push(post_from_row(conn, row?, viewer)?);
    }
    Ok(posts)
}

pub fn get_post(
    conn: &Connection,
    id: &Uuid,
    viewer: Option<&Uuid>,
) -> Result<Option<CommunityPost>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, author_id, author_name, author_role, content, category, comment_count,
                    created_at
             FROM community_posts WHERE id = ?1",
            params![id.to_string()],
            post_row_from_rusqlite,
        )
        .optional()?;
    row.map(|r| post_from_row(conn, r, viewer)).transpose()
}

pub fn increment_comment_count(conn: &Connection, post_id: &Uuid) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE community_posts SET comment_count = comment_count + 1 WHERE id = ?1",
        params![post_id.to_string()],
    )?;
    Ok(updated == 1)
}

struct PostRow {
    id: String,
    author_id: String,
    author_name: String,
    author_role: String,
    content: String,
    category: String,
    comment_count: u32,
    created_at: String,
}

fn post_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<PostRow, rusqlite::Error> {
    Ok(PostRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author_name: row.get(2)?,
        author_role: row.get(3)?,
        content: row.get(4)?,
        category: row.get(5)?,
        comment_count: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn post_from_row(
    conn: &Connection,
    row: PostRow,
    viewer: Option<&Uuid>,
) -> Result<CommunityPost, DatabaseError> {
    let id = uuid_from_db("community_posts.id", &row.id)?;
    Ok(CommunityPost {
        votes: get_vote_tally(conn, VoteTarget::Post, &id, viewer)?,
        id,
        author: Author {
            id: uuid_from_db("community_posts.author_id", &row.author_id)?,
            name: row.author_name,
            role: Role::from_str(&row.author_role)?,
        },
        content: row.content,
        category: row.category,
        comment_count: row.comment_count,
        created_at: timestamp_from_db("community_posts.created_at", &row.created_at)?,
    })
}

// ═══════════════════════════════════════════════════════════
// Comments and replies
// ═══════════════════════════════════════════════════════════

pub fn insert_comment(conn: &Connection, comment: &Comment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO community_comments
             (id, post_id, author_id, author_name, author_role, content, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            comment.id.to_string(),
            comment.post_id.to_string(),
            comment.author.id.to_string(),
            comment.author.name,
            comment.author.role.as_str(),
            comment.content,
            timestamp_to_db(&comment.created_at),
        ],
    )?;
    Ok(())
}

/// Comments on a post, oldest first.
pub fn list_comments(
    conn: &Connection,
    post_id: &Uuid,
    viewer: Option<&Uuid>,
) -> Result<Vec<Comment>, DatabaseError> {
    let rows = query_threaded(
        conn,
        "SELECT id, post_id, author_id, author_name, author_role, content, created_at
         FROM community_comments WHERE post_id = ?1 ORDER BY created_at, rowid",
        post_id,
    )?;

    let mut comments = Vec::new();
    for row in rows {
        let id = uuid_from_db("community_comments.id", &row.id)?;
        comments.push(Comment {
            votes: get_vote_tally(conn, VoteTarget::Comment, &id, viewer)?,
            id,
            post_id: uuid_from_db("community_comments.post_id", &row.parent_id)?,
            author: row.author()?,
            content: row.content,
            created_at: timestamp_from_db("community_comments.created_at", &row.created_at)?,
        });
    }
    Ok(comments)
}

pub fn insert_reply(conn: &Connection, reply: &Reply) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO community_replies
             (id, comment_id, author_id, author_name, author_role, content, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            reply.id.to_string(),
            reply.comment_id.to_string(),
            reply.author.id.to_string(),
            reply.author.name,
            reply.author.role.as_str(),
            reply.content,
            timestamp_to_db(&reply.created_at),
        ],
    )?;
    Ok(())
}

/// Replies to a comment, oldest first.
pub fn list_replies(
    conn: &Connection,
    comment_id: &Uuid,
    viewer: Option<&Uuid>,
) -> Result<Vec<Reply>, DatabaseError> {
    let rows = query_threaded(
        conn,
        "SELECT id, comment_id, author_id, author_name, author_role, content, created_at
         FROM community_replies WHERE comment_id = ?1 ORDER BY created_at, rowid",
        comment_id,
    )?;

    let mut replies = Vec::new();
    for row in rows {
        let id = uuid_from_db("community_replies.id", &row.id)?;
        replies.push(Reply {
            votes: get_vote_tally(conn, VoteTarget::Reply, &id, viewer)?,
            id,
            comment_id: uuid_from_db("community_replies.comment_id", &row.parent_id)?,
            author: row.author()?,
            content: row.content,
            created_at: timestamp_from_db("community_replies.created_at", &row.created_at)?,
        });
    }
    Ok(replies)
}

/// Post id of a comment, if the comment exists.
pub fn get_comment_post_id(
    conn: &Connection,
    comment_id: &Uuid,
) -> Result<Option<Uuid>, DatabaseError> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT post_id FROM community_comments WHERE id = ?1",
            params![comment_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    raw.map(|s| uuid_from_db("community_comments.post_id", &s)).transpose()
}

// Comments and replies share a column layout.
struct ThreadedRow {
    id: String,
    parent_id: String,
    author_id: String,
    author_name: String,
    author_role: String,
    content: String,
    created_at: String,
}

impl ThreadedRow {
    fn author(&self) -> Result<Author, DatabaseError> {
        Ok(Author {
            id: uuid_from_db("author_id", &self.author_id)?,
            name: self.author_name.clone(),
            role: Role::from_str(&self.author_role)?,
        })
    }
}

fn query_threaded(
    conn: &Connection,
    sql: &str,
    parent_id: &Uuid,
) -> Result<Vec<ThreadedRow>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![parent_id.to_string()], |row| {
        Ok(ThreadedRow {
            id: row.get(0)?,
            parent_id: row.get(1)?,
            author_id: row.get(2)?,
            author_name: row.get(3)?,
            author_role: row.get(4)?,
            content: row.get(5)?,
            created_at: row.get(6)?,
        })
    })?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

// ═══════════════════════════════════════════════════════════
// Votes
// ═══════════════════════════════════════════════════════════

pub fn vote_target_exists(
    conn: &Connection,
    kind: VoteTarget,
    id: &Uuid,
) -> Result<bool, DatabaseError> {
    let sql = match kind {
        VoteTarget::Post => "SELECT EXISTS(SELECT 1 FROM community_posts WHERE id = ?1)",
        VoteTarget::Comment => "SELECT EXISTS(SELECT 1 FROM community_comments WHERE id = ?1)",
        VoteTarget::Reply => "SELECT EXISTS(SELECT 1 FROM community_replies WHERE id = ?1)",
    };
    let exists = conn.query_row(sql, params![id.to_string()], |row| row.get::<_, bool>(0))?;
    Ok(exists)
}

pub fn get_user_vote(
    conn: &Connection,
    kind: VoteTarget,
    target_id: &Uuid,
    user_id: &Uuid,
) -> Result<Option<VoteDirection>, DatabaseError> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT direction FROM community_votes
             WHERE target_kind = ?1 AND target_id = ?2 AND user_id = ?3",
            params![kind.as_str(), target_id.to_string(), user_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    raw.map(|s| VoteDirection::from_str(&s)).transpose()
}

/// Record the user's vote, replacing any earlier one for the same item.
pub fn upsert_vote(
    conn: &Connection,
    kind: VoteTarget,
    target_id: &Uuid,
    user_id: &Uuid,
    direction: VoteDirection,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO community_votes (target_kind, target_id, user_id, direction)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (target_kind, target_id, user_id)
         DO UPDATE SET direction = excluded.direction",
        params![kind.as_str(), target_id.to_string(), user_id.to_string(), direction.as_str()],
    )?;
    Ok(())
}

pub fn delete_vote(
    conn: &Connection,
    kind: VoteTarget,
    target_id: &Uuid,
    user_id: &Uuid,
) -> Result<(), DatabaseError> {
    conn.execute(
        "DELETE FROM community_votes WHERE target_kind = ?1 AND target_id = ?2 AND user_id = ?3",
        params![kind.as_str(), target_id.to_string(), user_id.to_string()],
    )?;
    Ok(())
}

/// Tally computed from the vote rows.
pub fn get_vote_tally(
    conn: &Connection,
    kind: VoteTarget,
    target_id: &Uuid,
    viewer: Option<&Uuid>,
) -> Result<VoteTally, DatabaseError> {
    let (upvotes, downvotes) = conn.query_row(
        "SELECT COALESCE(SUM(direction = 'up'), 0), COALESCE(SUM(direction = 'down'), 0)
         FROM community_votes WHERE target_kind = ?1 AND target_id = ?2",
        params![kind.as_str(), target_id.to_string()],
        |row| Ok((row.get::<_, u32>(0)?, row.get::<_, u32>(1)?)),
    )?;
    let user_vote = match viewer {
        Some(user_id) => get_user_vote(conn, kind, target_id, user_id)?,
        None => None,
    };
    Ok(VoteTally::new(upvotes, downvotes, user_vote))
}
