//! Community board endpoints.
//!
//! - `GET|POST /api/community/posts`
//! - `GET /api/community/posts/:id`
//! - `GET|POST /api/community/posts/:id/comments`
//! - `GET|POST /api/community/comments/:id/replies`
//! - `POST /api/community/:kind/:id/vote`

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::{parse_id, ApiContext, SessionContext};
use crate::community;
use crate::events::Event;
use crate::models::{Comment, CommunityPost, Reply, VoteDirection, VoteTally, VoteTarget};

#[derive(Deserialize)]
pub struct PostListQuery {
    pub category: Option<String>,
}

#[derive(Deserialize)]
pub struct NewPostRequest {
    pub content: String,
    pub category: Option<String>,
}

#[derive(Deserialize)]
pub struct ContentRequest {
    pub content: String,
}

#[derive(Deserialize)]
pub struct VoteRequest {
    pub direction: VoteDirection,
}

pub async fn list_posts(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<PostListQuery>,
) -> Result<Json<Vec<CommunityPost>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let posts = community::list_posts(&conn, query.category.as_deref(), Some(&session.user.id))?;
    Ok(Json(posts))
}

pub async fn create_post(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Json(body): Json<NewPostRequest>,
) -> Result<(StatusCode, Json<CommunityPost>), ApiError> {
    let conn = ctx.core.open_db()?;
    let category = body.category.as_deref();
    let post = community::create_post(&conn, &session.user, &body.content, category)?;
    ctx.core.events.publish(Event::PostCreated { post: post.clone() });
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn get_post(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Result<Json<CommunityPost>, ApiError> {
    let post_id = parse_id(&id, "post")?;
    let conn = ctx.core.open_db()?;
    Ok(Json(community::get_post(&conn, &post_id, Some(&session.user.id))?))
}

pub async fn list_comments(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    let post_id = parse_id(&id, "post")?;
    let conn = ctx.core.open_db()?;
    Ok(Json(community::list_comments(&conn, &post_id, Some(&session.user.id))?))
}

pub async fn add_comment(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(body): Json<ContentRequest>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let post_id = parse_id(&id, "post")?;
    let mut conn = ctx.core.open_db()?;
    let comment = community::add_comment(&mut conn, &session.user, &post_id, &body.content)?;
    ctx.core.events.publish(Event::CommentAdded { comment: comment.clone() });
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn list_replies(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Reply>>, ApiError> {
    let comment_id = parse_id(&id, "comment")?;
    let conn = ctx.core.open_db()?;
    Ok(Json(community::list_replies(&conn, &comment_id, Some(&session.user.id))?))
}

pub async fn add_reply(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(body): Json<ContentRequest>,
) -> Result<(StatusCode, Json<Reply>), ApiError> {
    let comment_id = parse_id(&id, "comment")?;
    let conn = ctx.core.open_db()?;
    let (reply, post_id) = community::add_reply(&conn, &session.user, &comment_id, &body.content)?;
    ctx.core.events.publish(Event::ReplyAdded {
        post_id,
        reply: reply.clone(),
    });
    Ok((StatusCode::CREATED, Json(reply)))
}

pub async fn vote(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Path((kind, id)): Path<(String, String)>,
    Json(body): Json<VoteRequest>,
) -> Result<Json<VoteTally>, ApiError> {
    let target = match kind.as_str() {
        "posts" => VoteTarget::Post,
        "comments" => VoteTarget::Comment,
        "replies" => VoteTarget::Reply,
        other => return Err(ApiError::NotFound(format!("Unknown vote target: {other}"))),
    };
    let target_id = parse_id(&id, target.as_str())?;
    let mut conn = ctx.core.open_db()?;
    let tally =
        community::toggle_vote(&mut conn, &session.user.id, target, &target_id, body.direction)?;
    ctx.core.events.publish(Event::vote_changed(target, target_id, &tally));
    Ok(Json(tally))
}
