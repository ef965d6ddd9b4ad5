use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::info;

use btchub_db::models::NewForumPost;
use btchub_types::api::{Claims, CreatePostRequest, ForumPostResponse, ReactionCounts, ToggleReactionRequest};

use crate::convert;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::{AppState, with_db};

const REACTION_TYPES: &[&str] = &["like", "love", "rocket", "fire", "upvote", "downvote"];
const MAX_CONTENT_CHARS: usize = 5000;

#[derive(Debug, Deserialize)]
pub struct LatestQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    5
}

fn parse_post_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request("Invalid post ID"))
}

pub async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<ForumPostResponse>>, ApiError> {
    let rows = with_db(&state, |db| db.get_forum_posts()).await?;
    Ok(Json(rows.into_iter().map(convert::post).collect()))
}

pub async fn latest_posts(
    State(state): State<AppState>,
    Query(query): Query<LatestQuery>,
) -> Result<Json<Vec<ForumPostResponse>>, ApiError> {
    let limit = query.limit.clamp(1, 50);
    let rows = with_db(&state, move |db| db.get_latest_forum_posts(limit)).await?;
    Ok(Json(rows.into_iter().map(convert::post).collect()))
}

pub async fn replies(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ForumPostResponse>>, ApiError> {
    let id = parse_post_id(&id)?;
    let rows = with_db(&state, move |db| db.get_post_replies(id)).await?;
    Ok(Json(rows.into_iter().map(convert::post).collect()))
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(req): JsonBody<CreatePostRequest>,
) -> Result<(StatusCode, Json<ForumPostResponse>), ApiError> {
    let content = req.content.trim();
    if content.is_empty() && req.image_url.is_none() {
        return Err(ApiError::bad_request("Post content is required"));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(ApiError::bad_request("Post content is too long"));
    }

    let parent_post_id = match (req.is_reply, req.parent_post_id) {
        (true, None) => return Err(ApiError::bad_request("Replies need a parentPostId")),
        (true, parent) => parent,
        (false, _) => None,
    };

    let post = NewForumPost {
        user_id: claims.sub,
        title: req.title.filter(|t| !t.trim().is_empty()),
        content: content.to_string(),
        categories: req.categories,
        is_reply: req.is_reply,
        parent_post_id,
        mentions: req.mentions,
        hashtags: req.hashtags,
        image_url: req.image_url,
    };

    let row = with_db(&state, move |db| {
        if let Some(parent) = post.parent_post_id {
            if db.get_forum_post(parent)?.is_none() {
                return Ok(None);
            }
        }
        db.create_forum_post(&post).map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::NotFound("Parent post not found".into()))?;

    Ok((StatusCode::CREATED, Json(convert::post(row))))
}

/// Returns the post's reaction counts after the toggle.
pub async fn toggle_reaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
    JsonBody(req): JsonBody<ToggleReactionRequest>,
) -> Result<Json<ReactionCounts>, ApiError> {
    let id = parse_post_id(&id)?;
    if !REACTION_TYPES.contains(&req.reaction_type.as_str()) {
        return Err(ApiError::bad_request("Invalid reaction type"));
    }

    let counts = with_db(&state, move |db| {
        if db.get_forum_post(id)?.is_none() {
            return Ok(None);
        }
        db.toggle_reaction(id, claims.sub, &req.reaction_type)?;
        db.get_post_reactions(id).map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::NotFound("Post not found".into()))?;

    Ok(Json(counts))
}

/// Moderation is reserved for the admin account.
pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    let id = parse_post_id(&id)?;
    if claims.username != state.admin_username {
        return Err(ApiError::Forbidden(format!(
            "Only {} can delete posts",
            state.admin_username
        )));
    }

    if !with_db(&state, move |db| db.delete_forum_post(id)).await? {
        return Err(ApiError::NotFound("Post not found".into()));
    }
    info!(post = id, by = %claims.username, "forum post deleted");
    Ok(StatusCode::NO_CONTENT)
}
