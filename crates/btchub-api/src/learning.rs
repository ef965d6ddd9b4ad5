use axum::{
    Extension, Json,
    extract::{Path, State},
};
use chrono::{Datelike, Utc};
use serde::Deserialize;

use btchub_quiz::{GameConfig, GameSummary, QuizSession, SessionSummary};
use btchub_types::api::{Claims, DailyTipResponse, LearningProgressResponse, UpdateProgressRequest};

use crate::convert;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::{AppState, with_db};

const DEFAULT_COURSE: &str = "bitcoin-basics";
const DEFAULT_TOTAL_LESSONS: i64 = 10;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoreRequest {
    /// Chosen option per level in order; `null` skips a level.
    pub answers: Vec<Option<usize>>,
}

fn fallback_tip() -> DailyTipResponse {
    DailyTipResponse {
        id: 0,
        title: "Not your keys, not your coins".into(),
        content: "Move long-term savings off exchanges into a wallet where you hold the private keys."
            .into(),
        category: "Security".into(),
        created_at: Utc::now(),
    }
}

/// Same tip for everyone on a given day.
pub async fn daily_tip(State(state): State<AppState>) -> Result<Json<DailyTipResponse>, ApiError> {
    let day = Utc::now().ordinal();
    let tip = with_db(&state, move |db| db.get_daily_tip(day)).await?;
    Ok(Json(tip.map(convert::tip).unwrap_or_else(fallback_tip)))
}

pub async fn get_progress(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<LearningProgressResponse>, ApiError> {
    let user_id = claims.sub;
    let row = with_db(&state, move |db| db.get_learning_progress(user_id)).await?;
    Ok(Json(row.map(convert::progress).unwrap_or_else(|| {
        let now = Utc::now();
        LearningProgressResponse {
            id: 0,
            user_id,
            course_id: DEFAULT_COURSE.into(),
            completed_lessons: 0,
            total_lessons: DEFAULT_TOTAL_LESSONS,
            last_accessed_at: now,
            created_at: now,
            updated_at: now,
        }
    })))
}

pub async fn update_progress(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(req): JsonBody<UpdateProgressRequest>,
) -> Result<Json<LearningProgressResponse>, ApiError> {
    if req.course_id.trim().is_empty() {
        return Err(ApiError::bad_request("courseId is required"));
    }
    if req.completed_lessons < 0 {
        return Err(ApiError::bad_request("completedLessons cannot be negative"));
    }
    if let Some(total) = req.total_lessons {
        if total < 1 || req.completed_lessons > total {
            return Err(ApiError::bad_request("Invalid totalLessons"));
        }
    }

    let row = with_db(&state, move |db| {
        db.upsert_learning_progress(
            claims.sub,
            req.course_id.trim(),
            req.completed_lessons,
            req.total_lessons,
        )
    })
    .await?;
    Ok(Json(convert::progress(row)))
}

pub async fn list_games(State(state): State<AppState>) -> Json<Vec<GameSummary>> {
    Json(state.catalog.list())
}

pub async fn get_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<GameConfig>, ApiError> {
    state
        .catalog
        .get(&id)
        .map(|game| Json(game.as_ref().clone()))
        .ok_or_else(|| ApiError::NotFound(format!("Unknown game {id}")))
}

/// Score a finished run server-side.
pub async fn score_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<ScoreRequest>,
) -> Result<Json<SessionSummary>, ApiError> {
    let game = state
        .catalog
        .get(&id)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown game {id}")))?;
    if req.answers.len() > game.levels.len() {
        return Err(ApiError::bad_request(format!(
            "{id} has {} levels, got {} answers",
            game.levels.len(),
            req.answers.len()
        )));
    }

    QuizSession::replay(game, &req.answers)
        .map(Json)
        .map_err(|e| ApiError::bad_request(e.to_string()))
}
