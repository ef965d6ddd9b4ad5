use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::legislation::LegislationData;

// -- JWT Claims --

/// Session claims. The signed token travels in the `connect.sid` cookie or an
/// `Authorization: Bearer` header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub streak_days: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

// -- Forum --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreatePostRequest {
    pub title: Option<String>,
    pub content: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub is_reply: bool,
    pub parent_post_id: Option<i64>,
    #[serde(default)]
    pub mentions: Vec<String>,
    #[serde(default)]
    pub hashtags: Vec<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumPostResponse {
    pub id: i64,
    pub user_id: Option<i64>,
    pub username: String,
    pub title: Option<String>,
    pub content: String,
    pub categories: Vec<String>,
    pub upvotes: i64,
    pub downvotes: i64,
    pub comment_count: i64,
    pub is_reply: bool,
    pub parent_post_id: Option<i64>,
    pub mentions: Vec<String>,
    pub hashtags: Vec<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToggleReactionRequest {
    #[serde(rename = "type")]
    pub reaction_type: String,
}

/// reaction type -> count
pub type ReactionCounts = BTreeMap<String, i64>;

// -- Portfolio --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateBitcoinHoldingRequest {
    pub amount: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateHoldingRequest {
    pub asset: String,
    pub amount: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioEntryResponse {
    pub id: i64,
    pub user_id: i64,
    pub asset: String,
    pub amount: f64,
    pub value: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioResponse {
    pub user_id: i64,
    pub entries: Vec<PortfolioEntryResponse>,
    pub total_value: f64,
}

// -- Price alerts --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Above,
    Below,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Above => "above",
            Self::Below => "below",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "above" => Some(Self::Above),
            "below" => Some(Self::Below),
            _ => None,
        }
    }

    /// Whether `current` satisfies an alert set at `threshold`.
    pub fn is_met(&self, threshold: f64, current: f64) -> bool {
        match self {
            Self::Above => current >= threshold,
            Self::Below => current <= threshold,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateAlertRequest {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub price: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceAlertResponse {
    pub id: i64,
    pub user_id: i64,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub price: f64,
    pub is_triggered: bool,
    pub created_at: DateTime<Utc>,
    pub notified_at: Option<DateTime<Utc>>,
}

// -- Tips & learning --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTipResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningProgressResponse {
    pub id: i64,
    pub user_id: i64,
    pub course_id: String,
    pub completed_lessons: i64,
    pub total_lessons: i64,
    pub last_accessed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateProgressRequest {
    pub course_id: String,
    pub completed_lessons: i64,
    pub total_lessons: Option<i64>,
}

// -- Legislation --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminUploadRequest {
    pub password: String,
    pub data: LegislationData,
}

#[derive(Debug, Serialize)]
pub struct AdminUploadResponse {
    pub success: bool,
    pub message: String,
    pub data: LegislationData,
}

// -- Uploads --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub url: String,
    pub filename: String,
    pub original_name: String,
    pub mimetype: String,
    pub size: u64,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub file: UploadedFile,
}
