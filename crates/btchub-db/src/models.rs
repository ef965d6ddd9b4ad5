//! Database row types. These map directly to SQLite rows.
//! Distinct from btchub-types API models to keep the DB layer independent.
//! Timestamps are SQLite `datetime('now')` text ("YYYY-MM-DD HH:MM:SS", UTC).

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub streak_days: i64,
    pub last_login_at: Option<String>,
    pub created_at: String,
}

pub struct ForumPostRow {
    pub id: i64,
    pub user_id: Option<i64>,
    /// Joined from `users`; "Unknown" when the author row is gone.
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
    pub created_at: String,
    pub updated_at: String,
}

/// Insert payload for a forum post.
#[derive(Default)]
pub struct NewForumPost {
    pub user_id: i64,
    pub title: Option<String>,
    pub content: String,
    pub categories: Vec<String>,
    pub is_reply: bool,
    pub parent_post_id: Option<i64>,
    pub mentions: Vec<String>,
    pub hashtags: Vec<String>,
    pub image_url: Option<String>,
}

pub struct PriceAlertRow {
    pub id: i64,
    pub user_id: i64,
    pub kind: String,
    pub price: f64,
    pub is_triggered: bool,
    pub created_at: String,
    pub notified_at: Option<String>,
}

pub struct PortfolioEntryRow {
    pub id: i64,
    pub user_id: i64,
    pub asset: String,
    pub amount: f64,
    pub created_at: String,
    pub updated_at: String,
}

pub struct DailyTipRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: String,
    pub created_at: String,
}

pub struct LearningProgressRow {
    pub id: i64,
    pub user_id: i64,
    pub course_id: String,
    pub completed_lessons: i64,
    pub total_lessons: i64,
    pub last_accessed_at: String,
    pub created_at: String,
    pub updated_at: String,
}
