//! Conversions from database rows to response types.

use btchub_db::models::{
    DailyTipRow, ForumPostRow, LearningProgressRow, PortfolioEntryRow, PriceAlertRow, UserRow,
};
use btchub_types::api::{
    AlertKind, DailyTipResponse, ForumPostResponse, LearningProgressResponse,
    PortfolioEntryResponse, PriceAlertResponse, UserResponse,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone; they are UTC.
pub fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

pub fn user(row: UserRow) -> UserResponse {
    UserResponse {
        id: row.id,
        username: row.username,
        streak_days: row.streak_days,
        created_at: parse_timestamp(&row.created_at),
    }
}

pub fn post(row: ForumPostRow) -> ForumPostResponse {
    ForumPostResponse {
        id: row.id,
        user_id: row.user_id,
        username: row.username,
        title: row.title,
        content: row.content,
        categories: row.categories,
        upvotes: row.upvotes,
        downvotes: row.downvotes,
        comment_count: row.comment_count,
        is_reply: row.is_reply,
        parent_post_id: row.parent_post_id,
        mentions: row.mentions,
        hashtags: row.hashtags,
        image_url: row.image_url,
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
    }
}

pub fn alert(row: PriceAlertRow) -> PriceAlertResponse {
    PriceAlertResponse {
        id: row.id,
        user_id: row.user_id,
        kind: AlertKind::parse(&row.kind).unwrap_or_else(|| {
            warn!("Corrupt alert type '{}' on alert {}", row.kind, row.id);
            AlertKind::Above
        }),
        price: row.price,
        is_triggered: row.is_triggered,
        created_at: parse_timestamp(&row.created_at),
        notified_at: row.notified_at.as_deref().map(parse_timestamp),
    }
}

/// Bitcoin holdings are valued at `btc_price`; other assets are unpriced.
pub fn portfolio_entry(row: PortfolioEntryRow, btc_price: f64) -> PortfolioEntryResponse {
    let value = if is_bitcoin(&row.asset) {
        row.amount * btc_price
    } else {
        0.0
    };
    PortfolioEntryResponse {
        id: row.id,
        user_id: row.user_id,
        value,
        asset: row.asset,
        amount: row.amount,
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
    }
}

pub fn is_bitcoin(asset: &str) -> bool {
    asset.eq_ignore_ascii_case("bitcoin") || asset.eq_ignore_ascii_case("btc")
}

pub fn tip(row: DailyTipRow) -> DailyTipResponse {
    DailyTipResponse {
        id: row.id,
        title: row.title,
        content: row.content,
        category: row.category,
        created_at: parse_timestamp(&row.created_at),
    }
}

pub fn progress(row: LearningProgressRow) -> LearningProgressResponse {
    LearningProgressResponse {
        id: row.id,
        user_id: row.user_id,
        course_id: row.course_id,
        completed_lessons: row.completed_lessons,
        total_lessons: row.total_lessons,
        last_accessed_at: parse_timestamp(&row.last_accessed_at),
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn sqlite_and_rfc3339_timestamps() {
        let expected = Utc.with_ymd_and_hms(2025, 7, 1, 12, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2025-07-01 12:30:00"), expected);
        assert_eq!(parse_timestamp("2025-07-01T12:30:00Z"), expected);
        assert_eq!(parse_timestamp("garbage"), DateTime::<Utc>::default());
    }

    #[test]
    fn only_bitcoin_is_valued() {
        let row = |asset: &str| PortfolioEntryRow {
            id: 1,
            user_id: 1,
            asset: asset.into(),
            amount: 0.5,
            created_at: "2025-07-01 00:00:00".into(),
            updated_at: "2025-07-01 00:00:00".into(),
        };
        assert_eq!(portfolio_entry(row("bitcoin"), 100_000.0).value, 50_000.0);
        assert_eq!(portfolio_entry(row("BTC"), 100_000.0).value, 50_000.0);
        assert_eq!(portfolio_entry(row("ethereum"), 100_000.0).value, 0.0);
    }
}
