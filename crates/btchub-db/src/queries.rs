use std::collections::BTreeMap;

use crate::models::{
    DailyTipRow, ForumPostRow, LearningProgressRow, NewForumPost, PortfolioEntryRow, PriceAlertRow,
    UserRow,
};
use crate::Database;
use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, Row};

/// Reaction types that count towards a post's `upvotes`.
const UPVOTE_REACTIONS: &[&str] = &["like", "love", "rocket", "fire", "upvote"];

const SQLITE_TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S";

const POST_SELECT: &str =
    "SELECT p.id, p.user_id, u.username, p.title, p.content, p.categories, p.upvotes, p.downvotes,
            p.comment_count, p.is_reply, p.parent_post_id, p.mentions, p.hashtags, p.image_url,
            p.created_at, p.updated_at
     FROM forum_posts p
     LEFT JOIN users u ON p.user_id = u.id";

impl Database {
    // -- Users --

    pub fn create_user(&self, username: &str, password_hash: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, password) VALUES (?1, ?2)",
                (username, password_hash),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username = ?1", username))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", id))
    }

    /// Stamp a login and advance the daily streak.
    /// Same day keeps the streak, the following day extends it, any gap resets to 1.
    /// Returns the new streak.
    pub fn record_login(&self, user_id: i64, now: DateTime<Utc>) -> Result<i64> {
        self.with_conn(|conn| {
            let (streak, last_login): (i64, Option<String>) = conn
                .query_row(
                    "SELECT streak_days, last_login_at FROM users WHERE id = ?1",
                    [user_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?
                .ok_or_else(|| anyhow!("User not found: {}", user_id))?;

            let last_day = last_login.as_deref().and_then(parse_day);
            let streak = next_streak(streak, last_day, now.date_naive());

            conn.execute(
                "UPDATE users SET streak_days = ?1, last_login_at = ?2 WHERE id = ?3",
                rusqlite::params![streak, now.format(SQLITE_TIMESTAMP).to_string(), user_id],
            )?;
            Ok(streak)
        })
    }

    // -- Forum --

    /// Top-level posts, newest first.
    pub fn get_forum_posts(&self) -> Result<Vec<ForumPostRow>> {
        self.with_conn(|conn| {
            query_posts(
                conn,
                &format!("{POST_SELECT} WHERE p.is_reply = 0 ORDER BY p.created_at DESC, p.id DESC"),
                [],
            )
        })
    }

    pub fn get_latest_forum_posts(&self, limit: u32) -> Result<Vec<ForumPostRow>> {
        self.with_conn(|conn| {
            query_posts(
                conn,
                &format!(
                    "{POST_SELECT} WHERE p.is_reply = 0 ORDER BY p.created_at DESC, p.id DESC LIMIT ?1"
                ),
                [limit],
            )
        })
    }

    pub fn get_forum_post(&self, id: i64) -> Result<Option<ForumPostRow>> {
        self.with_conn(|conn| {
            let mut rows = query_posts(conn, &format!("{POST_SELECT} WHERE p.id = ?1"), [id])?;
            Ok(rows.pop())
        })
    }

    /// Replies to a post, oldest first.
    pub fn get_post_replies(&self, post_id: i64) -> Result<Vec<ForumPostRow>> {
        self.with_conn(|conn| {
            query_posts(
                conn,
                &format!(
                    "{POST_SELECT} WHERE p.parent_post_id = ?1 AND p.is_reply = 1
                     ORDER BY p.created_at ASC, p.id ASC"
                ),
                [post_id],
            )
        })
    }

    /// Insert a post. A reply bumps its parent's `comment_count` in the same transaction.
    pub fn create_forum_post(&self, post: &NewForumPost) -> Result<ForumPostRow> {
        let id = self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO forum_posts
                    (user_id, title, content, categories, is_reply, parent_post_id, mentions, hashtags, image_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    post.user_id,
                    post.title,
                    post.content,
                    serde_json::to_string(&post.categories)?,
                    post.is_reply,
                    post.parent_post_id,
                    serde_json::to_string(&post.mentions)?,
                    serde_json::to_string(&post.hashtags)?,
                    post.image_url,
                ],
            )?;
            let id = tx.last_insert_rowid();

            if let (true, Some(parent_id)) = (post.is_reply, post.parent_post_id) {
                tx.execute(
                    "UPDATE forum_posts SET comment_count = comment_count + 1 WHERE id = ?1",
                    [parent_id],
                )?;
            }

            tx.commit()?;
            Ok(id)
        })?;

        self.get_forum_post(id)?
            .ok_or_else(|| anyhow!("Post vanished after insert: {}", id))
    }

    /// Toggle a reaction: removes if exists, inserts if not, then recomputes
    /// the post's vote counters. Returns true when the reaction was added.
    pub fn toggle_reaction(&self, post_id: i64, user_id: i64, reaction_type: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let existing: Option<i64> = tx
                .query_row(
                    "SELECT id FROM post_reactions WHERE post_id = ?1 AND user_id = ?2 AND reaction_type = ?3",
                    rusqlite::params![post_id, user_id, reaction_type],
                    |row| row.get(0),
                )
                .optional()?;

            let added = if let Some(existing_id) = existing {
                tx.execute("DELETE FROM post_reactions WHERE id = ?1", [existing_id])?;
                false
            } else {
                tx.execute(
                    "INSERT INTO post_reactions (post_id, user_id, reaction_type) VALUES (?1, ?2, ?3)",
                    rusqlite::params![post_id, user_id, reaction_type],
                )?;
                true
            };

            let counts = query_reaction_counts(&tx, post_id)?;
            let upvotes: i64 = UPVOTE_REACTIONS
                .iter()
                .filter_map(|kind| counts.get(*kind))
                .sum();
            let downvotes = counts.get("downvote").copied().unwrap_or(0);

            tx.execute(
                "UPDATE forum_posts SET upvotes = ?1, downvotes = ?2, updated_at = datetime('now') WHERE id = ?3",
                rusqlite::params![upvotes, downvotes, post_id],
            )?;

            tx.commit()?;
            Ok(added)
        })
    }

    pub fn get_post_reactions(&self, post_id: i64) -> Result<BTreeMap<String, i64>> {
        self.with_conn(|conn| query_reaction_counts(conn, post_id))
    }

    /// Delete a post with its reactions and replies. Returns false when no such post.
    pub fn delete_forum_post(&self, post_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let parent: Option<Option<i64>> = tx
                .query_row(
                    "SELECT parent_post_id FROM forum_posts WHERE id = ?1",
                    [post_id],
                    |row| row.get(0),
                )
                .optional()?;

            let Some(parent) = parent else {
                return Ok(false);
            };

            tx.execute("DELETE FROM forum_posts WHERE id = ?1", [post_id])?;
            if let Some(parent_id) = parent {
                tx.execute(
                    "UPDATE forum_posts SET comment_count = MAX(comment_count - 1, 0) WHERE id = ?1",
                    [parent_id],
                )?;
            }

            tx.commit()?;
            Ok(true)
        })
    }

    // -- Portfolio --

    /// One row per (user, asset); the latest write wins.
    pub fn upsert_portfolio_entry(&self, user_id: i64, asset: &str, amount: f64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO portfolio_entries (user_id, asset, amount) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id, asset)
                 DO UPDATE SET amount = excluded.amount, updated_at = datetime('now')",
                rusqlite::params![user_id, asset, amount],
            )?;
            Ok(())
        })
    }

    pub fn get_portfolio_entries(&self, user_id: i64) -> Result<Vec<PortfolioEntryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, asset, amount, created_at, updated_at
                 FROM portfolio_entries WHERE user_id = ?1 ORDER BY asset",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(PortfolioEntryRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        asset: row.get(2)?,
                        amount: row.get(3)?,
                        created_at: row.get(4)?,
                        updated_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Price alerts --

    pub fn create_price_alert(&self, user_id: i64, kind: &str, price: f64) -> Result<PriceAlertRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO price_alerts (user_id, type, price) VALUES (?1, ?2, ?3)",
                rusqlite::params![user_id, kind, price],
            )?;
            let id = conn.last_insert_rowid();
            let mut rows = query_alerts(conn, "id = ?1", id)?;
            rows.pop().ok_or_else(|| anyhow!("Alert vanished after insert: {}", id))
        })
    }

    pub fn get_price_alerts(&self, user_id: i64) -> Result<Vec<PriceAlertRow>> {
        self.with_conn(|conn| query_alerts(conn, "user_id = ?1", user_id))
    }

    /// Only the owner can delete. Returns false when nothing matched.
    pub fn delete_price_alert(&self, id: i64, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM price_alerts WHERE id = ?1 AND user_id = ?2",
                [id, user_id],
            )?;
            Ok(n > 0)
        })
    }

    /// Flag an alert as fired. Already-triggered alerts are left untouched.
    pub fn mark_alert_triggered(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE price_alerts SET is_triggered = 1, notified_at = datetime('now')
                 WHERE id = ?1 AND is_triggered = 0",
                [id],
            )?;
            Ok(n > 0)
        })
    }

    // -- Daily tips --

    /// Deterministic pick: `day_of_year % tip_count` over tips ordered by id.
    pub fn get_daily_tip(&self, day_of_year: u32) -> Result<Option<DailyTipRow>> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM daily_tips", [], |row| row.get(0))?;
            if count == 0 {
                return Ok(None);
            }
            let offset = i64::from(day_of_year) % count;

            let row = conn
                .query_row(
                    "SELECT id, title, content, category, created_at FROM daily_tips
                     ORDER BY id LIMIT 1 OFFSET ?1",
                    [offset],
                    |row| {
                        Ok(DailyTipRow {
                            id: row.get(0)?,
                            title: row.get(1)?,
                            content: row.get(2)?,
                            category: row.get(3)?,
                            created_at: row.get(4)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    // -- Learning progress --

    /// Most recently accessed course for the user.
    pub fn get_learning_progress(&self, user_id: i64) -> Result<Option<LearningProgressRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, user_id, course_id, completed_lessons, total_lessons,
                            last_accessed_at, created_at, updated_at
                     FROM learning_progress WHERE user_id = ?1
                     ORDER BY last_accessed_at DESC, id DESC LIMIT 1",
                    [user_id],
                    map_progress,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn upsert_learning_progress(
        &self,
        user_id: i64,
        course_id: &str,
        completed_lessons: i64,
        total_lessons: Option<i64>,
    ) -> Result<LearningProgressRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO learning_progress (user_id, course_id, completed_lessons, total_lessons)
                 VALUES (?1, ?2, ?3, COALESCE(?4, 10))
                 ON CONFLICT(user_id, course_id) DO UPDATE SET
                    completed_lessons = excluded.completed_lessons,
                    total_lessons = COALESCE(?4, learning_progress.total_lessons),
                    last_accessed_at = datetime('now'),
                    updated_at = datetime('now')",
                rusqlite::params![user_id, course_id, completed_lessons, total_lessons],
            )?;

            let row = conn.query_row(
                "SELECT id, user_id, course_id, completed_lessons, total_lessons,
                        last_accessed_at, created_at, updated_at
                 FROM learning_progress WHERE user_id = ?1 AND course_id = ?2",
                rusqlite::params![user_id, course_id],
                map_progress,
            )?;
            Ok(row)
        })
    }
}

fn query_user<P: rusqlite::ToSql>(conn: &Connection, filter: &str, value: P) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, username, password, streak_days, last_login_at, created_at FROM users WHERE {filter}"
    ))?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                streak_days: row.get(3)?,
                last_login_at: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_posts<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<ForumPostRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, |row| {
            Ok(ForumPostRow {
                id: row.get(0)?,
                user_id: row.get(1)?,
                username: row.get::<_, Option<String>>(2)?.unwrap_or_else(|| "Unknown".to_string()),
                title: row.get(3)?,
                content: row.get(4)?,
                categories: json_list(row, 5)?,
                upvotes: row.get(6)?,
                downvotes: row.get(7)?,
                comment_count: row.get(8)?,
                is_reply: row.get(9)?,
                parent_post_id: row.get(10)?,
                mentions: json_list(row, 11)?,
                hashtags: json_list(row, 12)?,
                image_url: row.get(13)?,
                created_at: row.get(14)?,
                updated_at: row.get(15)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn query_reaction_counts(conn: &Connection, post_id: i64) -> Result<BTreeMap<String, i64>> {
    let mut stmt = conn.prepare(
        "SELECT reaction_type, COUNT(*) FROM post_reactions WHERE post_id = ?1 GROUP BY reaction_type",
    )?;
    let counts = stmt
        .query_map([post_id], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<std::result::Result<BTreeMap<_, _>, _>>()?;
    Ok(counts)
}

fn query_alerts(conn: &Connection, filter: &str, value: i64) -> Result<Vec<PriceAlertRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, user_id, type, price, is_triggered, created_at, notified_at
         FROM price_alerts WHERE {filter} ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt
        .query_map([value], |row| {
            Ok(PriceAlertRow {
                id: row.get(0)?,
                user_id: row.get(1)?,
                kind: row.get(2)?,
                price: row.get(3)?,
                is_triggered: row.get(4)?,
                created_at: row.get(5)?,
                notified_at: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_progress(row: &Row<'_>) -> rusqlite::Result<LearningProgressRow> {
    Ok(LearningProgressRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        course_id: row.get(2)?,
        completed_lessons: row.get(3)?,
        total_lessons: row.get(4)?,
        last_accessed_at: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Decode a JSON string-array column.
fn json_list(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_day(timestamp: &str) -> Option<NaiveDate> {
    timestamp
        .get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
}

fn next_streak(current: i64, last_login: Option<NaiveDate>, today: NaiveDate) -> i64 {
    match last_login {
        Some(day) if day == today => current.max(1),
        Some(day) if day.succ_opt() == Some(today) => current + 1,
        _ => 1,
    }
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn db_with_user(name: &str) -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let id = db.create_user(name, "hash").unwrap();
        (db, id)
    }

    fn post(user_id: i64, content: &str) -> NewForumPost {
        NewForumPost {
            user_id,
            content: content.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn portfolio_upsert_keeps_one_row_per_asset() {
        let (db, uid) = db_with_user("stacker");

        db.upsert_portfolio_entry(uid, "bitcoin", 0.5).unwrap();
        db.upsert_portfolio_entry(uid, "bitcoin", 1.25).unwrap();

        let entries = db.get_portfolio_entries(uid).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].asset, "bitcoin");
        assert_eq!(entries[0].amount, 1.25);
    }

    #[test]
    fn portfolio_assets_are_separate_rows() {
        let (db, uid) = db_with_user("stacker");
        db.upsert_portfolio_entry(uid, "bitcoin", 0.5).unwrap();
        db.upsert_portfolio_entry(uid, "ethereum", 2.0).unwrap();
        assert_eq!(db.get_portfolio_entries(uid).unwrap().len(), 2);
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let (db, _) = db_with_user("satoshi");
        let err = db.create_user("satoshi", "other").unwrap_err();
        assert!(crate::is_constraint_violation(&err));
        assert!(!crate::is_constraint_violation(&anyhow!("unrelated")));
    }

    #[test]
    fn login_streak_rules() {
        let (db, uid) = db_with_user("daily");
        let day1 = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();

        assert_eq!(db.record_login(uid, day1).unwrap(), 1);
        assert_eq!(db.record_login(uid, day1 + chrono::Duration::hours(5)).unwrap(), 1);
        assert_eq!(db.record_login(uid, day1 + chrono::Duration::days(1)).unwrap(), 2);
        assert_eq!(db.record_login(uid, day1 + chrono::Duration::days(4)).unwrap(), 1);
    }

    #[test]
    fn replies_bump_parent_comment_count() {
        let (db, uid) = db_with_user("poster");
        let parent = db.create_forum_post(&post(uid, "gm")).unwrap();

        let mut reply = post(uid, "gm to you");
        reply.is_reply = true;
        reply.parent_post_id = Some(parent.id);
        db.create_forum_post(&reply).unwrap();

        assert_eq!(db.get_forum_post(parent.id).unwrap().unwrap().comment_count, 1);
        assert_eq!(db.get_post_replies(parent.id).unwrap().len(), 1);
        // replies stay out of the top-level feed
        assert_eq!(db.get_forum_posts().unwrap().len(), 1);
    }

    #[test]
    fn post_lists_round_trip_through_json_columns() {
        let (db, uid) = db_with_user("tagger");
        let mut p = post(uid, "stack sats");
        p.categories = vec!["Memes".into()];
        p.hashtags = vec!["#bitcoin".into(), "#hodl".into()];
        let created = db.create_forum_post(&p).unwrap();

        assert_eq!(created.username, "tagger");
        assert_eq!(created.categories, vec!["Memes".to_string()]);
        assert_eq!(created.hashtags.len(), 2);
        assert!(created.mentions.is_empty());
    }

    #[test]
    fn toggle_reaction_adds_then_removes() {
        let (db, uid) = db_with_user("reactor");
        let p = db.create_forum_post(&post(uid, "wen moon")).unwrap();

        assert!(db.toggle_reaction(p.id, uid, "rocket").unwrap());
        assert_eq!(db.get_post_reactions(p.id).unwrap().get("rocket"), Some(&1));
        assert_eq!(db.get_forum_post(p.id).unwrap().unwrap().upvotes, 1);

        assert!(!db.toggle_reaction(p.id, uid, "rocket").unwrap());
        assert!(db.get_post_reactions(p.id).unwrap().is_empty());
        assert_eq!(db.get_forum_post(p.id).unwrap().unwrap().upvotes, 0);
    }

    #[test]
    fn downvotes_counted_separately() {
        let (db, uid) = db_with_user("critic");
        let p = db.create_forum_post(&post(uid, "fiat fixes this")).unwrap();
        db.toggle_reaction(p.id, uid, "downvote").unwrap();

        let row = db.get_forum_post(p.id).unwrap().unwrap();
        assert_eq!(row.downvotes, 1);
        assert_eq!(row.upvotes, 0);
    }

    #[test]
    fn delete_post_cascades_reactions_and_replies() {
        let (db, uid) = db_with_user("mod");
        let p = db.create_forum_post(&post(uid, "spam")).unwrap();
        db.toggle_reaction(p.id, uid, "like").unwrap();
        let mut reply = post(uid, "more spam");
        reply.is_reply = true;
        reply.parent_post_id = Some(p.id);
        db.create_forum_post(&reply).unwrap();

        assert!(db.delete_forum_post(p.id).unwrap());
        assert!(db.get_forum_post(p.id).unwrap().is_none());
        assert!(db.get_post_replies(p.id).unwrap().is_empty());
        assert!(db.get_post_reactions(p.id).unwrap().is_empty());
        assert!(!db.delete_forum_post(p.id).unwrap());
    }

    #[test]
    fn alerts_trigger_once_and_delete_by_owner_only() {
        let (db, uid) = db_with_user("watcher");
        let other = db.create_user("someone", "hash").unwrap();
        let alert = db.create_price_alert(uid, "above", 100_000.0).unwrap();
        assert!(!alert.is_triggered);

        assert!(db.mark_alert_triggered(alert.id).unwrap());
        assert!(!db.mark_alert_triggered(alert.id).unwrap());
        let stored = &db.get_price_alerts(uid).unwrap()[0];
        assert!(stored.is_triggered);
        assert!(stored.notified_at.is_some());

        assert!(!db.delete_price_alert(alert.id, other).unwrap());
        assert!(db.delete_price_alert(alert.id, uid).unwrap());
    }

    #[test]
    fn daily_tip_rotates_by_day() {
        let db = Database::open_in_memory().unwrap();
        let a = db.get_daily_tip(0).unwrap().unwrap();
        let b = db.get_daily_tip(1).unwrap().unwrap();
        let wrapped = db.get_daily_tip(5).unwrap().unwrap();

        assert_ne!(a.id, b.id);
        // five seeded tips
        assert_eq!(a.id, wrapped.id);
    }

    #[test]
    fn learning_progress_upserts_per_course() {
        let (db, uid) = db_with_user("student");
        assert!(db.get_learning_progress(uid).unwrap().is_none());

        db.upsert_learning_progress(uid, "bitcoin-basics", 2, None).unwrap();
        let row = db.upsert_learning_progress(uid, "bitcoin-basics", 3, Some(12)).unwrap();
        assert_eq!(row.completed_lessons, 3);
        assert_eq!(row.total_lessons, 12);

        let row = db.upsert_learning_progress(uid, "bitcoin-basics", 4, None).unwrap();
        assert_eq!(row.total_lessons, 12);
        assert_eq!(db.get_learning_progress(uid).unwrap().unwrap().completed_lessons, 4);
    }
}
