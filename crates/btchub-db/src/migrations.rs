use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            username        TEXT NOT NULL UNIQUE,
            password        TEXT NOT NULL,
            streak_days     INTEGER NOT NULL DEFAULT 0,
            last_login_at   TEXT,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS forum_posts (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id         INTEGER REFERENCES users(id) ON DELETE CASCADE,
            title           TEXT,
            content         TEXT NOT NULL,
            categories      TEXT NOT NULL DEFAULT '[]',
            upvotes         INTEGER NOT NULL DEFAULT 0,
            downvotes       INTEGER NOT NULL DEFAULT 0,
            comment_count   INTEGER NOT NULL DEFAULT 0,
            is_reply        INTEGER NOT NULL DEFAULT 0,
            parent_post_id  INTEGER REFERENCES forum_posts(id) ON DELETE CASCADE,
            mentions        TEXT NOT NULL DEFAULT '[]',
            hashtags        TEXT NOT NULL DEFAULT '[]',
            image_url       TEXT,
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_forum_posts_parent
            ON forum_posts(parent_post_id, created_at);

        CREATE TABLE IF NOT EXISTS post_reactions (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            post_id         INTEGER NOT NULL REFERENCES forum_posts(id) ON DELETE CASCADE,
            user_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            reaction_type   TEXT NOT NULL,
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(post_id, user_id, reaction_type)
        );

        CREATE INDEX IF NOT EXISTS idx_post_reactions_post
            ON post_reactions(post_id);

        CREATE TABLE IF NOT EXISTS price_alerts (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            type            TEXT NOT NULL CHECK (type IN ('above', 'below')),
            price           REAL NOT NULL,
            is_triggered    INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            notified_at     TEXT
        );

        CREATE TABLE IF NOT EXISTS portfolio_entries (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            asset           TEXT NOT NULL,
            amount          REAL NOT NULL,
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at      TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user_id, asset)
        );

        CREATE TABLE IF NOT EXISTS daily_tips (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            title           TEXT NOT NULL UNIQUE,
            content         TEXT NOT NULL,
            category        TEXT NOT NULL,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS learning_progress (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id             INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            course_id           TEXT NOT NULL,
            completed_lessons   INTEGER NOT NULL DEFAULT 0,
            total_lessons       INTEGER NOT NULL DEFAULT 10,
            last_accessed_at    TEXT NOT NULL DEFAULT (datetime('now')),
            created_at          TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at          TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user_id, course_id)
        );

        -- Seed the starter tips
        INSERT OR IGNORE INTO daily_tips (title, content, category) VALUES
            ('Dollar Cost Averaging (DCA)',
             'Instead of trying to time the market, consider investing a fixed amount in Bitcoin regularly. This strategy can help reduce the impact of volatility.',
             'Investment'),
            ('Secure Your Private Keys',
             'Never share your private keys or seed phrase with anyone. Write them down on paper and store them securely offline.',
             'Security'),
            ('Understand Bitcoin Fees',
             'Bitcoin transaction fees vary based on network congestion. Use fee estimation tools and consider the urgency of your transaction.',
             'Technology'),
            ('Lightning Network Benefits',
             'The Lightning Network enables instant, low-cost Bitcoin transactions. Perfect for small payments and microtransactions.',
             'Technology'),
            ('HODL Mentality',
             'HODL (Hold On for Dear Life) is a popular Bitcoin strategy. Consider your long-term goals and risk tolerance when investing.',
             'Investment');
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
