//! Durable user and chat-membership records over SQLite.
//!
//! This is the persistence facade: single-row reads and writes plus the
//! leaderboard queries. XP and bonus adjustments are single atomic UPDATE
//! statements so concurrent game completions for the same user cannot
//! lose increments.

use std::time::{SystemTime, UNIX_EPOCH};

use sqlx::SqlitePool;

/// Profile fields captured from the chat transport on first contact.
#[derive(Debug, Clone, Default)]
pub struct UserProfile {
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub language_code: Option<String>,
}

/// A durable user record.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub language_code: Option<String>,
    pub xp: i64,
    pub bonuses: i64,
    pub invited_by: Option<i64>,
    pub last_activity: i64,
    pub created_at: i64,
}

impl User {
    /// Display name: first name, plus last name when present.
    pub fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {last}", self.first_name),
            None => self.first_name.clone(),
        }
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// SQLite-backed store.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the schema if it doesn't exist.
    pub async fn init(pool: &SqlitePool) -> anyhow::Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS users (
                user_id       INTEGER PRIMARY KEY,
                username      TEXT,
                first_name    TEXT NOT NULL,
                last_name     TEXT,
                language_code TEXT,
                xp            INTEGER NOT NULL DEFAULT 0,
                bonuses       INTEGER NOT NULL DEFAULT 0,
                invited_by    INTEGER REFERENCES users(user_id),
                last_activity INTEGER NOT NULL,
                created_at    INTEGER NOT NULL
            )"#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_xp ON users(xp DESC)")
            .execute(pool)
            .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS chat_memberships (
                user_id    INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
                chat_id    INTEGER NOT NULL,
                is_admin   INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                UNIQUE(user_id, chat_id)
            )"#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    // ---- users ----

    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Insert a user. On a concurrent duplicate insert the existing row
    /// wins and is returned.
    pub async fn create_user(
        &self,
        user_id: i64,
        profile: &UserProfile,
        invited_by: Option<i64>,
    ) -> Result<User, sqlx::Error> {
        let now = now_ms();
        sqlx::query(
            r#"INSERT INTO users
                 (user_id, username, first_name, last_name, language_code,
                  invited_by, last_activity, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(user_id) DO NOTHING"#,
        )
        .bind(user_id)
        .bind(&profile.username)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.language_code)
        .bind(invited_by)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        self.get_user(user_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Refresh the last-activity timestamp.
    pub async fn touch_activity(&self, user_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_activity = ? WHERE user_id = ?")
            .bind(now_ms())
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Apply a signed XP delta and return the new total. Atomic at the
    /// store level; callers never read-modify-write. Returns 0 for an
    /// unknown user, which callers treat as "create the row first".
    pub async fn add_xp(&self, user_id: i64, delta: i64) -> Result<i64, sqlx::Error> {
        let total: Option<i64> =
            sqlx::query_scalar("UPDATE users SET xp = xp + ? WHERE user_id = ? RETURNING xp")
                .bind(delta)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(total.unwrap_or(0))
    }

    /// Apply a signed bonus delta and return the new total. Same shape as
    /// [`Store::add_xp`].
    pub async fn add_bonuses(&self, user_id: i64, delta: i64) -> Result<i64, sqlx::Error> {
        let total: Option<i64> = sqlx::query_scalar(
            "UPDATE users SET bonuses = bonuses + ? WHERE user_id = ? RETURNING bonuses",
        )
        .bind(delta)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(total.unwrap_or(0))
    }

    // ---- leaderboard ----

    /// Top users by XP, descending. Ties break on user id so the order is
    /// stable across calls.
    pub async fn top_users(&self, limit: i64) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY xp DESC, user_id ASC LIMIT ?")
            .bind(limit)
            .fetch_all(&self.pool)
            .await
    }

    /// 1-based leaderboard position: one plus the number of users with
    /// strictly greater XP. An unknown user ranks first by this formula,
    /// matching the count-of-greater definition.
    pub async fn rank_of(&self, user_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) + 1 FROM users
             WHERE xp > (SELECT xp FROM users WHERE user_id = ?)",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn count_users(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
    }

    // ---- chats ----

    /// Record that a user was seen in a chat. Upsert: an existing row only
    /// has its admin flag refreshed.
    pub async fn record_chat_membership(
        &self,
        user_id: i64,
        chat_id: i64,
        is_admin: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO chat_memberships (user_id, chat_id, is_admin, created_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(user_id, chat_id) DO UPDATE SET is_admin = excluded.is_admin"#,
        )
        .bind(user_id)
        .bind(chat_id)
        .bind(is_admin)
        .bind(now_ms())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Chat ids the user has been seen in.
    pub async fn user_chats(&self, user_id: i64) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar("SELECT chat_id FROM chat_memberships WHERE user_id = ?")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
    }

    // ---- referrals ----

    pub async fn count_referrals(&self, user_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE invited_by = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> Store {
        // One connection so every test task sees the same in-memory DB.
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        Store::init(&pool).await.unwrap();
        Store::new(pool)
    }

    fn profile(name: &str) -> UserProfile {
        UserProfile {
            first_name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_and_get() {
        let store = store().await;
        let user = store.create_user(7, &profile("Ann"), None).await.unwrap();
        assert_eq!(user.user_id, 7);
        assert_eq!(user.xp, 0);
        assert_eq!(user.bonuses, 0);

        let fetched = store.get_user(7).await.unwrap().unwrap();
        assert_eq!(fetched.first_name, "Ann");
        assert!(store.get_user(8).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_create_keeps_existing_row() {
        let store = store().await;
        store.create_user(7, &profile("Ann"), None).await.unwrap();
        store.add_xp(7, 5).await.unwrap();
        let again = store.create_user(7, &profile("Other"), None).await.unwrap();
        assert_eq!(again.first_name, "Ann");
        assert_eq!(again.xp, 5);
    }

    #[tokio::test]
    async fn xp_deltas_accumulate() {
        let store = store().await;
        store.create_user(1, &profile("A"), None).await.unwrap();
        store.create_user(2, &profile("B"), None).await.unwrap();

        assert_eq!(store.add_xp(1, 10).await.unwrap(), 10);
        // Unrelated user's delta interleaves without effect on user 1.
        assert_eq!(store.add_xp(2, 100).await.unwrap(), 100);
        assert_eq!(store.add_xp(1, 5).await.unwrap(), 15);
    }

    #[tokio::test]
    async fn concurrent_xp_updates_do_not_lose_increments() {
        let store = store().await;
        store.create_user(1, &profile("A"), None).await.unwrap();

        let mut tasks = Vec::new();
        for _ in 0..20 {
            let s = store.clone();
            tasks.push(tokio::spawn(async move { s.add_xp(1, 1).await }));
        }
        for t in tasks {
            t.await.unwrap().unwrap();
        }
        assert_eq!(store.get_user(1).await.unwrap().unwrap().xp, 20);
    }

    #[tokio::test]
    async fn add_xp_on_unknown_user_reports_zero() {
        let store = store().await;
        assert_eq!(store.add_xp(404, 10).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn bonuses_are_independent_of_xp() {
        let store = store().await;
        store.create_user(1, &profile("A"), None).await.unwrap();
        assert_eq!(store.add_bonuses(1, 4).await.unwrap(), 4);
        let user = store.get_user(1).await.unwrap().unwrap();
        assert_eq!(user.bonuses, 4);
        assert_eq!(user.xp, 0);
    }

    #[tokio::test]
    async fn top_users_order_and_tie_break() {
        let store = store().await;
        for (id, xp) in [(1, 30), (2, 10), (3, 30), (4, 20)] {
            store.create_user(id, &profile("u"), None).await.unwrap();
            store.add_xp(id, xp).await.unwrap();
        }
        let top = store.top_users(3).await.unwrap();
        let ids: Vec<i64> = top.iter().map(|u| u.user_id).collect();
        assert_eq!(ids, vec![1, 3, 4]);
    }

    #[tokio::test]
    async fn rank_counts_strictly_greater() {
        let store = store().await;
        for (id, xp) in [(1, 30), (2, 10), (3, 30)] {
            store.create_user(id, &profile("u"), None).await.unwrap();
            store.add_xp(id, xp).await.unwrap();
        }
        // Both 30-XP users rank first; the 10-XP user is third.
        assert_eq!(store.rank_of(1).await.unwrap(), 1);
        assert_eq!(store.rank_of(3).await.unwrap(), 1);
        assert_eq!(store.rank_of(2).await.unwrap(), 3);
        assert_eq!(store.count_users().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn membership_upsert_refreshes_admin_flag() {
        let store = store().await;
        store.create_user(1, &profile("A"), None).await.unwrap();
        store.record_chat_membership(1, -100, false).await.unwrap();
        store.record_chat_membership(1, -100, true).await.unwrap();
        store.record_chat_membership(1, -200, false).await.unwrap();

        let chats = store.user_chats(1).await.unwrap();
        assert_eq!(chats.len(), 2);
        assert!(chats.contains(&-100));
        assert!(chats.contains(&-200));
    }

    #[tokio::test]
    async fn referral_counting() {
        let store = store().await;
        store.create_user(1, &profile("Ref"), None).await.unwrap();
        store.create_user(2, &profile("A"), Some(1)).await.unwrap();
        store.create_user(3, &profile("B"), Some(1)).await.unwrap();
        store.create_user(4, &profile("C"), None).await.unwrap();

        assert_eq!(store.count_referrals(1).await.unwrap(), 2);
        assert_eq!(store.count_referrals(4).await.unwrap(), 0);
        assert_eq!(store.get_user(2).await.unwrap().unwrap().invited_by, Some(1));
    }

    #[tokio::test]
    async fn touch_activity_moves_the_timestamp_forward() {
        let store = store().await;
        let before = store.create_user(1, &profile("A"), None).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.touch_activity(1).await.unwrap();
        let after = store.get_user(1).await.unwrap().unwrap();
        assert!(after.last_activity >= before.last_activity);
    }

    #[test]
    fn display_name_joins_last_name() {
        let mut user = User {
            user_id: 1,
            username: None,
            first_name: "Ann".into(),
            last_name: None,
            language_code: None,
            xp: 0,
            bonuses: 0,
            invited_by: None,
            last_activity: 0,
            created_at: 0,
        };
        assert_eq!(user.display_name(), "Ann");
        user.last_name = Some("Lee".into());
        assert_eq!(user.display_name(), "Ann Lee");
    }
}
