//! Repository for the `users` registry table.

use sqlx::SqlitePool;

use crate::models::user::User;

/// Column list for `users` queries.
const COLUMNS: &str = "user_id, username, first_seen, last_seen";

/// Provides lookups and upserts for the user registry.
pub struct UserRepo;

impl UserRepo {
    pub async fn find_by_id(pool: &SqlitePool, user_id: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE user_id = ?");
        sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Record a sighting of `user_id`. `first_seen` is kept on conflict.
    pub async fn upsert(
        pool: &SqlitePool,
        user_id: &str,
        username: Option<&str>,
        seen_at: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO users (user_id, username, first_seen, last_seen) \
             VALUES (?1, ?2, ?3, ?3) \
             ON CONFLICT(user_id) DO UPDATE SET \
                 username = COALESCE(excluded.username, users.username), \
                 last_seen = excluded.last_seen",
        )
        .bind(user_id)
        .bind(username)
        .bind(seen_at)
        .execute(pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_keeps_first_seen_and_updates_name() {
        let pool = crate::create_memory_pool().await.unwrap();

        UserRepo::upsert(&pool, "u-1", Some("alice"), 100).await.unwrap();
        UserRepo::upsert(&pool, "u-1", Some("alice2"), 200).await.unwrap();

        let user = UserRepo::find_by_id(&pool, "u-1").await.unwrap().unwrap();
        assert_eq!(user.username.as_deref(), Some("alice2"));
        assert_eq!(user.first_seen, 100);
        assert_eq!(user.last_seen, 200);
    }

    #[tokio::test]
    async fn upsert_without_name_keeps_known_name() {
        let pool = crate::create_memory_pool().await.unwrap();

        UserRepo::upsert(&pool, "u-1", Some("alice"), 100).await.unwrap();
        UserRepo::upsert(&pool, "u-1", None, 300).await.unwrap();

        let user = UserRepo::find_by_id(&pool, "u-1").await.unwrap().unwrap();
        assert_eq!(user.username.as_deref(), Some("alice"));
        assert_eq!(user.last_seen, 300);
    }

    #[tokio::test]
    async fn missing_user_is_none() {
        let pool = crate::create_memory_pool().await.unwrap();
        assert!(UserRepo::find_by_id(&pool, "nobody").await.unwrap().is_none());
    }
}
