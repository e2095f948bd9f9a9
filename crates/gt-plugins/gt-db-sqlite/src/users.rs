//! SQLite-backed [`UserStore`].
//!
//! Credentials stay in this table: the password hash and the current
//! session token are never mapped onto the domain model.

use async_trait::async_trait;
use gt_core::models::User;
use gt_core::traits::UserStore;
use sqlx::{sqlite::SqlitePool, sqlite::SqliteRow, Row};
use uuid::Uuid;

use crate::{blob_to_uuid, uuid_to_blob};

pub struct SqliteUserStore {
    pool: SqlitePool,
}

impl SqliteUserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &SqliteRow) -> User {
    User {
        id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
        username: row.get("username"),
        email: row.get("email"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn create_user(&self, user: &User, password_hash: &str) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, token, created_at)
             VALUES (?, ?, ?, ?, NULL, ?)",
        )
        .bind(uuid_to_blob(user.id))
        .bind(&user.username)
        .bind(&user.email)
        .bind(password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let row = sqlx::query("SELECT id, username, email, created_at FROM users WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<(User, String)>> {
        let row = sqlx::query(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row
            .as_ref()
            .map(|row| (user_from_row(row), row.get("password_hash"))))
    }

    async fn find_by_token(&self, token: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query("SELECT id, username, email, created_at FROM users WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn store_token(&self, user_id: Uuid, token: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET token = ? WHERE id = ?")
            .bind(token)
            .bind(uuid_to_blob(user_id))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pool;
    use chrono::Utc;

    fn user(username: &str) -> User {
        User {
            id: Uuid::now_v7(),
            username: username.to_string(),
            email: format!("{}@test.invalid", username),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn create_and_find_by_username() {
        let store = SqliteUserStore::new(test_pool().await);
        let u = user("toto");
        store.create_user(&u, "argon2-hash").await.unwrap();

        let (found, hash) = store.find_by_username("toto").await.unwrap().unwrap();
        assert_eq!(found.id, u.id);
        assert_eq!(hash, "argon2-hash");
        assert!(store.find_by_username("titi").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let store = SqliteUserStore::new(test_pool().await);
        store.create_user(&user("toto"), "h1").await.unwrap();
        assert!(store.create_user(&user("toto"), "h2").await.is_err());
    }

    #[tokio::test]
    async fn token_lookup_follows_the_latest_token() {
        let store = SqliteUserStore::new(test_pool().await);
        let u = user("toto");
        store.create_user(&u, "hash").await.unwrap();

        assert!(store.find_by_token("t1").await.unwrap().is_none());

        store.store_token(u.id, "t1").await.unwrap();
        assert_eq!(store.find_by_token("t1").await.unwrap().unwrap().id, u.id);

        // A fresh login replaces the stored token.
        store.store_token(u.id, "t2").await.unwrap();
        assert!(store.find_by_token("t1").await.unwrap().is_none());
        assert_eq!(store.find_by_token("t2").await.unwrap().unwrap().id, u.id);
    }
}
