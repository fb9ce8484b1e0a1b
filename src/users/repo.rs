use anyhow::Context;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo_types::{NewUser, User};

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &SqlitePool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password, referral_code, timestamp
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    /// Find a user by id.
    pub async fn find_by_id(db: &SqlitePool, id: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password, referral_code, timestamp
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    /// All users in registration order.
    pub async fn list_all(db: &SqlitePool) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password, referral_code, timestamp
            FROM users
            ORDER BY rowid ASC
            "#,
        )
        .fetch_all(db)
        .await
        .context("list users")?;
        Ok(users)
    }

    /// Insert a new user with a fresh id and the current server time.
    pub async fn create(db: &SqlitePool, new: NewUser<'_>) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password, referral_code, timestamp)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, name, email, password, referral_code, timestamp
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(new.name)
        .bind(new.email)
        .bind(new.password)
        .bind(new.referral_code)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(db)
        .await
        .context("insert user")?;
        Ok(user)
    }
}
