use anyhow::Context;
use sqlx::{Executor, Sqlite};

use crate::users::repo_types::User;

// Users sharing the target's referral code. NULL never compares equal and
// empty codes are excluded, so a code-less target matches nobody.

/// Number of users whose referral code equals that of `user_id`.
pub async fn count_matches<'e, E>(db: E, user_id: &str) -> anyhow::Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let total = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
          FROM users u
          JOIN users target ON u.referral_code = target.referral_code
         WHERE target.id = ?
           AND target.referral_code <> ''
        "#,
    )
    .bind(user_id)
    .fetch_one(db)
    .await
    .context("count referral matches")?;
    Ok(total)
}

/// One page of those users, in registration order.
pub async fn list_matches<'e, E>(
    db: E,
    user_id: &str,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<User>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, User>(
        r#"
        SELECT u.id, u.name, u.email, u.password, u.referral_code, u.timestamp
          FROM users u
          JOIN users target ON u.referral_code = target.referral_code
         WHERE target.id = ?
           AND target.referral_code <> ''
         ORDER BY u.rowid ASC
         LIMIT ? OFFSET ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list referral matches")?;
    Ok(rows)
}
