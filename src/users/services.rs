use lazy_static::lazy_static;
use regex::Regex;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::users::dto::CreateUserRequest;
use crate::users::repo_types::{NewUser, User};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}

/// Register a user, rejecting an email that is already taken.
pub async fn register_user(db: &SqlitePool, mut req: CreateUserRequest) -> Result<User, ApiError> {
    req.email = req.email.trim().to_string();

    if req.name.trim().is_empty() {
        warn!("empty name");
        return Err(ApiError::InvalidRequest("Name must not be empty".into()));
    }
    if !is_valid_email(&req.email) {
        warn!(email = %req.email, "invalid email");
        return Err(ApiError::InvalidRequest("Invalid email".into()));
    }

    if User::find_by_email(db, &req.email).await?.is_some() {
        warn!(email = %req.email, "email already registered");
        return Err(ApiError::DuplicateEmail);
    }

    let new = NewUser {
        name: &req.name,
        email: &req.email,
        password: &req.password,
        referral_code: req.referral_code.as_deref(),
    };
    let user = match User::create(db, new).await {
        Ok(u) => u,
        // lost a race with a concurrent registration
        Err(e) if is_unique_violation(&e) => {
            warn!(email = %req.email, "email registered concurrently");
            return Err(ApiError::DuplicateEmail);
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user)
}

pub async fn fetch_user(db: &SqlitePool, id: &str) -> Result<User, ApiError> {
    User::find_by_id(db, id)
        .await?
        .ok_or(ApiError::NotFound("User not found"))
}

pub async fn fetch_all_users(db: &SqlitePool) -> Result<Vec<User>, ApiError> {
    Ok(User::list_all(db).await?)
}
