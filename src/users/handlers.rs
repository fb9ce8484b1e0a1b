use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    error::ApiError,
    extract::JsonBody,
    state::AppState,
    users::{
        dto::{CreateUserRequest, UserResponse},
        services::{fetch_all_users, fetch_user, register_user},
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/", post(create_user))
        .route("/users/:user_id", get(get_user))
        .route("/getall_users/", get(list_users))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateUserRequest>,
) -> Result<(StatusCode, HeaderMap, Json<UserResponse>), ApiError> {
    let user = register_user(&state.db, payload).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::LOCATION,
        HeaderValue::from_str(&format!("/users/{}", user.id)).context("location header")?,
    );

    Ok((StatusCode::CREATED, headers, Json(user.into())))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = fetch_all_users(&state.db).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = fetch_user(&state.db, &user_id).await?;
    Ok(Json(user.into()))
}
