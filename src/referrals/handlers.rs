use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    error::ApiError,
    extract::QueryParams,
    referrals::{dto::ReferralQuery, services::resolve_referrals},
    state::AppState,
    users::dto::UserResponse,
};

pub fn referral_routes() -> Router<AppState> {
    Router::new().route("/referrals/:user_id", get(list_referrals))
}

#[instrument(skip(state))]
pub async fn list_referrals(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    QueryParams(q): QueryParams<ReferralQuery>,
) -> Result<(HeaderMap, Json<Vec<UserResponse>>), ApiError> {
    let (users, window) = resolve_referrals(&state.db, &user_id, &q).await?;

    let mut headers = HeaderMap::new();
    headers.insert("x-total-count", HeaderValue::from(window.total));
    headers.insert("x-total-pages", HeaderValue::from(window.total_pages));

    Ok((headers, Json(users.into_iter().map(UserResponse::from).collect())))
}
