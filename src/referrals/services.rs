use anyhow::Context;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::referrals::{dto::ReferralQuery, repo};
use crate::users::repo_types::User;

/// Slice of a result set selected by a 1-indexed `page` of `per_page` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl PageWindow {
    /// Fails with not-found when `page` lies outside `[1, total_pages]`,
    /// which is every page when `total` is zero.
    pub fn new(page: i64, per_page: i64, total: i64) -> Result<Self, ApiError> {
        if per_page < 1 {
            return Err(ApiError::InvalidRequest("per_page must be at least 1".into()));
        }
        let total_pages = if total <= 0 { 0 } else { (total - 1) / per_page + 1 };
        if page < 1 || page > total_pages {
            return Err(ApiError::NotFound("Invalid page number"));
        }
        Ok(Self {
            page,
            per_page,
            total,
            total_pages,
        })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    /// Rows actually present on this page; the last page may be short.
    pub fn rows(&self) -> i64 {
        self.per_page.min(self.total - self.offset())
    }
}

/// Users sharing `user_id`'s referral code (itself included), one page at a time.
pub async fn resolve_referrals(
    db: &SqlitePool,
    user_id: &str,
    query: &ReferralQuery,
) -> Result<(Vec<User>, PageWindow), ApiError> {
    if User::find_by_id(db, user_id).await?.is_none() {
        warn!(%user_id, "referrals requested for unknown user");
        return Err(ApiError::NotFound("User not found"));
    }

    // count and page read the same snapshot
    let mut tx = db.begin().await.context("begin tx")?;
    let total = repo::count_matches(&mut *tx, user_id).await?;
    let window = PageWindow::new(query.page, query.per_page, total).map_err(|e| {
        warn!(%user_id, page = query.page, per_page = query.per_page, total, "page out of range");
        e
    })?;

    let users = repo::list_matches(&mut *tx, user_id, window.rows(), window.offset()).await?;
    tx.commit().await.context("commit tx")?;
    debug!(%user_id, total, page = window.page, returned = users.len(), "referrals resolved");
    Ok((users, window))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use crate::users::repo_types::NewUser;

    #[test]
    fn total_pages_is_ceiling_division() {
        assert_eq!(PageWindow::new(1, 20, 1).unwrap().total_pages, 1);
        assert_eq!(PageWindow::new(1, 20, 20).unwrap().total_pages, 1);
        assert_eq!(PageWindow::new(1, 20, 21).unwrap().total_pages, 2);
        assert_eq!(PageWindow::new(1, 1, 7).unwrap().total_pages, 7);
    }

    #[test]
    fn last_page_is_short() {
        let w = PageWindow::new(3, 2, 5).unwrap();
        assert_eq!(w.offset(), 4);
        assert_eq!(w.rows(), 1);
        let w = PageWindow::new(2, 2, 5).unwrap();
        assert_eq!(w.offset(), 2);
        assert_eq!(w.rows(), 2);
    }

    #[test]
    fn out_of_range_pages_are_not_found() {
        assert!(matches!(
            PageWindow::new(0, 20, 5),
            Err(ApiError::NotFound("Invalid page number"))
        ));
        assert!(matches!(
            PageWindow::new(-3, 20, 5),
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            PageWindow::new(2, 20, 5),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn zero_matches_reject_every_page() {
        assert!(matches!(PageWindow::new(1, 20, 0), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn non_positive_per_page_is_invalid() {
        assert!(matches!(
            PageWindow::new(1, 0, 5),
            Err(ApiError::InvalidRequest(_))
        ));
        assert!(matches!(
            PageWindow::new(1, -1, 5),
            Err(ApiError::InvalidRequest(_))
        ));
    }

    #[test]
    fn huge_per_page_does_not_overflow() {
        let w = PageWindow::new(1, i64::MAX, 3).unwrap();
        assert_eq!(w.total_pages, 1);
        assert_eq!(w.rows(), 3);
    }

    async fn add(state: &AppState, email: &str, code: Option<&str>) -> String {
        User::create(
            &state.db,
            NewUser {
                name: "n",
                email,
                password: "p",
                referral_code: code,
            },
        )
        .await
        .unwrap()
        .id
    }

    fn query(page: i64, per_page: i64) -> ReferralQuery {
        ReferralQuery { page, per_page }
    }

    #[tokio::test]
    async fn shared_code_returns_both_users() {
        let state = AppState::fake().await;
        let a = add(&state, "a@example.com", Some("X")).await;
        let b = add(&state, "b@example.com", Some("X")).await;

        let (users, window) = resolve_referrals(&state.db, &a, &query(1, 20)).await.unwrap();
        let ids: Vec<String> = users.into_iter().map(|u| u.id).collect();
        assert_eq!(ids, [a, b]);
        assert_eq!(window.total, 2);
        assert_eq!(window.total_pages, 1);
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let state = AppState::fake().await;
        let err = resolve_referrals(&state.db, "ghost", &query(1, 20))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound("User not found")));
    }

    #[tokio::test]
    async fn user_without_code_fails_on_first_page() {
        let state = AppState::fake().await;
        let lonely = add(&state, "lonely@example.com", None).await;
        add(&state, "other@example.com", None).await;

        let err = resolve_referrals(&state.db, &lonely, &query(1, 20))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound("Invalid page number")));
    }

    #[tokio::test]
    async fn totals_agree_with_the_rows_returned() {
        let state = AppState::fake().await;
        let first = add(&state, "g0@example.com", Some("G")).await;
        for i in 1..5 {
            add(&state, &format!("g{i}@example.com"), Some("G")).await;
        }

        let (page, window) = resolve_referrals(&state.db, &first, &query(3, 2)).await.unwrap();
        assert_eq!(window.total, 5);
        assert_eq!(window.total_pages, 3);
        assert_eq!(page.len() as i64, window.rows());

        // the pool (one connection in tests) is usable again, so the transaction ended
        add(&state, "late@example.com", Some("G")).await;
        let (_, window) = resolve_referrals(&state.db, &first, &query(1, 2)).await.unwrap();
        assert_eq!(window.total, 6);
    }

    #[tokio::test]
    async fn page_beyond_total_is_not_found() {
        let state = AppState::fake().await;
        let a = add(&state, "a@example.com", Some("X")).await;
        add(&state, "b@example.com", Some("X")).await;

        let err = resolve_referrals(&state.db, &a, &query(2, 20)).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound("Invalid page number")));
        let (users, _) = resolve_referrals(&state.db, &a, &query(2, 1)).await.unwrap();
        assert_eq!(users.len(), 1);
    }
}
