use serde::Deserialize;

/// `?page=&per_page=` on the referrals listing, 1-indexed.
#[derive(Debug, Deserialize)]
pub struct ReferralQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    20
}
