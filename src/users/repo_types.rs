use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,                    // uuid v4 as text
    pub name: String,
    pub email: String,                 // unique
    pub password: String,              // stored as given, never serialized
    pub referral_code: Option<String>, // free text, grouping key
    pub timestamp: OffsetDateTime,     // registration time (UTC)
}

/// Values for a user row about to be inserted.
#[derive(Debug)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub referral_code: Option<&'a str>,
}
