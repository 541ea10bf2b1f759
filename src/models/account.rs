use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database row identifier
pub type DbId = i64;

/// Full row from the `users` table.
///
/// Holds the password hash; use [`UserResponse`] for anything sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct User {
    pub id: DbId,
    pub username: String,
    pub password_hash: String,
}

/// User representation safe for API responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserResponse {
    pub id: DbId,
    pub username: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

/// A saved movie on a user's watch-list
///
/// A snapshot of the catalog record at save time; it has no link back to
/// the catalog. Stored in the `movies` table, where the poster path lives
/// in the `image` column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct WatchlistEntry {
    pub id: DbId,
    pub user_id: DbId,
    pub title: String,
    #[sqlx(rename = "image")]
    pub poster_path: Option<String>,
}
