use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::{
    auth::password::{hash_password, verify_password, verify_unknown_user},
    error::{AppError, AppResult},
    models::{DbId, User, WatchlistEntry},
};

/// Schema owned by the store, safe to apply any number of times
const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        username TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        CONSTRAINT uq_users_username UNIQUE (username)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS movies (
        id BIGSERIAL PRIMARY KEY,
        title TEXT NOT NULL,
        image TEXT,
        user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_movies_user_id ON movies (user_id)",
];

const USER_COLUMNS: &str = "id, username, password_hash";
const ENTRY_COLUMNS: &str = "id, user_id, title, image";

/// User accounts and their watch-lists
///
/// The schema is created lazily before the first query, so constructing a
/// store never touches the database.
#[derive(Clone)]
pub struct AccountStore {
    pool: PgPool,
    schema: Arc<OnceCell<()>>,
}

impl AccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            schema: Arc::new(OnceCell::new()),
        }
    }

    /// Creates the `users` and `movies` tables if they are missing
    pub async fn ensure_schema(&self) -> AppResult<()> {
        self.schema
            .get_or_try_init(|| async {
                for statement in SCHEMA {
                    sqlx::query(statement).execute(&self.pool).await?;
                }
                tracing::info!("Account schema ready");
                Ok::<_, AppError>(())
            })
            .await?;
        Ok(())
    }

    /// Creates a user with a freshly salted password hash
    ///
    /// The unique constraint on `username` decides races between concurrent
    /// registrations; the loser gets `UsernameTaken`.
    pub async fn register(&self, username: &str, password: &str) -> AppResult<User> {
        let username = validate_credentials(username, password)?;
        self.ensure_schema().await?;

        let password = password.to_string();
        let password_hash = run_blocking(move || hash_password(&password)).await??;
        let query = format!(
            "INSERT INTO users (username, password_hash) VALUES ($1, $2) RETURNING {USER_COLUMNS}"
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(username)
            .bind(&password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                    AppError::UsernameTaken
                }
                other => AppError::Database(other),
            })?;

        tracing::info!(user_id = user.id, username = %user.username, "User registered");

        Ok(user)
    }

    /// Checks a username/password pair
    ///
    /// Unknown users and wrong passwords are indistinguishable to the caller,
    /// both in the error returned and in the Argon2 work spent.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<User> {
        self.ensure_schema().await?;

        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(username.trim())
            .fetch_optional(&self.pool)
            .await?;

        let password = password.to_string();
        let Some(user) = user else {
            run_blocking(move || verify_unknown_user(&password)).await?;
            return Err(AppError::InvalidCredentials);
        };

        let hash = user.password_hash.clone();
        if !run_blocking(move || verify_password(&password, &hash)).await?? {
            tracing::warn!(username = %user.username, "Failed login attempt");
            return Err(AppError::InvalidCredentials);
        }

        Ok(user)
    }

    pub async fn find_user(&self, user_id: DbId) -> AppResult<Option<User>> {
        self.ensure_schema().await?;

        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Saves a snapshot of a movie to the user's watch-list
    pub async fn add_to_watchlist(
        &self,
        user_id: DbId,
        title: &str,
        poster_path: Option<&str>,
    ) -> AppResult<WatchlistEntry> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::InvalidInput("Title cannot be empty".to_string()));
        }
        self.ensure_schema().await?;

        let query = format!(
            "INSERT INTO movies (user_id, title, image) VALUES ($1, $2, $3) RETURNING {ENTRY_COLUMNS}"
        );
        let entry = sqlx::query_as::<_, WatchlistEntry>(&query)
            .bind(user_id)
            .bind(title)
            .bind(poster_path)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                    AppError::NotFound(format!("User {}", user_id))
                }
                other => AppError::Database(other),
            })?;

        tracing::info!(user_id, entry_id = entry.id, title = %entry.title, "Added to watch-list");

        Ok(entry)
    }

    /// The user's watch-list in the order it was saved
    pub async fn list_watchlist(&self, user_id: DbId) -> AppResult<Vec<WatchlistEntry>> {
        self.ensure_schema().await?;

        let query = format!("SELECT {ENTRY_COLUMNS} FROM movies WHERE user_id = $1 ORDER BY id");
        let entries = sqlx::query_as::<_, WatchlistEntry>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }

    /// Removes one of the user's own watch-list entries
    ///
    /// Entries belonging to other users are reported as not found.
    pub async fn remove_from_watchlist(&self, user_id: DbId, entry_id: DbId) -> AppResult<()> {
        self.ensure_schema().await?;

        let result = sqlx::query("DELETE FROM movies WHERE id = $1 AND user_id = $2")
            .bind(entry_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Watch-list entry {}",
                entry_id
            )));
        }

        tracing::info!(user_id, entry_id, "Removed from watch-list");

        Ok(())
    }
}

/// Runs CPU-bound password work off the async worker threads
async fn run_blocking<T, F>(work: F) -> AppResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(format!("Password task failed: {e}")))
}

/// Returns the trimmed username once both credentials are non-empty
fn validate_credentials<'a>(username: &'a str, password: &str) -> AppResult<&'a str> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::InvalidInput("Username cannot be empty".to_string()));
    }
    if password.is_empty() {
        return Err(AppError::InvalidInput("Password cannot be empty".to_string()));
    }
    Ok(username)
}
