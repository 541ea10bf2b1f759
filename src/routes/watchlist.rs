use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{
    auth::CurrentUser,
    error::AppResult,
    models::{DbId, WatchlistEntry},
    routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct AddEntryRequest {
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
}

/// Handler for the sidebar watch-list
pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<Vec<WatchlistEntry>>> {
    let entries = state.accounts.list_watchlist(current.user.id).await?;
    Ok(Json(entries))
}

/// Handler for "add to my watch-list"
pub async fn add(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<AddEntryRequest>,
) -> AppResult<(StatusCode, Json<WatchlistEntry>)> {
    let entry = state
        .accounts
        .add_to_watchlist(
            current.user.id,
            &request.title,
            request.poster_path.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Handler for removing an entry from the current user's watch-list
pub async fn remove(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(entry_id): Path<DbId>,
) -> AppResult<StatusCode> {
    state
        .accounts
        .remove_from_watchlist(current.user.id, entry_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
