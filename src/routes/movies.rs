use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{GenreList, Movie, MoviePage},
    routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Comma-separated keywords
    keywords: String,
}

impl SearchQuery {
    fn keywords(&self) -> Vec<String> {
        self.keywords
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(String::from)
            .collect()
    }
}

/// Handler for the popular movies grid
pub async fn popular(State(state): State<AppState>) -> AppResult<Json<MoviePage>> {
    let page = state.catalog.list_popular().await?;
    Ok(Json(page))
}

/// Handler for the genre picker
pub async fn genres(State(state): State<AppState>) -> AppResult<Json<GenreList>> {
    let genres = state.catalog.list_genres().await?;
    Ok(Json(genres))
}

/// Handler for keyword search; each keyword is looked up concurrently
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<Movie>>> {
    let keywords = params.keywords();
    if keywords.is_empty() {
        return Err(AppError::InvalidInput(
            "At least one search keyword is required".to_string(),
        ));
    }

    let movies = state.catalog.search_by_keywords(&keywords).await?;
    Ok(Json(movies))
}
