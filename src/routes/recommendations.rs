use axum::{extract::State, Extension, Json};

use crate::{
    auth::CurrentUser,
    error::AppResult,
    middleware::request_id::RequestId,
    models::{AssistantReply, Role},
    routes::AppState,
    services::recommendations::{self, Preferences, Recommendation},
};

/// Handler for the "find my movie match" action
///
/// Anyone may ask; the exchange is only kept for logged-in users.
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    current: Option<CurrentUser>,
    Json(preferences): Json<Preferences>,
) -> AppResult<Json<Recommendation>> {
    tracing::info!(
        request_id = %request_id,
        user_id = current.as_ref().map(|c| c.user.id),
        genres = preferences.genres.len(),
        min_rating = preferences.min_rating,
        max_rating = preferences.max_rating,
        "Processing recommendation request"
    );

    let recommendation = recommendations::recommend(
        state.assistant.as_ref(),
        state.catalog.as_ref(),
        &preferences,
        state.poll,
    )
    .await?;

    if let Some(current) = current {
        let prompt = AssistantReply {
            role: Role::User,
            content: preferences.to_prompt(),
        };
        state
            .conversations
            .record(current.user.id, [prompt, recommendation.reply.clone()])
            .await;
    }

    tracing::info!(
        request_id = %request_id,
        results = recommendation.movies.results.len(),
        "Recommendation completed"
    );

    Ok(Json(recommendation))
}

/// Handler for the current user's conversation so far
pub async fn history(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Json<Vec<AssistantReply>> {
    Json(state.conversations.for_user(current.user.id).await)
}
