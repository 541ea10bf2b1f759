use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{auth::CurrentUser, error::AppResult, models::UserResponse, routes::AppState};

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: Uuid,
    pub user: UserResponse,
}

/// Handler for sign-up
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = state
        .accounts
        .register(&request.username, &request.password)
        .await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// Handler for login; the returned token goes in `Authorization: Bearer`
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> AppResult<Json<LoginResponse>> {
    let user = state
        .accounts
        .authenticate(&request.username, &request.password)
        .await?;

    let user = UserResponse::from(&user);
    let token = state.sessions.open(user.clone()).await;

    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(LoginResponse { token, user }))
}

/// Handler for logout
pub async fn logout(State(state): State<AppState>, current: CurrentUser) -> StatusCode {
    state.sessions.close(&current.token).await;
    tracing::info!(user_id = current.user.id, "User logged out");
    StatusCode::NO_CONTENT
}
