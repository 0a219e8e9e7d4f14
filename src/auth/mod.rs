pub mod middleware;
pub mod password;
pub mod token;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::shared::error::Result;
use crate::shared::state::AppState;
use crate::users::{Role, UserView};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub token: String,
    pub user: UserView,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Registration doubles as the first login: the response carries a
/// session token alongside the created account.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let role = req.role.unwrap_or(Role::Customer);
    let user = state
        .directory
        .register(&req.name, &req.email, &req.password, role)
        .await?;
    let token = state.tokens.issue(user.id)?;
    info!("registered {} as {}", user.email, user.role.as_str());

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            token,
            user: user.view(),
        }),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let user = state.directory.authenticate(&req.email, &req.password).await?;
    let token = state.tokens.issue(user.id)?;
    Ok(Json(LoginResponse { token }))
}

pub fn configure_auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
}
