use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

use crate::shared::error::{Error, Result};
use crate::shared::state::AppState;
use crate::users::User;

/// The authenticated identity for the current request, inserted by
/// [`require_auth`] and read by handlers via `Extension`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

pub fn extract_bearer_token(value: &str) -> Option<&str> {
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
}

/// Resolves the bearer token to a user before any policy check runs.
/// A token is only as good as the account behind it: if the referenced
/// user no longer exists, the token is rejected.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(Error::Unauthenticated)?;
    let token = extract_bearer_token(header_value).ok_or(Error::Unauthenticated)?;

    let user_id = state.tokens.verify(token)?;
    let user = state.directory.find(user_id).await.map_err(|e| match e {
        Error::NotFound(_) => Error::InvalidToken,
        other => other,
    })?;

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}
