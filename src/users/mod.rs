//! User records, the credential directory, and user admin handlers.

use axum::extract::State;
use axum::routing::{get, put};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::auth::middleware::CurrentUser;
use crate::auth::password;
use crate::policy::{self, Action};
use crate::shared::error::{Error, Result};
use crate::shared::state::AppState;
use crate::store::UserStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Agent,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Agent => "agent",
            Self::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "customer" => Some(Self::Customer),
            "agent" => Some(Self::Agent),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Serializable projection of a user. The password hash never leaves
/// the store layer through any response body.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn view(&self) -> UserView {
        UserView {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Credential store: registration, credential validation, role
/// administration.
#[derive(Clone)]
pub struct Directory {
    users: Arc<dyn UserStore>,
}

impl Directory {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<User> {
        if name.trim().is_empty() {
            return Err(Error::Validation("name is required".into()));
        }
        if email.trim().is_empty() {
            return Err(Error::Validation("email is required".into()));
        }
        if password.is_empty() {
            return Err(Error::Validation("password is required".into()));
        }

        let password_hash = password::hash_password(password)?;
        let now = Utc::now();
        self.users
            .insert(User {
                id: Uuid::new_v4(),
                name: name.trim().to_string(),
                email: email.trim().to_string(),
                password_hash,
                role,
                created_at: now,
                updated_at: now,
            })
            .await
    }

    /// A missing account and a wrong password are indistinguishable to
    /// the caller.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let Some(user) = self.users.find_by_email(email).await? else {
            return Err(Error::InvalidCredentials);
        };
        if !password::verify_password(password, &user.password_hash)? {
            return Err(Error::InvalidCredentials);
        }
        Ok(user)
    }

    pub async fn find(&self, id: Uuid) -> Result<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or(Error::NotFound("user"))
    }

    pub async fn update_role(&self, id: Uuid, role: Role) -> Result<User> {
        self.users
            .set_role(id, role)
            .await?
            .ok_or(Error::NotFound("user"))
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        self.users.list().await
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub id: Uuid,
    pub role: Role,
}

pub async fn get_profile(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Json<UserView> {
    Json(user.view())
}

pub async fn update_user_role(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<Json<UserView>> {
    policy::require(actor.role, Action::UpdateUserRole)?;
    let user = state.directory.update_role(req.id, req.role).await?;
    info!("role of user {} set to {}", user.id, user.role.as_str());
    Ok(Json(user.view()))
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
) -> Result<Json<Vec<UserView>>> {
    policy::require(actor.role, Action::ListUsers)?;
    let users = state.directory.list().await?;
    Ok(Json(users.iter().map(User::view).collect()))
}

pub fn configure_users_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users", get(list_users))
        .route("/api/users/profile", get(get_profile))
        .route("/api/users/role", put(update_user_role))
}
