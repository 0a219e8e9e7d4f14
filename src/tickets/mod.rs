//! Ticket lifecycle: creation, assignment, status transitions, patch
//! updates, and the notifications they trigger.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::auth::middleware::CurrentUser;
use crate::notify::Dispatcher;
use crate::policy::{self, Action};
use crate::shared::error::{Error, Result};
use crate::shared::state::AppState;
use crate::store::{TicketStore, UserStore};
use crate::users::{Role, UserView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "in_progress" => Some(Self::InProgress),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
}

impl TicketPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Ticket {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub created_by: Uuid,
    pub assigned_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Read projection with the user references resolved. A dangling
/// reference renders as absent rather than failing the read.
#[derive(Debug, Serialize)]
pub struct TicketView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub created_by: Option<UserView>,
    pub assigned_to: Option<UserView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub title: String,
    pub description: String,
    pub priority: Option<TicketPriority>,
    pub assigned_to: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TicketPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub assigned_to: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct AssignTicketRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: TicketStatus,
}

/// The ticket state machine. Every mutation persists first; whatever
/// notification it implies fires only after the store has accepted
/// the write, and never feeds an error back into the mutation.
#[derive(Clone)]
pub struct TicketDesk {
    tickets: Arc<dyn TicketStore>,
    users: Arc<dyn UserStore>,
    notifier: Dispatcher,
}

impl TicketDesk {
    pub fn new(
        tickets: Arc<dyn TicketStore>,
        users: Arc<dyn UserStore>,
        notifier: Dispatcher,
    ) -> Self {
        Self {
            tickets,
            users,
            notifier,
        }
    }

    pub async fn create(&self, req: CreateTicketRequest, created_by: Uuid) -> Result<TicketView> {
        if req.title.trim().is_empty() {
            return Err(Error::Validation("title is required".into()));
        }
        if req.description.trim().is_empty() {
            return Err(Error::Validation("description is required".into()));
        }

        let now = Utc::now();
        let ticket = self
            .tickets
            .insert(Ticket {
                id: Uuid::new_v4(),
                title: req.title,
                description: req.description,
                status: TicketStatus::Open,
                priority: req.priority.unwrap_or(TicketPriority::Medium),
                created_by,
                assigned_to: req.assigned_to,
                created_at: now,
                updated_at: now,
            })
            .await?;

        if ticket.assigned_to.is_some() {
            let body = format!("A new ticket has been assigned to you: {}", ticket.title);
            self.notify_assignee(&ticket, "New Ticket Assigned", &body).await;
        }

        Ok(self.resolve(ticket).await)
    }

    pub async fn get(&self, id: Uuid) -> Result<TicketView> {
        let ticket = self.load(id).await?;
        Ok(self.resolve(ticket).await)
    }

    pub async fn list(&self) -> Result<Vec<TicketView>> {
        let mut views = Vec::new();
        for ticket in self.tickets.list().await? {
            views.push(self.resolve(ticket).await);
        }
        Ok(views)
    }

    /// Merges the provided fields and refreshes `updated_at` on every
    /// call. A changed assignee is an ordinary field edit here; the
    /// update notification still goes to whoever ends up assigned.
    pub async fn update(&self, id: Uuid, patch: TicketPatch) -> Result<TicketView> {
        let mut ticket = self.load(id).await?;

        if let Some(title) = patch.title {
            if title.trim().is_empty() {
                return Err(Error::Validation("title is required".into()));
            }
            ticket.title = title;
        }
        if let Some(description) = patch.description {
            if description.trim().is_empty() {
                return Err(Error::Validation("description is required".into()));
            }
            ticket.description = description;
        }
        if let Some(status) = patch.status {
            ticket.status = status;
        }
        if let Some(priority) = patch.priority {
            ticket.priority = priority;
        }
        if let Some(assigned_to) = patch.assigned_to {
            ticket.assigned_to = Some(assigned_to);
        }
        ticket.updated_at = Utc::now();

        let ticket = self.persist(ticket).await?;
        if ticket.assigned_to.is_some() {
            self.notify_assignee(
                &ticket,
                "Ticket Updated",
                "A ticket assigned to you has been updated.",
            )
            .await;
        }

        Ok(self.resolve(ticket).await)
    }

    pub async fn assign(&self, id: Uuid, user_id: Uuid) -> Result<TicketView> {
        let mut ticket = self.load(id).await?;
        let assignee = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(Error::NotFound("user"))?;

        ticket.assigned_to = Some(assignee.id);
        ticket.updated_at = Utc::now();
        let ticket = self.persist(ticket).await?;

        self.notifier.notify(
            &assignee.email,
            "Ticket Assigned",
            "You have a new ticket assigned to you.",
        );
        self.notifier.emit(
            "ticket.assigned",
            json!({ "user_id": assignee.id, "ticket_id": ticket.id }),
        );

        Ok(self.resolve(ticket).await)
    }

    /// Status may be set to any of the three values; no forward-only
    /// constraint (reopening a closed ticket is legal).
    pub async fn set_status(&self, id: Uuid, status: TicketStatus) -> Result<TicketView> {
        let mut ticket = self.load(id).await?;
        ticket.status = status;
        ticket.updated_at = Utc::now();
        let ticket = self.persist(ticket).await?;

        if ticket.assigned_to.is_some() {
            let body = format!(
                "The status of your ticket has been updated to {}.",
                status.as_str()
            );
            self.notify_assignee(&ticket, "Ticket Status Updated", &body).await;
        }

        Ok(self.resolve(ticket).await)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if self.tickets.delete(id).await? {
            Ok(())
        } else {
            Err(Error::NotFound("ticket"))
        }
    }

    async fn load(&self, id: Uuid) -> Result<Ticket> {
        self.tickets
            .find_by_id(id)
            .await?
            .ok_or(Error::NotFound("ticket"))
    }

    async fn persist(&self, ticket: Ticket) -> Result<Ticket> {
        self.tickets
            .save(ticket)
            .await?
            .ok_or(Error::NotFound("ticket"))
    }

    async fn resolve(&self, ticket: Ticket) -> TicketView {
        let created_by = self.resolve_user(ticket.created_by, "creator").await;
        let assigned_to = match ticket.assigned_to {
            Some(id) => self.resolve_user(id, "assignee").await,
            None => None,
        };
        TicketView {
            id: ticket.id,
            title: ticket.title,
            description: ticket.description,
            status: ticket.status,
            priority: ticket.priority,
            created_by,
            assigned_to,
            created_at: ticket.created_at,
            updated_at: ticket.updated_at,
        }
    }

    async fn resolve_user(&self, id: Uuid, kind: &str) -> Option<UserView> {
        match self.users.find_by_id(id).await {
            Ok(Some(user)) => Some(user.view()),
            Ok(None) => {
                warn!("ticket references missing {kind} {id}");
                None
            }
            Err(e) => {
                warn!("failed to resolve {kind} {id}: {e}");
                None
            }
        }
    }

    async fn notify_assignee(&self, ticket: &Ticket, subject: &str, body: &str) {
        let Some(assignee_id) = ticket.assigned_to else {
            return;
        };
        match self.users.find_by_id(assignee_id).await {
            Ok(Some(user)) => self.notifier.notify(&user.email, subject, body),
            Ok(None) => warn!(
                "ticket {} assigned to missing user {assignee_id}, skipping notification",
                ticket.id
            ),
            Err(e) => warn!("assignee lookup failed for ticket {}: {e}", ticket.id),
        }
    }
}

pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<CreateTicketRequest>,
) -> Result<(StatusCode, Json<TicketView>)> {
    policy::require(user.role, Action::CreateTicket)?;
    let view = state.desk.create(req, user.id).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<Vec<TicketView>>> {
    policy::require(user.role, Action::ListTickets)?;
    Ok(Json(state.desk.list().await?))
}

pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<TicketView>> {
    policy::require(user.role, Action::ReadTicket)?;
    let view = state.desk.get(id).await?;

    // Customers only see their own tickets.
    if user.role == Role::Customer
        && view.created_by.as_ref().map(|u| u.id) != Some(user.id)
    {
        return Err(Error::AccessDenied);
    }

    Ok(Json(view))
}

pub async fn update_ticket(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(patch): Json<TicketPatch>,
) -> Result<Json<TicketView>> {
    policy::require(user.role, Action::UpdateTicket)?;
    Ok(Json(state.desk.update(id, patch).await?))
}

pub async fn assign_ticket(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignTicketRequest>,
) -> Result<Json<TicketView>> {
    policy::require(user.role, Action::AssignTicket)?;
    Ok(Json(state.desk.assign(id, req.user_id).await?))
}

pub async fn change_status(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<ChangeStatusRequest>,
) -> Result<Json<TicketView>> {
    policy::require(user.role, Action::UpdateStatus)?;
    Ok(Json(state.desk.set_status(id, req.status).await?))
}

pub async fn delete_ticket(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    policy::require(user.role, Action::DeleteTicket)?;
    state.desk.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn configure_tickets_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tickets", get(list_tickets).post(create_ticket))
        .route(
            "/api/tickets/:id",
            get(get_ticket).put(update_ticket).delete(delete_ticket),
        )
        .route("/api/tickets/:id/assign", put(assign_ticket))
        .route("/api/tickets/:id/status", put(change_status))
}
