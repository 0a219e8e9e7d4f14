//! Storage traits for user and ticket records.
//!
//! The core never talks to a database directly: it goes through these
//! traits, each operation atomic at single-record granularity. Two
//! implementations exist: Postgres for production and an in-memory
//! map used by the test suite.

pub mod memory;
pub mod postgres;
pub mod schema;

use async_trait::async_trait;
use uuid::Uuid;

use crate::shared::error::Result;
use crate::tickets::Ticket;
use crate::users::{Role, User};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `DuplicateEmail` when the address is already taken.
    async fn insert(&self, user: User) -> Result<User>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    /// `Ok(None)` when no such user exists.
    async fn set_role(&self, id: Uuid, role: Role) -> Result<Option<User>>;
    async fn list(&self) -> Result<Vec<User>>;
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn insert(&self, ticket: Ticket) -> Result<Ticket>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Ticket>>;
    /// Full-record save. `Ok(None)` when the ticket no longer exists.
    async fn save(&self, ticket: Ticket) -> Result<Option<Ticket>>;
    /// `Ok(true)` when a record was removed.
    async fn delete(&self, id: Uuid) -> Result<bool>;
    async fn list(&self) -> Result<Vec<Ticket>>;
}
