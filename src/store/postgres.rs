use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::DatabaseErrorKind;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use uuid::Uuid;

use super::schema::{tickets, users};
use super::{TicketStore, UserStore};
use crate::config::DatabaseConfig;
use crate::shared::error::{Error, Result};
use crate::tickets::{Ticket, TicketPriority, TicketStatus};
use crate::users::{Role, User};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub fn create_pool(config: &DatabaseConfig) -> anyhow::Result<DbPool> {
    let manager = ConnectionManager::<PgConnection>::new(config.url());
    Pool::builder().max_size(10).build(manager).map_err(Into::into)
}

pub fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("migrations failed: {e}"))?;
    Ok(())
}

#[derive(Debug, Clone, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = users)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<User> for UserRow {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role.as_str().to_string(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl TryFrom<UserRow> for User {
    type Error = Error;

    fn try_from(row: UserRow) -> Result<Self> {
        let role = Role::parse(&row.role)
            .ok_or_else(|| Error::Internal(format!("unknown role in store: {}", row.role)))?;
        Ok(Self {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = tickets, treat_none_as_null = true)]
struct TicketRow {
    id: Uuid,
    title: String,
    description: String,
    status: String,
    priority: String,
    created_by: Uuid,
    assigned_to: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<Ticket> for TicketRow {
    fn from(ticket: Ticket) -> Self {
        Self {
            id: ticket.id,
            title: ticket.title,
            description: ticket.description,
            status: ticket.status.as_str().to_string(),
            priority: ticket.priority.as_str().to_string(),
            created_by: ticket.created_by,
            assigned_to: ticket.assigned_to,
            created_at: ticket.created_at,
            updated_at: ticket.updated_at,
        }
    }
}

impl TryFrom<TicketRow> for Ticket {
    type Error = Error;

    fn try_from(row: TicketRow) -> Result<Self> {
        let status = TicketStatus::parse(&row.status)
            .ok_or_else(|| Error::Internal(format!("unknown status in store: {}", row.status)))?;
        let priority = TicketPriority::parse(&row.priority).ok_or_else(|| {
            Error::Internal(format!("unknown priority in store: {}", row.priority))
        })?;
        Ok(Self {
            id: row.id,
            title: row.title,
            description: row.description,
            status,
            priority,
            created_by: row.created_by,
            assigned_to: row.assigned_to,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Postgres-backed store. Diesel is synchronous, so every call runs on
/// the blocking pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PgConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| Error::Internal(format!("database pool error: {e}")))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| Error::Internal(format!("database task failed: {e}")))?
    }
}

fn db_err(e: diesel::result::Error) -> Error {
    Error::Internal(format!("database error: {e}"))
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert(&self, user: User) -> Result<User> {
        let row = UserRow::from(user.clone());
        self.blocking(move |conn| {
            diesel::insert_into(users::table)
                .values(&row)
                .execute(conn)
                .map_err(|e| match e {
                    diesel::result::Error::DatabaseError(
                        DatabaseErrorKind::UniqueViolation,
                        _,
                    ) => Error::DuplicateEmail,
                    other => db_err(other),
                })?;
            Ok(())
        })
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = self
            .blocking(move |conn| {
                users::table
                    .find(id)
                    .first::<UserRow>(conn)
                    .optional()
                    .map_err(db_err)
            })
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.to_string();
        let row = self
            .blocking(move |conn| {
                users::table
                    .filter(users::email.eq(email))
                    .first::<UserRow>(conn)
                    .optional()
                    .map_err(db_err)
            })
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<Option<User>> {
        let now = Utc::now();
        let row = self
            .blocking(move |conn| {
                diesel::update(users::table.find(id))
                    .set((users::role.eq(role.as_str()), users::updated_at.eq(now)))
                    .get_result::<UserRow>(conn)
                    .optional()
                    .map_err(db_err)
            })
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<User>> {
        let rows = self
            .blocking(move |conn| {
                users::table
                    .order(users::created_at.asc())
                    .load::<UserRow>(conn)
                    .map_err(db_err)
            })
            .await?;
        rows.into_iter().map(User::try_from).collect()
    }
}

#[async_trait]
impl TicketStore for PgStore {
    async fn insert(&self, ticket: Ticket) -> Result<Ticket> {
        let row = TicketRow::from(ticket.clone());
        self.blocking(move |conn| {
            diesel::insert_into(tickets::table)
                .values(&row)
                .execute(conn)
                .map_err(db_err)?;
            Ok(())
        })
        .await?;
        Ok(ticket)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Ticket>> {
        let row = self
            .blocking(move |conn| {
                tickets::table
                    .find(id)
                    .first::<TicketRow>(conn)
                    .optional()
                    .map_err(db_err)
            })
            .await?;
        row.map(Ticket::try_from).transpose()
    }

    async fn save(&self, ticket: Ticket) -> Result<Option<Ticket>> {
        let row = TicketRow::from(ticket.clone());
        let updated = self
            .blocking(move |conn| {
                diesel::update(tickets::table.find(row.id))
                    .set(&row)
                    .get_result::<TicketRow>(conn)
                    .optional()
                    .map_err(db_err)
            })
            .await?;
        updated.map(Ticket::try_from).transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let removed = self
            .blocking(move |conn| {
                diesel::delete(tickets::table.find(id))
                    .execute(conn)
                    .map_err(db_err)
            })
            .await?;
        Ok(removed > 0)
    }

    async fn list(&self) -> Result<Vec<Ticket>> {
        let rows = self
            .blocking(move |conn| {
                tickets::table
                    .order(tickets::created_at.desc())
                    .load::<TicketRow>(conn)
                    .map_err(db_err)
            })
            .await?;
        rows.into_iter().map(Ticket::try_from).collect()
    }
}
