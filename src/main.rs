use anyhow::Context;
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use deskserver::api_router::build_router;
use deskserver::auth::token::TokenService;
use deskserver::config::AppConfig;
use deskserver::notify::events::EventHub;
use deskserver::notify::mailer::{MailTransport, NullMailer, SmtpMailer};
use deskserver::notify::Dispatcher;
use deskserver::shared::state::AppState;
use deskserver::store::postgres::{create_pool, run_migrations, PgStore};
use deskserver::tickets::TicketDesk;
use deskserver::users::Directory;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database).context("failed to connect to database")?;
    run_migrations(&pool)?;
    let store = Arc::new(PgStore::new(pool));

    let mailer: Arc<dyn MailTransport> = match &config.smtp.host {
        Some(host) => Arc::new(SmtpMailer::new(&config.smtp, host)?),
        None => {
            info!("SMTP_HOST not set, mail delivery disabled");
            Arc::new(NullMailer)
        }
    };
    let notifier = Dispatcher::new(mailer, EventHub::default());

    let tokens = TokenService::from_secret(&config.auth.jwt_secret, config.auth.token_ttl_secs)?;
    let directory = Directory::new(store.clone());
    let desk = TicketDesk::new(store.clone(), store.clone(), notifier.clone());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState {
        directory,
        desk,
        tokens,
        notifier,
    });

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
