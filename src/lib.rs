use std::path::Path;

use crate::auth::hash_password;
use crate::model::entity::{UserEntity, UserEntityCreateUpdate};
use crate::model::{CrudRepository, DbConnection, ModelManager};
use crate::utils::mailer::SharedMailer;
use crate::utils::signal::shutdown_signal;
use crate::web::{AuthenticatedUser, UserRole};
use crate::{error::AppResult, web::AppState};
use axum::Router;
use sqlx::migrate::Migrator;
use tokio::net::TcpListener;

pub mod config;
pub use config::{Config, ConfigError, ConfigResult};

pub mod auth;
pub mod error;
pub mod model;
pub mod utils;
pub mod web;

static APPLICATION_NAME: &str = "syllabus";

pub async fn build_server() -> AppResult<(AppState, Router)> {
    let use_local = cfg!(debug_assertions);
    let config = Config::get_or_init(use_local).await;
    let db = DbConnection::connect(config.app().database_uri())?;

    let migrator = Migrator::new(Path::new("./migrations"))
        .await
        .map_err(model::DatabaseError::from)?;
    tracing::debug!("applying migrations...");
    migrator
        .run(db.pool())
        .await
        .map_err(model::DatabaseError::from)?;

    build_server_with_pool(db).await
}

pub async fn build_server_with_pool(db: DbConnection) -> AppResult<(AppState, Router)> {
    let state = AppState::new(ModelManager::new(db));
    prepare(state).await
}

/// Same as [`build_server_with_pool`] with a custom mail transport.
pub async fn build_server_with(
    db: DbConnection,
    mailer: SharedMailer,
) -> AppResult<(AppState, Router)> {
    let state = AppState::with_mailer(ModelManager::new(db), mailer);
    prepare(state).await
}

async fn prepare(state: AppState) -> AppResult<(AppState, Router)> {
    let config = Config::get_or_init(true).await;

    ensure_admin(state.pool(), config).await?;

    let removed = model::entity::RefreshToken::cleanup_expired(
        state.pool(),
        &AuthenticatedUser::admin(),
    )
    .await?;
    if removed > 0 {
        tracing::info!("removed {removed} expired refresh tokens");
    }

    let app = web::routes::build_app(state.clone(), config);
    Ok((state, app))
}

/// Creates the admin account from the `[admin]` config section if it does not exist yet.
async fn ensure_admin(mm: &ModelManager, config: &Config) -> AppResult<()> {
    let Some(admin) = config.admin() else {
        return Ok(());
    };

    let system = AuthenticatedUser::admin();
    if UserEntity::find_by_email(mm, &system, admin.email())
        .await?
        .is_some()
    {
        return Ok(());
    }

    let data = UserEntityCreateUpdate {
        email: admin.email().to_string(),
        password_hash: hash_password(admin.password())?,
        full_name: "Administrator".to_string(),
        role: UserRole::Admin,
    };
    UserEntity::create(mm, &system, data).await?;

    tracing::info!("admin account {} created", admin.email());
    Ok(())
}

#[tracing::instrument]
pub async fn setup_workers() -> AppResult<()> {
    let (_, app) = build_server().await?;
    let config = Config::get_or_init(cfg!(debug_assertions)).await;
    let listener = TcpListener::bind(config.host().bindto()).await?;

    tracing::info!("axum is starting at: {}", config.host().bindto());
    let axum_handle = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

    axum_handle.await?;
    Ok(())
}

fn setup_trace() {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

    // load .env file for RUST_LOG etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .with(ErrorLayer::default())
        .init();

    tracing::debug!("tracing initialized.");
}

#[tracing::instrument]
pub async fn run() -> AppResult<()> {
    setup_trace();
    setup_workers().await?;
    Ok(())
}
