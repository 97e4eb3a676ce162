//! Runs the task board HTTP server.
//!
//! Configuration is read from the environment (see [`taskboard::config`]).
//! Without `DATABASE_URL` the board lives in memory and every user may
//! access every project, which suits local development. With it, tasks are
//! stored in `PostgreSQL` and project membership is read from the
//! `project_members` table; apply the migrations under `migrations/` first.

use std::sync::Arc;

use diesel::{
    PgConnection,
    r2d2::{ConnectionManager, Pool, PoolError},
};
use mockable::DefaultClock;
use taskboard::{
    config::{ConfigError, ServerConfig},
    http::{AppState, router},
    realtime::ProjectChannels,
    task::{
        adapters::{
            log_notifier::LogNotifier,
            memory::{InMemoryProjectMembers, InMemoryTaskRepository},
            postgres::{PostgresProjectMembers, PostgresTaskRepository, TaskPgPool},
        },
        ports::{TaskAuthorizer, TaskRepository},
        services::{BoardCollaborators, TaskBoardService},
    },
};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::{EnvFilter, prelude::*};

/// Errors that stop the server.
#[derive(Debug, Error)]
enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid log filter: {0}")]
    LogFilter(#[from] tracing_subscriber::filter::ParseError),
    #[error("failed to create database pool: {0}")]
    Pool(#[from] PoolError),
    #[error("database pool setup was interrupted: {0}")]
    PoolTask(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    init_tracing()?;
    let config = ServerConfig::from_env()?;

    match config.database_url.clone() {
        Some(url) => {
            let pool = connect(url, config.pool_size).await?;
            let repository = PostgresTaskRepository::new(pool.clone())
                .with_lock_timeout(config.move_timeout);
            let authorizer = PostgresProjectMembers::new(pool);
            info!(pool_size = config.pool_size, "using PostgreSQL task store");
            serve(&config, repository, authorizer).await
        }
        None => {
            info!("DATABASE_URL not set; using in-memory task store");
            serve(
                &config,
                InMemoryTaskRepository::new(),
                InMemoryProjectMembers::open(),
            )
            .await
        }
    }
}

fn init_tracing() -> Result<(), ServerError> {
    let directives = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_owned());
    let env_filter = EnvFilter::try_new(directives)?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();
    Ok(())
}

async fn connect(url: String, pool_size: u32) -> Result<TaskPgPool, ServerError> {
    let pool = tokio::task::spawn_blocking(move || {
        Pool::builder()
            .max_size(pool_size)
            .build(ConnectionManager::<PgConnection>::new(url))
    })
    .await??;
    Ok(pool)
}

async fn serve<R, A>(config: &ServerConfig, repository: R, authorizer: A) -> Result<(), ServerError>
where
    R: TaskRepository + 'static,
    A: TaskAuthorizer + 'static,
{
    let channels = ProjectChannels::new(config.channel_capacity);
    let collaborators = BoardCollaborators {
        authorizer: Arc::new(authorizer),
        notifier: Arc::new(LogNotifier),
        publisher: Arc::new(channels.clone()),
    };
    let service = TaskBoardService::new(
        Arc::new(repository),
        Arc::new(DefaultClock),
        collaborators,
    )
    .with_move_timeout(config.move_timeout);
    let app = router(AppState::new(service, channels));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "task board listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("task board stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
