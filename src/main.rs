//! users-graphql server and maintenance commands
//!
//! ```bash
//! # Serve the API (default)
//! users-graphql serve
//!
//! # Replace all users with 50 fake ones
//! users-graphql seed --count 50
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::signal;

use users_graphql::auth::AuthGuard;
use users_graphql::config::{self, AppConfig, Environment};
use users_graphql::database::{self, SeaOrmUserRepository};
use users_graphql::seed::{seed_users, DEFAULT_SEED_COUNT};
use users_graphql::server::{router, AppState, GRAPHQL_PATH};
use users_graphql::{telemetry, UserService};

#[derive(Parser)]
#[command(name = "users-graphql")]
#[command(author, version, about = "GraphQL user-management API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the GraphQL API
    Serve,
    /// Replace stored users with generated ones
    Seed {
        /// Number of users to create
        #[arg(short, long, default_value_t = DEFAULT_SEED_COUNT)]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    config::load_dotenv();
    telemetry::init_tracing(&Environment::from_env());

    let config = AppConfig::from_env().context("invalid configuration")?;

    let db = database::connect(&config.database_url)
        .await
        .context("failed to connect to database")?;
    database::sync_schema(&db)
        .await
        .context("failed to synchronize schema")?;
    let repository = Arc::new(SeaOrmUserRepository::new(db));

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let service = UserService::new(repository, AuthGuard::new(&config.jwt_secret));
            let app = router(AppState::new(service));

            let addr = config.socket_addr()?;
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind {}", addr))?;
            tracing::info!(%addr, path = GRAPHQL_PATH, "server listening");

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("server error")?;
        }
        Commands::Seed { count } => {
            let created = seed_users(repository.as_ref(), count)
                .await
                .context("seeding failed")?;
            tracing::info!(count = created.len(), "database seeded");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
