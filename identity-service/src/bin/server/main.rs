use std::sync::Arc;

use auth::TokenIssuer;
use identity_service::config::Config;
use identity_service::config::StorageBackend;
use identity_service::domain::subject::ports::AuthServicePort;
use identity_service::domain::subject::service::AuthService;
use identity_service::inbound::http::router::create_router;
use identity_service::outbound::password::Argon2PasswordHashing;
use identity_service::outbound::repositories::InMemoryStore;
use identity_service::outbound::repositories::PostgresSessionRepository;
use identity_service::outbound::repositories::PostgresSubjectRepository;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const MIN_SECRET_LENGTH: usize = 32;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "identity_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "identity-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        storage = ?config.storage.backend,
        issuer = %config.jwt.issuer,
        "Configuration loaded"
    );

    if config.jwt.secret.len() < MIN_SECRET_LENGTH {
        tracing::warn!(
            min_length = MIN_SECRET_LENGTH,
            "JWT secret is shorter than recommended"
        );
    }

    let issuer = Arc::new(TokenIssuer::new(
        config.jwt.secret.as_bytes(),
        config.jwt.issuer.clone(),
    ));
    let passwords = Arc::new(Argon2PasswordHashing::new());
    let policies = config.role_policies();

    let auth_service: Arc<dyn AuthServicePort> = match config.storage.backend {
        StorageBackend::Postgres => {
            let pg_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&config.database.url)
                .await?;
            tracing::info!(
                max_connections = 5,
                database = "postgresql",
                "Database connection pool created"
            );

            sqlx::migrate!("./migrations").run(&pg_pool).await?;
            tracing::info!(database = "postgresql", "Database migrations completed");

            Arc::new(AuthService::new(
                Arc::new(PostgresSubjectRepository::new(pg_pool.clone())),
                Arc::new(PostgresSessionRepository::new(pg_pool)),
                passwords,
                Arc::clone(&issuer),
                policies,
            ))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; subjects and sessions are lost on restart");
            let store = Arc::new(InMemoryStore::new());

            Arc::new(AuthService::new(
                Arc::clone(&store),
                store,
                passwords,
                Arc::clone(&issuer),
                policies,
            ))
        }
    };

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let http_application = create_router(auth_service, issuer);

    axum::serve(http_listener, http_application)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server exited successfully");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
