use blog_platform::{
    AppState,
    auth::{AuthenticatorState, JwtAuthenticator},
    config::AppConfig,
    create_router,
    repository::{PostgresRepository, RepositoryState},
};
use sqlx::{
    ConnectOptions,
    postgres::{PgConnectOptions, PgPoolOptions},
};
use std::{process, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, initializes logging, connects to Postgres, optionally migrates the
/// schema, then serves the router until the process is stopped.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail fast, listing every problem at once)
    dotenv::dotenv().ok();
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    // 2. Logging: RUST_LOG wins, otherwise crate-level debug.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "blog_platform=debug,tower_http=info".into());

    if config.env.is_local() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    }

    tracing::info!("Application starting in {} mode", config.env);

    if let Err(e) = run(config).await {
        tracing::error!("FATAL: {}", e);
        process::exit(1);
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    // 3. Database
    let mut connect_options = PgConnectOptions::from_str(&config.database_url)?;
    if !config.is_db_logging {
        connect_options = connect_options.disable_statement_logging();
    }

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options)
        .await?;

    if config.is_db_synchronize {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database schema migrated.");
    }

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;
    let auth = Arc::new(JwtAuthenticator::new(repo.clone(), &config)) as AuthenticatorState;

    // 4. State, router and server
    let port = config.port;
    let swagger = config.is_swagger_enabled;
    let app = create_router(AppState::new(repo, auth, config));

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;

    tracing::info!("Listening on 0.0.0.0:{}", port);
    if swagger {
        tracing::info!(
            "API Documentation (Swagger UI) available at: http://localhost:{}/swagger-ui",
            port
        );
    }

    axum::serve(listener, app).await?;
    Ok(())
}
