//! CampusGate event management backend
//!
//! Main application entry point

use tracing::info;

use CampusGate::{
    config::Settings,
    database::{connection::create_pool, DatabaseService},
    handlers::{create_router, AppState},
    services::ServiceFactory,
    utils::logging,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenv::dotenv().ok();
    let settings = Settings::new()?;
    settings.validate()?;

    // Initialize logging
    logging::init_logging(&settings.logging)?;

    info!("Starting CampusGate backend...");

    // Initialize database connection
    info!("Connecting to database...");
    let db_pool = create_pool(&settings.database).await?;

    // Run database migrations
    CampusGate::database::connection::run_migrations(&db_pool).await?;

    // Initialize services
    info!("Initializing services...");
    let database_service = DatabaseService::new(db_pool);
    let services = ServiceFactory::new(&settings, database_service.clone())?;

    // Build the router
    let state = AppState::new(services, database_service);
    let app = create_router(state);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "CampusGate is ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("CampusGate has been shut down.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
