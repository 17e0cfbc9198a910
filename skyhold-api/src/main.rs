use anyhow::Context;
use skyhold_api::{app, AppState, AuthConfig};
use skyhold_core::events::{EventPublisher, LogPublisher};
use skyhold_order::ExpirySweeper;
use skyhold_store::{app_config::Config, DbClient, EventProducer, PgBookingRepository, PgFlightRepository};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skyhold_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Skyhold API on port {}", config.server.port);

    // Postgres
    let db = DbClient::new(config.database.url.expose(), config.database.max_connections)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;

    // Event bus
    let events: Arc<dyn EventPublisher> = match &config.kafka {
        Some(kafka) => Arc::new(EventProducer::new(&kafka.brokers).context("Failed to create Kafka producer")?),
        None => {
            tracing::warn!("No Kafka brokers configured, lifecycle events will only be logged");
            Arc::new(LogPublisher)
        }
    };

    let state = AppState::new(
        Arc::new(PgFlightRepository::new(db.pool.clone())),
        Arc::new(PgBookingRepository::new(db.pool.clone())),
        events,
        &config.business_rules,
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
    );

    // Pending-booking expiry is off unless a TTL is configured
    if let Some(ttl) = config.business_rules.pending_booking_ttl_seconds {
        let sweeper = ExpirySweeper::new(state.bookings.clone(), Duration::from_secs(ttl));
        let every = Duration::from_secs(config.business_rules.expiry_sweep_interval_seconds.max(1));
        tokio::spawn(sweeper.run(every));
    }

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
