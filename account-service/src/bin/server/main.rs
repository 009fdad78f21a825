use std::sync::Arc;
use std::time::Duration;

use account_service::config::Config;
use account_service::identity::service::AccountService;
use account_service::identity::service::AccountSettings;
use account_service::inbound::http::router::create_router;
use account_service::inbound::http::router::AppState;
use account_service::outbound::notifications::KafkaNotificationDispatcher;
use account_service::password::service::PasswordService;
use account_service::password::service::PasswordSettings;
use account_service::profile::service::ProfileService;
use account_service::repositories::PostgresIdentityRepository;
use account_service::repositories::PostgresProfileRepository;
use account_service::repositories::PostgresResetTicketRepository;
use account_service::repositories::PostgresSessionStore;
use auth::Authenticator;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "account_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "account-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        kafka_brokers = %config.kafka.brokers,
        kafka_topic = %config.kafka.notifications_topic,
        frontend_url = %config.frontend.url,
        "Configuration loaded"
    );

    let pg_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;
    tracing::info!(
        max_connections = config.database.max_connections,
        database = "postgresql",
        "Database connection pool created"
    );

    sqlx::migrate!("./migrations").run(&pg_pool).await?;
    tracing::info!(database = "postgresql", "Database migrations completed");

    let authenticator = Arc::new(Authenticator::new(config.jwt.secret.as_bytes()));
    let identity_repository = Arc::new(PostgresIdentityRepository::new(pg_pool.clone()));
    let session_store = Arc::new(PostgresSessionStore::new(pg_pool.clone()));
    let profile_repository = Arc::new(PostgresProfileRepository::new(pg_pool.clone()));
    let ticket_repository = Arc::new(PostgresResetTicketRepository::new(pg_pool));
    let notifier = Arc::new(KafkaNotificationDispatcher::new(&config)?);

    let account_service = Arc::new(AccountService::new(
        Arc::clone(&identity_repository),
        Arc::clone(&session_store),
        Arc::clone(&notifier),
        Arc::clone(&authenticator),
        AccountSettings {
            token_ttl: chrono::Duration::hours(config.jwt.expiration_hours),
            session_ttl: chrono::Duration::hours(config.session.ttl_hours),
            verification_ttl: chrono::Duration::hours(config.email_verification.ttl_hours),
            frontend_url: config.frontend.url.clone(),
        },
    ));

    let password_service = Arc::new(PasswordService::new(
        identity_repository,
        Arc::clone(&ticket_repository),
        Arc::clone(&session_store),
        notifier,
        Arc::clone(&authenticator),
        PasswordSettings {
            ticket_ttl: chrono::Duration::minutes(config.password_reset.ticket_ttl_minutes),
            frontend_url: config.frontend.url.clone(),
            support_email: config.frontend.support_email.clone(),
        },
    ));

    let profile_service = Arc::new(ProfileService::new(
        profile_repository,
        config.profile.strict_flattened_keys,
    ));

    // Expired sessions and dead tickets are already ignored on read; this only reclaims rows.
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match session_store.purge_expired().await {
                Ok(purged) => tracing::debug!(purged, "Expired sessions purged"),
                Err(e) => tracing::error!(error = %e, "Failed to purge expired sessions"),
            }
            match ticket_repository.purge_expired().await {
                Ok(purged) => tracing::debug!(purged, "Dead reset tickets purged"),
                Err(e) => tracing::error!(error = %e, "Failed to purge reset tickets"),
            }
        }
    });

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let http_application = create_router(AppState {
        account_service,
        profile_service,
        password_service,
        authenticator,
        cookie_name: config.session.cookie_name.clone(),
    });

    axum::serve(http_listener, http_application).await?;

    tracing::info!("Server exited successfully");

    Ok(())
}
