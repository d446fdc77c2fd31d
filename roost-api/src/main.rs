use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use roost_api::{app, state::{AppState, AuthConfig}, worker};
use roost_booking::store::BookingStore;
use roost_booking::{
    BookingManager, CheckoutConfig, CheckoutCoordinator, HoldSweeper, MockPaymentProvider,
};
use roost_core::catalog::ResourceCatalog;
use roost_store::{Config, Db, PgBookingStore, PgResourceCatalog};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roost_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().expect("Failed to load config");
    tracing::info!("Starting Roost API on port {}", config.server.port);

    let db = Db::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let store: Arc<dyn BookingStore> = Arc::new(PgBookingStore::new(db.pool.clone()));
    let catalog: Arc<dyn ResourceCatalog> = Arc::new(PgResourceCatalog::new(db.pool.clone()));
    // In-process provider; swapped for the hosted gateway adapter per deploy.
    let provider = Arc::new(MockPaymentProvider::new());

    let manager = Arc::new(BookingManager::new(store.clone(), catalog.clone()));
    let coordinator = Arc::new(CheckoutCoordinator::new(
        store.clone(),
        provider,
        CheckoutConfig {
            success_url: config.payment.success_url.clone(),
            cancel_url: config.payment.cancel_url.clone(),
            provider_timeout: Duration::from_secs(config.payment.provider_timeout_seconds),
        },
    ));

    // Background sweep reclaiming stale unpaid holds.
    let sweeper = HoldSweeper::new(store.clone(), config.business_rules.pending_hold_seconds);
    tokio::spawn(worker::start_expiry_worker(
        sweeper,
        Duration::from_secs(config.business_rules.sweep_interval_seconds),
    ));

    let app_state = AppState {
        bookings: manager,
        checkout: coordinator,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
