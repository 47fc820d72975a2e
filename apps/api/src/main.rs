use std::net::SocketAddr;
use std::sync::Arc;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use billing_cell::{BillingStore, LedgerService};
use scheduling_cell::{BookingService, SchedulingStore};
use shared_config::AppConfig;
use shared_events::{spawn_dispatcher, EventBus, LoggingSink, NotificationSink};
use shared_utils::{Clock, SystemClock};
use triage_cell::{TriageService, TriageStore};

#[tokio::main]
async fn main() {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting hospital core API server");

    // Load configuration
    let config = AppConfig::from_env();

    // Event sink: finalized state changes flow to the notification
    // subsystem without ever blocking the emitting operation.
    let (events, event_rx) = EventBus::new();
    let sink = Arc::new(LoggingSink) as Arc<dyn NotificationSink>;
    spawn_dispatcher(event_rx, sink);

    let clock = Arc::new(SystemClock) as Arc<dyn Clock>;

    let booking = Arc::new(BookingService::new(
        Arc::new(SchedulingStore::new()),
        events.clone(),
        Arc::clone(&clock),
    ));
    let triage = Arc::new(TriageService::new(
        Arc::new(TriageStore::new()),
        events.clone(),
        Arc::clone(&clock),
    ));
    let ledger = Arc::new(LedgerService::new(
        Arc::new(BillingStore::new()),
        events.clone(),
        Arc::clone(&clock),
        &config,
    ));

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(Arc::new(config.clone()), booking, triage, ledger)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .expect("BIND_ADDR must be a valid socket address");
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
