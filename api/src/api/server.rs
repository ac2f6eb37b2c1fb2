use axum::{
    routing::{delete, get, post},
    Router,
};
use once_cell::sync::OnceCell;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{
    trace::{Sampler, SdkTracerProvider},
    Resource,
};
use std::env;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::api::handlers::*;
use crate::api::state::AppState;
use crate::config::AppConfig;
use crate::db;

const DEFAULT_LOG_FILTER: &str = "info,sqlx=info,hyper=warn,tower=warn,h2=error";

static TRACER_PROVIDER: OnceCell<SdkTracerProvider> = OnceCell::new();

pub fn init_tracing() {
    let enable_otel = env::var("OTEL_ENABLED").map(|v| v == "true").unwrap_or(false);
    let otel_endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4318/v1/traces".to_string());

    let subscriber = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .json()
                .with_target(false)
                .with_span_events(if enable_otel {
                    fmt::format::FmtSpan::NONE
                } else {
                    fmt::format::FmtSpan::CLOSE
                }),
        )
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        );

    if !enable_otel {
        subscriber.init();
        return;
    }

    match init_opentelemetry(&otel_endpoint) {
        Ok(provider) => {
            opentelemetry::global::set_tracer_provider(provider.clone());

            // global::tracer returns a BoxedTracer, which OpenTelemetryLayer cannot use
            let tracer = provider.tracer("piano-venues");
            let _ = TRACER_PROVIDER.set(provider);

            subscriber.with(OpenTelemetryLayer::new(tracer)).init();
            info!("OpenTelemetry enabled: {}", otel_endpoint);
        }
        Err(e) => {
            subscriber.init();
            error!("Failed to initialize OpenTelemetry: {}. Continuing with logs only.", e);
        }
    }
}

fn init_opentelemetry(endpoint: &str) -> Result<SdkTracerProvider, Box<dyn std::error::Error>> {
    let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
    let service_name = env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "piano-venues".to_string());

    let sampling_rate = env::var("OTEL_TRACE_SAMPLING_RATE")
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.1)
        .clamp(0.0, 1.0);

    let resource = Resource::builder()
        .with_attribute(KeyValue::new("service.name", service_name))
        .with_attribute(KeyValue::new("service.version", env!("CARGO_PKG_VERSION")))
        .with_attribute(KeyValue::new("deployment.environment", environment))
        .build();

    let exporter = SpanExporter::builder().with_http().with_endpoint(endpoint).build()?;

    let provider = SdkTracerProvider::builder()
        .with_resource(resource)
        .with_sampler(Sampler::TraceIdRatioBased(sampling_rate))
        .with_batch_exporter(exporter)
        .build();

    info!("OpenTelemetry sampling rate: {}%", sampling_rate * 100.0);
    Ok(provider)
}

/// Flush buffered spans before exit
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            eprintln!("Failed to flush OpenTelemetry spans: {}", e);
        }
    }
}

/// Connect, optionally migrate, and bundle the handler state
pub async fn build_state(config: AppConfig) -> Result<AppState, db::DatabaseError> {
    let pool = db::create_pool(&config.database_url).await?;
    db::health_check(&pool).await?;

    if config.run_migrations {
        db::run_migrations(&pool).await?;
    }

    Ok(AppState::new(pool, config))
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        // Venue directory
        .route("/api/venues", get(list_venues_handler).post(create_venue_handler))
        .route(
            "/api/venues/{id}",
            get(get_venue_handler).put(update_venue_handler).delete(delete_venue_handler),
        )
        .route("/api/venues/{id}/verify", post(verify_venue_handler))
        .route(
            "/api/venues/{id}/reviews",
            get(list_reviews_handler).post(create_review_handler),
        )
        // Curator administration (blog owner only)
        .route(
            "/api/admin/curators",
            get(list_curators_handler).post(add_curator_handler),
        )
        .route(
            "/api/admin/curators/{address}",
            delete(remove_curator_handler),
        )
        .route("/api/auth/permissions", get(permissions_handler))
        .route(
            "/api/profile/{address}",
            get(get_profile_handler).patch(update_profile_handler),
        )
        .route("/api/sync", get(sync_status_handler).post(sync_action_handler))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health_check() -> &'static str {
    "OK"
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down gracefully...");
}

pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    info!(
        chain_id = config.sync_chain_id,
        owner_configured = config.blog_owner_address.is_some(),
        "Starting piano venues server"
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = build_state(config).await?;
    let app = create_app(state);

    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
