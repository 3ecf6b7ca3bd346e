use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::docs;
use crate::handlers::{self, AppState};

/// Upper bound on request bodies; every route is GET.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Builds the full application router.
///
/// `/health` is mounted outside the rate limiter.
pub fn build_router(state: Arc<AppState>) -> anyhow::Result<Router> {
    let mut api_routes = Router::new()
        .route("/", get(handlers::root))
        // API Documentation
        .route("/docs", get(docs::serve_swagger_ui))
        .route("/api-docs/openapi.json", get(docs::serve_openapi_spec))
        // Taxpayer endpoints
        .route(
            "/api/v1.0/taxpayer/validate/",
            get(handlers::validate_taxpayer_missing_tin),
        )
        .route(
            "/api/v1.0/taxpayer/validate/:tin",
            get(handlers::validate_taxpayer),
        )
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES));

    if let Some(limit) = state.config.rate_limit {
        let governor_conf = Arc::new(
            GovernorConfigBuilder::default()
                .per_second(limit.per_second)
                .burst_size(limit.burst_size)
                .key_extractor(SmartIpKeyExtractor)
                .finish()
                .context("Invalid rate limit configuration")?,
        );
        tracing::info!(
            "Rate limiting enabled: {} req/s per IP, burst {}",
            limit.per_second,
            limit.burst_size
        );
        api_routes = api_routes.layer(ServiceBuilder::new().layer(GovernorLayer {
            config: governor_conf,
        }));
    }

    let cors = cors_layer(&state.config)?;

    Ok(Router::new()
        .route("/health", get(handlers::health))
        .merge(api_routes)
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors))
}

/// CORS for the configured browser origins; `*` allows any origin.
pub fn cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    if config.cors_origins.iter().any(|origin| origin == "*") {
        return Ok(CorsLayer::permissive());
    }

    let origins = config
        .cors_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS origin: {}", origin))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any))
}

/// Binds the listener and serves until Ctrl-C or SIGTERM.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(config.clone()).context("Failed to initialize state")?);
    tracing::info!("✓ LHDN client initialized: {}", state.lhdn_client.base_url());

    let app = build_router(state)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await.context("Bind failed")?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server failed")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install CTRL+C signal handler: {}", e);
            std::future::pending::<()>().await;
        }

        tracing::info!("CTRL+C received");
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                tracing::info!("SIGTERM received");
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutting down");
}
