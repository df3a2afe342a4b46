//! Application startup and lifecycle management.

use crate::config::{CorsConfig, FeedbackConfig};
use crate::error::panic_response;
use crate::handlers;
use crate::services::providers::{CompletionProvider, OpenAiProvider};
use crate::services::FeedbackEvaluator;
use axum::http::{header, HeaderValue, Method};
use axum::middleware::from_fn;
use axum::{
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::tracing::request_id_middleware;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub const FEEDBACK_PATH: &str = "/api/feedback";

/// Shared application state. Immutable after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: FeedbackConfig,
    pub evaluator: FeedbackEvaluator,
}

fn cors_layer(cors: &CorsConfig) -> Result<CorsLayer, AppError> {
    let origin = if cors.allowed_origin.trim() == "*" {
        AllowOrigin::any()
    } else {
        let origin = HeaderValue::from_str(cors.allowed_origin.trim()).map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!(
                "FEEDBACK_ALLOWED_ORIGIN '{}' is not a valid origin: {}",
                cors.allowed_origin,
                e
            ))
        })?;
        AllowOrigin::exact(origin)
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]))
}

/// Build the HTTP router around an already-assembled state.
pub fn build_router(state: AppState) -> Result<Router, AppError> {
    let cors = cors_layer(&state.config.cors)?;

    let router = Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            FEEDBACK_PATH,
            post(handlers::submit_feedback).fallback(handlers::method_not_allowed),
        )
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state);

    Ok(router)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the OpenAI Responses provider.
    pub async fn build(config: FeedbackConfig) -> Result<Self, AppError> {
        let provider = OpenAiProvider::new(&config.completion).map_err(|e| {
            tracing::error!("Failed to create completion client: {}", e);
            AppError::from(e)
        })?;

        Self::build_with_provider(config, Arc::new(provider)).await
    }

    /// Build the application around any completion provider.
    pub async fn build_with_provider(
        config: FeedbackConfig,
        provider: Arc<dyn CompletionProvider>,
    ) -> Result<Self, AppError> {
        let evaluator = FeedbackEvaluator::new(
            provider,
            config.completion.clone(),
            config.variant.clone(),
        );

        tracing::info!(
            model = %config.completion.model,
            variant = %config.variant.schema,
            strict_schema = config.variant.strict_schema,
            allowed_origin = %config.cors.allowed_origin,
            "Initialized feedback evaluator"
        );

        let state = AppState {
            config: config.clone(),
            evaluator,
        };
        let router = build_router(state)?;

        // Port 0 picks a random port for testing
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Feedback service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until SIGINT/SIGTERM.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                e
            })
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received");
}
