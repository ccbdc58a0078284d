//! Router configuration module
//!
//! Configures all routes, middleware layers, and creates the application router.

use std::{sync::Arc, time::Duration};

use axum::{
    http::{header, Method, StatusCode},
    routing::{get, post, put},
    Router,
};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::handlers::{
    create_facecam_handler, create_photo_detail_handler, create_photo_handler,
    facecam_recognition_handler, get_facecam_handler, get_object_handler, get_photo_handler,
    health, photo_recognition_handler, ready, set_interaction_flags_handler,
    update_facecam_asset_handler, upload_facecam_handler, upload_photo_handler,
};
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Create the application router with default config (for testing)
pub fn create_router(state: AppState) -> Router {
    create_router_with_config(&Config::default(), state)
}

/// Create the application router with custom configuration
pub fn create_router_with_config(config: &Config, state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    // Request body limit
    let body_limit = RequestBodyLimitLayer::new(config.body_limit_mb * 1024 * 1024);

    // Request timeout
    let timeout = TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        Duration::from_secs(config.timeout_secs),
    );

    let router = Router::new()
        .route("/api/photos", post(upload_photo_handler))
        .route("/api/facecams", post(upload_facecam_handler))
        .route("/internal/photos", post(create_photo_handler))
        .route("/internal/photos/{id}", get(get_photo_handler))
        .route(
            "/internal/photos/{id}/interactions",
            put(set_interaction_flags_handler),
        )
        .route("/internal/photo-details", post(create_photo_detail_handler))
        .route("/internal/facecams", post(create_facecam_handler))
        .route("/internal/facecams/{user_id}", get(get_facecam_handler))
        .route(
            "/internal/facecams/{user_id}/asset",
            put(update_facecam_asset_handler),
        )
        .route(
            "/internal/recognition/photos",
            post(photo_recognition_handler),
        )
        .route(
            "/internal/recognition/facecams",
            post(facecam_recognition_handler),
        )
        .route("/objects/{*key}", get(get_object_handler))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(cors)
        .layer(body_limit)
        .layer(timeout);

    // Conditionally apply rate limiting (disabled in tests, enabled in production)
    if config.rate_limit_enabled {
        let governor_conf = GovernorConfigBuilder::default()
            .per_second(config.rate_limit_per_sec)
            .burst_size(config.rate_limit_burst)
            .finish();

        match governor_conf {
            Some(conf) => {
                tracing::info!(
                    "Rate limiting: {} req/s (burst: {})",
                    config.rate_limit_per_sec,
                    config.rate_limit_burst
                );
                router
                    .layer(GovernorLayer::new(Arc::new(conf)))
                    .layer(TraceLayer::new_for_http())
            }
            None => {
                tracing::warn!("Rate limiter config invalid, running without rate limiting");
                router.layer(TraceLayer::new_for_http())
            }
        }
    } else {
        tracing::warn!("Rate limiting: DISABLED");
        router.layer(TraceLayer::new_for_http())
    }
}
