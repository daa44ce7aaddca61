use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Router,
};
use std::path::Path;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::{
    config::Config,
    handlers::{applications, auth, jobs},
    middleware::auth::{admin_middleware, auth_middleware},
    AppState,
};

/// The REST surface with its auth layers, without transport concerns.
pub fn api_routes(state: AppState) -> Router {
    let authenticated = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route(
            "/api/applications",
            get(applications::list_applications).post(applications::create_application),
        )
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    let admin = Router::new()
        .route("/api/jobs", post(jobs::create_job))
        .route(
            "/api/jobs/:id",
            patch(jobs::update_job).delete(jobs::delete_job),
        )
        .route(
            "/api/applications/:id/status",
            patch(applications::update_status),
        )
        .route_layer(from_fn_with_state(state.clone(), admin_middleware));

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/admin/register", post(auth::register_admin))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/admin/login", post(auth::login_admin))
        .route("/api/jobs", get(jobs::list_jobs))
        .route("/api/jobs/:id", get(jobs::get_job))
        .merge(authenticated)
        .merge(admin)
        .with_state(state)
}

/// Full application: API, CORS, body limit, request tracing and the optional
/// static client bundle.
pub fn build_app(state: AppState, config: &Config) -> anyhow::Result<Router> {
    let allow_origin = if config.cors_allowed_origin == "*" {
        AllowOrigin::any()
    } else {
        AllowOrigin::exact(config.cors_allowed_origin.parse::<HeaderValue>()?)
    };
    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let mut app = api_routes(state);

    if let Some(dir) = &config.static_dir {
        let index = Path::new(dir).join("index.html");
        app = app.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)));
        tracing::info!("Serving client bundle from {}", dir);
    }

    Ok(app
        .layer(cors)
        .layer(DefaultBodyLimit::max(config.max_request_body_mb * 1024 * 1024))
        .layer(TraceLayer::new_for_http()))
}
