use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::middleware::{admin_guard, token_guard};
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Public routes -- no token required
    let public_routes = Router::new()
        .route("/auth/login", get(handlers::get_public_key).post(handlers::login))
        .route("/auth/refresh", post(handlers::refresh))
        .route("/question/practice", get(handlers::practice))
        .route("/question/info", get(handlers::info))
        .route("/question/all", get(handlers::all))
        .route("/question/:pid", get(handlers::by_pid));

    // User routes -- token guard resolves the caller's profile
    let user_routes = Router::new()
        .route("/user/profile", get(handlers::profile))
        .route(
            "/user/progress",
            get(handlers::list_progress).post(handlers::mark_progress),
        )
        .route(
            "/user/star",
            get(handlers::list_stars).post(handlers::mark_star),
        )
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            token_guard,
        ));

    // Admin routes -- permission claim gated, profile never resolved
    let admin_routes = Router::new()
        .route("/admin/percheck", get(handlers::percheck))
        .route("/admin/request", post(handlers::manage_request_info))
        .route("/admin/crawl", post(handlers::trigger_crawl))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            admin_guard,
        ));

    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
