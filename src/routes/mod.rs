/// Application routes configuration
use crate::handlers::{
    get_image_collection, get_time_series_plot, health, home, require_login, AppState,
};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Build the application router with all routes
pub fn build_router(state: AppState) -> Router {
    let app = Router::new()
        .route("/", get(home))
        .route("/get-image-collection", post(get_image_collection))
        .route("/get-image-collection/", post(get_image_collection))
        .route("/get-time-series-plot", post(get_time_series_plot))
        .route("/get-time-series-plot/", post(get_time_series_plot))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_login));

    let root = state.config.root_url.clone();
    let app = if root.is_empty() {
        app
    } else {
        // `nest` does not match the root with a trailing slash on its own
        Router::new()
            .route(&format!("{root}/"), get(home))
            .route_layer(middleware::from_fn_with_state(state.clone(), require_login))
            .nest(&root, app)
    };

    Router::new()
        // Health check
        .route("/health", get(health))
        .merge(app)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
