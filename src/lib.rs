pub mod error;
pub mod handlers;
pub mod state;
pub mod ui;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use state::SharedState;
use tower_http::trace::TraceLayer;

pub fn app(state: SharedState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/feed", get(handlers::get_feed))
        .route("/feed/query", put(handlers::put_query))
        .route("/feed/scroll", post(handlers::post_scroll))
        .route("/feed/posts/:id/comments", get(handlers::get_comments))
        .route("/posts", post(handlers::create_post))
        .route("/posts/:id/save", post(handlers::save_post))
        .route("/toasts", get(handlers::get_toasts))
        .route("/toasts/:id", delete(handlers::delete_toast))
        .route("/anniversary", get(handlers::get_anniversary))
        .layer(TraceLayer::new_for_http())
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .with_state(state)
}
