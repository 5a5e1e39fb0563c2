use axum::routing::get;
use axum::Router;

use crate::handlers::suggestion_handlers::search_suggestions;

pub fn suggestion_routes() -> Router {
    Router::new().route("/search-suggestions", get(search_suggestions))
}
