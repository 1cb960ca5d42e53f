use crate::{AppState, handlers};
use axum::{Router, routing::delete};

/// Testing Router Module
///
/// Never mounted unless `INCLUDE_TESTING_MODULE` is set.
pub fn testing_routes() -> Router<AppState> {
    Router::new().route("/all-data", delete(handlers::delete_all_data))
}
