//! Order API module

mod handler;

use axum::{
    Router,
    routing::{get, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/my-orders", get(handler::my_orders))
        .route("/check-expired-orders", put(handler::check_expired))
        .route("/{id}/pay", put(handler::pay))
        .route("/{id}/status", put(handler::set_status))
}
