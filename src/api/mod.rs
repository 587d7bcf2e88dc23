//! HTTP control surface
//!
//! A thin JSON layer over [`Server`]. Handlers that mine or dial peers
//! hand the work to the blocking pool.

use crate::network::Server;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;

mod errors;
mod routes;

pub use errors::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub server: Arc<Server>,
}

pub struct ApiRoutes;

impl ApiRoutes {
    pub fn router(server: Arc<Server>) -> Router {
        Router::new()
            .route("/blocks", get(routes::get_blocks))
            .route("/blocks/latest", get(routes::get_latest))
            .route("/mine", post(routes::mine))
            .route("/mine/pending", post(routes::mine_pending))
            .route("/peers", get(routes::get_peers).post(routes::add_peer))
            .route("/balance/{address}", get(routes::get_balance))
            .route("/wallet", get(routes::get_wallet))
            .route("/transactions", post(routes::send_transaction))
            .route("/transactions/pool", get(routes::get_pool))
            .route("/utxos", get(routes::get_unspent_outputs))
            .with_state(AppState { server })
    }

    pub async fn serve(server: Arc<Server>, listener: TcpListener) -> Result<(), std::io::Error> {
        axum::serve(listener, Self::router(server)).await
    }
}
