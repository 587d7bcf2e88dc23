use crate::api::errors::ApiError;
use crate::api::AppState;
use crate::core::{Block, Payload, Transaction};
use crate::storage::UnspentOutput;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct MineRequest {
    pub data: String,
}

#[derive(Deserialize)]
pub struct ConnectPeer {
    pub endpoint: String,
}

#[derive(Deserialize)]
pub struct SendTransaction {
    pub address: String,
    pub amount: u64,
}

#[derive(Serialize)]
pub struct Balance {
    pub address: String,
    pub balance: u64,
}

pub async fn get_blocks(State(state): State<AppState>) -> Json<Vec<Block>> {
    Json(state.server.get_chain())
}

pub async fn get_latest(State(state): State<AppState>) -> Json<Block> {
    Json(state.server.get_latest())
}

/// Mine a data block. The proof-of-work search runs off the async runtime.
pub async fn mine(
    State(state): State<AppState>,
    Json(json): Json<MineRequest>,
) -> Result<Json<Block>, ApiError> {
    if json.data.is_empty() {
        return Err(ApiError::BadRequest("data must not be empty".to_string()));
    }

    let server = Arc::clone(&state.server);
    let block =
        tokio::task::spawn_blocking(move || server.mine(Payload::Data(json.data))).await??;
    Ok(Json(block))
}

pub async fn mine_pending(State(state): State<AppState>) -> Result<Json<Block>, ApiError> {
    let server = Arc::clone(&state.server);
    let block = tokio::task::spawn_blocking(move || server.mine_pending()).await??;
    Ok(Json(block))
}

pub async fn get_peers(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.server.list_peers())
}

pub async fn add_peer(
    State(state): State<AppState>,
    Json(json): Json<ConnectPeer>,
) -> Result<impl IntoResponse, ApiError> {
    let server = Arc::clone(&state.server);
    tokio::task::spawn_blocking(move || server.connect(&json.endpoint)).await??;
    Ok(StatusCode::OK)
}

pub async fn get_balance(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Json<Balance> {
    let balance = state.server.get_balance(&address);
    Json(Balance { address, balance })
}

pub async fn get_wallet(State(state): State<AppState>) -> Json<Balance> {
    Json(Balance {
        address: state.server.wallet_address().to_string(),
        balance: state.server.wallet_balance(),
    })
}

pub async fn send_transaction(
    State(state): State<AppState>,
    Json(json): Json<SendTransaction>,
) -> Result<Json<Transaction>, ApiError> {
    let tx = state.server.send_transaction(&json.address, json.amount)?;
    Ok(Json(tx))
}

pub async fn get_pool(State(state): State<AppState>) -> Json<Vec<Transaction>> {
    Json(state.server.get_pool())
}

pub async fn get_unspent_outputs(State(state): State<AppState>) -> Json<Vec<UnspentOutput>> {
    Json(state.server.get_unspent_outputs())
}
