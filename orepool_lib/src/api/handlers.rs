// Copyright (C) 2025, 2026 Orepool Developers (see AUTHORS)
//
// This file is part of Orepool
//
// Orepool is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Orepool is distributed in the hope that it will be useful, but WITHOUT ANY
// WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// Orepool. If not, see <https://www.gnu.org/licenses/>.

use super::models::{
    ApiState, BlockResponse, BlocksQuery, ErrorResponse, MinerResponse, PaymentResponse,
    StatsResponse, SubmitShareRequest, SubmitShareResponse, SubscribeQuery,
};
use crate::error::RejectReason;
use crate::ingest::{ShareOutcome, ShareSubmission};
use crate::store::StoreError;
use crate::utils::time_provider::format_timestamp;
use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use tracing::{debug, error};

fn store_error(e: StoreError) -> (StatusCode, Json<ErrorResponse>) {
    error!("Store error serving API request: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "store error".into(),
            message: e.to_string(),
        }),
    )
}

/// Health check handler
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Handler for share submission
pub async fn submit_share(
    State(state): State<ApiState>,
    Json(request): Json<SubmitShareRequest>,
) -> Result<Json<SubmitShareResponse>, (StatusCode, Json<ErrorResponse>)> {
    let submission = ShareSubmission {
        address: request.address,
        worker: request.worker,
        hash: request.hash,
        nonce: request.nonce,
        difficulty: request.difficulty,
    };
    let outcome = state.ingestion.submit(submission).await.map_err(|e| {
        error!("Share submission failed: {}", e);
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "submission failed".into(),
                message: e.to_string(),
            }),
        )
    })?;

    let response = match outcome {
        ShareOutcome::Accepted { block_candidate } => SubmitShareResponse {
            status: "accepted".into(),
            reason: None,
            block_candidate,
        },
        ShareOutcome::Rejected(reason) => SubmitShareResponse {
            status: "rejected".into(),
            reason: Some(
                match reason {
                    RejectReason::DuplicateShare => "duplicate share",
                    RejectReason::InvalidProof => "invalid proof",
                }
                .into(),
            ),
            block_candidate: false,
        },
    };
    Ok(Json(response))
}

/// Handler for a miner's balances and recent payments
pub async fn get_miner(
    State(state): State<ApiState>,
    Path(address): Path<String>,
) -> Result<Json<MinerResponse>, (StatusCode, Json<ErrorResponse>)> {
    let miner = state
        .store
        .get_miner(&address)
        .map_err(store_error)?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "unknown miner".into(),
                    message: format!("no shares recorded for {address}"),
                }),
            )
        })?;

    let payments = state
        .store
        .payments_for_address(&address, 50)
        .map_err(store_error)?
        .into_iter()
        .map(|p| PaymentResponse {
            amount: p.amount,
            tx_hash: p.tx_hash,
            status: format!("{:?}", p.status).to_lowercase(),
            created_at: p.created_at,
        })
        .collect();

    let now = state.time_provider.seconds_since_epoch();
    Ok(Json(MinerResponse {
        address: miner.address,
        worker: miner.worker,
        pending_balance: miner.pending_balance,
        total_paid: miner.total_paid,
        window_weight: state.ledger.miner_weight(&address, now),
        last_seen: miner.last_seen,
        formatted_last_seen: format_timestamp(miner.last_seen),
        payments,
    }))
}

/// Handler for recently found blocks
pub async fn get_blocks(
    State(state): State<ApiState>,
    Query(params): Query<BlocksQuery>,
) -> Result<Json<Vec<BlockResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let blocks = state
        .store
        .recent_blocks(params.limit.unwrap_or(25))
        .map_err(store_error)?
        .into_iter()
        .map(|b| BlockResponse {
            hash: b.hash,
            height: b.height,
            reward: b.reward,
            finder: b.finder,
            status: b.status.to_string(),
            found_at: b.found_at,
            formatted_found_at: format_timestamp(b.found_at),
        })
        .collect();
    Ok(Json(blocks))
}

/// Handler for pool-wide stats
pub async fn get_stats(
    State(state): State<ApiState>,
) -> Result<Json<StatsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let now = state.time_provider.seconds_since_epoch();
    let window_secs = state.ledger.window_secs();
    let window_weight = state.ledger.total_weight(now);
    let active_since = now.saturating_sub(window_secs);

    Ok(Json(StatsResponse {
        chain_height: state.chain_state.height(),
        network_difficulty: state.chain_state.network_difficulty(),
        daemon_reachable: state.chain_state.daemon_reachable(),
        active_miners: state
            .store
            .active_miner_count(active_since)
            .map_err(store_error)?,
        window_weight,
        pool_hashrate: window_weight / window_secs.max(1),
        confirmed_blocks: state.store.confirmed_block_count().map_err(store_error)?,
    }))
}

/// Handler for the event subscription websocket
pub async fn subscribe_events(
    State(state): State<ApiState>,
    Query(params): Query<SubscribeQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_subscriber(socket, state, params.address))
}

/// Pump bus events into the socket until either side goes away
async fn serve_subscriber(mut socket: WebSocket, state: ApiState, address: Option<String>) {
    let Some((id, mut events)) = state.notifications.subscribe(address).await else {
        return;
    };

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                if socket.send(Message::Text((*event).clone())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // Inbound frames are ignored, the socket is one-way
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    debug!("Event subscriber {} disconnected", id);
    state.notifications.unsubscribe(id).await;
}
