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

use super::handlers::{
    get_blocks, get_miner, get_stats, health_check, submit_share, subscribe_events,
};
use super::models::ApiState;
use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// HTTP and websocket API for the pool
pub struct ApiServer {
    state: ApiState,
    hostname: String,
    port: u16,
}

impl ApiServer {
    pub fn new(state: ApiState, hostname: String, port: u16) -> Self {
        Self {
            state,
            hostname,
            port,
        }
    }

    /// Start the API server
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let app = self.create_app();
        let addr: SocketAddr = format!("{}:{}", self.hostname, self.port).parse()?;

        info!("Starting API server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Create the Axum application with routes and middleware
    pub fn create_app(&self) -> Router {
        Router::new()
            .route("/health", get(health_check))
            .route("/api/submit", post(submit_share))
            .route("/api/miner/:address", get(get_miner))
            .route("/api/blocks", get(get_blocks))
            .route("/api/stats", get(get_stats))
            .route("/ws", get(subscribe_events))
            .with_state(self.state.clone())
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(
                        CorsLayer::new()
                            .allow_origin(Any)
                            .allow_methods(Any)
                            .allow_headers(Any),
                    ),
            )
    }
}
