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

use crate::DaemonRpcConfig;
use base64::Engine;
use wiremock::MockServer;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

/// Start a mock daemon and build a client config pointing at it
pub async fn setup_mock_daemon_rpc() -> (MockServer, DaemonRpcConfig) {
    let mock_server = MockServer::start().await;

    let config = DaemonRpcConfig {
        url: mock_server.uri(),
        username: "testuser".to_string(),
        password: "testpass".to_string(),
        timeout_secs: Some(5),
    };

    (mock_server, config)
}

/// Mount a mock for a given method and params, ignoring the request id so the
/// same mock serves repeated calls.
pub async fn mock_method(
    mock_server: &MockServer,
    api_method: &str,
    params: serde_json::Value,
    result: serde_json::Value,
) {
    let auth_header = format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", "testuser", "testpass"))
    );

    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("Authorization", auth_header))
        .and(body_partial_json(serde_json::json!({
            "jsonrpc": "2.0",
            "method": api_method,
            "params": params,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({ "jsonrpc": "2.0", "result": result, "id": 0 }),
        ))
        .mount(mock_server)
        .await;
}
