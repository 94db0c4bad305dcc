use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::error;
use uuid::Uuid;

use crate::domain::value_objects::orders::{ConnectionInfo, ServerPlan};

/// Game-panel control plane, spoken as `action` + payload against a single
/// RPC-style endpoint.
#[async_trait]
#[automock]
pub trait PanelGateway: Send + Sync {
    async fn create_server(&self, request: CreateServerRequest) -> Result<CreateServerResponse>;

    async fn send_power_signal(&self, server_id: &str, signal: PowerSignal) -> Result<()>;

    async fn suspend_server(&self, server_id: &str) -> Result<()>;

    async fn unsuspend_server(&self, server_id: &str) -> Result<()>;

    async fn terminate_server(&self, server_id: &str) -> Result<()>;

    async fn server_status(&self, server_id: &str) -> Result<ServerStatusResponse>;
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateServerRequest {
    #[serde(rename = "orderId")]
    pub order_id: Uuid,
    #[serde(rename = "serverDetails")]
    pub server_details: ServerPlan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateServerResponse {
    pub status: String,
    #[serde(rename = "serverId")]
    pub server_id: String,
    #[serde(rename = "connectionInfo")]
    pub connection_info: Option<ConnectionInfo>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerSignal {
    Start,
    Stop,
    Restart,
    Kill,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerStatusResponse {
    pub current_state: String,
    pub is_suspended: bool,
    pub resources: ServerResources,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerResources {
    pub memory_bytes: i64,
    pub cpu_absolute: f64,
    pub disk_bytes: i64,
    pub network_rx_bytes: i64,
    pub network_tx_bytes: i64,
    pub uptime: i64,
}

/// Minimal panel client built on reqwest.
pub struct PanelClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl PanelClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        error!(
            status = %status,
            response_body = %body,
            context = %context,
            "panel api request failed"
        );

        anyhow::bail!(
            "panel API request failed: {} (status {}, body: {})",
            context,
            status,
            body
        );
    }

    async fn call(&self, action: &str, payload: Value, context: &str) -> Result<reqwest::Response> {
        let mut body = json!({ "action": action });
        if let (Some(body_map), Some(payload_map)) = (body.as_object_mut(), payload.as_object()) {
            for (key, value) in payload_map {
                body_map.insert(key.clone(), value.clone());
            }
        }

        let resp = self
            .http
            .post(format!("{}/api/rpc", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;
        Self::ensure_success(resp, context).await
    }
}

#[async_trait]
impl PanelGateway for PanelClient {
    async fn create_server(&self, request: CreateServerRequest) -> Result<CreateServerResponse> {
        let resp = self
            .call("create", serde_json::to_value(&request)?, "create server")
            .await?;

        let parsed: CreateServerResponse = resp.json().await?;
        Ok(parsed)
    }

    async fn send_power_signal(&self, server_id: &str, signal: PowerSignal) -> Result<()> {
        self.call(
            "power",
            json!({ "serverId": server_id, "signal": signal }),
            "send power signal",
        )
        .await?;
        Ok(())
    }

    async fn suspend_server(&self, server_id: &str) -> Result<()> {
        self.call("suspend", json!({ "serverId": server_id }), "suspend server")
            .await?;
        Ok(())
    }

    async fn unsuspend_server(&self, server_id: &str) -> Result<()> {
        self.call(
            "unsuspend",
            json!({ "serverId": server_id }),
            "unsuspend server",
        )
        .await?;
        Ok(())
    }

    async fn terminate_server(&self, server_id: &str) -> Result<()> {
        self.call(
            "terminate",
            json!({ "serverId": server_id }),
            "terminate server",
        )
        .await?;
        Ok(())
    }

    async fn server_status(&self, server_id: &str) -> Result<ServerStatusResponse> {
        let resp = self
            .call("status", json!({ "serverId": server_id }), "server status")
            .await?;

        let parsed: ServerStatusResponse = resp.json().await?;
        Ok(parsed)
    }
}

/// Strips secret-bearing fields from a request/response snapshot before it is
/// persisted into an order's provisioning log.
pub fn sanitize_snapshot(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sanitized = serde_json::Map::new();
            for (key, nested) in map {
                let lowered = key.to_ascii_lowercase();
                if lowered.contains("key")
                    || lowered.contains("token")
                    || lowered.contains("secret")
                    || lowered.contains("authorization")
                {
                    sanitized.insert(key.clone(), Value::String("<redacted>".to_string()));
                } else {
                    sanitized.insert(key.clone(), sanitize_snapshot(nested));
                }
            }
            Value::Object(sanitized)
        }
        Value::Array(items) => Value::Array(items.iter().map(sanitize_snapshot).collect()),
        other => other.clone(),
    }
}
