use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use tracing::error;

use crate::payments::qr_gateway::{
    Charge, ChargeStatus, DEFAULT_CHARGE_TTL_SECS, GenerateChargeRequest, QrGateway,
};

/// QR gateway with push updates: every charge comes back with a WebSocket URL
/// that emits payment events. Status polling stays available as a safety net.
pub struct LiveQrClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(rename = "qrCode")]
    qr_code: String,
    #[serde(rename = "transactionId")]
    transaction_id: String,
    #[serde(rename = "wsUrl")]
    ws_url: String,
    #[serde(rename = "expiresIn")]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
}

impl LiveQrClient {
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
            "live qr gateway request failed"
        );

        anyhow::bail!(
            "live QR gateway request failed: {} (status {})",
            context,
            status
        );
    }
}

#[async_trait]
impl QrGateway for LiveQrClient {
    async fn generate_charge(&self, request: GenerateChargeRequest) -> Result<Charge> {
        let resp = self
            .http
            .post(format!("{}/v1/qr", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "generate charge").await?;

        let parsed: GenerateResponse = resp.json().await?;
        Ok(Charge {
            qr_code: parsed.qr_code,
            transaction_id: parsed.transaction_id,
            ws_url: Some(parsed.ws_url),
            expires_in_secs: parsed.expires_in.unwrap_or(DEFAULT_CHARGE_TTL_SECS),
        })
    }

    async fn check_status(&self, transaction_id: &str) -> Result<ChargeStatus> {
        let resp = self
            .http
            .get(format!("{}/v1/qr/{}/status", self.base_url, transaction_id))
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "check charge status").await?;

        let parsed: StatusResponse = resp.json().await?;
        Ok(ChargeStatus::from_str(&parsed.status))
    }
}
