//! HTTP client for a running patrimonio server.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// API client for the patrimonio server.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Creates a new API client.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Submits a detection and returns the resulting movement.
    pub async fn post_detection(&self, request: &DetectionRequest) -> Result<MovementView> {
        self.post("/api/v1/detections", request).await
    }

    /// Gets an asset by id.
    pub async fn get_asset(&self, id: Uuid) -> Result<AssetView> {
        self.get(&format!("/api/v1/assets/{}", id)).await
    }

    /// Gets an asset's movement history, oldest first.
    pub async fn asset_history(&self, id: Uuid) -> Result<Vec<MovementView>> {
        self.get(&format!("/api/v1/assets/{}/movements", id)).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send request")?;

        self.handle_response(response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        self.handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .context("Failed to parse response body")
        } else {
            let error: ApiErrorResponse =
                response.json().await.unwrap_or_else(|_| ApiErrorResponse {
                    code: "UNKNOWN".to_string(),
                    message: "Unknown error".to_string(),
                });
            anyhow::bail!("API error ({}): {} - {}", status, error.code, error.message)
        }
    }
}

// Request/Response types (matching server DTOs)

/// Detection submitted by `patrimonio detect`.
#[derive(Debug, Serialize)]
pub struct DetectionRequest {
    pub sensor_id: Uuid,
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssetView {
    pub id: Uuid,
    pub external_tag: String,
    pub name: String,
    pub current_location_id: Uuid,
    pub last_seen_at: DateTime<Utc>,
    pub version: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MovementView {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub from_location_id: Uuid,
    pub to_location_id: Uuid,
    pub sensor_id: Uuid,
    pub kind: String,
    pub status: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    code: String,
    message: String,
}
