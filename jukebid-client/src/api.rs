//! REST API client
//!
//! Thin typed wrapper over the jukebox HTTP API. Network and server
//! failures map onto the engine error taxonomy: 402 bodies decode into
//! the structured shortfall, other 4xx into validation errors, and
//! transport problems into retryable transient errors.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use jukebid_core::config::ApiConfig;
use jukebid_core::logging::generate_trace_id;
use jukebid_core::models::{MediaId, Party, PartyId, Pence, QueueEntry, SortWindow};
use jukebid_core::{Error, Result};

/// Confirmation returned for an accepted bid
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidReceipt {
    pub updated_balance: Pence,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlaceBidRequest<'a> {
    media_id: &'a MediaId,
    amount: Pence,
}

/// Structured error body the API returns on rejection
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    current_balance: Option<Pence>,
    #[serde(default)]
    required_amount: Option<Pence>,
}

/// Operations the party session consumes.
///
/// A trait seam so the session can be exercised against a mock without
/// a live server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PartyApi: Send + Sync {
    async fn get_party_snapshot(&self, party_id: &PartyId) -> Result<Party>;

    async fn get_ranked_media(
        &self,
        party_id: &PartyId,
        window: SortWindow,
    ) -> Result<Vec<QueueEntry>>;

    async fn place_bid(
        &self,
        party_id: &PartyId,
        media_id: &MediaId,
        amount: Pence,
    ) -> Result<BidReceipt>;

    async fn veto_media(&self, party_id: &PartyId, media_id: &MediaId) -> Result<()>;

    async fn unveto_media(&self, party_id: &PartyId, media_id: &MediaId) -> Result<()>;

    async fn skip_next(&self, party_id: &PartyId) -> Result<()>;

    async fn skip_previous(&self, party_id: &PartyId) -> Result<()>;
}

/// HTTP implementation of [`PartyApi`]
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Decode a response body, mapping error statuses onto the taxonomy
    async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| Error::Internal(format!("Undecodable response body: {e}")));
        }

        Err(Self::decode_error(response).await)
    }

    async fn decode_error(response: reqwest::Response) -> Error {
        let status = response.status();
        let body: ApiErrorBody = response.json().await.unwrap_or(ApiErrorBody {
            message: status.to_string(),
            current_balance: None,
            required_amount: None,
        });

        if status == reqwest::StatusCode::PAYMENT_REQUIRED {
            if let (Some(current_balance), Some(required_amount)) =
                (body.current_balance, body.required_amount)
            {
                return Error::InsufficientFunds {
                    current_balance,
                    required_amount,
                };
            }
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Error::NotFound(body.message);
        }

        if status.is_client_error() {
            return Error::InvalidInput(body.message);
        }

        Error::TransientNetwork(format!("{status}: {}", body.message))
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http
            .get(self.url(path))
            .header("x-trace-id", generate_trace_id())
            .send()
            .await
            .map_err(|e| Error::TransientNetwork(e.to_string()))?;
        Self::decode(response).await
    }

    async fn post<B: Serialize + Sync, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .http
            .post(self.url(path))
            .header("x-trace-id", generate_trace_id())
            .json(body)
            .send()
            .await
            .map_err(|e| Error::TransientNetwork(e.to_string()))?;
        Self::decode(response).await
    }

    /// POST where the API returns no body on success
    async fn post_unit(&self, path: &str) -> Result<()> {
        let response = self
            .http
            .post(self.url(path))
            .header("x-trace-id", generate_trace_id())
            .send()
            .await
            .map_err(|e| Error::TransientNetwork(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::decode_error(response).await)
        }
    }
}

#[async_trait]
impl PartyApi for ApiClient {
    #[instrument(skip(self), fields(party_id = %party_id.as_str()))]
    async fn get_party_snapshot(&self, party_id: &PartyId) -> Result<Party> {
        debug!("Fetching party snapshot");
        self.get(&format!("/parties/{}", party_id.as_str())).await
    }

    #[instrument(skip(self), fields(party_id = %party_id.as_str()))]
    async fn get_ranked_media(
        &self,
        party_id: &PartyId,
        window: SortWindow,
    ) -> Result<Vec<QueueEntry>> {
        self.get(&format!(
            "/parties/{}/ranking?window={}",
            party_id.as_str(),
            window.as_query_param()
        ))
        .await
    }

    #[instrument(skip(self), fields(party_id = %party_id.as_str(), media_id = %media_id.as_str()))]
    async fn place_bid(
        &self,
        party_id: &PartyId,
        media_id: &MediaId,
        amount: Pence,
    ) -> Result<BidReceipt> {
        self.post(
            &format!("/parties/{}/bids", party_id.as_str()),
            &PlaceBidRequest { media_id, amount },
        )
        .await
    }

    #[instrument(skip(self), fields(party_id = %party_id.as_str(), media_id = %media_id.as_str()))]
    async fn veto_media(&self, party_id: &PartyId, media_id: &MediaId) -> Result<()> {
        self.post_unit(&format!(
            "/parties/{}/media/{}/veto",
            party_id.as_str(),
            media_id.as_str()
        ))
        .await
    }

    #[instrument(skip(self), fields(party_id = %party_id.as_str(), media_id = %media_id.as_str()))]
    async fn unveto_media(&self, party_id: &PartyId, media_id: &MediaId) -> Result<()> {
        self.post_unit(&format!(
            "/parties/{}/media/{}/unveto",
            party_id.as_str(),
            media_id.as_str()
        ))
        .await
    }

    #[instrument(skip(self), fields(party_id = %party_id.as_str()))]
    async fn skip_next(&self, party_id: &PartyId) -> Result<()> {
        self.post_unit(&format!("/parties/{}/skip-next", party_id.as_str()))
            .await
    }

    #[instrument(skip(self), fields(party_id = %party_id.as_str()))]
    async fn skip_previous(&self, party_id: &PartyId) -> Result<()> {
        self.post_unit(&format!("/parties/{}/skip-previous", party_id.as_str()))
            .await
    }
}
