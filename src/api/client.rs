//! Gateway API client implementation.

use super::{
    BalanceSource, BalancesRequest, BalancesResponse, GatewayApi, TransferRequests,
    TransferResponse,
};
use crate::{error::ApiError, types::UnifiedBalances};
use alloy::primitives::Address;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};
use url::Url;

/// HTTP client for the Gateway API.
///
/// Cheap to clone, meant to be constructed once per network.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: Url,
    /// Domains queried when a balance request does not name any.
    domains: Vec<u32>,
}

impl GatewayClient {
    /// Creates a new client for the given base URL, e.g.
    /// `https://gateway-api-testnet.circle.com/v1`.
    pub fn new(base_url: Url, domains: Vec<u32>) -> Self {
        Self { client: Client::new(), base_url, domains }
    }

    /// Configures the HTTP client.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.as_str().trim_end_matches('/'))
    }

    /// Reads a JSON body from a successful response.
    async fn json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!(%status, %body, "Gateway API request failed");
            return Err(ApiError::Status { status: status.as_u16(), body });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait::async_trait]
impl GatewayApi for GatewayClient {
    async fn info(&self) -> Result<serde_json::Value, ApiError> {
        let response = self.client.get(self.endpoint("info")).send().await?;
        Self::json(response).await
    }

    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn balances(
        &self,
        token: &str,
        depositor: Address,
        domains: Option<&[u32]>,
    ) -> Result<UnifiedBalances, ApiError> {
        let request = BalancesRequest {
            token: token.to_string(),
            sources: domains
                .unwrap_or(&self.domains)
                .iter()
                .map(|domain| BalanceSource { depositor, domain: *domain })
                .collect(),
        };

        let response = self.client.post(self.endpoint("balances")).json(&request).send().await?;
        let response: BalancesResponse = Self::json(response).await?;

        debug!(count = response.balances.len(), "Fetched balances");

        Ok(response.balances.into())
    }

    #[instrument(skip_all, fields(base_url = %self.base_url, intents = requests.len()))]
    async fn transfer(&self, requests: TransferRequests) -> Result<TransferResponse, ApiError> {
        let response = self.client.post(self.endpoint("transfer")).json(&requests).send().await?;

        let status = response.status();
        let body = response.text().await?;

        // Rejections come back as 4xx with a structured body, which is a final answer rather
        // than a transport failure. A 5xx is an outage even when it carries a message.
        match serde_json::from_str::<TransferResponse>(&body) {
            Ok(response) if status.is_success() => Ok(response),
            Ok(response) if status.is_client_error() && response.message.is_some() => Ok(response),
            Err(err) if status.is_success() => Err(err.into()),
            _ => {
                error!(%status, %body, "Gateway transfer request failed");
                Err(ApiError::Status { status: status.as_u16(), body })
            }
        }
    }
}
