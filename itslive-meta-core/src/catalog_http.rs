//! `reqwest` implementation of [`CatalogTransport`] for STAC APIs with the
//! transaction extension.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::contract::{BoxError, CatalogResponse, CatalogTransport};

/// Header carrying the catalog API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

#[derive(Debug, Clone, Default)]
pub struct HttpCatalog {
    client: reqwest::Client,
}

impl HttpCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn read(response: reqwest::Response) -> Result<CatalogResponse, BoxError> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(status, body_len = body.len(), "STAC API responded");
        Ok(CatalogResponse { status, body })
    }
}

#[async_trait]
impl CatalogTransport for HttpCatalog {
    #[instrument(skip(self, api_token, item), fields(method = "POST"))]
    async fn create_item(
        &self,
        items_endpoint: &str,
        api_token: &str,
        item: &Value,
    ) -> Result<CatalogResponse, BoxError> {
        let response = self
            .client
            .post(items_endpoint)
            .header(API_KEY_HEADER, api_token)
            .json(item)
            .send()
            .await?;
        Self::read(response).await
    }

    #[instrument(skip(self, api_token, item), fields(method = "PUT"))]
    async fn update_item(
        &self,
        item_url: &str,
        api_token: &str,
        item: &Value,
    ) -> Result<CatalogResponse, BoxError> {
        let response = self
            .client
            .put(item_url)
            .header(API_KEY_HEADER, api_token)
            .json(item)
            .send()
            .await?;
        Self::read(response).await
    }
}
