//! This client fetches addresses, materials and pickup dates from the waste collection provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::ACCEPT, Client, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

static CONTENT_TYPE_JSON: &str = "application/json";

/// An address known to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: String,
    pub label: String,
}

/// A waste category collected at an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    pub id: String,
    pub name: String,
}

/// Everything the calendar pipeline needs from the provider.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn search_address(&self, query: &str) -> Result<Vec<Address>>;

    async fn materials(&self, address_id: &str) -> Result<Vec<Material>>;

    /// The raw pickup date strings of one material, exactly as the provider writes them.
    async fn pickup_dates(&self, address_id: &str, material_id: &str) -> Result<Vec<String>>;
}

/// Talks JSON over HTTP to the provider.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: Url,
}

impl HttpClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|err| Error::config(format!("invalid provider URL {base_url:?}: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::config(format!(
                "provider URL {base_url} cannot be a base"
            )));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        // Drop the empty segment of a trailing slash so `/api/` and `/api` behave alike.
        url.path_segments_mut()
            .map_err(|_| Error::unknown("provider URL cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Get a list payload from the provider.
    async fn get_list<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        debug!(url = %url, "Requesting provider");
        let response = self
            .client
            .get(url)
            .query(query)
            .header(ACCEPT, CONTENT_TYPE_JSON)
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;
        parse_list(&body)
    }
}

#[async_trait]
impl UpstreamClient for HttpClient {
    async fn search_address(&self, query: &str) -> Result<Vec<Address>> {
        let url = self.url(&["address", "search"])?;
        self.get_list(url, &[("query", query)]).await
    }

    async fn materials(&self, address_id: &str) -> Result<Vec<Material>> {
        let url = self.url(&["address", address_id, "materials"])?;
        self.get_list(url, &[]).await
    }

    async fn pickup_dates(&self, address_id: &str, material_id: &str) -> Result<Vec<String>> {
        let url = self.url(&["address", address_id, "materials", material_id, "dates"])?;
        self.get_list(url, &[]).await
    }
}

/// Parse a JSON list, anything else is a protocol error.
fn parse_list<T: DeserializeOwned>(body: &str) -> Result<Vec<T>> {
    serde_json::from_str(body).map_err(|err| Error::upstream_protocol(err.to_string()))
}
