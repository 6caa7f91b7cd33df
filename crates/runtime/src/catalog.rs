use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use threadwatch_core::CatalogPage;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("catalog returned HTTP {status}")]
    Status { status: u16 },

    #[error("catalog body could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Source of catalog pages for one board.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<CatalogPage>, CatalogError>;
}

/// Reads `{api_base}/{board}/catalog.json`.
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: Client,
    url: String,
}

impl HttpCatalog {
    pub fn new(api_base: &str, board: &str, timeout: Duration) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("threadwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: catalog_url(api_base, board),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn catalog_url(api_base: &str, board: &str) -> String {
    format!(
        "{}/{}/catalog.json",
        api_base.trim_end_matches('/'),
        board.trim_matches('/')
    )
}

#[async_trait]
impl CatalogSource for HttpCatalog {
    async fn fetch(&self) -> Result<Vec<CatalogPage>, CatalogError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let pages: Vec<CatalogPage> = serde_json::from_str(&body)?;
        debug!(url = %self.url, pages = pages.len(), "catalog fetched");
        Ok(pages)
    }
}
