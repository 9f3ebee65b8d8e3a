//! Client for the remote shop catalog feed.
//!
//! The feed is a plain HTTP GET returning the full catalog snapshot as JSON:
//! an array of shop objects, each carrying its list of offers. There is no
//! pagination and no stable identity across snapshots.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("feed returned status {0}")]
    Status(StatusCode),
    #[error("feed body is not a valid catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One shop as it appears on the wire.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ShopRecord {
    pub link: String,
    pub name: String,
    #[serde(rename = "ownerName")]
    pub owner_name: String,
    #[serde(rename = "ownerCastle")]
    pub owner_castle: String,
    pub kind: String,
    pub mana: i64,
    #[serde(default)]
    pub offers: Vec<OfferRecord>,
}

/// One offer nested under a shop on the wire.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct OfferRecord {
    pub item: String,
    pub price: i64,
    pub mana: i64,
}

/// Source of catalog snapshots. The production implementation is
/// [`FeedClient`]; tests substitute their own.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_catalog(&self) -> Result<Vec<ShopRecord>, FeedError>;
}

#[derive(Clone)]
pub struct FeedClient {
    http: Client,
    url: Url,
}

impl fmt::Debug for FeedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedClient")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl FeedClient {
    pub fn new(url: Url, timeout: Duration) -> Self {
        let http = Client::builder()
            .user_agent("cw-shops-bot/0.1")
            .timeout(timeout)
            .build()
            .expect("reqwest client");
        Self { http, url }
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let url = Url::parse(&cfg.catalog.feed_url)?;
        Ok(Self::new(url, cfg.fetch_timeout()))
    }
}

#[async_trait]
impl CatalogSource for FeedClient {
    async fn fetch_catalog(&self) -> Result<Vec<ShopRecord>, FeedError> {
        let res = self.http.get(self.url.clone()).send().await?;
        if !res.status().is_success() {
            return Err(FeedError::Status(res.status()));
        }
        let body = res.text().await?;
        debug!(bytes = body.len(), "retrieved catalog snapshot");
        parse_catalog(&body)
    }
}

/// Parse a feed body into shop records. Split out from the transport so a
/// malformed body is reported as [`FeedError::Parse`] and is testable
/// without a server.
pub fn parse_catalog(body: &str) -> Result<Vec<ShopRecord>, FeedError> {
    Ok(serde_json::from_str(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_snapshot() {
        let body = r#"[
            {
                "link": "a1",
                "name": "Forge",
                "ownerName": "Bob",
                "ownerCastle": "North",
                "kind": "⚒",
                "mana": 100,
                "offers": [
                    {"item": "Iron Sword", "price": 20, "mana": 5},
                    {"item": "Iron Shield", "price": 35, "mana": 7}
                ]
            }
        ]"#;
        let shops = parse_catalog(body).unwrap();
        assert_eq!(shops.len(), 1);
        let shop = &shops[0];
        assert_eq!(shop.link, "a1");
        assert_eq!(shop.owner_name, "Bob");
        assert_eq!(shop.owner_castle, "North");
        assert_eq!(shop.kind, "⚒");
        assert_eq!(shop.offers.len(), 2);
        assert_eq!(shop.offers[0].item, "Iron Sword");
        assert_eq!(shop.offers[0].price, 20);
    }

    #[test]
    fn shop_without_offers_parses_empty() {
        let body = r#"[{"link": "b2", "name": "Lab", "ownerName": "Eve",
                        "ownerCastle": "South", "kind": "⚗️", "mana": 40}]"#;
        let shops = parse_catalog(body).unwrap();
        assert!(shops[0].offers.is_empty());
    }

    #[test]
    fn malformed_body_is_parse_error() {
        let err = parse_catalog("{\"not\": \"an array\"}").unwrap_err();
        assert!(matches!(err, FeedError::Parse(_)));

        let err = parse_catalog("<html>503</html>").unwrap_err();
        assert!(matches!(err, FeedError::Parse(_)));
    }

    #[test]
    fn missing_required_field_is_parse_error() {
        let body = r#"[{"link": "a1", "name": "Forge"}]"#;
        assert!(matches!(parse_catalog(body), Err(FeedError::Parse(_))));
    }
}
