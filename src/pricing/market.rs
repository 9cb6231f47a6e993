//! Spot prices from the external metal-price endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::client::get_json;
use super::numeric::lenient_f64;
use crate::error::FetchError;

/// `metalType` tags used by the price feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetalType {
    Gold24 = 1,
    Silver = 2,
}

impl MetalType {
    fn from_tag(tag: &Value) -> Option<Self> {
        match tag.as_f64()? {
            t if t == 1.0 => Some(MetalType::Gold24),
            t if t == 2.0 => Some(MetalType::Silver),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetalEntry {
    #[serde(rename = "metalType", default)]
    pub metal_type: Value,
    /// Price per gram. For silver the feed reuses the same field name.
    #[serde(rename = "buyPrice24", default, deserialize_with = "lenient_f64")]
    pub buy_price24: f64,
}

impl MetalEntry {
    pub fn metal(&self) -> Option<MetalType> {
        MetalType::from_tag(&self.metal_type)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketResponse {
    #[serde(rename = "isSuccess", default)]
    pub is_success: bool,
    #[serde(default)]
    pub result: Option<Vec<MetalEntry>>,
}

/// Spot prices per gram picked out of a successful response.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpotPrice {
    pub gold24: Option<f64>,
    pub silver: Option<f64>,
}

impl MarketResponse {
    /// `None` when the feed reports failure or carries no result list; the
    /// board must not be touched in that case. First entry per metal wins.
    pub fn spot(&self) -> Option<SpotPrice> {
        if !self.is_success {
            return None;
        }
        let entries = self.result.as_ref()?;
        let price_of = |metal: MetalType| {
            entries.iter().find(|e| e.metal() == Some(metal)).map(|e| e.buy_price24)
        };
        Some(SpotPrice { gold24: price_of(MetalType::Gold24), silver: price_of(MetalType::Silver) })
    }
}

#[async_trait]
pub trait MarketSource: Send + Sync {
    async fn fetch(&self) -> Result<MarketResponse, FetchError>;
}

pub struct HttpMarketSource {
    client: Client,
    url: String,
}

impl HttpMarketSource {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self { client, url: url.into() }
    }
}

#[async_trait]
impl MarketSource for HttpMarketSource {
    async fn fetch(&self) -> Result<MarketResponse, FetchError> {
        get_json(&self.client, &self.url).await
    }
}
