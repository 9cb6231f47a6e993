//! Price offsets kept in the document store.
//!
//! The store holds one or more adjustment documents; the live one is flagged
//! with `goldExchange: "yes"`. Each offset is added to the corresponding
//! displayed price. A failed or empty load never clears offsets that were
//! loaded earlier.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use super::client::get_json;
use super::numeric::coerce_f64;
use crate::error::FetchError;

/// Field that marks the live adjustment document.
pub const SELECTOR_FIELD: &str = "goldExchange";
/// Value of [`SELECTOR_FIELD`] on the live document.
pub const SELECTOR_VALUE: &str = "yes";

/// The six offsets applied to spot-derived prices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AdjustmentSet {
    pub gold24: f64,
    pub gold22: f64,
    pub gold21: f64,
    pub gold18: f64,
    /// Reserved. Never read from a document, so it stays 0 after a load.
    pub bulk: f64,
    pub silver: f64,
}

impl AdjustmentSet {
    /// Read offsets out of an adjustment document. Missing or unparseable
    /// fields become 0.
    pub fn from_document(doc: &Map<String, Value>) -> Self {
        let field = |name: &str| doc.get(name).map(coerce_f64).unwrap_or(0.0);
        Self {
            gold24: field("24k"),
            gold22: field("22k"),
            gold21: field("21k"),
            gold18: field("18k"),
            bulk: 0.0,
            silver: field("silver"),
        }
    }
}

/// Envelope returned by the adjustment endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdjustmentResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Vec<Value>,
}

impl AdjustmentResponse {
    /// First document flagged as live, if any.
    pub fn live_document(&self) -> Option<&Map<String, Value>> {
        self.data
            .iter()
            .filter_map(Value::as_object)
            .find(|doc| doc.get(SELECTOR_FIELD).and_then(Value::as_str) == Some(SELECTOR_VALUE))
    }
}

#[async_trait]
pub trait AdjustmentSource: Send + Sync {
    async fn fetch(&self) -> Result<AdjustmentResponse, FetchError>;
}

/// Reads adjustments from the passthrough service over HTTP.
pub struct HttpAdjustmentSource {
    client: Client,
    url: String,
}

impl HttpAdjustmentSource {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self { client, url: url.into() }
    }
}

#[async_trait]
impl AdjustmentSource for HttpAdjustmentSource {
    async fn fetch(&self) -> Result<AdjustmentResponse, FetchError> {
        get_json(&self.client, &self.url).await
    }
}

/// What a single load did to the caller's offsets.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Offsets replaced with the values of the live document.
    Loaded(AdjustmentSet),
    /// Endpoint answered, but had no usable live document. Offsets kept.
    NoMatch,
    /// Endpoint failed. Offsets kept.
    Unavailable(String),
}

pub struct AdjustmentLoader<S> {
    source: S,
}

impl<S: AdjustmentSource> AdjustmentLoader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Refresh `current` from the source. Never fails: on any problem the
    /// offsets are left exactly as they were.
    #[instrument(level = "debug", skip_all)]
    pub async fn load(&self, current: &mut AdjustmentSet) -> LoadOutcome {
        let response = match self.source.fetch().await {
            Ok(response) => response,
            Err(e) => return LoadOutcome::Unavailable(e.to_string()),
        };

        if !response.success || response.data.is_empty() {
            debug!(success = response.success, docs = response.data.len(), "no adjustment data");
            return LoadOutcome::NoMatch;
        }

        match response.live_document() {
            Some(doc) => {
                *current = AdjustmentSet::from_document(doc);
                LoadOutcome::Loaded(*current)
            }
            None => LoadOutcome::NoMatch,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    /// Replays canned responses; `None` simulates a transport failure.
    pub(crate) struct ScriptedAdjustments {
        responses: Mutex<Vec<Option<Value>>>,
    }

    impl ScriptedAdjustments {
        pub(crate) fn new(responses: Vec<Option<Value>>) -> Self {
            Self { responses: Mutex::new(responses) }
        }
    }

    #[async_trait]
    impl AdjustmentSource for ScriptedAdjustments {
        async fn fetch(&self) -> Result<AdjustmentResponse, FetchError> {
            let next = {
                let mut responses = self.responses.lock();
                if responses.is_empty() { None } else { responses.remove(0) }
            };
            match next {
                Some(body) => serde_json::from_value(body).map_err(|source| FetchError::Decode {
                    url: "scripted".into(),
                    source,
                }),
                None => Err(FetchError::Status { url: "scripted".into(), status: 503 }),
            }
        }
    }

    fn offsets() -> AdjustmentSet {
        AdjustmentSet { gold24: 1.0, gold22: 0.5, gold21: 0.25, gold18: -0.5, bulk: 0.0, silver: 2.0 }
    }

    #[test]
    fn test_from_document_coerces_fields() {
        let doc = json!({
            "goldExchange": "yes",
            "24k": "1.0",
            "22k": 0.5,
            "21k": "0.25 KWD",
            "18k": -0.5,
            "silver": "2",
        });
        assert_eq!(AdjustmentSet::from_document(doc.as_object().unwrap()), offsets());
    }

    #[test]
    fn test_from_document_defaults_missing_to_zero() {
        let doc = json!({ "goldExchange": "yes", "24k": "oops", "silver": null });
        assert_eq!(AdjustmentSet::from_document(doc.as_object().unwrap()), AdjustmentSet::default());
    }

    #[test]
    fn test_bulk_is_never_loaded() {
        let doc = json!({ "goldExchange": "yes", "bulk": 9, "box5": 9 });
        assert_eq!(AdjustmentSet::from_document(doc.as_object().unwrap()).bulk, 0.0);
    }

    #[test]
    fn test_live_document_is_first_flagged() {
        let response: AdjustmentResponse = serde_json::from_value(json!({
            "success": true,
            "data": [
                { "goldExchange": "no", "24k": 5 },
                "not a document",
                { "goldExchange": "yes", "24k": 1 },
                { "goldExchange": "yes", "24k": 2 },
            ]
        }))
        .unwrap();
        assert_eq!(response.live_document().unwrap()["24k"], json!(1));
    }

    #[tokio::test]
    async fn test_load_replaces_offsets() {
        let loader = AdjustmentLoader::new(ScriptedAdjustments::new(vec![Some(json!({
            "success": true,
            "data": [{ "goldExchange": "yes", "24k": "1.0", "22k": 0.5, "21k": 0.25, "18k": -0.5, "silver": 2 }]
        }))]));
        let mut current = AdjustmentSet::default();
        assert_eq!(loader.load(&mut current).await, LoadOutcome::Loaded(offsets()));
        assert_eq!(current, offsets());
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_offsets() {
        let loader = AdjustmentLoader::new(ScriptedAdjustments::new(vec![None]));
        let mut current = offsets();
        assert!(matches!(loader.load(&mut current).await, LoadOutcome::Unavailable(_)));
        assert_eq!(current, offsets());
    }

    #[tokio::test]
    async fn test_no_flagged_document_keeps_zero_default() {
        let loader = AdjustmentLoader::new(ScriptedAdjustments::new(vec![Some(json!({
            "success": true,
            "data": [{ "goldExchange": "no", "24k": 3 }]
        }))]));
        let mut current = AdjustmentSet::default();
        assert_eq!(loader.load(&mut current).await, LoadOutcome::NoMatch);
        assert_eq!(current, AdjustmentSet::default());
    }

    #[tokio::test]
    async fn test_unsuccessful_response_keeps_offsets() {
        let loader = AdjustmentLoader::new(ScriptedAdjustments::new(vec![
            Some(json!({ "success": false, "error": "boom" })),
            Some(json!({ "success": true, "data": [] })),
        ]));
        let mut current = offsets();
        assert_eq!(loader.load(&mut current).await, LoadOutcome::NoMatch);
        assert_eq!(loader.load(&mut current).await, LoadOutcome::NoMatch);
        assert_eq!(current, offsets());
    }
}
