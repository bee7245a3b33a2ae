//! Mock marketplace for integration testing.
//!
//! A deterministic `Transport` that answers search, item lookup and bid
//! requests from in-memory fixtures and records every request it sees.
//! Nothing leaves the process.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

use ebay_sniper::marketplace::{ApiRequest, Transport};

/// Which endpoint a recorded request hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Search,
    Item,
    Bid,
}

pub fn classify(req: &ApiRequest) -> CallKind {
    if req.url.ends_with("/item_summary/search") {
        CallKind::Search
    } else if req.url.ends_with("/place_proxy_bid") {
        CallKind::Bid
    } else {
        CallKind::Item
    }
}

/// A mock eBay for deterministic testing.
///
/// Unknown items answer 404; unknown queries answer an empty result set.
pub struct MockMarketplace {
    items: HashMap<String, Value>,
    searches: HashMap<String, Vec<Value>>,
    /// Bid attempts still to fail before one succeeds.
    bid_failures: Mutex<u32>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl MockMarketplace {
    pub fn new() -> Self {
        Self {
            items: HashMap::new(),
            searches: HashMap::new(),
            bid_failures: Mutex::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Register an item reachable by id.
    pub fn with_item(mut self, item_id: &str, end_time: &str) -> Self {
        self.items.insert(item_id.to_string(), item_payload(item_id, end_time));
        self
    }

    /// Register the summaries a query returns.
    pub fn with_search(mut self, query: &str, summaries: Vec<Value>) -> Self {
        self.searches.insert(query.to_string(), summaries);
        self
    }

    /// Make the next `n` bid attempts fail with a 503.
    pub fn failing_bids(self, n: u32) -> Self {
        *self.bid_failures.lock().unwrap() = n;
        self
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_of(&self, kind: CallKind) -> Vec<ApiRequest> {
        self.calls()
            .into_iter()
            .filter(|c| classify(c) == kind)
            .collect()
    }
}

pub fn item_payload(item_id: &str, end_time: &str) -> Value {
    json!({
        "itemId": item_id,
        "title": format!("Listing {item_id}"),
        "itemEndTime": end_time,
        "currentBidPrice": { "value": "41.00", "currency": "USD" },
    })
}

#[async_trait]
impl Transport for MockMarketplace {
    async fn send(&self, request: &ApiRequest, _token: &SecretString) -> Result<Value> {
        self.calls.lock().unwrap().push(request.clone());

        match classify(request) {
            CallKind::Search => {
                let query = request.query_param("q").unwrap_or_default();
                let summaries = self.searches.get(query).cloned().unwrap_or_default();
                Ok(json!({ "total": summaries.len(), "itemSummaries": summaries }))
            }
            CallKind::Item => {
                let id = request.url.rsplit('/').next().unwrap_or_default();
                self.items
                    .get(id)
                    .cloned()
                    .ok_or_else(|| anyhow!("eBay API error 404 Not Found: {id}"))
            }
            CallKind::Bid => {
                let mut remaining = self.bid_failures.lock().unwrap();
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(anyhow!("eBay API error 503 Service Unavailable"));
                }
                Ok(json!({ "proxyBidId": "PB-0001", "auction": { "auctionStatus": "ACTIVE" } }))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> SecretString {
        SecretString::new("t".to_string())
    }

    #[tokio::test]
    async fn test_mock_unknown_item_is_404() {
        let market = MockMarketplace::new();
        let err = market
            .send(&ApiRequest::get("https://api.test/item/1"), &token())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
        assert_eq!(market.calls_of(CallKind::Item).len(), 1);
    }

    #[tokio::test]
    async fn test_mock_bid_failures_then_success() {
        let market = MockMarketplace::new().failing_bids(1);
        let bid = ApiRequest::post("https://api.test/item/1/place_proxy_bid", json!({}));
        assert!(market.send(&bid, &token()).await.is_err());
        assert!(market.send(&bid, &token()).await.is_ok());
        assert_eq!(market.calls_of(CallKind::Bid).len(), 2);
    }
}
