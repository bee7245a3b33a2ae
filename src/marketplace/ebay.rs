//! eBay Browse API endpoints.
//!
//! Builds the three requests the sniper needs and sends them through the
//! retrying executor. Nothing here talks to the transport directly.
//!
//! Base URL: https://api.ebay.com/buy/browse/v1
//! Auth: `Authorization: Bearer {user token}` on every call.

use anyhow::Result;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::debug;

use crate::engine::executor::RequestExecutor;
use crate::marketplace::ApiRequest;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Keyword searches only ever look at the top hit.
const SEARCH_LIMIT: u32 = 1;

/// Highest price first. Picks the most expensive match, not the most
/// relevant one; kept as the ranking users of this tool rely on.
const SEARCH_SORT: &str = "-price";

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct EbayClient {
    executor: RequestExecutor,
    base_url: String,
}

impl EbayClient {
    pub fn new(executor: RequestExecutor, base_url: &str) -> Self {
        Self {
            executor,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    // -- Request builders ------------------------------------------------

    pub fn search_request(&self, query: &str) -> ApiRequest {
        ApiRequest::get(format!("{}/item_summary/search", self.base_url))
            .with_query("q", query)
            .with_query("limit", SEARCH_LIMIT)
            .with_query("sort", SEARCH_SORT)
    }

    pub fn item_request(&self, item_id: &str) -> ApiRequest {
        ApiRequest::get(format!(
            "{}/item/{}",
            self.base_url,
            urlencoding::encode(item_id)
        ))
    }

    pub fn bid_request(&self, item_id: &str, amount: Decimal, currency: &str) -> ApiRequest {
        let body = json!({
            "maxBidAmount": {
                "currency": currency,
                "value": amount.to_string(),
            }
        });
        ApiRequest::post(
            format!(
                "{}/item/{}/place_proxy_bid",
                self.base_url,
                urlencoding::encode(item_id)
            ),
            body,
        )
    }

    // -- Calls -----------------------------------------------------------

    /// Top search hit for `query`, if any.
    pub async fn search_top_item(&self, query: &str) -> Option<Value> {
        let data = self.executor.execute(&self.search_request(query)).await?;
        let first = data
            .get("itemSummaries")
            .and_then(Value::as_array)
            .and_then(|items| items.first())
            .cloned();

        debug!(query, found = first.is_some(), "Search complete");
        first
    }

    /// Item detail by listing id.
    pub async fn get_item(&self, item_id: &str) -> Option<Value> {
        self.executor.execute(&self.item_request(item_id)).await
    }

    /// Place a proxy bid. `Ok(None)` means every attempt failed.
    pub async fn place_proxy_bid(
        &self,
        item_id: &str,
        amount: Decimal,
        currency: &str,
    ) -> Result<Option<Value>> {
        if item_id.is_empty() {
            anyhow::bail!("Cannot bid without an item id");
        }
        if amount <= Decimal::ZERO {
            anyhow::bail!("Bid amount must be positive, got {amount}");
        }
        if currency.is_empty() {
            anyhow::bail!("Bid currency is required");
        }

        Ok(self
            .executor
            .execute(&self.bid_request(item_id, amount, currency))
            .await)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
