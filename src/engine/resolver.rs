//! Identifier resolution.
//!
//! Turns a direct listing link or a keyword (plus optional fallback
//! query) into an `AuctionItem`. Retries only happen inside the
//! executor; a failure here ends the snipe attempt.

use tracing::{debug, info};

use crate::marketplace::ebay::EbayClient;
use crate::types::{extract_item_id, AuctionItem, Identifier, ResolveError};

pub struct Resolver<'a> {
    client: &'a EbayClient,
}

impl<'a> Resolver<'a> {
    pub fn new(client: &'a EbayClient) -> Self {
        Self { client }
    }

    pub async fn resolve(
        &self,
        identifier: &Identifier,
        fallback: Option<&str>,
    ) -> Result<AuctionItem, ResolveError> {
        let item = match identifier {
            Identifier::Link(url) => self.resolve_link(url).await?,
            Identifier::Keyword(query) => self.resolve_keyword(query, fallback).await?,
        };

        info!(
            item_id = %item.item_id,
            title = item.title.as_deref().unwrap_or("-"),
            price = item.current_price.as_deref().unwrap_or("-"),
            end_time = %item.end_time,
            "Item resolved"
        );
        Ok(item)
    }

    async fn resolve_link(&self, url: &str) -> Result<AuctionItem, ResolveError> {
        let item_id =
            extract_item_id(url).ok_or_else(|| ResolveError::UnrecognizedLink(url.to_string()))?;

        debug!(item_id = %item_id, "Fetching item from link");
        let payload = self
            .client
            .get_item(&item_id)
            .await
            .ok_or(ResolveError::NotFound)?;

        AuctionItem::from_api(&payload)
    }

    async fn resolve_keyword(
        &self,
        query: &str,
        fallback: Option<&str>,
    ) -> Result<AuctionItem, ResolveError> {
        if let Some(summary) = self.client.search_top_item(query).await {
            return AuctionItem::from_api(&summary);
        }

        // One fallback search, always as a plain query
        let Some(fallback) = fallback else {
            return Err(ResolveError::NotFound);
        };
        info!(query, fallback, "No results for keyword, trying fallback");

        let summary = self
            .client
            .search_top_item(fallback)
            .await
            .ok_or(ResolveError::NotFound)?;
        AuctionItem::from_api(&summary)
    }
}
