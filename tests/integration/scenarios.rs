//! Full resolve → wait → bid runs through the public API.

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use rust_decimal_macros::dec;
use secrecy::SecretString;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use ebay_sniper::engine::executor::{RequestExecutor, RetryPolicy};
use ebay_sniper::engine::scheduler::{fire_instant, Clock, SnipeScheduler};
use ebay_sniper::marketplace::ebay::EbayClient;
use ebay_sniper::types::{BidOutcome, SnipeRequest, SnipeState};

use crate::mock_marketplace::{item_payload, CallKind, MockMarketplace};

const END_TIME: &str = "2026-10-20T09:00:00.000Z";

struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

fn end_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 20, 9, 0, 0).unwrap()
}

fn scheduler(market: &Arc<MockMarketplace>, max_retries: u32, now: DateTime<Utc>) -> SnipeScheduler {
    let executor = RequestExecutor::new(
        market.clone(),
        SecretString::new("integration-token".to_string()),
        RetryPolicy {
            max_retries,
            retry_delay: Duration::from_secs(1),
        },
    );
    let client = Arc::new(EbayClient::new(executor, "https://api.ebay.test/buy/browse/v1"));
    SnipeScheduler::with_clock(client, Arc::new(FixedClock(now)))
}

#[tokio::test(start_paused = true)]
async fn test_direct_link_waits_then_bids_once() {
    let market = Arc::new(MockMarketplace::new().with_item("12345", END_TIME));
    let lead = 30;
    let now = fire_instant(end_time(), lead) - ChronoDuration::seconds(10);
    let sched = scheduler(&market, 3, now);

    let request = SnipeRequest::new(
        "https://www.ebay.com/itm/12345?hash=item1c",
        None,
        dec!(75.50),
        "usd",
        lead,
    );

    let started = tokio::time::Instant::now();
    let mut handle = sched.launch(request);
    let report = handle.wait().await.unwrap();
    let waited = started.elapsed();

    assert!(waited >= Duration::from_secs(10), "waited {waited:?}");
    assert!(waited < Duration::from_secs(11), "waited {waited:?}");

    assert_eq!(market.calls_of(CallKind::Item).len(), 1);
    assert!(market.calls_of(CallKind::Search).is_empty());

    let bids = market.calls_of(CallKind::Bid);
    assert_eq!(bids.len(), 1);
    assert!(bids[0].url.ends_with("/item/12345/place_proxy_bid"));
    assert_eq!(
        bids[0].body,
        Some(json!({"maxBidAmount": {"currency": "USD", "value": "75.50"}}))
    );

    assert_eq!(report.fire_instant, Some(end_time() - ChronoDuration::seconds(30)));
    assert!(report.outcome().unwrap().is_success());
}

#[tokio::test(start_paused = true)]
async fn test_keyword_without_results_never_bids() {
    let market = Arc::new(MockMarketplace::new());
    let sched = scheduler(&market, 3, end_time() - ChronoDuration::hours(1));

    let request = SnipeRequest::new("unobtainium widget", None, dec!(10), "USD", 5);
    let report = sched.launch(request).wait().await.unwrap();

    assert_eq!(
        report.final_state,
        SnipeState::Abandoned("Item not found".to_string())
    );
    assert_eq!(market.calls_of(CallKind::Search).len(), 1);
    assert!(market.calls_of(CallKind::Bid).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_bid_succeeds_on_third_attempt() {
    let market = Arc::new(
        MockMarketplace::new()
            .with_item("12345", END_TIME)
            .failing_bids(2),
    );
    let sched = scheduler(&market, 3, end_time());

    let request = SnipeRequest::new("https://www.ebay.com/itm/12345", None, dec!(20), "EUR", 5);
    let report = sched.launch(request).wait().await.unwrap();

    assert_eq!(market.calls_of(CallKind::Bid).len(), 3);
    assert_eq!(
        report.final_state,
        SnipeState::Done(BidOutcome::Success(
            json!({ "proxyBidId": "PB-0001", "auction": { "auctionStatus": "ACTIVE" } })
        ))
    );
}

#[tokio::test(start_paused = true)]
async fn test_bid_exhausted_ends_done_with_failure() {
    let market = Arc::new(
        MockMarketplace::new()
            .with_item("12345", END_TIME)
            .failing_bids(10),
    );
    let sched = scheduler(&market, 3, end_time());

    let request = SnipeRequest::new("https://www.ebay.com/itm/12345", None, dec!(20), "EUR", 5);
    let report = sched.launch(request).wait().await.unwrap();

    assert_eq!(market.calls_of(CallKind::Bid).len(), 3);
    assert!(matches!(
        report.final_state,
        SnipeState::Done(BidOutcome::Failure(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_keyword_fallback_resolves_and_bids() {
    let market = Arc::new(
        MockMarketplace::new()
            .with_search("leica m2 body", vec![item_payload("v1|2002|0", END_TIME)]),
    );
    let sched = scheduler(&market, 3, end_time());

    let request = SnipeRequest::new("leica m3 body", Some("leica m2 body"), dec!(900), "USD", 60);
    let report = sched.launch(request).wait().await.unwrap();

    let searches = market.calls_of(CallKind::Search);
    assert_eq!(searches.len(), 2);
    assert_eq!(searches[0].query_param("q"), Some("leica m3 body"));
    assert_eq!(searches[1].query_param("q"), Some("leica m2 body"));
    assert_eq!(searches[0].query_param("sort"), Some("-price"));
    assert_eq!(searches[0].query_param("limit"), Some("1"));

    let bids = market.calls_of(CallKind::Bid);
    assert_eq!(bids.len(), 1);
    assert!(bids[0].url.ends_with("/item/v1%7C2002%7C0/place_proxy_bid"));
    assert_eq!(report.item.unwrap().item_id, "v1|2002|0");
}

#[tokio::test(start_paused = true)]
async fn test_calls_are_strictly_ordered() {
    let market = Arc::new(MockMarketplace::new().with_item("12345", END_TIME));
    let sched = scheduler(&market, 3, end_time() - ChronoDuration::minutes(5));

    let request = SnipeRequest::new("https://www.ebay.com/itm/12345", None, dec!(5), "USD", 1);
    sched.launch(request).wait().await.unwrap();

    let kinds: Vec<CallKind> = market
        .calls()
        .iter()
        .map(crate::mock_marketplace::classify)
        .collect();
    assert_eq!(kinds, vec![CallKind::Item, CallKind::Bid]);
}
