//! Shared types for the sniper.
//!
//! The data model flowing from the resolver through the scheduler:
//! what the user asked for (`SnipeRequest`), what it resolved to
//! (`AuctionItem`), and how the attempt ended (`BidOutcome`,
//! `SnipeReport`).

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;
use std::fmt;
use std::sync::LazyLock;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Shortest lead time we will honour, in seconds.
pub const MIN_LEAD_SECS: i64 = 1;
/// Longest lead time we will honour, in seconds.
pub const MAX_LEAD_SECS: i64 = 3600;

/// Wire format of `itemEndTime`, e.g. `2026-10-19T18:04:05.000Z`.
const END_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

static LINK_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://").expect("static regex"));
static ITEM_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/itm/(\d+)").expect("static regex"));
static END_TIME_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{1,6}Z$").expect("static regex")
});

// ---------------------------------------------------------------------------
// Identifier
// ---------------------------------------------------------------------------

/// What the user typed to point at an auction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    /// A direct listing URL (`http://` or `https://`).
    Link(String),
    /// Free-text search keywords.
    Keyword(String),
}

impl Identifier {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if LINK_PREFIX.is_match(input) {
            Identifier::Link(input.to_string())
        } else {
            Identifier::Keyword(input.to_string())
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Link(url) => write!(f, "link {url}"),
            Identifier::Keyword(q) => write!(f, "keyword \"{q}\""),
        }
    }
}

/// Pull the numeric listing id out of an `/itm/<digits>` path segment.
pub fn extract_item_id(url: &str) -> Option<String> {
    ITEM_PATH
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

// ---------------------------------------------------------------------------
// Lead time
// ---------------------------------------------------------------------------

/// Narrow a requested lead time into `[MIN_LEAD_SECS, MAX_LEAD_SECS]`.
///
/// Out-of-range requests are silently clamped, never rejected.
pub fn clamp_lead_secs(requested: i64) -> i64 {
    requested.clamp(MIN_LEAD_SECS, MAX_LEAD_SECS)
}

// ---------------------------------------------------------------------------
// Auction item
// ---------------------------------------------------------------------------

/// A concrete listing to bid on.
#[derive(Debug, Clone, PartialEq)]
pub struct AuctionItem {
    pub item_id: String,
    pub end_time: DateTime<Utc>,
    /// Listing title, when the API returned one.
    pub title: Option<String>,
    /// Current price as reported by the API (`value currency`).
    pub current_price: Option<String>,
}

impl AuctionItem {
    /// Build an item from an item summary or item detail payload.
    pub fn from_api(payload: &Value) -> Result<Self, ResolveError> {
        let item_id = payload
            .get("itemId")
            .and_then(Value::as_str)
            .ok_or(ResolveError::MissingField("itemId"))?
            .to_string();

        let raw_end = payload
            .get("itemEndTime")
            .and_then(Value::as_str)
            .ok_or(ResolveError::MissingField("itemEndTime"))?;
        let end_time = parse_end_time(raw_end)?;

        let title = payload
            .get("title")
            .and_then(Value::as_str)
            .map(String::from);

        let current_price = payload
            .get("currentBidPrice")
            .or_else(|| payload.get("price"))
            .and_then(|p| {
                let value = p.get("value").and_then(Value::as_str)?;
                let currency = p.get("currency").and_then(Value::as_str).unwrap_or("");
                Some(format!("{value} {currency}").trim_end().to_string())
            });

        Ok(Self {
            item_id,
            end_time,
            title,
            current_price,
        })
    }

    /// Time left until bidding closes (negative once closed).
    pub fn time_remaining(&self, now: DateTime<Utc>) -> chrono::Duration {
        self.end_time - now
    }
}

impl fmt::Display for AuctionItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.item_id)?;
        if let Some(title) = &self.title {
            write!(f, " {title}")?;
        }
        write!(f, " (ends {})", self.end_time.format("%Y-%m-%d %H:%M:%S UTC"))
    }
}

/// Parse an `itemEndTime` value. Anything but the exact wire format fails.
pub fn parse_end_time(raw: &str) -> Result<DateTime<Utc>, ResolveError> {
    if !END_TIME_SHAPE.is_match(raw) {
        return Err(ResolveError::MalformedEndTime(raw.to_string()));
    }
    NaiveDateTime::parse_from_str(raw, END_TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| ResolveError::MalformedEndTime(raw.to_string()))
}

// ---------------------------------------------------------------------------
// Snipe request
// ---------------------------------------------------------------------------

/// One user's intent for one snipe.
#[derive(Debug, Clone)]
pub struct SnipeRequest {
    pub identifier: Identifier,
    /// Secondary search query, used only when the keyword search is empty.
    pub fallback: Option<String>,
    pub max_bid_amount: Decimal,
    /// ISO-4217 style code, upper-cased.
    pub currency: String,
    /// As requested; clamped by the scheduler.
    pub lead_time_secs: i64,
}

impl SnipeRequest {
    pub fn new(
        identifier: &str,
        fallback: Option<&str>,
        max_bid_amount: Decimal,
        currency: &str,
        lead_time_secs: i64,
    ) -> Self {
        let fallback = fallback
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);

        Self {
            identifier: Identifier::parse(identifier),
            fallback,
            max_bid_amount,
            currency: currency.trim().to_uppercase(),
            lead_time_secs,
        }
    }

    pub fn clamped_lead_secs(&self) -> i64 {
        clamp_lead_secs(self.lead_time_secs)
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of the single bid placement.
#[derive(Debug, Clone, PartialEq)]
pub enum BidOutcome {
    /// The API accepted the request; carries its response body.
    Success(Value),
    Failure(String),
}

impl BidOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BidOutcome::Success(_))
    }
}

impl fmt::Display for BidOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BidOutcome::Success(payload) => write!(f, "success: {payload}"),
            BidOutcome::Failure(reason) => write!(f, "failure: {reason}"),
        }
    }
}

/// Where a snipe attempt is in its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum SnipeState {
    Resolving,
    Waiting,
    Bidding,
    Done(BidOutcome),
    /// Resolution failed; no bid was placed.
    Abandoned(String),
    /// Cancelled by the caller before bidding.
    Cancelled,
}

impl fmt::Display for SnipeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnipeState::Resolving => write!(f, "RESOLVING"),
            SnipeState::Waiting => write!(f, "WAITING"),
            SnipeState::Bidding => write!(f, "BIDDING"),
            SnipeState::Done(_) => write!(f, "DONE"),
            SnipeState::Abandoned(_) => write!(f, "ABANDONED"),
            SnipeState::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// What the background snipe task hands back when it finishes.
#[derive(Debug, Clone)]
pub struct SnipeReport {
    pub item: Option<AuctionItem>,
    pub fire_instant: Option<DateTime<Utc>>,
    pub final_state: SnipeState,
}

impl SnipeReport {
    pub fn outcome(&self) -> Option<&BidOutcome> {
        match &self.final_state {
            SnipeState::Done(outcome) => Some(outcome),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Why an identifier could not be turned into an `AuctionItem`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("Unrecognized link (no /itm/<id> segment): {0}")]
    UnrecognizedLink(String),

    #[error("Item not found")]
    NotFound,

    #[error("Item payload missing field: {0}")]
    MissingField(&'static str),

    #[error("Malformed item end time: {0}")]
    MalformedEndTime(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
