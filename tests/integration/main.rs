//! End-to-end snipe scenarios against an in-memory marketplace.

mod mock_marketplace;
mod scenarios;
