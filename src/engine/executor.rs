//! Retrying request executor.
//!
//! Every remote call (search, item lookup, bid placement) goes through
//! here. A call is attempted up to `max_retries` times with a flat pause
//! between attempts. Exhaustion is not an error: the caller gets `None`
//! and decides what absence means.

use secrecy::SecretString;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

use crate::marketplace::{ApiRequest, Transport};

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Retry settings applied identically to every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_retries: u32,
    pub retry_delay: Duration,
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    token: SecretString,
    policy: RetryPolicy,
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn Transport>, token: SecretString, policy: RetryPolicy) -> Self {
        Self {
            transport,
            token,
            policy,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Perform one logical call.
    ///
    /// Returns the first successful response body, or `None` once
    /// `max_retries` attempts have failed.
    pub async fn execute(&self, request: &ApiRequest) -> Option<Value> {
        let max = self.policy.max_retries;

        for attempt in 1..=max {
            match self.transport.send(request, &self.token).await {
                Ok(body) => {
                    debug!(attempt, request = %request, "Request succeeded");
                    return Some(body);
                }
                Err(e) => {
                    error!(
                        attempt,
                        max_retries = max,
                        request = %request,
                        error = %e,
                        "Request failed"
                    );
                    if attempt < max {
                        tokio::time::sleep(self.policy.retry_delay).await;
                    }
                }
            }
        }

        error!(max_retries = max, request = %request, "Max retries reached, giving up");
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
