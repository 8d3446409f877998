//! Client configuration.

use std::time::Duration;

/// Configuration for the client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Gas price used when a request does not set one.
    pub default_gas_price: u64,
    /// Whether to re-check commitment and signature before submission.
    pub validate_before_submit: bool,
    /// Delay between DAG feed samples.
    pub poll_interval: Duration,
    /// Upper bound on DAG feed samples. `None` polls until stable or cancelled.
    pub max_polls: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_gas_price: 10,
            validate_before_submit: true,
            poll_interval: Duration::from_secs(1),
            max_polls: None,
        }
    }
}
