//! Deploy submission seam.
//!
//! The network transport lives outside this crate. Whatever it reports as a
//! failure is wrapped in [`ClientError::TransportFailure`] with the deploy
//! hash attached and the original error kept as the source. Nothing is
//! retried.

use async_trait::async_trait;
use tracing::{info, warn};

use stakedag_core::{validate_deploy, ReadyDeploy};

use crate::config::ClientConfig;
use crate::error::{BoxError, ClientError, Result};

/// Transport that delivers a final deploy to a node.
#[async_trait]
pub trait DeploySubmitter: Send + Sync {
    /// Send the deploy. Returns the node's acknowledgement text.
    async fn submit(&self, deploy: &ReadyDeploy) -> std::result::Result<String, BoxError>;
}

/// Submit a deploy, checking it first when configured to.
pub async fn submit_deploy<T>(
    submitter: &T,
    deploy: &ReadyDeploy,
    config: &ClientConfig,
) -> Result<String>
where
    T: DeploySubmitter + ?Sized,
{
    if config.validate_before_submit {
        validate_deploy(deploy)?;
    }

    match submitter.submit(deploy).await {
        Ok(ack) => {
            info!(deploy_hash = %deploy.deploy_hash(), "deploy submitted");
            Ok(ack)
        }
        Err(source) => {
            warn!(deploy_hash = %deploy.deploy_hash(), error = %source, "deploy submission failed");
            Err(ClientError::TransportFailure {
                deploy_hash: *deploy.deploy_hash(),
                source,
            })
        }
    }
}

/// A simple in-memory submitter for testing.
pub mod memory {
    use super::*;
    use std::fmt;
    use tokio::sync::Mutex;

    /// Error returned by a [`MemorySubmitter`] configured to fail.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Rejected(pub String);

    impl fmt::Display for Rejected {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl std::error::Error for Rejected {}

    /// Records every deploy it receives, or rejects all of them.
    #[derive(Default)]
    pub struct MemorySubmitter {
        received: Mutex<Vec<ReadyDeploy>>,
        reject_with: Option<String>,
    }

    impl MemorySubmitter {
        pub fn new() -> Self {
            Self::default()
        }

        /// A submitter whose every call fails with `message`.
        pub fn rejecting(message: impl Into<String>) -> Self {
            Self {
                received: Mutex::new(Vec::new()),
                reject_with: Some(message.into()),
            }
        }

        /// Deploys accepted so far.
        pub async fn received(&self) -> Vec<ReadyDeploy> {
            self.received.lock().await.clone()
        }
    }

    #[async_trait]
    impl DeploySubmitter for MemorySubmitter {
        async fn submit(&self, deploy: &ReadyDeploy) -> std::result::Result<String, BoxError> {
            if let Some(message) = &self.reject_with {
                return Err(Box::new(Rejected(message.clone())));
            }
            self.received.lock().await.push(deploy.clone());
            Ok(format!("Success! Deploy hash: {}", deploy.deploy_hash().to_hex()))
        }
    }
}
