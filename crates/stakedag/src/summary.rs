//! Human-readable deploy listings.

use serde::Serialize;

use stakedag_core::ReadyDeploy;

use crate::error::Result;

/// Display view of one deploy. Digests and keys are lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploySummary {
    pub deploy_hash: String,
    pub account: String,
    pub timestamp: i64,
    pub nonce: u64,
    pub gas_price: u64,
    pub body_hash: Option<String>,
    pub session_size: usize,
    pub payment_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_algorithm: Option<String>,
}

impl From<&ReadyDeploy> for DeploySummary {
    fn from(deploy: &ReadyDeploy) -> Self {
        let header = deploy.header();
        let approval = deploy.approval();
        Self {
            deploy_hash: deploy.deploy_hash().to_hex(),
            account: hex::encode(&header.account),
            timestamp: header.timestamp,
            nonce: header.nonce,
            gas_price: header.gas_price,
            body_hash: header.body_hash().map(|h| h.to_hex()),
            session_size: deploy.body().session.len(),
            payment_size: deploy.body().payment.len(),
            signer: approval.map(|a| a.signer.to_hex()),
            signature_algorithm: approval.map(|a| a.algorithm.to_string()),
        }
    }
}

impl DeploySummary {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Render a list of deploys, one JSON block each, followed by a count.
pub fn render_deploys(deploys: &[ReadyDeploy]) -> Result<String> {
    let mut out = String::new();
    for deploy in deploys {
        out.push_str("------------- deploy -------------\n");
        out.push_str(&DeploySummary::from(deploy).to_json()?);
        out.push('\n');
    }
    out.push_str(&format!("count: {}\n", deploys.len()));
    Ok(out)
}
