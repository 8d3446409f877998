//! Structural and cryptographic checks for deploys and block metadata.

use crate::deploy::{Approval, DeployBody, DeployHeader, ReadyDeploy};
use crate::error::ValidationError;
use crate::metadata::{check_unique_justifications, check_unique_parents, total_weight, BlockMetadata};
use crate::types::DeployHash;

/// Check that `header` commits to `body` and `deploy_hash` commits to `header`.
pub fn validate_commitment(
    header: &DeployHeader,
    body: &DeployBody,
    deploy_hash: &DeployHash,
) -> Result<(), ValidationError> {
    match header.body_hash() {
        None => {
            return Err(ValidationError::CommitmentMismatch(
                "header has no body hash".into(),
            ))
        }
        Some(declared) if *declared != body.compute_hash() => {
            return Err(ValidationError::CommitmentMismatch(
                "body hash does not match body".into(),
            ))
        }
        Some(_) => {}
    }

    let computed = header.compute_hash();
    if computed != *deploy_hash {
        return Err(ValidationError::CommitmentMismatch(format!(
            "deploy hash {} does not match header hash {}",
            deploy_hash, computed
        )));
    }
    Ok(())
}

/// Check an approval's signature over `deploy_hash`.
pub fn validate_approval(approval: &Approval, deploy_hash: &DeployHash) -> Result<(), ValidationError> {
    if approval.verify(deploy_hash) {
        Ok(())
    } else {
        Err(ValidationError::SignatureFailed)
    }
}

/// Full check of a final deploy: commitment, then approval if present.
pub fn validate_deploy(deploy: &ReadyDeploy) -> Result<(), ValidationError> {
    validate_commitment(deploy.header(), deploy.body(), deploy.deploy_hash())?;
    if let Some(approval) = deploy.approval() {
        validate_approval(approval, deploy.deploy_hash())?;
    }
    Ok(())
}

/// Structural invariants of a metadata record, independent of its neighbours.
///
/// - parents and justification validators are unique
/// - rank is 0 exactly for genesis
/// - non-genesis blocks carry positive, non-overflowing total stake
pub fn validate_metadata_structure(meta: &BlockMetadata) -> Result<(), ValidationError> {
    check_unique_parents(meta.parents())?;
    check_unique_justifications(meta.justifications())?;

    let total = total_weight(meta.weight_map())?;
    if meta.is_genesis() {
        if meta.rank() != 0 {
            return Err(ValidationError::InconsistentRank(format!(
                "genesis block has rank {}",
                meta.rank()
            )));
        }
    } else {
        if meta.rank() == 0 {
            return Err(ValidationError::InconsistentRank(
                "non-genesis block has rank 0".into(),
            ));
        }
        if total == 0 {
            return Err(ValidationError::InconsistentWeightMap(
                "non-genesis block has zero total stake".into(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Ed25519Signature, Keypair};
    use crate::deploy::Deploy;

    fn committed() -> ReadyDeploy {
        Deploy::new(
            DeployHeader::new(&b"acct"[..], 1000, 1, 10),
            DeployBody::new(&b"s"[..], &b"p"[..]),
        )
        .with_hashes()
        .into()
    }

    #[test]
    fn test_valid_unsigned() {
        assert!(validate_deploy(&committed()).is_ok());
    }

    #[test]
    fn test_valid_signed() {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let deploy = Deploy::new(
            DeployHeader::new(keypair.public_key().0.to_vec(), 1000, 1, 10),
            DeployBody::new(&b"s"[..], &b"p"[..]),
        )
        .with_hashes()
        .sign(&keypair);
        let ready = ReadyDeploy::from(deploy);
        assert!(validate_deploy(&ready).is_ok());
    }

    #[test]
    fn test_tampered_body_detected() {
        let deploy = committed();
        let tampered = DeployBody::new(&b"evil"[..], &b"p"[..]);
        let result = validate_commitment(deploy.header(), &tampered, deploy.deploy_hash());
        assert!(matches!(result, Err(ValidationError::CommitmentMismatch(_))));
    }

    #[test]
    fn test_wrong_deploy_hash_detected() {
        let deploy = committed();
        let result = validate_commitment(
            deploy.header(),
            deploy.body(),
            &DeployHash::from_bytes([0xab; 32]),
        );
        assert!(matches!(result, Err(ValidationError::CommitmentMismatch(_))));
    }

    #[test]
    fn test_uncommitted_header_detected() {
        let deploy = committed();
        let bare = DeployHeader::new(&b"acct"[..], 1000, 1, 10);
        let result = validate_commitment(&bare, deploy.body(), deploy.deploy_hash());
        assert!(matches!(result, Err(ValidationError::CommitmentMismatch(_))));
    }

    #[test]
    fn test_bad_approval() {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let deploy = committed();
        let approval = Approval {
            signer: keypair.public_key(),
            algorithm: crate::deploy::SignatureAlgorithm::Ed25519,
            signature: Ed25519Signature::from_bytes([0xff; 64]),
        };
        assert!(matches!(
            validate_approval(&approval, deploy.deploy_hash()),
            Err(ValidationError::SignatureFailed)
        ));
    }
}
