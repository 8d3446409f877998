//! Property tests over generated DAGs and deploys.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use proptest::prelude::*;

use stakedag::core::crypto::{self, Ed25519Signature};
use stakedag::core::{
    compare, sort_by_rank, BlockMetadata, CoreError, Deploy, RankOrdered, ValidationError,
};
use stakedag_testkit::generators::{
    dag_from_params, deploy_from_params, keypair, metadata_for_dag, DagParams, DeployParams,
};

proptest! {
    #[test]
    fn metadata_roundtrips(params: DagParams) {
        for meta in metadata_for_dag(&dag_from_params(&params)) {
            let bytes = meta.to_bytes();
            let decoded = BlockMetadata::from_bytes(&bytes).unwrap();
            prop_assert_eq!(&decoded, &meta);
            prop_assert_eq!(decoded.to_bytes(), bytes);
        }
    }

    #[test]
    fn rank_is_one_more_than_highest_parent(params: DagParams) {
        let blocks = dag_from_params(&params);
        let metas = metadata_for_dag(&blocks);
        let ranks: HashMap<_, _> = metas.iter().map(|m| (*m.block_hash(), m.rank())).collect();

        for meta in &metas {
            match meta.parents().iter().map(|p| ranks[p]).max() {
                None => prop_assert_eq!(meta.rank(), 0),
                Some(max) => prop_assert_eq!(meta.rank(), max + 1),
            }
        }
    }

    #[test]
    fn ordering_is_a_strict_total_order(params: DagParams) {
        let metas = metadata_for_dag(&dag_from_params(&params));

        for a in &metas {
            prop_assert_eq!(compare(a, a), Ordering::Equal);
            for b in &metas {
                let ab = compare(a, b);
                prop_assert_eq!(ab, compare(b, a).reverse());
                if a.block_hash() != b.block_hash() {
                    prop_assert_ne!(ab, Ordering::Equal);
                }
                for c in &metas {
                    if ab == Ordering::Less && compare(b, c) == Ordering::Less {
                        prop_assert_eq!(compare(a, c), Ordering::Less);
                    }
                }
            }
        }
    }

    #[test]
    fn sort_and_wrapper_agree(params: DagParams) {
        let metas = metadata_for_dag(&dag_from_params(&params));

        let mut sorted = metas.clone();
        sort_by_rank(&mut sorted);
        let via_set: Vec<BlockMetadata> = metas
            .iter()
            .map(RankOrdered)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|m| m.into_inner().clone())
            .collect();

        prop_assert_eq!(sorted, via_set);
    }

    #[test]
    fn commitment_is_idempotent(params: DeployParams) {
        let ready = deploy_from_params(&params);
        let again = Deploy::new(ready.header().clone(), ready.body().clone())
            .with_hashes()
            .with_hashes();
        prop_assert_eq!(again.deploy_hash(), ready.deploy_hash());
    }

    #[test]
    fn deploy_roundtrips(params: DeployParams) {
        let ready = deploy_from_params(&params);
        let decoded = stakedag::ReadyDeploy::from_bytes(&ready.to_bytes()).unwrap();
        prop_assert_eq!(decoded, ready);
    }

    #[test]
    fn signature_rejects_single_byte_flips(
        kp in keypair(),
        digest in any::<[u8; 32]>(),
        index in 0usize..64,
        bit in 0u8..8,
    ) {
        let sig = crypto::sign(&digest, &kp);
        let pk = kp.public_key();
        prop_assert!(crypto::verify(&digest, &sig, &pk));

        let mut bad_sig = sig.0;
        bad_sig[index] ^= 1 << bit;
        prop_assert!(!crypto::verify(&digest, &Ed25519Signature(bad_sig), &pk));

        let mut bad_digest = digest;
        bad_digest[index % 32] ^= 1 << bit;
        prop_assert!(!crypto::verify(&bad_digest, &sig, &pk));
    }

    #[test]
    fn random_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        if let Err(err) = BlockMetadata::from_bytes(&bytes) {
            prop_assert!(matches!(err, CoreError::MalformedEncoding(_)));
        }
        if let Err(err) = stakedag::ReadyDeploy::from_bytes(&bytes) {
            prop_assert!(matches!(
                err,
                ValidationError::Core(CoreError::MalformedEncoding(_))
            ));
        }
    }

    #[test]
    fn truncated_deploy_rejected(params: DeployParams, cut in any::<prop::sample::Index>()) {
        let bytes = deploy_from_params(&params).to_bytes();
        let len = cut.index(bytes.len());
        prop_assert!(matches!(
            stakedag::ReadyDeploy::from_bytes(&bytes[..len]),
            Err(ValidationError::Core(CoreError::MalformedEncoding(_)))
        ));
    }

    #[test]
    fn truncated_metadata_rejected(params: DagParams, cut in any::<prop::sample::Index>()) {
        let metas = metadata_for_dag(&dag_from_params(&params));
        let bytes = metas[metas.len() - 1].to_bytes();
        let len = cut.index(bytes.len());
        prop_assert!(matches!(
            BlockMetadata::from_bytes(&bytes[..len]),
            Err(CoreError::MalformedEncoding(_))
        ));
    }
}
