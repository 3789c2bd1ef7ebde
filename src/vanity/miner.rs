//! Bounded salt search

use std::sync::Arc;

use alloy_primitives::B256;
use futures::stream::{self, StreamExt};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::predictor::AddressPredictor;
use super::score::{matches_suffix, score_address};
use crate::codec::{encode_creation_params, TokenCreationParams};
use crate::metrics::metrics;
use crate::types::DeploymentCandidate;

/// How the miner decides which candidate to keep
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum MiningPolicy {
    /// Highest score after the whole budget; ties keep the earliest attempt
    #[default]
    BestScore,
    /// Stop at the first address ending in `suffix`; otherwise behaves like
    /// `BestScore`. Still bounded by the budget.
    FirstSuffixMatch { suffix: String },
}

/// Fresh 256-bit salt from the OS CSPRNG
pub fn random_salt() -> B256 {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    B256::from(bytes)
}

#[derive(Debug, Clone)]
pub struct VanityMiner {
    predictor: Arc<dyn AddressPredictor>,
    fan_out: usize,
    policy: MiningPolicy,
}

impl VanityMiner {
    pub fn new(predictor: Arc<dyn AddressPredictor>) -> Self {
        Self {
            predictor,
            fan_out: 1,
            policy: MiningPolicy::default(),
        }
    }

    /// Concurrent predictor calls; clamped to at least 1
    pub fn with_fan_out(mut self, fan_out: usize) -> Self {
        self.fan_out = fan_out.max(1);
        self
    }

    pub fn with_policy(mut self, policy: MiningPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn predictor(&self) -> &Arc<dyn AddressPredictor> {
        &self.predictor
    }

    /// Search up to `budget` random salts for the best-shaped address
    ///
    /// Returns `None` only when every prediction failed (or `budget` is 0).
    pub async fn mine(&self, params: &TokenCreationParams, budget: u64) -> Option<DeploymentCandidate> {
        let encoded = encode_creation_params(params);
        let ticker = params.symbol.trim();

        let mut attempts = stream::iter(0..budget)
            .map(|attempt| {
                let encoded = &encoded;
                async move {
                    let salt = random_salt();
                    let result = self.predictor.predict_address(encoded, salt).await;
                    tokio::task::yield_now().await;
                    (attempt, salt, result)
                }
            })
            .buffer_unordered(self.fan_out);

        let mut best: Option<DeploymentCandidate> = None;
        let mut failures: u64 = 0;

        while let Some((attempt, salt, result)) = attempts.next().await {
            metrics().record(|m| m.mining_attempts.inc());
            let predicted_address = match result {
                Ok(address) => address,
                Err(e) => {
                    failures += 1;
                    metrics().record(|m| m.mining_failures.inc());
                    debug!(attempt, error = %e, "Address prediction failed");
                    continue;
                }
            };

            let candidate = DeploymentCandidate {
                salt,
                predicted_address,
                score: score_address(&predicted_address, ticker),
                attempt,
            };

            if let MiningPolicy::FirstSuffixMatch { suffix } = &self.policy {
                if matches_suffix(&predicted_address, suffix) {
                    info!(attempt, address = %predicted_address, "Suffix match found");
                    return Some(candidate);
                }
            }

            if is_better(&candidate, best.as_ref()) {
                best = Some(candidate);
            }
        }

        match &best {
            Some(c) => info!(
                budget,
                failures,
                score = c.score,
                attempt = c.attempt,
                address = %c.predicted_address,
                "Vanity search finished"
            ),
            None => warn!(budget, failures, "Vanity search produced no candidate"),
        }
        best
    }
}

fn is_better(candidate: &DeploymentCandidate, best: Option<&DeploymentCandidate>) -> bool {
    match best {
        None => true,
        Some(b) => candidate.score > b.score || (candidate.score == b.score && candidate.attempt < b.attempt),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;

    fn candidate(score: u32, attempt: u64) -> DeploymentCandidate {
        DeploymentCandidate {
            salt: B256::ZERO,
            predicted_address: Address::ZERO,
            score,
            attempt,
        }
    }

    #[test]
    fn test_ties_keep_earliest() {
        assert!(is_better(&candidate(10, 5), None));
        assert!(is_better(&candidate(11, 9), Some(&candidate(10, 1))));
        assert!(is_better(&candidate(10, 1), Some(&candidate(10, 5))));
        assert!(!is_better(&candidate(10, 6), Some(&candidate(10, 5))));
        assert!(!is_better(&candidate(9, 0), Some(&candidate(10, 5))));
    }

    #[test]
    fn test_random_salts_differ() {
        assert_ne!(random_salt(), random_salt());
    }

    #[test]
    fn test_policy_serde() {
        let policy: MiningPolicy = serde_json::from_str(r#"{"policy":"first_suffix_match","suffix":"beef"}"#).unwrap();
        assert_eq!(
            policy,
            MiningPolicy::FirstSuffixMatch {
                suffix: "beef".into()
            }
        );
    }
}
