//! Vanity address mining
//!
//! Searches deployment salts for a predicted token address that scores well
//! against a fixed pattern. The search is stateless across attempts and is
//! always bounded by an attempt budget.

mod miner;
mod predictor;
mod score;

pub use miner::{random_salt, MiningPolicy, VanityMiner};
pub use predictor::{AddressPredictor, Create2Predictor, LedgerPredictor};
pub use score::{address_body, matches_suffix, score_address};
