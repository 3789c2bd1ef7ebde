//! Address scoring

use alloy_primitives::Address;

const LEADING_ZERO_POINTS: u32 = 10;
const REPEAT_POINTS: u32 = 5;
const TICKER_POINTS: u32 = 15;
const REPEAT_RUN: usize = 3;
const TICKER_PREFIX: usize = 3;

/// Lowercase 40-character hex body of `address`, without `0x`
pub fn address_body(address: &Address) -> String {
    hex::encode(address.as_slice())
}

/// Score a predicted address
///
/// * +10 per leading `0` nibble
/// * +5 if any hex digit repeats three or more times in a row
/// * +15 if the body contains the first three characters of `ticker`,
///   case-insensitive (shorter tickers never match)
pub fn score_address(address: &Address, ticker: &str) -> u32 {
    let body = address_body(address);
    let bytes = body.as_bytes();

    let leading_zeros = bytes.iter().take_while(|&&c| c == b'0').count() as u32;
    let mut score = leading_zeros * LEADING_ZERO_POINTS;

    if bytes
        .windows(REPEAT_RUN)
        .any(|w| w.iter().all(|&c| c == w[0]))
    {
        score += REPEAT_POINTS;
    }

    if let Some(prefix) = ticker_prefix(ticker) {
        if body.contains(&prefix) {
            score += TICKER_POINTS;
        }
    }

    score
}

fn ticker_prefix(ticker: &str) -> Option<String> {
    let ticker = ticker.trim();
    if ticker.chars().count() < TICKER_PREFIX {
        return None;
    }
    Some(ticker.chars().take(TICKER_PREFIX).collect::<String>().to_lowercase())
}

/// Whether the body ends with `suffix` (optional `0x`, case-insensitive)
pub fn matches_suffix(address: &Address, suffix: &str) -> bool {
    let suffix = suffix.trim();
    let suffix = suffix.strip_prefix("0x").unwrap_or(suffix).to_lowercase();
    !suffix.is_empty() && address_body(address).ends_with(&suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_leading_zeros() {
        let a = address!("001a2b3c4d5e6f7a8b9c0d1e2f3a4b5c6d7e8f9a");
        assert_eq!(score_address(&a, ""), 20);
    }

    #[test]
    fn test_leading_zero_run_also_counts_as_repeat() {
        let a = address!("0000a2b3c4d5e6f7a8b9c0d1e2f3a4b5c6d7e8f9");
        assert_eq!(score_address(&a, ""), 45);
    }

    #[test]
    fn test_repeat_bonus_once() {
        let a = address!("1a2bbb3c4d5e6f7a8b9c0d1e2f3a4b5c6d7e8fff");
        assert_eq!(score_address(&a, ""), 5);
    }

    #[test]
    fn test_ticker_bonus_case_insensitive() {
        let a = address!("1a2b3cabe4d5e6f7a8b9c0d1e2f3a4b5c6d7e8f9");
        assert_eq!(score_address(&a, "ABE"), 15);
        assert_eq!(score_address(&a, "abed"), 15);
        assert_eq!(score_address(&a, "AB"), 0);
        assert_eq!(score_address(&a, "cat"), 0);
    }

    #[test]
    fn test_combined() {
        let a = address!("00cafe1a2b3c4d5e6f7a8b9c0d1e2f3a4b5c6777");
        assert_eq!(score_address(&a, "CAFE"), 20 + 5 + 15);
    }

    #[test]
    fn test_suffix_match() {
        let a = address!("1a2b3c4d5e6f7a8b9c0d1e2f3a4b5c6d7e8f1337");
        assert!(matches_suffix(&a, "1337"));
        assert!(matches_suffix(&a, "0xF1337"));
        assert!(!matches_suffix(&a, "beef"));
        assert!(!matches_suffix(&a, ""));
    }
}
