//! Currency Decomposition
//!
//! Splits a reward quantity into stackable currency items. Denomination
//! `stack-N` is worth 64^N units, so the split is a base-64 numeral read
//! from the highest configured digit down.

use std::collections::BTreeMap;

/// Units per step between denominations
pub const STACK_BASE: u64 = 64;

const STACK_PREFIX: &str = "stack-";

/// A number of items of one denomination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyStack {
    /// `stack-N`
    pub stack_key: String,
    /// Catalog item id for this denomination
    pub item_id: String,
    pub count: u64,
}

/// Parse `N` out of `stack-N`
pub fn stack_exponent(key: &str) -> Option<u32> {
    key.strip_prefix(STACK_PREFIX)?.parse().ok()
}

/// Unit value of `stack-N`, or `None` if it does not fit in a u64
pub fn stack_value(exponent: u32) -> Option<u64> {
    STACK_BASE.checked_pow(exponent)
}

/// Greedy mixed-radix decomposition of `total`.
///
/// Only denominations with a non-zero count are returned, largest first.
/// A remainder smaller than the smallest configured denomination is dropped.
pub fn decompose(total: u64, denominations: &BTreeMap<String, String>) -> Vec<CurrencyStack> {
    let mut stacks: Vec<(u64, &String, &String)> = denominations
        .iter()
        .filter_map(|(key, item_id)| {
            let value = stack_value(stack_exponent(key)?)?;
            Some((value, key, item_id))
        })
        .collect();
    stacks.sort_by(|a, b| b.0.cmp(&a.0));

    let mut remaining = total;
    let mut result = Vec::new();

    for (value, key, item_id) in stacks {
        if remaining == 0 {
            break;
        }
        let count = remaining / value;
        if count > 0 {
            result.push(CurrencyStack {
                stack_key: key.clone(),
                item_id: item_id.clone(),
                count,
            });
            remaining -= count * value;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_stacks() -> BTreeMap<String, String> {
        let mut stacks = BTreeMap::new();
        stacks.insert("stack-0".to_string(), "dust".to_string());
        stacks.insert("stack-1".to_string(), "shard".to_string());
        stacks
    }

    #[test]
    fn test_decompose_130() {
        let result = decompose(130, &two_stacks());
        assert_eq!(
            result,
            vec![
                CurrencyStack { stack_key: "stack-1".into(), item_id: "shard".into(), count: 2 },
                CurrencyStack { stack_key: "stack-0".into(), item_id: "dust".into(), count: 2 },
            ]
        );
    }

    #[test]
    fn test_decompose_skips_empty_denominations() {
        let result = decompose(128, &two_stacks());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].stack_key, "stack-1");
        assert_eq!(result[0].count, 2);
    }

    #[test]
    fn test_remainder_below_smallest_is_dropped() {
        let mut stacks = BTreeMap::new();
        stacks.insert("stack-1".to_string(), "shard".to_string());
        let result = decompose(100, &stacks);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].count, 1);
        assert!(decompose(63, &stacks).is_empty());
    }

    #[test]
    fn test_ordering_is_numeric_not_lexical() {
        let mut stacks = two_stacks();
        stacks.insert("stack-2".to_string(), "crystal".to_string());
        stacks.insert("stack-10".to_string(), "relic".to_string());
        // 64^2 + 64 + 1
        let result = decompose(4161, &stacks);
        let keys: Vec<_> = result.iter().map(|s| s.stack_key.as_str()).collect();
        assert_eq!(keys, vec!["stack-2", "stack-1", "stack-0"]);
    }

    #[test]
    fn test_malformed_keys_are_ignored() {
        let mut stacks = two_stacks();
        stacks.insert("gold".to_string(), "coin".to_string());
        stacks.insert("stack-99".to_string(), "impossible".to_string());
        let total: u64 = decompose(70, &stacks).iter().map(|s| s.count).sum();
        assert_eq!(total, 7);
    }
}
