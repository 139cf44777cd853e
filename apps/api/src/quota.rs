//! Quota Gate for usage-limited free-tier operations.
//!
//! The check and the increment are intentionally separate steps: the counter
//! is only advanced after the downstream generation succeeded, via
//! `clients::identity`. The read and the remote increment are not atomic, so
//! two concurrent requests from the same caller can both pass the check before
//! either increment lands. Known limitation, accepted as best-effort.

use crate::models::Plan;

/// Number of usage-gated generations a free caller gets before upgrade.
pub const FREE_TIER_LIMIT: u32 = 10;

pub const LIMIT_REACHED_MESSAGE: &str = "Limit reached. Upgrade to continue.";

/// Returns whether a usage-gated operation may proceed.
/// Premium callers are never limited; denial mutates nothing.
pub fn free_tier_allows(plan: Plan, free_usage: u32) -> bool {
    plan.is_premium() || free_usage < FREE_TIER_LIMIT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premium_is_never_limited() {
        assert!(free_tier_allows(Plan::Premium, 0));
        assert!(free_tier_allows(Plan::Premium, FREE_TIER_LIMIT));
        assert!(free_tier_allows(Plan::Premium, u32::MAX));
    }

    #[test]
    fn free_below_limit_is_allowed() {
        assert!(free_tier_allows(Plan::Free, 0));
        assert!(free_tier_allows(Plan::Free, FREE_TIER_LIMIT - 1));
    }

    #[test]
    fn free_at_or_above_limit_is_denied() {
        assert!(!free_tier_allows(Plan::Free, FREE_TIER_LIMIT));
        assert!(!free_tier_allows(Plan::Free, FREE_TIER_LIMIT + 1));
    }
}
