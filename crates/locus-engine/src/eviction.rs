//! Rules deciding when a request leaves the queue.

use serde::{Deserialize, Serialize};

/// A single eviction rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionRule {
    /// Evict on any failure.
    OnError,
    /// Evict once the accepted-data counter reaches `count`.
    OnReceiveData {
        /// Threshold on the accepted-data counter
        count: u64,
    },
}

/// A set of [`EvictionRule`]s; any match evicts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvictionPolicy {
    rules: Vec<EvictionRule>,
}

impl EvictionPolicy {
    /// Policy that never evicts automatically.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// `{onError}`, used by long-lived monitors.
    #[must_use]
    pub fn on_error() -> Self {
        Self::none().with(EvictionRule::OnError)
    }

    /// `{onError, onReceiveData(1)}`, used by single-shot kinds.
    #[must_use]
    pub fn single_shot() -> Self {
        Self::on_error().with(EvictionRule::OnReceiveData { count: 1 })
    }

    /// Add a rule. Duplicates are ignored.
    #[must_use]
    pub fn with(mut self, rule: EvictionRule) -> Self {
        if !self.rules.contains(&rule) {
            self.rules.push(rule);
        }
        self
    }

    /// `true` if the policy holds `rule`.
    #[must_use]
    pub fn contains(&self, rule: EvictionRule) -> bool {
        self.rules.contains(&rule)
    }

    /// Rules in insertion order.
    #[must_use]
    pub fn rules(&self) -> &[EvictionRule] {
        &self.rules
    }

    /// `true` if no rule is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Decide whether the request must be removed after delivering `outcome`.
    ///
    /// `received` is the accepted-data counter after the delivery was counted.
    #[must_use]
    pub fn should_evict<T, E>(&self, outcome: &Result<T, E>, received: u64) -> bool {
        self.rules.iter().any(|rule| match (rule, outcome) {
            (EvictionRule::OnError, Err(_)) => true,
            (EvictionRule::OnReceiveData { count }, Ok(_)) => received >= *count,
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Outcome = Result<(), ()>;

    #[test]
    fn test_single_shot() {
        let policy = EvictionPolicy::single_shot();
        assert!(policy.should_evict(&Outcome::Ok(()), 1));
        assert!(policy.should_evict(&Outcome::Err(()), 0));
    }

    #[test]
    fn test_count_threshold() {
        let policy = EvictionPolicy::none().with(EvictionRule::OnReceiveData { count: 3 });
        assert!(!policy.should_evict(&Outcome::Ok(()), 1));
        assert!(!policy.should_evict(&Outcome::Ok(()), 2));
        assert!(policy.should_evict(&Outcome::Ok(()), 3));
        assert!(!policy.should_evict(&Outcome::Err(()), 3));
    }

    #[test]
    fn test_on_error_only() {
        let policy = EvictionPolicy::on_error();
        assert!(!policy.should_evict(&Outcome::Ok(()), 100));
        assert!(policy.should_evict(&Outcome::Err(()), 0));
    }

    #[test]
    fn test_empty_policy_never_evicts() {
        let policy = EvictionPolicy::none();
        assert!(policy.is_empty());
        assert!(!policy.should_evict(&Outcome::Err(()), 0));
        assert!(!policy.should_evict(&Outcome::Ok(()), u64::MAX));
    }

    #[test]
    fn test_duplicate_rules_collapse() {
        let policy = EvictionPolicy::on_error()
            .with(EvictionRule::OnError)
            .with(EvictionRule::OnReceiveData { count: 1 });
        assert_eq!(policy, EvictionPolicy::single_shot());
        assert_eq!(policy.rules().len(), 2);
    }
}
