//! Healing strategy trait and registry

use crate::models::{HealthIssue, IssueCategory};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// One remediation routine per issue category
///
/// `heal` returns `Ok(true)` when remediation verifiably succeeded,
/// `Ok(false)` when it ran but the condition persists, and `Err` when the
/// routine itself failed.
#[async_trait]
pub trait HealingStrategy: Send + Sync {
    fn category(&self) -> IssueCategory;

    async fn heal(&self, issue: &HealthIssue) -> anyhow::Result<bool>;
}

/// Closed mapping from issue category to its strategy
#[derive(Default)]
pub struct StrategyRegistry {
    strategies: HashMap<IssueCategory, Arc<dyn HealingStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy under its own category, replacing any previous one
    pub fn register(&mut self, strategy: Arc<dyn HealingStrategy>) -> &mut Self {
        self.strategies.insert(strategy.category(), strategy);
        self
    }

    pub fn get(&self, category: IssueCategory) -> Option<Arc<dyn HealingStrategy>> {
        self.strategies.get(&category).cloned()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopStrategy(IssueCategory);

    #[async_trait]
    impl HealingStrategy for NoopStrategy {
        fn category(&self) -> IssueCategory {
            self.0
        }

        async fn heal(&self, _issue: &HealthIssue) -> anyhow::Result<bool> {
            Ok(true)
        }
    }

    #[test]
    fn test_registry_keys_by_strategy_category() {
        let mut registry = StrategyRegistry::new();
        registry.register(Arc::new(NoopStrategy(IssueCategory::Memory)));
        registry.register(Arc::new(NoopStrategy(IssueCategory::Database)));

        assert_eq!(registry.len(), 2);
        assert!(registry.get(IssueCategory::Memory).is_some());
        assert!(registry.get(IssueCategory::System).is_none());
    }

    #[test]
    fn test_registering_twice_replaces() {
        let mut registry = StrategyRegistry::new();
        registry.register(Arc::new(NoopStrategy(IssueCategory::Memory)));
        registry.register(Arc::new(NoopStrategy(IssueCategory::Memory)));
        assert_eq!(registry.len(), 1);
    }
}
