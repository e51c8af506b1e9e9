//! Healing dispatch with cooldown and attempt limits
//!
//! One attempt record per issue type. A per-type async mutex is held across
//! the heal call, so attempts for the same type serialize while different
//! types proceed concurrently.

use crate::healing::strategy::StrategyRegistry;
use crate::models::{HealthIssue, IssueType};
use crate::sink::MetricsSink;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Dispatch limits; defaults match the monitoring interval
#[derive(Debug, Clone)]
pub struct HealingPolicy {
    /// Minimum gap between attempts for one issue type
    pub cooldown: Duration,
    /// Consecutive failures after which a type is no longer dispatched
    pub max_attempts: u32,
    /// Hard cap on a single strategy invocation
    pub heal_timeout: Duration,
    /// Idle time after which a type pinned at the failure limit is
    /// forgiven and retried
    pub stale_reset: Duration,
}

impl Default for HealingPolicy {
    fn default() -> Self {
        let cooldown = Duration::from_secs(300);
        Self {
            cooldown,
            max_attempts: 3,
            heal_timeout: Duration::from_secs(30),
            stale_reset: cooldown * 6,
        }
    }
}

#[derive(Debug, Default)]
struct AttemptState {
    consecutive_failures: u32,
    last_attempt: Option<Instant>,
}

#[derive(Debug, PartialEq, Eq)]
enum Decision {
    Proceed,
    CoolingDown,
    AttemptLimitReached,
}

fn decide(policy: &HealingPolicy, state: &AttemptState, now: Instant) -> Decision {
    if state.consecutive_failures >= policy.max_attempts {
        return Decision::AttemptLimitReached;
    }
    match state.last_attempt {
        Some(last) if now < last + policy.cooldown => Decision::CoolingDown,
        _ => Decision::Proceed,
    }
}

/// Routes detected issues to registered strategies and tracks outcomes
pub struct HealingDispatcher {
    registry: Arc<StrategyRegistry>,
    policy: HealingPolicy,
    states: DashMap<IssueType, Arc<Mutex<AttemptState>>>,
    total_attempts: AtomicU64,
    sink: Arc<dyn MetricsSink>,
}

impl HealingDispatcher {
    pub fn new(registry: Arc<StrategyRegistry>, sink: Arc<dyn MetricsSink>) -> Self {
        Self::with_policy(registry, sink, HealingPolicy::default())
    }

    pub fn with_policy(
        registry: Arc<StrategyRegistry>,
        sink: Arc<dyn MetricsSink>,
        policy: HealingPolicy,
    ) -> Self {
        Self {
            registry,
            policy,
            states: DashMap::new(),
            total_attempts: AtomicU64::new(0),
            sink,
        }
    }

    /// Attempt remediation for one issue, honoring cooldown and attempt
    /// limits. Skipped issues are logged but never recorded as attempts.
    pub async fn dispatch(&self, issue: &HealthIssue) {
        let slot = self
            .states
            .entry(issue.issue_type)
            .or_insert_with(|| Arc::new(Mutex::new(AttemptState::default())))
            .clone();
        let mut state = slot.lock().await;
        let now = Instant::now();

        // A type pinned at the failure limit gets a fresh start once it
        // has been idle long enough
        if state.consecutive_failures >= self.policy.max_attempts {
            if let Some(last) = state.last_attempt {
                if now >= last + self.policy.stale_reset {
                    info!(issue_type = %issue.issue_type.as_str(), "Attempt limit reset after idle period");
                    state.consecutive_failures = 0;
                }
            }
        }

        match decide(&self.policy, &state, now) {
            Decision::Proceed => {}
            Decision::CoolingDown => {
                warn!(
                    issue_type = %issue.issue_type.as_str(),
                    "Skipping healing attempt, cooldown active"
                );
                return;
            }
            Decision::AttemptLimitReached => {
                warn!(
                    issue_type = %issue.issue_type.as_str(),
                    failures = state.consecutive_failures,
                    "Skipping healing attempt, failure limit reached"
                );
                return;
            }
        }

        state.last_attempt = Some(now);
        self.total_attempts.fetch_add(1, Ordering::Relaxed);

        let Some(strategy) = self.registry.get(issue.category) else {
            state.consecutive_failures += 1;
            error!(
                issue_type = %issue.issue_type.as_str(),
                category = ?issue.category,
                "No healing strategy registered for category"
            );
            self.sink
                .record_healing_outcome(issue.issue_type, false, "no strategy");
            return;
        };

        info!(
            issue_type = %issue.issue_type.as_str(),
            severity = ?issue.severity,
            description = %issue.description,
            "Attempting to heal issue"
        );

        let outcome = tokio::time::timeout(self.policy.heal_timeout, strategy.heal(issue)).await;
        match outcome {
            Ok(Ok(true)) => {
                // Back to the never-attempted state; the next detection
                // dispatches immediately
                *state = AttemptState::default();
                info!(issue_type = %issue.issue_type.as_str(), "Issue healed");
                self.sink
                    .record_healing_outcome(issue.issue_type, true, "healed");
            }
            Ok(Ok(false)) => {
                state.consecutive_failures += 1;
                warn!(
                    issue_type = %issue.issue_type.as_str(),
                    failures = state.consecutive_failures,
                    "Healing attempt did not resolve the issue"
                );
                self.sink
                    .record_healing_outcome(issue.issue_type, false, "unresolved");
            }
            Ok(Err(e)) => {
                state.consecutive_failures += 1;
                error!(
                    issue_type = %issue.issue_type.as_str(),
                    error = %e,
                    failures = state.consecutive_failures,
                    "Healing attempt failed"
                );
                self.sink
                    .record_healing_outcome(issue.issue_type, false, "error");
            }
            Err(_) => {
                state.consecutive_failures += 1;
                error!(
                    issue_type = %issue.issue_type.as_str(),
                    timeout_secs = self.policy.heal_timeout.as_secs(),
                    "Healing attempt timed out"
                );
                self.sink
                    .record_healing_outcome(issue.issue_type, false, "timeout");
            }
        }
    }

    /// Attempts actually started (skips excluded)
    pub fn total_attempts(&self) -> u64 {
        self.total_attempts.load(Ordering::Relaxed)
    }

    /// Issue types with an attempt record
    pub fn active_issue_types(&self) -> usize {
        self.states.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::healing::strategy::HealingStrategy;
    use crate::models::{IssueCategory, IssueSeverity};
    use crate::sink::testing::RecordingSink;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::{HashMap, VecDeque};

    enum Step {
        Succeed,
        Fail,
        Error,
        Hang,
    }

    struct ScriptedStrategy {
        category: IssueCategory,
        script: Mutex<VecDeque<Step>>,
        calls: AtomicU64,
    }

    impl ScriptedStrategy {
        fn new(category: IssueCategory, script: Vec<Step>) -> Arc<Self> {
            Arc::new(Self {
                category,
                script: Mutex::new(script.into()),
                calls: AtomicU64::new(0),
            })
        }

        fn calls(&self) -> u64 {
            self.calls.load(Ordering::Relaxed)
        }
    }

    #[async_trait]
    impl HealingStrategy for ScriptedStrategy {
        fn category(&self) -> IssueCategory {
            self.category
        }

        async fn heal(&self, _issue: &HealthIssue) -> anyhow::Result<bool> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            match self.script.lock().await.pop_front() {
                Some(Step::Succeed) | None => Ok(true),
                Some(Step::Fail) => Ok(false),
                Some(Step::Error) => Err(anyhow::anyhow!("remediation backend offline")),
                Some(Step::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(true)
                }
            }
        }
    }

    fn memory_issue() -> HealthIssue {
        HealthIssue {
            issue_type: IssueType::HighMemoryUsage,
            category: IssueCategory::Memory,
            severity: IssueSeverity::Warning,
            description: "Memory usage is above 85%".to_string(),
            detected_at: Utc::now(),
            context: HashMap::new(),
        }
    }

    fn cpu_issue() -> HealthIssue {
        HealthIssue {
            issue_type: IssueType::HighCpuUsage,
            category: IssueCategory::System,
            severity: IssueSeverity::Critical,
            description: "CPU usage is above 90%".to_string(),
            detected_at: Utc::now(),
            context: HashMap::new(),
        }
    }

    fn dispatcher(
        strategy: Arc<ScriptedStrategy>,
        sink: Arc<RecordingSink>,
        policy: HealingPolicy,
    ) -> HealingDispatcher {
        let mut registry = StrategyRegistry::new();
        registry.register(strategy);
        HealingDispatcher::with_policy(Arc::new(registry), sink, policy)
    }

    #[test]
    fn test_decide_eligibility() {
        let policy = HealingPolicy::default();
        let now = Instant::now();

        let fresh = AttemptState::default();
        assert_eq!(decide(&policy, &fresh, now), Decision::Proceed);

        let cooling = AttemptState {
            consecutive_failures: 1,
            last_attempt: Some(now),
        };
        assert_eq!(decide(&policy, &cooling, now), Decision::CoolingDown);
        assert_eq!(
            decide(&policy, &cooling, now + policy.cooldown),
            Decision::Proceed
        );

        let exhausted = AttemptState {
            consecutive_failures: 3,
            last_attempt: Some(now),
        };
        assert_eq!(
            decide(&policy, &exhausted, now + policy.cooldown * 10),
            Decision::AttemptLimitReached
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_blocks_immediate_retry() {
        let strategy = ScriptedStrategy::new(IssueCategory::Memory, vec![Step::Fail, Step::Fail]);
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher(strategy.clone(), sink.clone(), HealingPolicy::default());

        dispatcher.dispatch(&memory_issue()).await;
        dispatcher.dispatch(&memory_issue()).await;
        assert_eq!(strategy.calls(), 1);
        assert_eq!(dispatcher.total_attempts(), 1);

        tokio::time::advance(Duration::from_secs(301)).await;
        dispatcher.dispatch(&memory_issue()).await;
        assert_eq!(strategy.calls(), 2);
        assert_eq!(dispatcher.total_attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_limit_stops_dispatch() {
        let strategy = ScriptedStrategy::new(
            IssueCategory::Memory,
            vec![Step::Fail, Step::Error, Step::Fail, Step::Succeed],
        );
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher(strategy.clone(), sink.clone(), HealingPolicy::default());

        for _ in 0..5 {
            dispatcher.dispatch(&memory_issue()).await;
            tokio::time::advance(Duration::from_secs(301)).await;
        }

        // Three failures, then the limit holds
        assert_eq!(strategy.calls(), 3);
        assert_eq!(dispatcher.total_attempts(), 3);
        let outcomes = sink.healing.lock().unwrap();
        assert!(outcomes.iter().all(|(_, success, _)| !success));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_failure_count() {
        let strategy = ScriptedStrategy::new(
            IssueCategory::Memory,
            vec![Step::Fail, Step::Fail, Step::Succeed, Step::Fail],
        );
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher(strategy.clone(), sink.clone(), HealingPolicy::default());

        for _ in 0..4 {
            dispatcher.dispatch(&memory_issue()).await;
            tokio::time::advance(Duration::from_secs(301)).await;
        }

        // The success at attempt three cleared the two failures, so the
        // fourth attempt still runs
        assert_eq!(strategy.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_clears_cooldown_too() {
        let strategy =
            ScriptedStrategy::new(IssueCategory::Memory, vec![Step::Succeed, Step::Succeed]);
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher(strategy.clone(), sink.clone(), HealingPolicy::default());

        dispatcher.dispatch(&memory_issue()).await;
        // No cooldown after a success, the record is back to initial
        dispatcher.dispatch(&memory_issue()).await;
        assert_eq!(strategy.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_limit_is_forgiven_after_idle() {
        let strategy = ScriptedStrategy::new(
            IssueCategory::Memory,
            vec![Step::Fail, Step::Fail, Step::Fail, Step::Succeed],
        );
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher(strategy.clone(), sink.clone(), HealingPolicy::default());

        for _ in 0..3 {
            dispatcher.dispatch(&memory_issue()).await;
            tokio::time::advance(Duration::from_secs(301)).await;
        }
        dispatcher.dispatch(&memory_issue()).await;
        assert_eq!(strategy.calls(), 3);

        // Idle past the stale-reset window
        tokio::time::advance(Duration::from_secs(1800)).await;
        dispatcher.dispatch(&memory_issue()).await;
        assert_eq!(strategy.calls(), 4);
        assert!(sink.healing.lock().unwrap().last().unwrap().1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_strategy_is_recorded_failure() {
        // No strategy covers the System category
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = HealingDispatcher::new(Arc::new(StrategyRegistry::new()), sink.clone());

        dispatcher.dispatch(&cpu_issue()).await;

        assert_eq!(dispatcher.total_attempts(), 1);
        let outcomes = sink.healing.lock().unwrap();
        assert_eq!(
            outcomes.as_slice(),
            &[(IssueType::HighCpuUsage, false, "no strategy".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_strategy_times_out_as_failure() {
        let strategy = ScriptedStrategy::new(IssueCategory::Memory, vec![Step::Hang]);
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher(strategy.clone(), sink.clone(), HealingPolicy::default());

        dispatcher.dispatch(&memory_issue()).await;

        let outcomes = sink.healing.lock().unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].1);
        assert_eq!(outcomes[0].2, "timeout");
    }

    #[tokio::test(start_paused = true)]
    async fn test_distinct_issue_types_tracked_separately() {
        let memory = ScriptedStrategy::new(IssueCategory::Memory, vec![Step::Fail]);
        let sink = Arc::new(RecordingSink::default());
        let mut registry = StrategyRegistry::new();
        registry.register(memory.clone());
        let dispatcher =
            HealingDispatcher::with_policy(Arc::new(registry), sink.clone(), HealingPolicy::default());

        dispatcher.dispatch(&memory_issue()).await;
        dispatcher.dispatch(&cpu_issue()).await;

        // The memory failure does not block the CPU issue record
        assert_eq!(dispatcher.total_attempts(), 2);
        assert_eq!(dispatcher.active_issue_types(), 2);
    }
}
