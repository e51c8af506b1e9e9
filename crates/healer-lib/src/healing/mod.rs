//! Remediation: strategies, dispatch, and proactive mitigation

mod application;
mod database;
mod dispatcher;
mod memory;
mod network;
mod proactive;
mod strategy;

pub use application::ApplicationHealingStrategy;
pub use database::DatabaseHealingStrategy;
pub use dispatcher::{HealingDispatcher, HealingPolicy};
pub use memory::MemoryHealingStrategy;
pub use network::NetworkHealingStrategy;
pub use proactive::ProactiveHealer;
pub use strategy::{HealingStrategy, StrategyRegistry};
