//! Pluggable routing strategies. The sea-of-gates router is registered by
//! default; hosts may add their own under a different name.

use crate::errors::{ErrorLog, RouterError};
use crate::sea_of_gates::SeaOfGatesRouter;
use eda_common::db::layout::Layout;
use eda_common::util::config::RoutingConfig;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Result of one routing run.
#[derive(Debug, Clone, Default)]
pub struct RoutingSummary {
    pub nets_attempted: usize,
    pub nets_routed: usize,
    pub failed_nets: Vec<String>,
    pub segments_routed: usize,
    pub segments_total: usize,
    pub wire_length: f64,
    pub elapsed: Duration,
    pub cancelled: bool,
    pub errors: ErrorLog,
}

impl RoutingSummary {
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.failed_nets.is_empty()
    }
}

/// Shared cancellation flag, polled between nets.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

pub trait RoutingStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn route(
        &self,
        layout: &mut Layout,
        options: &RoutingConfig,
        cancel: &CancelToken,
    ) -> Result<RoutingSummary, RouterError>;
}

pub struct StrategyRegistry {
    strategies: Vec<Box<dyn RoutingStrategy>>,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        let mut registry = Self { strategies: Vec::new() };
        registry.register(Box::new(SeaOfGatesRouter));
        registry
    }
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a strategy, replacing any registered under the same name.
    pub fn register(&mut self, strategy: Box<dyn RoutingStrategy>) {
        self.strategies.retain(|s| s.name() != strategy.name());
        self.strategies.push(strategy);
    }

    pub fn get(&self, name: &str) -> Option<&dyn RoutingStrategy> {
        self.strategies
            .iter()
            .find(|s| s.name() == name)
            .map(|s| s.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoOp;

    impl RoutingStrategy for NoOp {
        fn name(&self) -> &str {
            "noop"
        }

        fn route(
            &self,
            _layout: &mut Layout,
            _options: &RoutingConfig,
            _cancel: &CancelToken,
        ) -> Result<RoutingSummary, RouterError> {
            Ok(RoutingSummary::default())
        }
    }

    #[test]
    fn registry_holds_sea_of_gates_by_default() {
        let mut registry = StrategyRegistry::new();
        assert_eq!(registry.names(), vec!["sea-of-gates"]);
        registry.register(Box::new(NoOp));
        registry.register(Box::new(NoOp));
        assert_eq!(registry.names(), vec!["sea-of-gates", "noop"]);
        assert!(registry.get("noop").is_some());
        assert!(registry.get("maze").is_none());
    }

    #[test]
    fn cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let handle = token.clone();
        assert!(!token.is_cancelled());
        handle.cancel();
        assert!(token.is_cancelled());
    }
}
