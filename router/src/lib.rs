pub mod algo;
pub mod blockage;
pub mod context;
pub mod drc;
pub mod errors;
pub mod realize;
pub mod rules;
pub mod sea_of_gates;
pub mod strategy;
pub mod terminals;
pub mod utils;
pub mod verify;

pub use errors::{RouteFailure, RouterError};
pub use strategy::{CancelToken, RoutingStrategy, RoutingSummary, StrategyRegistry};

use eda_common::db::layout::Layout;
use eda_common::util::config::Config;

pub fn route(layout: &mut Layout, config: &Config) -> Result<RoutingSummary, RouterError> {
    route_with_cancel(layout, config, &CancelToken::new())
}

/// Routes with the strategy named in the configuration. `cancel` is polled
/// between nets; work already done is kept.
pub fn route_with_cancel(
    layout: &mut Layout,
    config: &Config,
    cancel: &CancelToken,
) -> Result<RoutingSummary, RouterError> {
    let registry = StrategyRegistry::new();
    let name = &config.routing.strategy;
    let strategy = registry
        .get(name)
        .ok_or_else(|| RouterError::UnknownStrategy(name.clone()))?;
    log::info!("Using routing strategy '{}'", strategy.name());
    strategy.route(layout, &config.routing, cancel)
}
