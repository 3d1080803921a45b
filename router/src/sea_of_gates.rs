//! Net-by-net driver: orders each net's terminals into segments, searches
//! every segment in both directions and keeps the shorter route.

use crate::algo::optimize::OptimizedPath;
use crate::algo::wavefront::{Endpoint, SearchOutcome, SearchResult, Segment, Wavefront};
use crate::blockage::{BlockageIndex, BlockageNet};
use crate::context::RoutingContext;
use crate::errors::{RouteFailure, RouterError};
use crate::realize::{Realized, realize};
use crate::rules::SpacingCache;
use crate::strategy::{CancelToken, RoutingStrategy, RoutingSummary};
use crate::terminals::{
    Terminal, check_technology, clear_endpoint, gather, order_terminals, reserve, snap_pair,
    terminal_layer,
};
use eda_common::db::hierarchy::top_net_tag;
use eda_common::db::indices::NetId;
use eda_common::db::layout::{Layout, PortRef};
use eda_common::geom::point::Point;
use eda_common::geom::rect::Rect;
use eda_common::util::config::RoutingConfig;
use eda_common::util::profiler::ScopedTimer;
use std::collections::HashSet;

pub struct SeaOfGatesRouter;

impl RoutingStrategy for SeaOfGatesRouter {
    fn name(&self) -> &str {
        "sea-of-gates"
    }

    fn route(
        &self,
        layout: &mut Layout,
        options: &RoutingConfig,
        cancel: &CancelToken,
    ) -> Result<RoutingSummary, RouterError> {
        run(layout, options, cancel)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

struct NetPlan {
    net: NetId,
    name: String,
    tag: BlockageNet,
    terminals: Vec<Terminal>,
    widths: Vec<f64>,
}

pub fn run(
    layout: &mut Layout,
    options: &RoutingConfig,
    cancel: &CancelToken,
) -> Result<RoutingSummary, RouterError> {
    let timer = ScopedTimer::new("Sea-of-gates routing");
    let top = layout.top_cell()?;
    let tech = layout.technology(&top.technology)?.clone();
    let ctx = RoutingContext::new(tech, options)?;
    let mut index = BlockageIndex::build(layout, &ctx)?;

    let nets = top.nets_to_route();
    log::info!(
        "Routing {} nets in '{}' over {} metal layers",
        nets.len(),
        top.name,
        ctx.num_metals()
    );
    let mut plans = Vec::with_capacity(nets.len());
    for &net in &nets {
        plans.push(plan_net(layout, &ctx, net)?);
    }

    // every net's ports are claimed before the first search
    for plan in &plans {
        for t in &plan.terminals {
            reserve(&mut index, &ctx, t, plan.tag, &plan.widths);
        }
    }

    let mut summary = RoutingSummary::default();
    for (i, plan) in plans.iter().enumerate() {
        if cancel.is_cancelled() {
            log::warn!("Routing cancelled with {} nets left", plans.len() - i);
            summary.cancelled = true;
            break;
        }
        route_net(layout, &ctx, &mut index, plan, &mut summary)?;
    }

    summary.elapsed = timer.elapsed();
    log::info!(
        "Routed {}/{} nets ({}/{} segments), wire length {:.1}",
        summary.nets_routed,
        summary.nets_attempted,
        summary.segments_routed,
        summary.segments_total,
        summary.wire_length
    );
    if !summary.failed_nets.is_empty() {
        log::warn!("Unrouted nets: {}", summary.failed_nets.join(", "));
    }
    Ok(summary)
}

fn plan_net(layout: &Layout, ctx: &RoutingContext, net: NetId) -> Result<NetPlan, RouterError> {
    let top = layout.top_cell()?;
    let terminals = gather(layout, net);
    let mut width: f64 = 0.0;
    for t in &terminals {
        width = width.max(layout.widest_wire_at(layout.top, t.port)?);
    }
    let width = width.min(ctx.options.max_wire_width);
    Ok(NetPlan {
        net,
        name: top.net_name(net).to_string(),
        tag: BlockageNet::from_tag(top_net_tag(net)),
        terminals,
        widths: ctx.widths_for(width),
    })
}

fn route_net(
    layout: &mut Layout,
    ctx: &RoutingContext,
    index: &mut BlockageIndex,
    plan: &NetPlan,
    summary: &mut RoutingSummary,
) -> Result<(), RouterError> {
    let _timer = ScopedTimer::debug(format!("Net '{}'", plan.name));
    summary.nets_attempted += 1;
    let n = plan.terminals.len();
    if n < 2 {
        let failure = RouteFailure::NoValidTerminals(n);
        summary.errors.report(&plan.name, &failure, Vec::new(), Vec::new());
        summary.failed_nets.push(plan.name.clone());
        return Ok(());
    }
    log::info!("Routing net '{}' ({} terminals)", plan.name, n);

    let centers: Vec<Point<f64>> = plan.terminals.iter().map(|t| t.info.center).collect();
    let order = order_terminals(&centers);
    let mut routed = vec![false; order.len() - 1];
    for (s, pair) in order.windows(2).enumerate() {
        let (a, b) = (&plan.terminals[pair[0]], &plan.terminals[pair[1]]);
        summary.segments_total += 1;
        match route_segment(layout, ctx, index, plan, a, b)? {
            Ok(done) => {
                routed[s] = true;
                summary.segments_routed += 1;
                summary.wire_length += done.length;
            }
            Err(failure) => {
                let (shapes, lines) = highlight(&failure, a, b);
                summary.errors.report(&plan.name, &failure, shapes, lines);
            }
        }
    }

    let complete = routed.iter().all(|&r| r);
    if complete {
        summary.nets_routed += 1;
    } else {
        summary.failed_nets.push(plan.name.clone());
    }
    let removed = reconcile(layout, plan, &order, &routed, complete)?;
    log::debug!("Net '{}': removed {} placeholders", plan.name, removed);
    Ok(())
}

/// Deletes the placeholders whose endpoints are now joined by routed
/// segments. Returns how many were removed.
fn reconcile(
    layout: &mut Layout,
    plan: &NetPlan,
    order: &[usize],
    routed: &[bool],
    complete: bool,
) -> Result<usize, RouterError> {
    let top = layout.top_cell_mut()?;
    let position = |port: PortRef| order.iter().position(|&i| plan.terminals[i].port == port);
    let doomed: HashSet<usize> = top
        .unrouted_on(plan.net)
        .into_iter()
        .filter(|&u| {
            if complete {
                return true;
            }
            let w = &top.unrouted[u];
            match (position(w.head), position(w.tail)) {
                (Some(h), Some(t)) => routed[h.min(t)..h.max(t)].iter().all(|&r| r),
                _ => false,
            }
        })
        .collect();

    let mut i = 0;
    top.unrouted.retain(|_| {
        let keep = !doomed.contains(&i);
        i += 1;
        keep
    });
    Ok(doomed.len())
}

/// Routes one terminal pair. The outer error aborts the run; the inner one
/// is a recoverable per-segment failure.
fn route_segment(
    layout: &mut Layout,
    ctx: &RoutingContext,
    index: &mut BlockageIndex,
    plan: &NetPlan,
    a: &Terminal,
    b: &Terminal,
) -> Result<Result<Realized, RouteFailure>, RouterError> {
    let segment = match prepare_segment(ctx, index, plan, a, b) {
        Ok(s) => s,
        Err(failure) => return Ok(Err(failure)),
    };
    let (forward, backward) = search_both(ctx, index, &segment);
    log::debug!(
        "{} -> {}: {} forward and {} backward expansions",
        a.name,
        b.name,
        forward.expansions,
        backward.expansions
    );
    let limit = ctx.options.complexity_limit;
    let path = match choose_path(forward, backward, limit, &a.name, &b.name) {
        Ok((_, path)) => path,
        Err(failure) => return Ok(Err(failure)),
    };
    realize(layout, ctx, index, &path, a, b, plan.net, &plan.widths).map(Ok)
}

fn prepare_segment(
    ctx: &RoutingContext,
    index: &BlockageIndex,
    plan: &NetPlan,
    a: &Terminal,
    b: &Terminal,
) -> Result<Segment, RouteFailure> {
    check_technology(ctx, a)?;
    check_technology(ctx, b)?;
    let la = terminal_layer(ctx, a)?;
    let lb = terminal_layer(ctx, b)?;

    let grain = ctx.grain();
    let (ax, bx) = snap_pair(a.info.center.x, b.info.center.x, grain);
    let (ay, by) = snap_pair(a.info.center.y, b.info.center.y, grain);

    let mut rules = SpacingCache::new(&ctx.tech);
    let from = clear_endpoint(index, ctx, &mut rules, plan.tag, a, la, Point::new(ax, ay), plan.widths[la])?;
    let to = clear_endpoint(index, ctx, &mut rules, plan.tag, b, lb, Point::new(bx, by), plan.widths[lb])?;
    Ok(Segment {
        from: Endpoint { point: from, layer: la },
        to: Endpoint { point: to, layer: lb },
        net: plan.tag,
        widths: plan.widths.clone(),
    })
}

fn search_both(ctx: &RoutingContext, index: &BlockageIndex, segment: &Segment) -> (SearchOutcome, SearchOutcome) {
    let limit = ctx.options.complexity_limit;
    let reverse = segment.reversed();
    let search = |s: &Segment| Wavefront::new(ctx, index, s).search(limit);
    if ctx.options.parallel_directions {
        rayon::join(|| search(segment), || search(&reverse))
    } else {
        (search(segment), search(&reverse))
    }
}

/// Picks the shorter of the two directional results, preferring the forward
/// one on ties. A backward path is reversed so it always runs from -> to.
pub fn choose_path(
    forward: SearchOutcome,
    backward: SearchOutcome,
    limit: usize,
    from: &str,
    to: &str,
) -> Result<(Direction, OptimizedPath), RouteFailure> {
    match (forward.result, backward.result) {
        (SearchResult::Found(f), SearchResult::Found(b)) => {
            let b = b.reversed();
            if b.length() < f.length() {
                Ok((Direction::Backward, b))
            } else {
                Ok((Direction::Forward, f))
            }
        }
        (SearchResult::Found(f), _) => Ok((Direction::Forward, f)),
        (_, SearchResult::Found(b)) => Ok((Direction::Backward, b.reversed())),
        (SearchResult::TooComplex, SearchResult::TooComplex) => {
            Err(RouteFailure::SearchTooComplex { limit })
        }
        _ => Err(RouteFailure::UnreachableDestination {
            from: from.to_string(),
            to: to.to_string(),
        }),
    }
}

fn highlight(failure: &RouteFailure, a: &Terminal, b: &Terminal) -> (Vec<Rect>, Vec<(Point<f64>, Point<f64>)>) {
    match failure {
        RouteFailure::BlockedPort { blocker, .. } => (vec![*blocker, a.info.bounds, b.info.bounds], Vec::new()),
        RouteFailure::UnreachableDestination { .. } => (Vec::new(), vec![(a.info.center, b.info.center)]),
        RouteFailure::TechnologyMismatch { .. } | RouteFailure::UnconnectablePort(_) => {
            (vec![a.info.bounds, b.info.bounds], Vec::new())
        }
        RouteFailure::SearchTooComplex { .. } | RouteFailure::NoValidTerminals(_) => (Vec::new(), Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::optimize::PathVertex;

    fn outcome(points: &[(f64, f64)]) -> SearchOutcome {
        let raw: Vec<PathVertex> = points
            .iter()
            .map(|&(x, y)| PathVertex {
                point: Point::new(x, y),
                layer: 0,
                via: None,
            })
            .collect();
        SearchOutcome {
            result: SearchResult::Found(OptimizedPath::collapse(&raw)),
            expansions: 1,
        }
    }

    fn failed(result: SearchResult) -> SearchOutcome {
        SearchOutcome { result, expansions: 10 }
    }

    #[test]
    fn shorter_backward_path_is_reversed() {
        let forward = outcome(&[(0.0, 0.0), (0.0, 5.0), (10.0, 5.0), (10.0, 0.0)]);
        // found from the far end, so it starts at (10, 0)
        let backward = outcome(&[(10.0, 0.0), (0.0, 0.0)]);
        let (dir, path) = choose_path(forward, backward, 100, "a", "b").unwrap();
        assert_eq!(dir, Direction::Backward);
        assert_eq!(path.first().unwrap().point, Point::new(0.0, 0.0));
        assert_eq!(path.last().unwrap().point, Point::new(10.0, 0.0));
    }

    #[test]
    fn ties_keep_the_forward_path() {
        let forward = outcome(&[(0.0, 0.0), (10.0, 0.0)]);
        let backward = outcome(&[(10.0, 0.0), (0.0, 0.0)]);
        let (dir, _) = choose_path(forward, backward, 100, "a", "b").unwrap();
        assert_eq!(dir, Direction::Forward);
    }

    #[test]
    fn one_success_is_enough() {
        let backward = outcome(&[(10.0, 0.0), (0.0, 0.0)]);
        let (dir, path) = choose_path(failed(SearchResult::Exhausted), backward, 100, "a", "b").unwrap();
        assert_eq!(dir, Direction::Backward);
        assert_eq!(path.first().unwrap().point, Point::new(0.0, 0.0));
    }

    #[test]
    fn failures_are_classified() {
        let both_limited = choose_path(
            failed(SearchResult::TooComplex),
            failed(SearchResult::TooComplex),
            100,
            "a",
            "b",
        );
        assert_eq!(both_limited.unwrap_err(), RouteFailure::SearchTooComplex { limit: 100 });

        let mixed = choose_path(
            failed(SearchResult::TooComplex),
            failed(SearchResult::Exhausted),
            100,
            "a",
            "b",
        );
        assert!(matches!(
            mixed.unwrap_err(),
            RouteFailure::UnreachableDestination { .. }
        ));
    }
}
