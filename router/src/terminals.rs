//! Terminal gathering, visiting order, validation and port reservations.

use crate::algo::optimize::via_width;
use crate::blockage::{BlockageIndex, BlockageNet};
use crate::context::RoutingContext;
use crate::drc::metal_blockage;
use crate::errors::RouteFailure;
use crate::rules::SpacingCache;
use crate::utils::grain::{down_to_grain, up_to_grain};
use eda_common::db::indices::NetId;
use eda_common::db::layout::{Layout, PortInfo, PortRef};
use eda_common::geom::point::Point;
use eda_common::geom::rect::Rect;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct Terminal {
    pub port: PortRef,
    pub name: String,
    pub info: PortInfo,
}

/// Resolves the placeholder endpoints of `net`. Ports that no longer
/// resolve are dropped with a warning.
pub fn gather(layout: &Layout, net: NetId) -> Vec<Terminal> {
    let Ok(top) = layout.top_cell() else {
        return Vec::new();
    };
    top.net_terminals(net)
        .into_iter()
        .filter_map(|port| match layout.port_info(layout.top, port) {
            Ok(info) => Some(Terminal {
                port,
                name: top.describe_port(port),
                info,
            }),
            Err(e) => {
                log::warn!("Skipping {}: {}", top.describe_port(port), e);
                None
            }
        })
        .collect()
}

/// Visiting order: the closest pair first, then whichever end of the chain
/// is nearer to a remaining point grows. Ties grow the tail.
pub fn order_terminals(points: &[Point<f64>]) -> Vec<usize> {
    let n = points.len();
    if n < 2 {
        return (0..n).collect();
    }
    let mut best = (0, 1, f64::MAX);
    for i in 0..n {
        for j in (i + 1)..n {
            let d = points[i].distance(&points[j]);
            if d < best.2 {
                best = (i, j, d);
            }
        }
    }
    let mut chain = VecDeque::from([best.0, best.1]);
    let mut remaining: Vec<usize> = (0..n).filter(|&k| k != best.0 && k != best.1).collect();

    let nearest = |end: usize, remaining: &[usize]| {
        remaining
            .iter()
            .enumerate()
            .map(|(slot, &k)| (slot, points[end].distance(&points[k])))
            .fold((0, f64::MAX), |acc, c| if c.1 < acc.1 { c } else { acc })
    };
    while !remaining.is_empty() {
        let (head_slot, head_d) = nearest(chain[0], &remaining);
        let (tail_slot, tail_d) = nearest(chain[chain.len() - 1], &remaining);
        if head_d < tail_d {
            chain.push_front(remaining.remove(head_slot));
        } else {
            chain.push_back(remaining.remove(tail_slot));
        }
    }
    chain.into_iter().collect()
}

pub fn check_technology(ctx: &RoutingContext, t: &Terminal) -> Result<(), RouteFailure> {
    if t.info.technology == ctx.tech.name {
        return Ok(());
    }
    Err(RouteFailure::TechnologyMismatch {
        port: t.name.clone(),
        found: t.info.technology.clone(),
        expected: ctx.tech.name.clone(),
    })
}

/// Lowest routable metal of a terminal.
pub fn terminal_layer(ctx: &RoutingContext, t: &Terminal) -> Result<usize, RouteFailure> {
    check_technology(ctx, t)?;
    t.info
        .layers
        .iter()
        .copied()
        .filter(|&l| l < ctx.num_metals() && !ctx.prevented[l])
        .min()
        .ok_or_else(|| RouteFailure::UnconnectablePort(t.name.clone()))
}

/// Snaps two coordinates to the grain, each toward the other.
pub fn snap_pair(from: f64, to: f64, grain: f64) -> (f64, f64) {
    if to < from {
        (down_to_grain(from, grain), up_to_grain(to, grain))
    } else if to > from {
        (up_to_grain(from, grain), down_to_grain(to, grain))
    } else {
        (up_to_grain(from, grain), up_to_grain(to, grain))
    }
}

/// Confirms a wire end fits at `snapped`, falling back to the exact port
/// center when the snapped point is obstructed.
pub fn clear_endpoint(
    index: &BlockageIndex,
    ctx: &RoutingContext,
    rules: &mut SpacingCache<'_>,
    net: BlockageNet,
    t: &Terminal,
    layer: usize,
    snapped: Point<f64>,
    width: f64,
) -> Result<Point<f64>, RouteFailure> {
    let default_width = ctx.default_width(layer);
    let half = default_width.max(width) / 2.0;
    let surround = rules.default_spacing(layer, default_width);

    let blocker_at = |p: Point<f64>| {
        metal_blockage(index, layer, net, &Rect::from_center(p, half, half), surround)
    };
    let Some(blocker) = blocker_at(snapped) else {
        return Ok(snapped);
    };
    if !snapped.approx_eq(&t.info.center) && blocker_at(t.info.center).is_none() {
        return Ok(t.info.center);
    }
    Err(RouteFailure::BlockedPort {
        port: t.name.clone(),
        layer: ctx.layer_name(layer).to_string(),
        blocker,
    })
}

/// Claims the access area around a terminal: the smallest via of every
/// layer pair touching its metals, tagged as a reservation of `net`.
pub fn reserve(index: &mut BlockageIndex, ctx: &RoutingContext, t: &Terminal, net: BlockageNet, widths: &[f64]) {
    if t.info.technology != ctx.tech.name {
        return;
    }
    let (Some(&low), Some(&high)) = (t.info.layers.iter().min(), t.info.layers.iter().max()) else {
        return;
    };
    let first = low.saturating_sub(1);
    for lower in first..=high {
        if lower + 1 >= ctx.num_metals() {
            break;
        }
        let Some(candidate) = ctx.via_catalog.get(lower).and_then(|c| c.first()) else {
            continue;
        };
        for (layer, rect) in candidate.metal_rects(via_width(widths, lower), t.info.center) {
            index.add_metal(layer, rect, net.reservation());
        }
    }
}
