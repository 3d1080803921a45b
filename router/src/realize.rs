//! Turns a found path into pins, vias and wires in the top cell, and feeds
//! every new shape back into the blockage index.

use crate::algo::optimize::{OptimizedPath, via_width};
use crate::blockage::{BlockageIndex, BlockageNet};
use crate::context::RoutingContext;
use crate::errors::RouterError;
use crate::terminals::Terminal;
use eda_common::db::error::DbError;
use eda_common::db::hierarchy::{primitive_shapes, top_net_tag};
use eda_common::db::indices::{NetId, NodeId};
use eda_common::db::layout::{CellDef, Layout, PortRef, ShapeLayer, Wire};
use eda_common::geom::point::{Point, approx_eq};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Realized {
    pub nodes: usize,
    pub wires: usize,
    pub length: f64,
}

#[derive(Debug, Clone, Copy)]
struct Waypoint {
    at: Point<f64>,
    layer: usize,
    /// Catalog entry of the via arriving here, for layer changes.
    via: Option<usize>,
}

/// Where to bend when a path end is not aligned with its port center.
/// Continues the adjoining run when there is one.
fn jog(center: Point<f64>, end: Point<f64>, neighbour: Option<Point<f64>>) -> Option<Point<f64>> {
    if approx_eq(center.x, end.x) || approx_eq(center.y, end.y) {
        return None;
    }
    match neighbour {
        Some(n) if approx_eq(n.y, end.y) && !approx_eq(n.x, end.x) => Some(Point::new(center.x, end.y)),
        _ => Some(Point::new(end.x, center.y)),
    }
}

fn waypoints(path: &OptimizedPath, from: &Terminal, to: &Terminal) -> Vec<Waypoint> {
    let verts = path.vertices();
    let (Some(first), Some(last)) = (verts.first(), verts.last()) else {
        return Vec::new();
    };
    let same_layer = |i: usize, layer: usize| verts.get(i).filter(|v| v.layer == layer).map(|v| v.point);
    let plain = |at: Point<f64>, layer: usize| Waypoint { at, layer, via: None };

    let mut out = vec![plain(from.info.center, first.layer)];
    if let Some(p) = jog(from.info.center, first.point, same_layer(1, first.layer)) {
        out.push(plain(p, first.layer));
    }
    out.extend(verts.iter().map(|v| Waypoint {
        at: v.point,
        layer: v.layer,
        via: v.via,
    }));
    let before_last = verts.len().checked_sub(2).and_then(|i| same_layer(i, last.layer));
    if let Some(p) = jog(to.info.center, last.point, before_last) {
        out.push(plain(p, last.layer));
    }
    out.push(plain(to.info.center, last.layer));

    out.dedup_by(|b, a| a.layer == b.layer && a.at.approx_eq(&b.at));
    out
}

pub fn realize(
    layout: &mut Layout,
    ctx: &RoutingContext,
    index: &mut BlockageIndex,
    path: &OptimizedPath,
    from: &Terminal,
    to: &Terminal,
    net: NetId,
    widths: &[f64],
) -> Result<Realized, RouterError> {
    let wps = waypoints(path, from, to);
    let m = wps.len();
    let mut out = Realized::default();
    if m < 2 {
        return Ok(out);
    }
    let tag = BlockageNet::from_tag(top_net_tag(net));
    let width = |layer: usize| widths.get(layer).copied().unwrap_or(0.0);
    let hop = |k: usize| wps[k].layer != wps[k + 1].layer;
    let top = layout.top_cell_mut()?;
    let mut created: Vec<NodeId> = Vec::new();

    let mut vias: Vec<Option<NodeId>> = vec![None; m - 1];
    for k in 0..m - 1 {
        if !hop(k) {
            continue;
        }
        let lower = wps[k].layer.min(wps[k + 1].layer);
        let candidate = ctx
            .via_catalog
            .get(lower)
            .and_then(|c| c.get(wps[k + 1].via.unwrap_or(0)))
            .ok_or_else(|| DbError::UnknownVia {
                tech: ctx.tech.name.clone(),
                via: format!("between metals {} and {}", lower, lower + 1),
            })?;
        let name = format!("sog_via_{}", top.nodes.len());
        let node = top.add_via(
            name,
            candidate.template.name.clone(),
            wps[k].at,
            candidate.orientation,
            via_width(widths, lower),
            Some(net),
        );
        created.push(node);
        vias[k] = Some(node);
    }

    let mut anchors: Vec<PortRef> = Vec::with_capacity(m);
    for k in 0..m {
        let anchor = if k == 0 {
            from.port
        } else if k == m - 1 {
            to.port
        } else if let Some(v) = vias[k - 1] {
            PortRef::new(v, 0)
        } else if let Some(v) = vias[k] {
            PortRef::new(v, 0)
        } else {
            let name = format!("sog_pin_{}", top.nodes.len());
            let node = top.add_pin(name, wps[k].layer, wps[k].at, width(wps[k].layer), Some(net));
            created.push(node);
            PortRef::new(node, 0)
        };
        anchors.push(anchor);
    }

    let mut lay = |top: &mut CellDef, a: PortRef, b: PortRef, layer: usize, p: Point<f64>, q: Point<f64>| {
        let wire = Wire {
            net,
            layer,
            width: width(layer),
            head: a,
            tail: b,
            head_point: p,
            tail_point: q,
        };
        index.add_metal(layer, wire.rect(), tag);
        out.length += wire.length();
        out.wires += 1;
        top.add_wire(wire);
    };
    for k in 0..m - 1 {
        match vias[k] {
            None => lay(top, anchors[k], anchors[k + 1], wps[k].layer, wps[k].at, wps[k + 1].at),
            Some(v) => {
                // stacked or port-adjacent vias are joined by zero-length wires
                let via = PortRef::new(v, 0);
                if anchors[k] != via {
                    lay(top, anchors[k], via, wps[k].layer, wps[k].at, wps[k].at);
                }
                if anchors[k + 1] != via {
                    lay(top, via, anchors[k + 1], wps[k + 1].layer, wps[k + 1].at, wps[k + 1].at);
                }
            }
        }
    }

    for id in &created {
        let node = top.node(*id)?;
        for (layer, rect) in primitive_shapes(&ctx.tech, node)? {
            match layer {
                ShapeLayer::Metal(l) => index.add_metal(l, rect, tag),
                ShapeLayer::Cut(l) => index.add_cut(l, rect.center(), tag),
            }
        }
    }
    out.nodes = created.len();
    log::debug!(
        "Realized {} nodes and {} wires ({:.1} units)",
        out.nodes,
        out.wires,
        out.length
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jog_continues_the_adjoining_run() {
        let c = Point::new(0.0, 0.5);
        let end = Point::new(3.0, 1.0);
        // vertical run leaving the end: bend on the port's row
        assert_eq!(jog(c, end, Some(Point::new(3.0, 9.0))), Some(Point::new(3.0, 0.5)));
        // horizontal run: bend on the port's column
        assert_eq!(jog(c, end, Some(Point::new(9.0, 1.0))), Some(Point::new(0.0, 1.0)));
        // aligned ends need no bend
        assert_eq!(jog(c, Point::new(5.0, 0.5), None), None);
    }
}
