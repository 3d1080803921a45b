//! Post-route verification: spacing around the top cell's wires and nodes,
//! wire ends landing on their ports, and per-net connectivity.

use crate::errors::RouterError;
use eda_common::db::hierarchy::{enumerate, primitive_shapes, top_net_tag};
use eda_common::db::indices::NetId;
use eda_common::db::layout::{Layout, NodeKind, PortRef, ShapeLayer};
use eda_common::db::tech::Technology;
use eda_common::geom::rect::Rect;
use eda_common::geom::rtree::SpatialIndex;
use rayon::prelude::*;
use std::collections::HashMap;

const CHECK_TOLERANCE: f64 = 0.005;

#[derive(Debug, Clone, Default)]
pub struct VerifyReport {
    pub spacing: Vec<String>,
    pub detached: Vec<String>,
    pub open: Vec<String>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.violations() == 0
    }

    pub fn violations(&self) -> usize {
        self.spacing.len() + self.detached.len() + self.open.len()
    }
}

pub fn run(layout: &Layout) -> Result<VerifyReport, RouterError> {
    log::info!("Starting route verification...");
    let (spacing, (detached, open)) = rayon::join(
        || check_spacing(layout),
        || rayon::join(|| check_attachment(layout), || check_connectivity(layout)),
    );
    let report = VerifyReport {
        spacing: spacing?,
        detached: detached?,
        open: open?,
    };

    let sections = [
        ("No spacing violations.", "Spacing violations", &report.spacing),
        ("All wire ends sit on their ports.", "Detached wire ends", &report.detached),
        ("All routed nets are connected.", "Open nets", &report.open),
    ];
    for (pass, fail, found) in sections {
        if found.is_empty() {
            log::info!("\x1b[32mPASS\x1b[0m: {}", pass);
        } else {
            log::error!("\x1b[31mFAIL\x1b[0m: {} ({})", fail, found.len());
            for msg in found.iter() {
                log::error!("  {}", msg);
            }
        }
    }
    Ok(report)
}

struct Subject {
    layer: ShapeLayer,
    rect: Rect,
    net: u32,
    owner: String,
}

fn subjects(layout: &Layout, tech: &Technology) -> Result<Vec<Subject>, RouterError> {
    let top = layout.top_cell()?;
    let mut out: Vec<Subject> = top
        .wires
        .iter()
        .enumerate()
        .map(|(i, w)| Subject {
            layer: ShapeLayer::Metal(w.layer),
            rect: w.rect(),
            net: top_net_tag(w.net),
            owner: format!("wire {} of '{}'", i, top.net_name(w.net)),
        })
        .collect();
    for node in &top.nodes {
        let Some(net) = node.net else { continue };
        if matches!(node.kind, NodeKind::Instance { .. }) {
            continue;
        }
        for (layer, rect) in primitive_shapes(tech, node)? {
            out.push(Subject {
                layer,
                rect,
                net: top_net_tag(net),
                owner: format!("node '{}'", node.name),
            });
        }
    }
    Ok(out)
}

/// Foreign metal closer than the layer's spacing rule, and foreign cuts
/// closer than cut spacing, around every netted shape of the top cell.
fn check_spacing(layout: &Layout) -> Result<Vec<String>, RouterError> {
    let top = layout.top_cell()?;
    let tech = layout.technology(&top.technology)?;

    let mut metals: Vec<Vec<(Rect, u32)>> = vec![Vec::new(); tech.num_metals()];
    let mut cuts: Vec<Vec<(Rect, u32)>> = vec![Vec::new(); tech.via_layers.len()];
    enumerate(layout, |shape| {
        if shape.technology.name != tech.name {
            return;
        }
        let rect = shape.geometry.bbox();
        let bucket = match shape.layer {
            ShapeLayer::Metal(l) => metals.get_mut(l),
            ShapeLayer::Cut(l) => cuts.get_mut(l),
        };
        if let Some(bucket) = bucket {
            bucket.push((rect, shape.net));
        }
    })?;
    let metals: Vec<SpatialIndex<u32>> = metals.into_iter().map(SpatialIndex::bulk_load).collect();
    let cuts: Vec<SpatialIndex<u32>> = cuts.into_iter().map(SpatialIndex::bulk_load).collect();

    let mut found: Vec<String> = subjects(layout, tech)?
        .par_iter()
        .flat_map_iter(|s| {
            let mut hits = Vec::new();
            match s.layer {
                ShapeLayer::Metal(l) => {
                    let Some(index) = metals.get(l) else { return hits };
                    let area = s.rect.expand(tech.max_surround(l));
                    for other in index.query(&area).filter(|o| o.item != s.net) {
                        let spacing = tech.spacing(
                            l,
                            s.rect.min_dim().max(other.rect.min_dim()),
                            s.rect.max_dim().max(other.rect.max_dim()),
                        );
                        if s.rect.expand(spacing - CHECK_TOLERANCE).overlaps(&other.rect) {
                            hits.push(format!(
                                "{} on {} is too close to net tag {} at ({:.3}, {:.3})",
                                s.owner,
                                tech.metals[l].name,
                                other.item,
                                other.rect.center().x,
                                other.rect.center().y
                            ));
                        }
                    }
                }
                ShapeLayer::Cut(l) => {
                    let (Some(index), Some(layer)) = (cuts.get(l), tech.via_layers.get(l)) else {
                        return hits;
                    };
                    let surround = layer.cut_spacing + layer.cut_size.max(s.rect.max_dim());
                    let c = s.rect.center();
                    let area = Rect::from_center(c, surround, surround);
                    for other in index.query(&area).filter(|o| o.item != s.net) {
                        let o = other.rect.center();
                        if (o.x - c.x).abs() < surround - CHECK_TOLERANCE
                            && (o.y - c.y).abs() < surround - CHECK_TOLERANCE
                        {
                            hits.push(format!(
                                "{} cut on {} is too close to net tag {} at ({:.3}, {:.3})",
                                s.owner, layer.name, other.item, o.x, o.y
                            ));
                        }
                    }
                }
            }
            hits
        })
        .collect();
    found.sort();
    found.dedup();
    Ok(found)
}

/// Every wire end must lie within the bounds of the port it names.
fn check_attachment(layout: &Layout) -> Result<Vec<String>, RouterError> {
    let top = layout.top_cell()?;
    let found = top
        .wires
        .par_iter()
        .enumerate()
        .flat_map_iter(|(i, w)| {
            [(w.head, w.head_point), (w.tail, w.tail_point)]
                .into_iter()
                .filter_map(move |(port, at)| match layout.port_info(layout.top, port) {
                    Ok(info) if info.bounds.expand(CHECK_TOLERANCE).contains(at) => None,
                    Ok(_) => Some(format!(
                        "wire {} of '{}' ends at ({:.3}, {:.3}) outside {}",
                        i,
                        top.net_name(w.net),
                        at.x,
                        at.y,
                        top.describe_port(port)
                    )),
                    Err(e) => Some(format!("wire {} of '{}': {}", i, top.net_name(w.net), e)),
                })
        })
        .collect();
    Ok(found)
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Nets with wires must form a single piece and have no placeholders left.
fn check_connectivity(layout: &Layout) -> Result<Vec<String>, RouterError> {
    let top = layout.top_cell()?;
    let mut by_net: HashMap<NetId, Vec<(PortRef, PortRef)>> = HashMap::new();
    for w in &top.wires {
        by_net.entry(w.net).or_default().push((w.head, w.tail));
    }
    for u in &top.unrouted {
        by_net.entry(u.net).or_default();
    }

    let mut nets: Vec<NetId> = by_net.keys().copied().collect();
    nets.sort();
    let found = nets
        .par_iter()
        .filter_map(|net| {
            let name = top.net_name(*net);
            let remaining = top.unrouted_on(*net).len();
            if remaining > 0 {
                return Some(format!("'{}' has {} unrouted connections", name, remaining));
            }
            let edges = by_net.get(net)?;
            let mut ids: HashMap<PortRef, usize> = HashMap::new();
            for &(a, b) in edges {
                for p in [a, b] {
                    let next = ids.len();
                    ids.entry(p).or_insert(next);
                }
            }
            let mut parent: Vec<usize> = (0..ids.len()).collect();
            for (a, b) in edges {
                let (ra, rb) = (find(&mut parent, ids[a]), find(&mut parent, ids[b]));
                parent[ra] = rb;
            }
            let pieces = (0..parent.len()).filter(|&i| find(&mut parent, i) == i).count();
            (pieces > 1).then(|| format!("'{}' is split into {} pieces", name, pieces))
        })
        .collect();
    Ok(found)
}
