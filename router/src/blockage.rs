//! Per-layer R-trees of everything a route must respect: existing material,
//! port reservations and geometry laid down earlier in the run.

use crate::context::RoutingContext;
use crate::errors::RouterError;
use eda_common::db::hierarchy::{self, FlatShape};
use eda_common::db::layout::{Geometry, Layout, ShapeLayer};
use eda_common::geom::point::Point;
use eda_common::geom::polygon::Polygon;
use eda_common::geom::rect::Rect;
use eda_common::geom::rtree::{IndexedRect, SpatialIndex};

/// Signed owner tag. `|tag|` identifies the net; a negative tag marks a port
/// reservation, which blocks other nets but is never notch-checked by its
/// own net. Zero is unconnected material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockageNet(pub i32);

impl BlockageNet {
    pub const UNCONNECTED: BlockageNet = BlockageNet(0);

    pub fn from_tag(tag: u32) -> Self {
        Self(tag as i32)
    }

    pub fn reservation(self) -> Self {
        Self(-self.0.abs())
    }

    pub fn is_reservation(self) -> bool {
        self.0 < 0
    }

    pub fn same_net(self, other: BlockageNet) -> bool {
        self.0.abs() == other.0.abs()
    }
}

#[derive(Debug, Clone)]
pub struct MetalBlockage {
    /// Kept for non-rectangular material; the index key is its bounding box.
    pub polygon: Option<Polygon>,
    pub net: BlockageNet,
}

impl MetalBlockage {
    pub fn covers(&self, bounds: &Rect, p: Point<f64>) -> bool {
        match &self.polygon {
            Some(poly) => poly.contains_point(p),
            None => bounds.contains(p),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ViaBlockage {
    pub center: Point<f64>,
    pub net: BlockageNet,
}

pub struct BlockageIndex {
    metals: Vec<SpatialIndex<MetalBlockage>>,
    cuts: Vec<SpatialIndex<ViaBlockage>>,
    design_bounds: Rect,
}

impl BlockageIndex {
    pub fn new(num_metals: usize) -> Self {
        Self {
            metals: (0..num_metals).map(|_| SpatialIndex::new()).collect(),
            cuts: (0..num_metals.saturating_sub(1))
                .map(|_| SpatialIndex::new())
                .collect(),
            design_bounds: Rect::default(),
        }
    }

    /// Indexes every shape of the flattened design. Shapes drawn in another
    /// technology are matched to routing layers by name; unmatched layers
    /// are ignored.
    pub fn build(layout: &Layout, ctx: &RoutingContext) -> Result<Self, RouterError> {
        let n = ctx.num_metals();
        let mut metal_items: Vec<Vec<(Rect, MetalBlockage)>> = vec![Vec::new(); n];
        let mut cut_items: Vec<Vec<(Rect, ViaBlockage)>> = vec![Vec::new(); n.saturating_sub(1)];
        let mut bounds: Option<Rect> = None;

        hierarchy::enumerate(layout, |shape| {
            let net = BlockageNet::from_tag(shape.net);
            let bbox = shape.geometry.bbox();
            match shape.layer {
                ShapeLayer::Metal(layer) => {
                    let Some(layer) = map_metal(ctx, &shape, layer) else {
                        return;
                    };
                    let polygon = match shape.geometry {
                        Geometry::Rect(_) => None,
                        Geometry::Polygon(p) => Some(p),
                    };
                    metal_items[layer].push((bbox, MetalBlockage { polygon, net }));
                }
                ShapeLayer::Cut(layer) => {
                    let Some(layer) = map_cut(ctx, &shape, layer) else {
                        return;
                    };
                    let center = bbox.center();
                    cut_items[layer].push((Rect::point(center), ViaBlockage { center, net }));
                }
            }
            bounds = Some(bounds.map_or(bbox, |b| b.union(&bbox)));
        })?;

        let metal_count: usize = metal_items.iter().map(Vec::len).sum();
        let cut_count: usize = cut_items.iter().map(Vec::len).sum();
        log::info!(
            "Blockage index: {} metal shapes, {} cuts on {} layers",
            metal_count,
            cut_count,
            n
        );

        Ok(Self {
            metals: metal_items.into_iter().map(SpatialIndex::bulk_load).collect(),
            cuts: cut_items.into_iter().map(SpatialIndex::bulk_load).collect(),
            design_bounds: bounds.unwrap_or_default(),
        })
    }

    /// Extent of the material present when the index was built.
    pub fn design_bounds(&self) -> Rect {
        self.design_bounds
    }

    pub fn add_metal(&mut self, layer: usize, rect: Rect, net: BlockageNet) {
        if let Some(index) = self.metals.get_mut(layer) {
            index.insert(
                rect,
                MetalBlockage {
                    polygon: None,
                    net,
                },
            );
        }
    }

    pub fn add_cut(&mut self, via_layer: usize, center: Point<f64>, net: BlockageNet) {
        if let Some(index) = self.cuts.get_mut(via_layer) {
            index.insert(Rect::point(center), ViaBlockage { center, net });
        }
    }

    pub fn metals_in<'a>(
        &'a self,
        layer: usize,
        area: &Rect,
    ) -> impl Iterator<Item = &'a IndexedRect<MetalBlockage>> + use<'a> {
        let area = *area;
        self.metals
            .get(layer)
            .into_iter()
            .flat_map(move |index| index.query(&area))
    }

    pub fn cuts_in<'a>(
        &'a self,
        via_layer: usize,
        area: &Rect,
    ) -> impl Iterator<Item = &'a IndexedRect<ViaBlockage>> + use<'a> {
        let area = *area;
        self.cuts
            .get(via_layer)
            .into_iter()
            .flat_map(move |index| index.query(&area))
    }
}

fn map_metal(ctx: &RoutingContext, shape: &FlatShape<'_>, layer: usize) -> Option<usize> {
    if shape.technology.name == ctx.tech.name {
        return (layer < ctx.num_metals()).then_some(layer);
    }
    let name = &shape.technology.metals.get(layer)?.name;
    ctx.tech.metal_index(name)
}

fn map_cut(ctx: &RoutingContext, shape: &FlatShape<'_>, layer: usize) -> Option<usize> {
    if shape.technology.name == ctx.tech.name {
        return (layer + 1 < ctx.num_metals()).then_some(layer);
    }
    let name = &shape.technology.via_layers.get(layer)?.name;
    ctx.tech.via_layers.iter().position(|v| &v.name == name)
}
