#![allow(dead_code)]

use eda_common::db::indices::NetId;
use eda_common::db::layout::{CellDef, Geometry, Layout, PortRef, ShapeLayer};
use eda_common::db::tech::{LayerDirection, MetalLayer, SpacingRule, Technology};
use eda_common::geom::point::Point;
use eda_common::geom::rect::Rect;
use eda_common::util::config::Config;
use eda_common::util::generator::demo_technology;

pub struct Design {
    pub layout: Layout,
    pub pins: Vec<PortRef>,
    pub net: NetId,
}

/// One net "sig" with a metal-1 pin at each point, chained by placeholders.
pub fn chain(points: &[(f64, f64)]) -> Design {
    let mut top = CellDef::new("top", "demo3");
    let net = top.add_net("sig");
    let pins: Vec<PortRef> = points
        .iter()
        .enumerate()
        .map(|(i, &(x, y))| {
            let node = top.add_pin(format!("p{}", i), 0, Point::new(x, y), 2.0, Some(net));
            PortRef::new(node, 0)
        })
        .collect();
    for pair in pins.windows(2) {
        top.add_unrouted(net, pair[0], pair[1]);
    }
    Design {
        layout: Layout::new(demo_technology(), top),
        pins,
        net,
    }
}

/// One horizontal metal with 2-unit wires and 2-unit spacing, no vias.
pub fn single_metal() -> Technology {
    Technology {
        name: "single".to_string(),
        metals: vec![MetalLayer {
            name: "M1".to_string(),
            direction: LayerDirection::Horizontal,
            default_width: 2.0,
            spacing: vec![SpacingRule {
                min_width: 0.0,
                min_length: 0.0,
                spacing: 2.0,
            }],
        }],
        via_layers: Vec::new(),
        vias: Vec::new(),
    }
}

/// Centre of the one-wire gap in the slotted wall.
pub const SLOT_X: f64 = 7.0;
/// Metal-1 wall across y 5..10, split around `SLOT_X`. Both halves reach
/// far past the search area.
pub const SLOT_WALLS: [(f64, f64, f64, f64); 2] = [(-50.0, 5.0, 3.5, 10.0), (10.5, 5.0, 200.0, 10.0)];

/// Pins at (0, 0) and (100, 40) on either side of the slotted wall, in the
/// single-metal technology.
pub fn slot_design() -> Design {
    let mut top = CellDef::new("top", "single");
    let net = top.add_net("sig");
    let pins: Vec<PortRef> = [(0.0, 0.0), (100.0, 40.0)]
        .iter()
        .enumerate()
        .map(|(i, &(x, y))| {
            let node = top.add_pin(format!("p{}", i), 0, Point::new(x, y), 2.0, Some(net));
            PortRef::new(node, 0)
        })
        .collect();
    top.add_unrouted(net, pins[0], pins[1]);
    let mut layout = Layout::new(single_metal(), top);
    for (x0, y0, x1, y1) in SLOT_WALLS {
        obstacle(&mut layout, 0, x0, y0, x1, y1);
    }
    Design { layout, pins, net }
}

pub fn obstacle(layout: &mut Layout, layer: usize, x0: f64, y0: f64, x1: f64, y1: f64) {
    let rect = Rect::new(Point::new(x0, y0), Point::new(x1, y1));
    layout
        .top_cell_mut()
        .unwrap()
        .add_shape(ShapeLayer::Metal(layer), Geometry::Rect(rect), None);
}

pub fn config() -> Config {
    Config::default()
}
