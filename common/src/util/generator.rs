use crate::db::layout::{CellDef, Geometry, Layout, PortRef, ShapeLayer};
use crate::db::tech::{LayerDirection, MetalLayer, SpacingRule, Technology, ViaLayer, ViaTemplate};
use crate::geom::point::Point;
use crate::geom::rect::Rect;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const MAX_PIN_ATTEMPTS: usize = 10_000;

/// Three-metal technology used by generated benchmarks: 2-unit wires with
/// 2-unit spacing, a wider rule for fat metal, and single-cut vias.
pub fn demo_technology() -> Technology {
    let metal = |name: &str, direction| MetalLayer {
        name: name.to_string(),
        direction,
        default_width: 2.0,
        spacing: vec![
            SpacingRule {
                min_width: 0.0,
                min_length: 0.0,
                spacing: 2.0,
            },
            SpacingRule {
                min_width: 6.0,
                min_length: 20.0,
                spacing: 3.0,
            },
        ],
    };
    let via = |name: &str, lower| ViaTemplate {
        name: name.to_string(),
        lower,
        lower_metal: Rect::from_center(Point::new(0.0, 0.0), 1.0, 1.0),
        upper_metal: Rect::from_center(Point::new(0.0, 0.0), 1.0, 1.0),
        cuts: vec![Rect::from_center(Point::new(0.0, 0.0), 0.5, 0.5)],
    };
    let cut_layer = |name: &str| ViaLayer {
        name: name.to_string(),
        cut_spacing: 2.0,
        cut_size: 1.0,
    };
    Technology {
        name: "demo3".to_string(),
        metals: vec![
            metal("M1", LayerDirection::Horizontal),
            metal("M2", LayerDirection::Vertical),
            metal("M3", LayerDirection::Horizontal),
        ],
        via_layers: vec![cut_layer("V1"), cut_layer("V2")],
        vias: vec![via("VIA12", 0), via("VIA23", 1)],
    }
}

/// Builds a random routing problem: `num_nets` nets of two or three metal-1
/// pins on an integer grid inside a `die` x `die` square, plus unconnected
/// metal-1 obstructions kept clear of every pin.
pub fn generate_random_design(num_nets: usize, num_obstacles: usize, die: f64, seed: u64) -> Layout {
    let mut rng = StdRng::seed_from_u64(seed);
    let tech = demo_technology();
    let pin_size = tech.metals[0].default_width;
    let keep_out = 4.0 * pin_size;
    let die = die.max(10.0 * keep_out);
    let mut top = CellDef::new("random_top", tech.name.clone());
    let mut pins: Vec<Point<f64>> = Vec::new();

    let random_point = |rng: &mut StdRng, taken: &[Point<f64>]| {
        (0..MAX_PIN_ATTEMPTS).find_map(|_| {
            let p = Point::new(
                rng.gen_range(0..die as i64) as f64,
                rng.gen_range(0..die as i64) as f64,
            );
            taken.iter().all(|q| q.manhattan(&p) > keep_out).then_some(p)
        })
    };

    log::info!(
        "Generating benchmark: {} nets, {} obstructions, die {}x{}",
        num_nets,
        num_obstacles,
        die,
        die
    );

    'nets: for n in 0..num_nets {
        let terminals = if rng.gen_bool(0.3) { 3 } else { 2 };
        let mut spots = Vec::with_capacity(terminals);
        for _ in 0..terminals {
            let Some(at) = random_point(&mut rng, &pins) else {
                log::warn!("Die is full; stopping after {} nets", n);
                break 'nets;
            };
            pins.push(at);
            spots.push(at);
        }
        let net = top.add_net(format!("n{}", n));
        let mut ports = Vec::with_capacity(terminals);
        for (t, at) in spots.into_iter().enumerate() {
            let node = top.add_pin(format!("n{}_{}", n, t), 0, at, pin_size, Some(net));
            ports.push(PortRef::new(node, 0));
        }
        for pair in ports.windows(2) {
            top.add_unrouted(net, pair[0], pair[1]);
        }
    }

    let mut placed = 0;
    let mut attempts = 0;
    while placed < num_obstacles && attempts < num_obstacles * 50 {
        attempts += 1;
        let w = rng.gen_range(2..12) as f64;
        let h = rng.gen_range(2..12) as f64;
        let corner = Point::new(
            rng.gen_range(0..die as i64) as f64,
            rng.gen_range(0..die as i64) as f64,
        );
        let rect = Rect::new(corner, Point::new(corner.x + w, corner.y + h));
        let grown = rect.expand(keep_out);
        if pins.iter().any(|p| grown.contains(*p)) {
            continue;
        }
        top.add_shape(ShapeLayer::Metal(0), Geometry::Rect(rect), None);
        placed += 1;
    }
    if placed < num_obstacles {
        log::warn!("Only {} of {} obstructions fit", placed, num_obstacles);
    }

    Layout::new(tech, top)
}
