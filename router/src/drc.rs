//! Spacing and notch checks against the blockage index and against the
//! route under construction.

use crate::blockage::{BlockageIndex, BlockageNet};
use crate::context::RoutingContext;
use crate::rules::SpacingCache;
use eda_common::geom::point::Point;
use eda_common::geom::rect::Rect;

/// Metal already laid by the path being searched, as `(layer, rect)`.
pub type PathShapes = [(usize, Rect)];

/// First foreign shape within `surround` of `rect`, if any. Used for the
/// coarse check at route terminals.
pub fn metal_blockage(
    index: &BlockageIndex,
    layer: usize,
    net: BlockageNet,
    rect: &Rect,
    surround: f64,
) -> Option<Rect> {
    let area = rect.expand(surround);
    index
        .metals_in(layer, &area)
        .filter(|hit| !hit.item.net.same_net(net))
        .filter(|hit| hit.rect.overlaps(&area))
        .find(|hit| match &hit.item.polygon {
            Some(poly) => poly.intersects_rect(&area),
            None => true,
        })
        .map(|hit| hit.rect)
}

/// True when `rect` on `layer` would violate spacing to any indexed shape
/// or to the route's own metal in `path`.
pub fn metal_blockage_and_notch(
    index: &BlockageIndex,
    rules: &mut SpacingCache<'_>,
    ctx: &RoutingContext,
    layer: usize,
    net: BlockageNet,
    rect: &Rect,
    path: &PathShapes,
) -> bool {
    let width = rect.min_dim();
    let length = rect.max_dim();
    let search = rect.expand(ctx.worst_surround.get(layer).copied().unwrap_or(0.0));

    for hit in index.metals_in(layer, &search) {
        let spacing = rules.spacing(
            layer,
            hit.rect.min_dim().max(width),
            hit.rect.max_dim().max(length),
        );
        let drc_area = rect.expand(spacing);
        if !hit.rect.overlaps(&drc_area) {
            continue;
        }
        if hit.item.net.same_net(net) {
            if !hit.item.net.is_reservation()
                && found_a_notch(index, layer, net, rect, &hit.rect, spacing, path)
            {
                return true;
            }
            continue;
        }
        if let Some(poly) = &hit.item.polygon {
            if !poly.intersects_rect(&drc_area) {
                continue;
            }
        }
        return true;
    }

    let spacing = rules.spacing(layer, width, length);
    let drc_area = rect.expand(spacing);
    path.iter()
        .filter(|(l, r)| *l == layer && r.overlaps(&drc_area))
        .any(|(_, r)| found_a_notch(index, layer, net, rect, r, spacing, path))
}

/// Two same-net shapes closer than `dist` must have material between them.
/// Facing edges are sampled at both ends of their common span and in the
/// middle, on the midline of the gap; diagonal neighbours are tested at the
/// two corners of the L that would join them.
pub fn found_a_notch(
    index: &BlockageIndex,
    layer: usize,
    net: BlockageNet,
    a: &Rect,
    b: &Rect,
    dist: f64,
    path: &PathShapes,
) -> bool {
    let x_overlap = a.min.x <= b.max.x && b.min.x <= a.max.x;
    let y_overlap = a.min.y <= b.max.y && b.min.y <= a.max.y;
    if x_overlap && y_overlap {
        return false;
    }
    let covered = |p: Point<f64>| point_covered(index, layer, net, p, path);

    if x_overlap {
        let (gap, mid_y) = if a.max.y < b.min.y {
            (b.min.y - a.max.y, (a.max.y + b.min.y) / 2.0)
        } else {
            (a.min.y - b.max.y, (b.max.y + a.min.y) / 2.0)
        };
        if gap > dist {
            return false;
        }
        let lo = a.min.x.max(b.min.x);
        let hi = a.max.x.min(b.max.x);
        return [lo, hi, (lo + hi) / 2.0]
            .into_iter()
            .any(|x| !covered(Point::new(x, mid_y)));
    }

    if y_overlap {
        let (gap, mid_x) = if a.max.x < b.min.x {
            (b.min.x - a.max.x, (a.max.x + b.min.x) / 2.0)
        } else {
            (a.min.x - b.max.x, (b.max.x + a.min.x) / 2.0)
        };
        if gap > dist {
            return false;
        }
        let lo = a.min.y.max(b.min.y);
        let hi = a.max.y.min(b.max.y);
        return [lo, hi, (lo + hi) / 2.0]
            .into_iter()
            .any(|y| !covered(Point::new(mid_x, y)));
    }

    let (ax, bx) = if a.max.x < b.min.x {
        (a.max.x, b.min.x)
    } else {
        (a.min.x, b.max.x)
    };
    let (ay, by) = if a.max.y < b.min.y {
        (a.max.y, b.min.y)
    } else {
        (a.min.y, b.max.y)
    };
    if Point::new(ax, ay).distance(&Point::new(bx, by)) > dist {
        return false;
    }
    !covered(Point::new(ax, by)) && !covered(Point::new(bx, ay))
}

/// Whether `p` lies on material of exactly this net, indexed or on the path.
pub fn point_covered(
    index: &BlockageIndex,
    layer: usize,
    net: BlockageNet,
    p: Point<f64>,
    path: &PathShapes,
) -> bool {
    let indexed = index
        .metals_in(layer, &Rect::point(p))
        .any(|hit| hit.item.net == net && hit.item.covers(&hit.rect, p));
    indexed || path.iter().any(|(l, r)| *l == layer && r.contains(p))
}

/// True when a cut centred at `center` comes within `surround` of a cut of
/// another net, or of this net at a different location.
pub fn via_blockage(
    index: &BlockageIndex,
    via_layer: usize,
    net: BlockageNet,
    center: Point<f64>,
    surround: f64,
) -> bool {
    let area = Rect::from_center(center, surround, surround);
    index.cuts_in(via_layer, &area).any(|hit| {
        let cut = hit.item;
        if cut.net.same_net(net) && cut.center.approx_eq(&center) {
            return false;
        }
        (cut.center.x - center.x).abs() < surround && (cut.center.y - center.y).abs() < surround
    })
}
