//! Cost-ordered grid search for one two-terminal connection.
//!
//! Vertices live in an arena and point at their predecessor by index. Each
//! popped vertex tries six moves (both directions on X, Y and layer). Moves
//! toward the target along an axis jump as far as the blockage index allows
//! instead of stepping one grain at a time; intermediate stops along a jump
//! are queued at a growing premium so the search can still turn mid-run.

use super::optimize::{OptimizedPath, PathVertex, via_width};
use crate::blockage::{BlockageIndex, BlockageNet};
use crate::context::RoutingContext;
use crate::drc::{metal_blockage_and_notch, via_blockage};
use crate::rules::SpacingCache;
use crate::utils::grain::{down_to_grain, is_on_grain, quantize, up_to_grain};
use eda_common::geom::point::{EPSILON, Point, approx_eq};
use eda_common::geom::rect::Rect;
use priority_queue::PriorityQueue;
use std::cmp::Reverse;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Endpoint {
    pub point: Point<f64>,
    pub layer: usize,
}

/// One connection to search for. `widths` holds the wire width per metal.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub from: Endpoint,
    pub to: Endpoint,
    pub net: BlockageNet,
    pub widths: Vec<f64>,
}

impl Segment {
    pub fn reversed(&self) -> Self {
        Self {
            from: self.to,
            to: self.from,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchResult {
    /// Path in search order, from `from` to `to`.
    Found(OptimizedPath),
    Exhausted,
    TooComplex,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub result: SearchResult,
    pub expansions: usize,
}

#[derive(Debug, Clone)]
struct ViaUse {
    lower: usize,
    candidate: usize,
    cuts: Vec<Point<f64>>,
}

#[derive(Debug, Clone)]
struct SearchVertex {
    point: Point<f64>,
    layer: usize,
    cost: i64,
    parent: Option<u32>,
    via: Option<ViaUse>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
    Z,
}

fn along(p: Point<f64>, axis: Axis) -> f64 {
    match axis {
        Axis::Y => p.y,
        _ => p.x,
    }
}

fn with_along(p: Point<f64>, axis: Axis, v: f64) -> Point<f64> {
    match axis {
        Axis::Y => Point::new(p.x, v),
        _ => Point::new(v, p.y),
    }
}

pub struct Wavefront<'a> {
    ctx: &'a RoutingContext,
    index: &'a BlockageIndex,
    seg: &'a Segment,
    rules: SpacingCache<'a>,
    vertices: Vec<SearchVertex>,
    queue: PriorityQueue<u32, Reverse<(i64, i64, u32)>>,
    visited: HashSet<(i64, i64, usize)>,
    bounds: Rect,
    jump_bound: Rect,
    design: Rect,
    metal_spacing: Vec<f64>,
    grain: f64,
}

impl<'a> Wavefront<'a> {
    pub fn new(ctx: &'a RoutingContext, index: &'a BlockageIndex, seg: &'a Segment) -> Self {
        let mut rules = SpacingCache::new(&ctx.tech);
        let metal_spacing = (0..ctx.num_metals())
            .map(|l| {
                let w = seg.widths.get(l).copied().unwrap_or(0.0);
                w / 2.0 + rules.default_spacing(l, w)
            })
            .collect();
        let design = index.design_bounds();
        let margin = design.width().min(design.height()) * ctx.options.search_bound_percent / 100.0;
        let jump_bound = Rect::from_corners(seg.from.point, seg.to.point);
        Self {
            ctx,
            index,
            seg,
            rules,
            vertices: Vec::new(),
            queue: PriorityQueue::new(),
            visited: HashSet::new(),
            bounds: jump_bound.expand(margin),
            jump_bound,
            design,
            metal_spacing,
            grain: ctx.grain(),
        }
    }

    /// Runs until the target is reached, the queue empties, or more than
    /// `limit` vertices have been popped.
    pub fn search(mut self, limit: usize) -> SearchOutcome {
        let from = self.seg.from;
        let to = self.seg.to;
        self.vertices.push(SearchVertex {
            point: from.point,
            layer: from.layer,
            cost: 0,
            parent: None,
            via: None,
        });
        self.mark_visited(from.point, from.layer);
        if from.layer == to.layer && from.point.approx_eq(&to.point) {
            return SearchOutcome {
                result: SearchResult::Found(self.optimized_from(0)),
                expansions: 0,
            };
        }
        self.enqueue(0);

        let mut expansions = 0;
        while let Some((idx, _)) = self.queue.pop() {
            expansions += 1;
            if expansions > limit {
                log::debug!("Search gave up after {} expansions", limit);
                return SearchOutcome {
                    result: SearchResult::TooComplex,
                    expansions,
                };
            }
            if let Some(found) = self.expand(idx) {
                log::debug!("Reached target after {} expansions", expansions);
                return SearchOutcome {
                    result: SearchResult::Found(self.optimized_from(found)),
                    expansions,
                };
            }
        }
        SearchOutcome {
            result: SearchResult::Exhausted,
            expansions,
        }
    }

    /// Generates the moves out of `idx`; returns the vertex that reached the
    /// target, if one did.
    fn expand(&mut self, idx: u32) -> Option<u32> {
        let g = self.grain;
        let to = self.seg.to;
        let cur = self.vertices[idx as usize].point;
        let cz = self.vertices[idx as usize].layer;
        let n_metals = self.ctx.num_metals() as i64;

        for dir in 0..6 {
            let (axis, step, dz): (Axis, f64, i64) = match dir {
                0 => (Axis::X, up_to_grain(cur.x - g, g) - cur.x, 0),
                1 => (Axis::X, down_to_grain(cur.x + g, g) - cur.x, 0),
                2 => (Axis::Y, up_to_grain(cur.y - g, g) - cur.y, 0),
                3 => (Axis::Y, down_to_grain(cur.y + g, g) - cur.y, 0),
                4 => (Axis::Z, 0.0, -1),
                _ => (Axis::Z, 0.0, 1),
            };

            let nz = cz as i64 + dz;
            if nz < 0 || nz >= n_metals {
                continue;
            }
            let nz = nz as usize;
            if dz != 0 && self.ctx.prevented[nz] {
                continue;
            }

            if axis == Axis::Z {
                if self.is_visited(cur, nz) {
                    continue;
                }
                let Some(via) = self.find_via(idx, cur, cz, nz) else {
                    continue;
                };
                let cost = self.move_cost(idx, cur, nz);
                let new = self.add_vertex(cur, nz, cost, idx, Some(via));
                if nz == to.layer && cur.approx_eq(&to.point) {
                    return Some(new);
                }
                self.enqueue(new);
                continue;
            }

            let mut d = step;
            let toward = (along(to.point, axis) - along(cur, axis)) * d > 0.0;
            if toward {
                let jump = self.jump_size(cur, cz, axis, d.signum());
                if jump * d <= 0.0 {
                    continue;
                }
                d = jump;
            }
            let (lo, hi) = match axis {
                Axis::Y => (self.bounds.min.y, self.bounds.max.y),
                _ => (self.bounds.min.x, self.bounds.max.x),
            };
            let target = (along(cur, axis) + d).clamp(lo, hi);
            if (target - along(cur, axis)).abs() < EPSILON {
                continue;
            }
            let mut next = with_along(cur, axis, target);
            if self.is_visited(next, cz) {
                continue;
            }
            if !self.planar_clear(idx, cur, next, cz, axis) {
                // back off one grain toward the current point
                let sign = (target - along(cur, axis)).signum();
                let backed = if sign > 0.0 {
                    down_to_grain(target - g, g)
                } else {
                    up_to_grain(target + g, g)
                };
                if (backed - along(cur, axis)) * sign <= EPSILON {
                    continue;
                }
                next = with_along(cur, axis, backed);
                if self.is_visited(next, cz) || !self.planar_clear(idx, cur, next, cz, axis) {
                    continue;
                }
            }

            let cost = self.move_cost(idx, next, cz);
            let new = self.add_vertex(next, cz, cost, idx, None);
            if cz == to.layer && next.approx_eq(&to.point) {
                return Some(new);
            }
            self.enqueue(new);

            if let Some(found) = self.add_intermediates(idx, cur, next, cz, axis, cost) {
                return Some(found);
            }
        }
        None
    }

    /// Queues stops between `cur` and the end of a jump, walking back from
    /// the end. Each stop costs one more than the one after it, so turning
    /// early in a run is dearer than turning late. The stride doubles every
    /// ten stops.
    fn add_intermediates(
        &mut self,
        idx: u32,
        cur: Point<f64>,
        end: Point<f64>,
        z: usize,
        axis: Axis,
        cost: i64,
    ) -> Option<u32> {
        let g = self.grain;
        let start = along(cur, axis);
        let mut pos = along(end, axis);
        let sign = (pos - start).signum();
        if (pos - start).abs() <= g + EPSILON {
            return None;
        }
        let to = self.seg.to;
        let mut stride = g;
        let mut stops = 0;
        let mut step_cost = cost;
        loop {
            pos = if sign > 0.0 {
                down_to_grain(pos - stride, g)
            } else {
                up_to_grain(pos + stride, g)
            };
            if (pos - start) * sign <= EPSILON {
                return None;
            }
            // charged for visited stops too
            step_cost += 1;
            let p = with_along(cur, axis, pos);
            if !self.is_visited(p, z) {
                let new = self.add_vertex(p, z, step_cost, idx, None);
                if z == to.layer && p.approx_eq(&to.point) {
                    return Some(new);
                }
                self.enqueue(new);
            }
            stops += 1;
            if stops % 10 == 0 {
                stride *= 2.0;
            }
        }
    }

    /// Signed distance that can be travelled from `p` along `axis` before
    /// foreign metal gets closer than the layer spacing, bounded by the
    /// envelope of the two terminals.
    fn jump_size(&self, p: Point<f64>, z: usize, axis: Axis, sign: f64) -> f64 {
        let ms = self.metal_spacing[z];
        let (bound_lo, bound_hi) = match axis {
            Axis::Y => (self.jump_bound.min.y, self.jump_bound.max.y),
            _ => (self.jump_bound.min.x, self.jump_bound.max.x),
        };
        let start = along(p, axis);
        let mut limit = if sign > 0.0 { bound_hi + ms } else { bound_lo - ms };
        let lane = match axis {
            Axis::Y => Rect::from_corners(
                Point::new(p.x - ms, start - sign * ms),
                Point::new(p.x + ms, limit),
            ),
            _ => Rect::from_corners(
                Point::new(start - sign * ms, p.y - ms),
                Point::new(limit, p.y + ms),
            ),
        };
        for hit in self.index.metals_in(z, &lane) {
            if hit.item.net.same_net(self.seg.net) || !hit.rect.overlaps(&lane) {
                continue;
            }
            let (lo, hi) = match axis {
                Axis::Y => (hit.rect.min.y, hit.rect.max.y),
                _ => (hit.rect.min.x, hit.rect.max.x),
            };
            if sign > 0.0 {
                limit = limit.min(lo);
            } else {
                limit = limit.max(hi);
            }
        }
        let mut d = limit - sign * ms - start;

        let to = self.seg.to;
        let target = along(to.point, axis);
        let across = |q: Point<f64>| match axis {
            Axis::Y => q.x,
            _ => q.y,
        };
        if z == to.layer && approx_eq(across(p), across(to.point)) {
            let overshoots = (target - start) * sign > 0.0 && (start + d - target) * sign > 0.0;
            if overshoots {
                d = target - start;
            }
        }
        let end = start + d;
        if !approx_eq(end, target) {
            let snapped = if sign > 0.0 {
                down_to_grain(end, self.grain)
            } else {
                up_to_grain(end, self.grain)
            };
            d = snapped - start;
        }
        d
    }

    /// Design-rule check for a run from `cur` to `next` on layer `z`,
    /// merged with the straight run that led to `cur`.
    fn planar_clear(&mut self, idx: u32, cur: Point<f64>, next: Point<f64>, z: usize, axis: Axis) -> bool {
        let half = self.seg.widths.get(z).copied().unwrap_or(0.0) / 2.0;
        let mut rect = Rect::from_corners(cur, next).expand(half);
        let mut run_start = idx;
        while let Some(parent) = self.vertices[run_start as usize].parent {
            let pv = &self.vertices[parent as usize];
            let collinear = match axis {
                Axis::Y => approx_eq(pv.point.x, cur.x),
                _ => approx_eq(pv.point.y, cur.y),
            };
            if pv.layer != z || !collinear {
                break;
            }
            run_start = parent;
        }
        if run_start != idx {
            let earliest = self.vertices[run_start as usize].point;
            rect = rect.union(&Rect::point(earliest).expand(half));
        }
        let path = self.path_shapes(run_start);
        !metal_blockage_and_notch(
            self.index,
            &mut self.rules,
            self.ctx,
            z,
            self.seg.net,
            &rect,
            &path,
        )
    }

    /// First via candidate that fits between `from_z` and `to_z` at `at`.
    fn find_via(&mut self, idx: u32, at: Point<f64>, from_z: usize, to_z: usize) -> Option<ViaUse> {
        let ctx = self.ctx;
        let lower = from_z.min(to_z);
        let min_width = via_width(&self.seg.widths, lower);
        let surround = ctx.via_surround.get(lower).copied().unwrap_or(0.0);
        let path = self.path_shapes(idx);
        let candidates = ctx.via_catalog.get(lower)?;

        'candidates: for (ci, candidate) in candidates.iter().enumerate() {
            for (layer, rect) in candidate.metal_rects(min_width, at) {
                if metal_blockage_and_notch(
                    self.index,
                    &mut self.rules,
                    ctx,
                    layer,
                    self.seg.net,
                    &rect,
                    &path,
                ) {
                    continue 'candidates;
                }
            }
            let cuts = candidate.cut_centers(at);
            for cut in &cuts {
                if via_blockage(self.index, lower, self.seg.net, *cut, surround)
                    || self.path_cut_conflict(idx, lower, *cut, surround)
                {
                    continue 'candidates;
                }
            }
            return Some(ViaUse {
                lower,
                candidate: ci,
                cuts,
            });
        }
        None
    }

    fn path_cut_conflict(&self, idx: u32, lower: usize, cut: Point<f64>, surround: f64) -> bool {
        let mut at = Some(idx);
        while let Some(i) = at {
            let v = &self.vertices[i as usize];
            if let Some(via) = v.via.as_ref().filter(|via| via.lower == lower) {
                let clash = via.cuts.iter().any(|c| {
                    (c.x - cut.x).abs() < surround && (c.y - cut.y).abs() < surround
                });
                if clash {
                    return true;
                }
            }
            at = v.parent;
        }
        false
    }

    fn move_cost(&mut self, idx: u32, next: Point<f64>, nz: usize) -> i64 {
        let w = self.ctx.options.costs;
        let g = self.grain;
        let to = self.seg.to;
        let cur = self.vertices[idx as usize].point;
        let cz = self.vertices[idx as usize].layer;
        let dx = next.x - cur.x;
        let dy = next.y - cur.y;
        let dz = nz as i64 - cz as i64;
        let mut cost = self.vertices[idx as usize].cost;

        for (d, c, t, n) in [(dx, cur.x, to.point.x, next.x), (dy, cur.y, to.point.y, next.y)] {
            if d == 0.0 {
                continue;
            }
            if approx_eq(t, c) {
                cost += w.wrong_direction / 2;
            } else if (t - c).abs() < (t - n).abs() {
                cost += w.wrong_direction;
            }
        }

        if dx != 0.0 && cz % 2 == 0 {
            cost += w.alternating_metal * (dx.abs() as i64) / (self.design.width() as i64).max(1);
        }
        if dy != 0.0 && cz % 2 == 1 {
            cost += w.alternating_metal * (dy.abs() as i64) / (self.design.height() as i64).max(1);
        }

        if dz != 0 {
            let tz = to.layer as i64;
            if tz == cz as i64 {
                cost += w.layer_change;
            } else if (tz - cz as i64).abs() < (tz - nz as i64).abs() {
                cost += w.layer_change * w.wrong_direction;
            }
        } else {
            let (axis, d) = if dx != 0.0 { (Axis::X, dx) } else { (Axis::Y, dy) };
            let sign = d.signum();
            let ahead = (self.jump_size(next, cz, axis, sign) * sign).max(0.0);
            let behind = (self.jump_size(cur, cz, axis, -sign) * -sign).max(0.0);
            if ahead > g && behind > g {
                cost += (ahead * behind) as i64 / w.unused_track.max(1);
            }
            if let Some(parent) = self.vertices[idx as usize].parent {
                let pv = &self.vertices[parent as usize];
                let previous = if pv.layer != cz {
                    Axis::Z
                } else if !approx_eq(pv.point.x, cur.x) {
                    Axis::X
                } else {
                    Axis::Y
                };
                if previous != axis {
                    cost += w.turning;
                }
            }
        }

        if !self.ctx.favored[nz] {
            cost += w.layer_change * w.unfavored * dz.abs() + w.unfavored * ((dx + dy).abs() as i64);
        }

        if !is_on_grain(next.x, g) && !approx_eq(next.x, to.point.x) {
            cost += w.off_grid;
        }
        if !is_on_grain(next.y, g) && !approx_eq(next.y, to.point.y) {
            cost += w.off_grid;
        }
        cost
    }

    /// Metal of the path ending at `idx`, for notch checks.
    fn path_shapes(&self, idx: u32) -> Vec<(usize, Rect)> {
        self.optimized_from(idx).shapes(self.ctx, &self.seg.widths)
    }

    fn optimized_from(&self, idx: u32) -> OptimizedPath {
        let mut raw = Vec::new();
        let mut at = Some(idx);
        while let Some(i) = at {
            let v = &self.vertices[i as usize];
            raw.push(PathVertex {
                point: v.point,
                layer: v.layer,
                via: v.via.as_ref().map(|via| via.candidate),
            });
            at = v.parent;
        }
        raw.reverse();
        OptimizedPath::collapse(&raw)
    }

    fn add_vertex(&mut self, point: Point<f64>, layer: usize, cost: i64, parent: u32, via: Option<ViaUse>) -> u32 {
        self.vertices.push(SearchVertex {
            point,
            layer,
            cost,
            parent: Some(parent),
            via,
        });
        self.mark_visited(point, layer);
        (self.vertices.len() - 1) as u32
    }

    fn enqueue(&mut self, idx: u32) {
        let v = &self.vertices[idx as usize];
        let to = self.seg.to;
        let remaining = (to.point.x - v.point.x).abs()
            + (to.point.y - v.point.y).abs()
            + (to.layer as f64 - v.layer as f64).abs();
        self.queue.push(idx, Reverse((v.cost, quantize(remaining), idx)));
    }

    fn mark_visited(&mut self, p: Point<f64>, layer: usize) {
        self.visited.insert((quantize(p.x), quantize(p.y), layer));
    }

    fn is_visited(&self, p: Point<f64>, layer: usize) -> bool {
        self.visited.contains(&(quantize(p.x), quantize(p.y), layer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eda_common::util::config::RoutingConfig;
    use eda_common::util::generator::demo_technology;

    #[test]
    fn jump_stops_cost_more_toward_the_origin() {
        let ctx = RoutingContext::new(demo_technology(), &RoutingConfig::default()).unwrap();
        let index = BlockageIndex::new(ctx.num_metals());
        let seg = Segment {
            from: Endpoint {
                point: Point::new(0.0, 0.0),
                layer: 0,
            },
            to: Endpoint {
                point: Point::new(40.0, 0.0),
                layer: 0,
            },
            net: BlockageNet(1),
            widths: ctx.widths_for(0.0),
        };
        let mut wf = Wavefront::new(&ctx, &index, &seg);
        let origin = Point::new(0.0, 0.0);
        wf.add_vertex(origin, 0, 0, 0, None);
        wf.mark_visited(Point::new(15.0, 0.0), 0);

        let end = Point::new(20.0, 0.0);
        assert_eq!(wf.add_intermediates(0, origin, end, 0, Axis::X, 100), None);

        let stops: Vec<(f64, i64)> = wf.vertices[1..].iter().map(|v| (v.point.x, v.cost)).collect();
        assert_eq!(stops[0], (19.0, 101));
        // 15 was already visited but still counts
        assert!(stops.iter().all(|&(x, _)| !approx_eq(x, 15.0)));
        assert!(stops.contains(&(14.0, 106)));
        for pair in stops.windows(2) {
            assert!(pair[1].0 < pair[0].0);
            assert!(pair[1].1 > pair[0].1);
        }
        // stride doubles after ten stops
        assert_eq!(stops.last().map(|s| s.0), Some(2.0));
    }
}
