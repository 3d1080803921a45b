use crate::context::RoutingContext;
use eda_common::geom::point::{Point, approx_eq};
use eda_common::geom::rect::Rect;

/// A path corner. `via` is the catalog entry used to arrive here from the
/// previous vertex when that move changed layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathVertex {
    pub point: Point<f64>,
    pub layer: usize,
    pub via: Option<usize>,
}

/// A route reduced to its corners and layer changes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OptimizedPath {
    vertices: Vec<PathVertex>,
}

impl OptimizedPath {
    /// Drops every vertex that continues a straight same-layer run. Runs
    /// are judged by the direction of their first step.
    pub fn collapse(raw: &[PathVertex]) -> Self {
        let Some(first) = raw.first() else {
            return Self::default();
        };
        let mut vertices = vec![*first];
        let mut i = 0;
        while i + 1 < raw.len() {
            let a = raw[i];
            let b = raw[i + 1];
            if a.layer != b.layer {
                vertices.push(b);
                i += 1;
                continue;
            }
            let along_x = !approx_eq(a.point.x, b.point.x);
            let mut j = i + 1;
            while j + 1 < raw.len() {
                let next = raw[j + 1];
                let collinear = if along_x {
                    approx_eq(next.point.y, a.point.y)
                } else {
                    approx_eq(next.point.x, a.point.x)
                };
                if next.layer != a.layer || !collinear {
                    break;
                }
                j += 1;
            }
            vertices.push(raw[j]);
            i = j;
        }
        Self { vertices }
    }

    pub fn vertices(&self) -> &[PathVertex] {
        &self.vertices
    }

    pub fn first(&self) -> Option<&PathVertex> {
        self.vertices.first()
    }

    pub fn last(&self) -> Option<&PathVertex> {
        self.vertices.last()
    }

    /// Same path walked the other way. Arrival vias move to the vertex on
    /// the other side of each layer change.
    pub fn reversed(&self) -> Self {
        let n = self.vertices.len();
        let vertices = (0..n)
            .rev()
            .map(|i| PathVertex {
                via: if i + 1 < n {
                    self.vertices[i + 1].via
                } else {
                    None
                },
                ..self.vertices[i]
            })
            .collect();
        Self { vertices }
    }

    /// Manhattan length with layer changes weighted as ten units.
    pub fn length(&self) -> f64 {
        self.vertices
            .windows(2)
            .map(|w| {
                (w[1].point.x - w[0].point.x).abs()
                    + (w[1].point.y - w[0].point.y).abs()
                    + 10.0 * (w[1].layer as f64 - w[0].layer as f64).abs()
            })
            .sum()
    }

    /// Metal occupied by the path: every run extended by half its width at
    /// both ends, and both metals of every via.
    pub fn shapes(&self, ctx: &RoutingContext, widths: &[f64]) -> Vec<(usize, Rect)> {
        let mut out = Vec::new();
        for w in self.vertices.windows(2) {
            let (a, b) = (w[0], w[1]);
            if a.layer == b.layer {
                let width = widths.get(a.layer).copied().unwrap_or(0.0);
                out.push((a.layer, Rect::from_corners(a.point, b.point).expand(width / 2.0)));
                continue;
            }
            let lower = a.layer.min(b.layer);
            let candidate = b.via.and_then(|v| ctx.via_catalog.get(lower)?.get(v));
            if let Some(candidate) = candidate {
                out.extend(candidate.metal_rects(via_width(widths, lower), a.point));
            }
        }
        out
    }
}

/// Minimum metal width of a via between `lower` and `lower + 1`.
pub fn via_width(widths: &[f64], lower: usize) -> f64 {
    let w = |l: usize| widths.get(l).copied().unwrap_or(0.0);
    w(lower).max(w(lower + 1))
}
