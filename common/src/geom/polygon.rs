use super::point::{EPSILON, Point};
use super::rect::Rect;
use serde::{Deserialize, Serialize};

/// A simple polygon given by its vertices in order (either winding).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub points: Vec<Point<f64>>,
}

impl Polygon {
    pub fn new(points: Vec<Point<f64>>) -> Self {
        Self { points }
    }

    pub fn bbox(&self) -> Rect {
        let mut it = self.points.iter();
        let Some(first) = it.next() else {
            return Rect::default();
        };
        it.fold(Rect::point(*first), |acc, p| acc.union(&Rect::point(*p)))
    }

    pub fn area(&self) -> f64 {
        shoelace(&self.points).abs()
    }

    /// Returns the rectangle when the polygon is an axis-aligned box.
    pub fn as_rect(&self) -> Option<Rect> {
        let bbox = self.bbox();
        if self.points.len() == 4 && (self.area() - bbox.area()).abs() < EPSILON {
            Some(bbox)
        } else {
            None
        }
    }

    /// Point containment, boundary inclusive.
    pub fn contains_point(&self, p: Point<f64>) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[j];
            if on_segment(a, b, p) {
                return true;
            }
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
                if p.x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// True when the polygon and the rectangle share a region of positive area.
    pub fn intersects_rect(&self, rect: &Rect) -> bool {
        if !self.bbox().overlaps(rect) {
            return false;
        }
        let clipped = clip_to_rect(&self.points, rect);
        clipped.len() >= 3 && shoelace(&clipped).abs() > EPSILON
    }
}

fn shoelace(points: &[Point<f64>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    sum / 2.0
}

fn on_segment(a: Point<f64>, b: Point<f64>, p: Point<f64>) -> bool {
    let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    if cross.abs() > EPSILON {
        return false;
    }
    p.x >= a.x.min(b.x) - EPSILON
        && p.x <= a.x.max(b.x) + EPSILON
        && p.y >= a.y.min(b.y) - EPSILON
        && p.y <= a.y.max(b.y) + EPSILON
}

#[derive(Clone, Copy)]
enum Edge {
    Left,
    Right,
    Bottom,
    Top,
}

impl Edge {
    fn inside(self, p: Point<f64>, r: &Rect) -> bool {
        match self {
            Edge::Left => p.x >= r.min.x,
            Edge::Right => p.x <= r.max.x,
            Edge::Bottom => p.y >= r.min.y,
            Edge::Top => p.y <= r.max.y,
        }
    }

    fn cut(self, a: Point<f64>, b: Point<f64>, r: &Rect) -> Point<f64> {
        match self {
            Edge::Left => lerp_x(a, b, r.min.x),
            Edge::Right => lerp_x(a, b, r.max.x),
            Edge::Bottom => lerp_y(a, b, r.min.y),
            Edge::Top => lerp_y(a, b, r.max.y),
        }
    }
}

// Sutherland-Hodgman against the four rectangle edges.
fn clip_to_rect(points: &[Point<f64>], rect: &Rect) -> Vec<Point<f64>> {
    let mut output = points.to_vec();
    for edge in [Edge::Left, Edge::Right, Edge::Bottom, Edge::Top] {
        if output.is_empty() {
            break;
        }
        let input = std::mem::take(&mut output);
        let mut prev = input[input.len() - 1];
        for &cur in &input {
            match (edge.inside(cur, rect), edge.inside(prev, rect)) {
                (true, true) => output.push(cur),
                (true, false) => {
                    output.push(edge.cut(prev, cur, rect));
                    output.push(cur);
                }
                (false, true) => output.push(edge.cut(prev, cur, rect)),
                (false, false) => {}
            }
            prev = cur;
        }
    }
    output
}

fn lerp_x(a: Point<f64>, b: Point<f64>, x: f64) -> Point<f64> {
    let t = (x - a.x) / (b.x - a.x);
    Point::new(x, a.y + t * (b.y - a.y))
}

fn lerp_y(a: Point<f64>, b: Point<f64>, y: f64) -> Point<f64> {
    let t = (y - a.y) / (b.y - a.y);
    Point::new(a.x + t * (b.x - a.x), y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Polygon {
        Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
        ])
    }

    #[test]
    fn rect_inside_bbox_but_outside_triangle() {
        let tri = triangle();
        let far_corner = Rect::new(Point::new(8.0, 8.0), Point::new(10.0, 10.0));
        assert!(tri.bbox().overlaps(&far_corner));
        assert!(!tri.intersects_rect(&far_corner));

        let near_corner = Rect::new(Point::new(1.0, 1.0), Point::new(2.0, 2.0));
        assert!(tri.intersects_rect(&near_corner));
    }

    #[test]
    fn boundary_points_are_contained() {
        let tri = triangle();
        assert!(tri.contains_point(Point::new(5.0, 5.0)));
        assert!(tri.contains_point(Point::new(0.0, 3.0)));
        assert!(!tri.contains_point(Point::new(6.0, 6.0)));
    }

    #[test]
    fn detects_boxes() {
        let square = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 2.0),
            Point::new(0.0, 2.0),
        ]);
        assert_eq!(
            square.as_rect(),
            Some(Rect::new(Point::new(0.0, 0.0), Point::new(4.0, 2.0)))
        );
        assert!(triangle().as_rect().is_none());
    }
}
