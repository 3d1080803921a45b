use super::point::Point;
use super::polygon::Polygon;
use super::rect::Rect;
use serde::{Deserialize, Serialize};

/// Manhattan placement orientations. Mirrored variants reflect about the
/// x-axis before rotating.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    R0,
    R90,
    R180,
    R270,
    MX,
    MXR90,
    MXR180,
    MXR270,
}

impl Orientation {
    pub const ROTATIONS: [Orientation; 4] = [
        Orientation::R0,
        Orientation::R90,
        Orientation::R180,
        Orientation::R270,
    ];

    fn quarter_turns(self) -> u8 {
        match self {
            Orientation::R0 | Orientation::MX => 0,
            Orientation::R90 | Orientation::MXR90 => 1,
            Orientation::R180 | Orientation::MXR180 => 2,
            Orientation::R270 | Orientation::MXR270 => 3,
        }
    }

    fn is_mirrored(self) -> bool {
        matches!(
            self,
            Orientation::MX | Orientation::MXR90 | Orientation::MXR180 | Orientation::MXR270
        )
    }

    /// Exact rotation matrix; quarter turns avoid trig round-off.
    pub fn matrix(self) -> [[f64; 2]; 2] {
        let rot = match self.quarter_turns() {
            0 => [[1., 0.], [0., 1.]],
            1 => [[0., -1.], [1., 0.]],
            2 => [[-1., 0.], [0., -1.]],
            _ => [[0., 1.], [-1., 0.]],
        };
        if self.is_mirrored() {
            matmul(&rot, &[[1., 0.], [0., -1.]])
        } else {
            rot
        }
    }
}

/// 2x2 matrix plus translation, applied as `a * p + b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub a: [[f64; 2]; 2],
    pub b: [f64; 2],
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            a: [[1., 0.], [0., 1.]],
            b: [0., 0.],
        }
    }

    pub fn translate(x: f64, y: f64) -> Self {
        Self {
            a: [[1., 0.], [0., 1.]],
            b: [x, y],
        }
    }

    /// Transform of an instance placed at `origin` with `orientation`.
    pub fn from_placement(origin: Point<f64>, orientation: Orientation) -> Self {
        Self {
            a: orientation.matrix(),
            b: [origin.x, origin.y],
        }
    }

    /// Composes a child transform into its parent's coordinate space.
    /// Not commutative: the child is applied first.
    pub fn cascade(parent: &Transform, child: &Transform) -> Transform {
        let mut b = matvec(&parent.a, &child.b);
        b[0] += parent.b[0];
        b[1] += parent.b[1];
        Self {
            a: matmul(&parent.a, &child.a),
            b,
        }
    }

    pub fn apply(&self, p: Point<f64>) -> Point<f64> {
        let v = matvec(&self.a, &[p.x, p.y]);
        Point::new(v[0] + self.b[0], v[1] + self.b[1])
    }

    /// Manhattan transforms keep rectangles rectangular.
    pub fn apply_rect(&self, r: &Rect) -> Rect {
        Rect::from_corners(self.apply(r.min), self.apply(r.max))
    }

    pub fn apply_polygon(&self, poly: &Polygon) -> Polygon {
        Polygon::new(poly.points.iter().map(|p| self.apply(*p)).collect())
    }
}

fn matmul(a: &[[f64; 2]; 2], b: &[[f64; 2]; 2]) -> [[f64; 2]; 2] {
    [
        [
            a[0][0] * b[0][0] + a[0][1] * b[1][0],
            a[0][0] * b[0][1] + a[0][1] * b[1][1],
        ],
        [
            a[1][0] * b[0][0] + a[1][1] * b[1][0],
            a[1][0] * b[0][1] + a[1][1] * b[1][1],
        ],
    ]
}

fn matvec(a: &[[f64; 2]; 2], b: &[f64; 2]) -> [f64; 2] {
    [
        a[0][0] * b[0] + a[0][1] * b[1],
        a[1][0] * b[0] + a[1][1] * b[1],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_turn_is_exact() {
        let t = Transform::from_placement(Point::new(10.0, 0.0), Orientation::R90);
        assert_eq!(t.apply(Point::new(1.0, 0.0)), Point::new(10.0, 1.0));
    }

    #[test]
    fn cascade_applies_child_first() {
        let parent = Transform::from_placement(Point::new(1.0, 1.0), Orientation::MX);
        let child = Transform::translate(1.0, 1.0);
        let both = Transform::cascade(&parent, &child);
        // child moves (1,1) to (2,2); parent mirrors to (2,-2) and shifts
        assert_eq!(both.apply(Point::new(1.0, 1.0)), Point::new(3.0, -1.0));
    }

    #[test]
    fn rotated_rect_is_normalized() {
        let t = Transform::from_placement(Point::new(0.0, 0.0), Orientation::R180);
        let r = Rect::new(Point::new(1.0, 0.0), Point::new(3.0, 1.0));
        let out = t.apply_rect(&r);
        assert_eq!(out.min, Point::new(-3.0, -1.0));
        assert_eq!(out.max, Point::new(-1.0, 0.0));
    }
}
