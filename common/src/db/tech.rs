use crate::geom::point::Point;
use crate::geom::rect::Rect;
use crate::geom::transform::{Orientation, Transform};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerDirection {
    Horizontal,
    Vertical,
    Any,
}

/// Applies to pieces at least `min_width` wide and `min_length` long.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpacingRule {
    #[serde(default)]
    pub min_width: f64,
    #[serde(default)]
    pub min_length: f64,
    pub spacing: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetalLayer {
    pub name: String,
    pub direction: LayerDirection,
    pub default_width: f64,
    #[serde(default)]
    pub spacing: Vec<SpacingRule>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViaLayer {
    pub name: String,
    pub cut_spacing: f64,
    pub cut_size: f64,
}

/// A via between metal `lower` and `lower + 1`. Geometry is relative to the
/// via origin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViaTemplate {
    pub name: String,
    pub lower: usize,
    pub lower_metal: Rect,
    pub upper_metal: Rect,
    pub cuts: Vec<Rect>,
}

impl ViaTemplate {
    pub fn footprint(&self) -> Rect {
        self.lower_metal.union(&self.upper_metal)
    }

    pub fn area(&self) -> f64 {
        self.footprint().area()
    }

    pub fn is_square(&self) -> bool {
        [self.lower_metal, self.upper_metal]
            .iter()
            .all(|r| (r.width() - r.height()).abs() < 1e-9)
    }

    pub fn is_centered(&self) -> bool {
        [self.lower_metal, self.upper_metal]
            .iter()
            .all(|r| r.center().approx_eq(&Point::new(0.0, 0.0)))
    }

    /// Metal rectangles grown to `min_width`, oriented, relative to the origin.
    pub fn metal_rects(&self, min_width: f64, orientation: Orientation) -> [(usize, Rect); 2] {
        let t = Transform::from_placement(Point::new(0.0, 0.0), orientation);
        [
            (self.lower, t.apply_rect(&self.lower_metal.grow_to(min_width))),
            (self.lower + 1, t.apply_rect(&self.upper_metal.grow_to(min_width))),
        ]
    }

    pub fn cut_rects(&self, orientation: Orientation) -> Vec<Rect> {
        let t = Transform::from_placement(Point::new(0.0, 0.0), orientation);
        self.cuts.iter().map(|c| t.apply_rect(c)).collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Technology {
    pub name: String,
    pub metals: Vec<MetalLayer>,
    /// `via_layers[i]` holds the cuts between metal `i` and `i + 1`.
    pub via_layers: Vec<ViaLayer>,
    pub vias: Vec<ViaTemplate>,
}

impl Technology {
    pub fn num_metals(&self) -> usize {
        self.metals.len()
    }

    pub fn metal_index(&self, name: &str) -> Option<usize> {
        self.metals.iter().position(|m| m.name == name)
    }

    pub fn via(&self, name: &str) -> Option<&ViaTemplate> {
        self.vias.iter().find(|v| v.name == name)
    }

    pub fn vias_between(&self, lower: usize) -> impl Iterator<Item = (usize, &ViaTemplate)> {
        self.vias
            .iter()
            .enumerate()
            .filter(move |(_, v)| v.lower == lower)
    }

    /// Minimum spacing between a piece of `metal` of the given size and its
    /// neighbours: the largest applicable rule, zero when none applies.
    pub fn spacing(&self, metal: usize, width: f64, length: f64) -> f64 {
        let Some(layer) = self.metals.get(metal) else {
            return 0.0;
        };
        layer
            .spacing
            .iter()
            .filter(|r| width >= r.min_width && length >= r.min_length)
            .map(|r| r.spacing)
            .fold(0.0, f64::max)
    }

    /// Largest spacing any rule on `metal` can demand.
    pub fn max_surround(&self, metal: usize) -> f64 {
        self.metals
            .get(metal)
            .map(|l| l.spacing.iter().map(|r| r.spacing).fold(0.0, f64::max))
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tech() -> Technology {
        Technology {
            name: "t".into(),
            metals: vec![MetalLayer {
                name: "M1".into(),
                direction: LayerDirection::Horizontal,
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
                        spacing: 4.0,
                    },
                ],
            }],
            via_layers: vec![],
            vias: vec![],
        }
    }

    #[test]
    fn wide_long_metal_needs_more_room() {
        let t = tech();
        assert_eq!(t.spacing(0, 2.0, 50.0), 2.0);
        assert_eq!(t.spacing(0, 6.0, 10.0), 2.0);
        assert_eq!(t.spacing(0, 6.0, 20.0), 4.0);
        assert_eq!(t.max_surround(0), 4.0);
        assert_eq!(t.spacing(3, 2.0, 2.0), 0.0);
    }

    #[test]
    fn off_center_via_rotates() {
        let v = ViaTemplate {
            name: "v".into(),
            lower: 0,
            lower_metal: Rect::new(Point::new(-1.0, -1.0), Point::new(3.0, 1.0)),
            upper_metal: Rect::new(Point::new(-1.0, -1.0), Point::new(1.0, 1.0)),
            cuts: vec![Rect::new(Point::new(-0.5, -0.5), Point::new(0.5, 0.5))],
        };
        assert!(!v.is_centered());
        assert!(!v.is_square());
        let [(l0, lower), (l1, _)] = v.metal_rects(0.0, Orientation::R90);
        assert_eq!((l0, l1), (0, 1));
        assert_eq!(lower.min, Point::new(-1.0, -1.0));
        assert_eq!(lower.max, Point::new(1.0, 3.0));
    }
}
