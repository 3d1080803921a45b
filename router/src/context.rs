use crate::errors::RouterError;
use eda_common::db::tech::{Technology, ViaTemplate};
use eda_common::geom::point::Point;
use eda_common::geom::rect::Rect;
use eda_common::geom::transform::Orientation;
use eda_common::util::config::RoutingConfig;

/// One way of placing a via between a pair of adjacent metals.
#[derive(Debug, Clone)]
pub struct ViaCandidate {
    pub template: ViaTemplate,
    pub orientation: Orientation,
}

impl ViaCandidate {
    /// Both metal rectangles, grown to `min_width` and placed at `at`.
    pub fn metal_rects(&self, min_width: f64, at: Point<f64>) -> [(usize, Rect); 2] {
        self.template
            .metal_rects(min_width, self.orientation)
            .map(|(layer, r)| (layer, r.translate(at)))
    }

    pub fn cut_centers(&self, at: Point<f64>) -> Vec<Point<f64>> {
        self.template
            .cut_rects(self.orientation)
            .iter()
            .map(|r| r.center() + at)
            .collect()
    }
}

/// Immutable per-run view of the technology and routing options.
pub struct RoutingContext {
    pub tech: Technology,
    pub options: RoutingConfig,
    pub favored: Vec<bool>,
    pub prevented: Vec<bool>,
    /// `via_catalog[i]` joins metal `i` and `i + 1`, smallest footprint first.
    pub via_catalog: Vec<Vec<ViaCandidate>>,
    pub worst_surround: Vec<f64>,
    pub via_surround: Vec<f64>,
}

impl RoutingContext {
    pub fn new(tech: Technology, options: &RoutingConfig) -> Result<Self, RouterError> {
        let n = tech.num_metals();
        if n == 0 {
            return Err(RouterError::NoMetalLayers(tech.name.clone()));
        }

        let flags = |names: &[String]| -> Result<Vec<bool>, RouterError> {
            let mut out = vec![false; n];
            for name in names {
                let idx = tech
                    .metal_index(name)
                    .ok_or_else(|| RouterError::UnknownLayer(name.clone()))?;
                out[idx] = true;
            }
            Ok(out)
        };
        let prevented = flags(&options.prevented_layers)?;
        let favored = if options.favored_layers.is_empty() {
            vec![true; n]
        } else {
            flags(&options.favored_layers)?
        };

        let mut via_catalog = Vec::with_capacity(n.saturating_sub(1));
        let mut via_surround = Vec::with_capacity(n.saturating_sub(1));
        for lower in 0..n.saturating_sub(1) {
            let mut candidates = Vec::new();
            for (_, template) in tech.vias_between(lower) {
                let orientations: &[Orientation] = if !template.is_centered() {
                    &Orientation::ROTATIONS
                } else if !template.is_square() {
                    &[Orientation::R0, Orientation::R90]
                } else {
                    &[Orientation::R0]
                };
                for &orientation in orientations {
                    candidates.push(ViaCandidate {
                        template: template.clone(),
                        orientation,
                    });
                }
            }
            if candidates.is_empty() {
                return Err(RouterError::MissingVia {
                    lower: tech.metals[lower].name.clone(),
                    upper: tech.metals[lower + 1].name.clone(),
                });
            }
            candidates.sort_by(|a, b| a.template.area().total_cmp(&b.template.area()));

            let largest_cut = candidates
                .iter()
                .flat_map(|c| c.template.cuts.iter())
                .map(|c| c.max_dim())
                .fold(0.0, f64::max);
            let (cut_spacing, cut_size) = tech
                .via_layers
                .get(lower)
                .map(|v| (v.cut_spacing, v.cut_size))
                .unwrap_or((0.0, 0.0));
            via_surround.push(cut_spacing + cut_size.max(largest_cut));
            via_catalog.push(candidates);
        }

        let worst_surround = (0..n).map(|m| tech.max_surround(m)).collect();

        log::debug!(
            "Routing context for '{}': {} metals, {} via candidates",
            tech.name,
            n,
            via_catalog.iter().map(Vec::len).sum::<usize>()
        );

        Ok(Self {
            tech,
            options: options.clone(),
            favored,
            prevented,
            via_catalog,
            worst_surround,
            via_surround,
        })
    }

    pub fn num_metals(&self) -> usize {
        self.tech.num_metals()
    }

    pub fn layer_name(&self, layer: usize) -> &str {
        self.tech
            .metals
            .get(layer)
            .map(|m| m.name.as_str())
            .unwrap_or("?")
    }

    pub fn default_width(&self, layer: usize) -> f64 {
        self.tech.metals.get(layer).map(|m| m.default_width).unwrap_or(0.0)
    }

    /// Per-layer wire widths for a net whose widest attached wire is `net_width`.
    pub fn widths_for(&self, net_width: f64) -> Vec<f64> {
        (0..self.num_metals())
            .map(|l| self.default_width(l).max(net_width))
            .collect()
    }

    pub fn grain(&self) -> f64 {
        self.options.grain_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eda_common::db::tech::{LayerDirection, MetalLayer, SpacingRule, ViaLayer};

    fn tech(vias: Vec<ViaTemplate>) -> Technology {
        let metal = |name: &str| MetalLayer {
            name: name.into(),
            direction: LayerDirection::Any,
            default_width: 2.0,
            spacing: vec![SpacingRule {
                min_width: 0.0,
                min_length: 0.0,
                spacing: 2.0,
            }],
        };
        Technology {
            name: "t".into(),
            metals: vec![metal("M1"), metal("M2")],
            via_layers: vec![ViaLayer {
                name: "V1".into(),
                cut_spacing: 2.0,
                cut_size: 1.0,
            }],
            vias,
        }
    }

    fn via(name: &str, metal: Rect) -> ViaTemplate {
        ViaTemplate {
            name: name.into(),
            lower: 0,
            lower_metal: metal,
            upper_metal: metal,
            cuts: vec![Rect::from_center(Point::new(0.0, 0.0), 0.5, 0.5)],
        }
    }

    #[test]
    fn catalog_orders_by_area_and_expands_rotations() {
        let origin = Point::new(0.0, 0.0);
        let big = via("big", Rect::from_center(origin, 2.0, 2.0));
        let bar = via("bar", Rect::from_center(origin, 1.5, 0.5));
        let offset = via("offset", Rect::new(origin, Point::new(1.0, 1.0)));
        let ctx = RoutingContext::new(tech(vec![big, bar, offset]), &RoutingConfig::default()).unwrap();
        let names: Vec<_> = ctx.via_catalog[0]
            .iter()
            .map(|c| (c.template.name.as_str(), c.orientation))
            .collect();
        assert_eq!(
            names,
            vec![
                ("offset", Orientation::R0),
                ("offset", Orientation::R90),
                ("offset", Orientation::R180),
                ("offset", Orientation::R270),
                ("bar", Orientation::R0),
                ("bar", Orientation::R90),
                ("big", Orientation::R0),
            ]
        );
        assert_eq!(ctx.via_surround[0], 3.0);
        assert_eq!(ctx.worst_surround, vec![2.0, 2.0]);
        assert_eq!(ctx.favored, vec![true, true]);
    }

    #[test]
    fn setup_errors() {
        assert!(matches!(
            RoutingContext::new(tech(Vec::new()), &RoutingConfig::default()),
            Err(RouterError::MissingVia { .. })
        ));
        let options = RoutingConfig {
            prevented_layers: vec!["M9".into()],
            ..RoutingConfig::default()
        };
        let v = via("v", Rect::from_center(Point::new(0.0, 0.0), 1.0, 1.0));
        assert!(matches!(
            RoutingContext::new(tech(vec![v]), &options),
            Err(RouterError::UnknownLayer(name)) if name == "M9"
        ));
    }
}
