//! Flattens a layout hierarchy into placed primitive shapes.
//!
//! Every shape is reported in top-cell coordinates together with a global
//! net tag: top-cell net `n` is tag `n + 1`, nets private to an instance get
//! fresh tags above those, and geometry without a net is tag 0.

use super::error::DbError;
use super::indices::NetId;
use super::layout::{Geometry, Layout, MAX_HIERARCHY_DEPTH, Node, NodeKind, ShapeLayer};
use super::tech::Technology;
use crate::geom::rect::Rect;
use crate::geom::transform::Transform;

pub struct FlatShape<'a> {
    pub technology: &'a Technology,
    pub layer: ShapeLayer,
    pub geometry: Geometry,
    pub net: u32,
}

pub fn top_net_tag(net: NetId) -> u32 {
    net.0 + 1
}

/// Metal and cut rectangles of a pin or via node, relative to its cell.
/// Instances yield nothing; their contents are reached by recursion.
pub fn primitive_shapes(tech: &Technology, node: &Node) -> Result<Vec<(ShapeLayer, Rect)>, DbError> {
    match &node.kind {
        NodeKind::Pin { layer } => Ok(vec![(
            ShapeLayer::Metal(*layer),
            Rect::from_center(node.origin, node.size / 2.0, node.size / 2.0),
        )]),
        NodeKind::Via { template } => {
            let via = tech.via(template).ok_or_else(|| DbError::UnknownVia {
                tech: tech.name.clone(),
                via: template.clone(),
            })?;
            let mut out: Vec<(ShapeLayer, Rect)> = via
                .metal_rects(node.size, node.orientation)
                .into_iter()
                .map(|(layer, r)| (ShapeLayer::Metal(layer), r.translate(node.origin)))
                .collect();
            out.extend(
                via.cut_rects(node.orientation)
                    .into_iter()
                    .map(|r| (ShapeLayer::Cut(via.lower), r.translate(node.origin))),
            );
            Ok(out)
        }
        NodeKind::Instance { .. } => Ok(Vec::new()),
    }
}

pub fn enumerate<'a, F>(layout: &'a Layout, mut visit: F) -> Result<(), DbError>
where
    F: FnMut(FlatShape<'a>),
{
    let top = layout.top_cell()?;
    let tags: Vec<u32> = (0..top.nets.len()).map(|i| i as u32 + 1).collect();
    let mut next_tag = top.nets.len() as u32 + 1;
    walk(
        layout,
        layout.top,
        &Transform::identity(),
        &tags,
        &mut next_tag,
        0,
        &mut visit,
    )
}

fn walk<'a, F>(
    layout: &'a Layout,
    cell_id: super::indices::CellId,
    t: &Transform,
    net_tags: &[u32],
    next_tag: &mut u32,
    depth: usize,
    visit: &mut F,
) -> Result<(), DbError>
where
    F: FnMut(FlatShape<'a>),
{
    if depth > MAX_HIERARCHY_DEPTH {
        return Err(DbError::RecursiveHierarchy(MAX_HIERARCHY_DEPTH));
    }
    let cell = layout.cell(cell_id)?;
    let tech = layout.technology(&cell.technology)?;
    let tag = |net: Option<NetId>| {
        net.and_then(|n| net_tags.get(n.index()).copied())
            .unwrap_or(0)
    };

    for shape in &cell.shapes {
        visit(FlatShape {
            technology: tech,
            layer: shape.layer,
            geometry: shape.geometry.transform(t),
            net: tag(shape.net),
        });
    }
    for wire in &cell.wires {
        visit(FlatShape {
            technology: tech,
            layer: ShapeLayer::Metal(wire.layer),
            geometry: Geometry::Rect(t.apply_rect(&wire.rect())),
            net: tag(Some(wire.net)),
        });
    }
    for node in &cell.nodes {
        if let NodeKind::Instance { cell: child, connections } = &node.kind {
            let child_def = layout.cell(*child)?;
            let mut child_tags = Vec::with_capacity(child_def.nets.len());
            for net in 0..child_def.nets.len() {
                let bound = child_def
                    .exports
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| e.net.index() == net)
                    .find_map(|(e, _)| connections.iter().find(|c| c.export == e));
                child_tags.push(match bound {
                    Some(c) => tag(Some(c.net)),
                    None => {
                        *next_tag += 1;
                        *next_tag - 1
                    }
                });
            }
            let child_t = Transform::cascade(t, &node.placement());
            walk(layout, *child, &child_t, &child_tags, next_tag, depth + 1, visit)?;
        } else {
            for (layer, rect) in primitive_shapes(tech, node)? {
                visit(FlatShape {
                    technology: tech,
                    layer,
                    geometry: Geometry::Rect(t.apply_rect(&rect)),
                    net: tag(node.net),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::indices::CellId;
    use crate::db::layout::{CellDef, PortConnection, PortRef};
    use crate::db::tech::{LayerDirection, MetalLayer};
    use crate::geom::point::Point;
    use crate::geom::transform::Orientation;

    fn tech() -> Technology {
        Technology {
            name: "t".into(),
            metals: vec![MetalLayer {
                name: "M1".into(),
                direction: LayerDirection::Any,
                default_width: 2.0,
                spacing: Vec::new(),
            }],
            via_layers: Vec::new(),
            vias: Vec::new(),
        }
    }

    fn two_level() -> Layout {
        let mut leaf = CellDef::new("leaf", "t");
        let a = leaf.add_net("a");
        let private = leaf.add_net("private");
        let pa = leaf.add_pin("pa", 0, Point::new(1.0, 0.0), 2.0, Some(a));
        leaf.add_pin("pp", 0, Point::new(5.0, 0.0), 2.0, Some(private));
        leaf.add_export("A", PortRef::new(pa, 0), a);

        let mut top = CellDef::new("top", "t");
        let _unused = top.add_net("unused");
        let sig = top.add_net("sig");
        let mut layout = Layout::new(tech(), CellDef::new("placeholder", "t"));
        let leaf_id = layout.add_cell(leaf);
        top.add_instance(
            "u0",
            leaf_id,
            Point::new(10.0, 10.0),
            Orientation::R90,
            vec![PortConnection { export: 0, net: sig }],
        );
        layout.cells[0] = top;
        layout.top = CellId::new(0);
        layout
    }

    #[test]
    fn exported_nets_inherit_parent_tags() {
        let layout = two_level();
        let mut seen = Vec::new();
        enumerate(&layout, |s| seen.push((s.geometry.bbox().center(), s.net))).unwrap();
        assert_eq!(seen.len(), 2);
        // leaf (1,0) rotated a quarter turn lands at (10,11)
        assert!(seen.contains(&(Point::new(10.0, 11.0), 2)));
        // the private net gets a tag past every top-level net
        assert!(seen.contains(&(Point::new(10.0, 15.0), 3)));
    }

    #[test]
    fn self_instantiation_is_reported() {
        let mut layout = Layout::new(tech(), CellDef::new("top", "t"));
        let top = layout.top;
        layout.cells[0].add_instance("me", top, Point::new(0.0, 0.0), Orientation::R0, Vec::new());
        assert!(matches!(
            enumerate(&layout, |_| {}),
            Err(DbError::RecursiveHierarchy(_))
        ));
    }
}
