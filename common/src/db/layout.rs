use super::error::DbError;
use super::indices::{CellId, NetId, NodeId, WireId};
use super::tech::Technology;
use crate::geom::point::Point;
use crate::geom::polygon::Polygon;
use crate::geom::rect::Rect;
use crate::geom::transform::{Orientation, Transform};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeLayer {
    Metal(usize),
    Cut(usize),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Rect(Rect),
    Polygon(Polygon),
}

impl Geometry {
    pub fn bbox(&self) -> Rect {
        match self {
            Geometry::Rect(r) => *r,
            Geometry::Polygon(p) => p.bbox(),
        }
    }

    pub fn transform(&self, t: &Transform) -> Geometry {
        match self {
            Geometry::Rect(r) => Geometry::Rect(t.apply_rect(r)),
            Geometry::Polygon(p) => {
                let moved = t.apply_polygon(p);
                match moved.as_rect() {
                    Some(r) => Geometry::Rect(r),
                    None => Geometry::Polygon(moved),
                }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Net {
    pub name: String,
}

/// Raw geometry drawn directly in a cell (obstructions, fixed metal).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub layer: ShapeLayer,
    pub geometry: Geometry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net: Option<NetId>,
}

/// Binds export `export` of an instantiated cell to a net of the parent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortConnection {
    pub export: usize,
    pub net: NetId,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Square of metal on one layer; also used for route bends.
    Pin { layer: usize },
    /// Instance of a technology via template.
    Via { template: String },
    /// Placement of another cell; its ports are the cell's exports.
    Instance {
        cell: CellId,
        #[serde(default)]
        connections: Vec<PortConnection>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub origin: Point<f64>,
    #[serde(default)]
    pub orientation: Orientation,
    /// Pin side length, or the minimum metal width of a via.
    #[serde(default)]
    pub size: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net: Option<NetId>,
}

impl Node {
    pub fn placement(&self) -> Transform {
        Transform::from_placement(self.origin, self.orientation)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortRef {
    pub node: NodeId,
    #[serde(default)]
    pub port: usize,
}

impl PortRef {
    pub fn new(node: NodeId, port: usize) -> Self {
        Self { node, port }
    }
}

/// A straight metal segment with half-width extensions past both ends.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Wire {
    pub net: NetId,
    pub layer: usize,
    pub width: f64,
    pub head: PortRef,
    pub tail: PortRef,
    pub head_point: Point<f64>,
    pub tail_point: Point<f64>,
}

impl Wire {
    pub fn rect(&self) -> Rect {
        Rect::from_corners(self.head_point, self.tail_point).expand(self.width / 2.0)
    }

    pub fn length(&self) -> f64 {
        self.head_point.distance(&self.tail_point)
    }
}

/// A connection that still has to be routed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnroutedWire {
    pub net: NetId,
    pub head: PortRef,
    pub tail: PortRef,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Export {
    pub name: String,
    pub port: PortRef,
    pub net: NetId,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellDef {
    pub name: String,
    pub technology: String,
    #[serde(default)]
    pub nets: Vec<Net>,
    #[serde(default)]
    pub shapes: Vec<Shape>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub wires: Vec<Wire>,
    #[serde(default)]
    pub unrouted: Vec<UnroutedWire>,
    #[serde(default)]
    pub exports: Vec<Export>,
}

impl CellDef {
    pub fn new(name: impl Into<String>, technology: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            technology: technology.into(),
            nets: Vec::new(),
            shapes: Vec::new(),
            nodes: Vec::new(),
            wires: Vec::new(),
            unrouted: Vec::new(),
            exports: Vec::new(),
        }
    }

    pub fn add_net(&mut self, name: impl Into<String>) -> NetId {
        self.nets.push(Net { name: name.into() });
        NetId::new(self.nets.len() - 1)
    }

    pub fn net_name(&self, net: NetId) -> &str {
        self.nets
            .get(net.index())
            .map(|n| n.name.as_str())
            .unwrap_or("?")
    }

    fn add_node(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId::new(self.nodes.len() - 1)
    }

    pub fn add_pin(
        &mut self,
        name: impl Into<String>,
        layer: usize,
        at: Point<f64>,
        size: f64,
        net: Option<NetId>,
    ) -> NodeId {
        self.add_node(Node {
            name: name.into(),
            kind: NodeKind::Pin { layer },
            origin: at,
            orientation: Orientation::R0,
            size,
            net,
        })
    }

    pub fn add_via(
        &mut self,
        name: impl Into<String>,
        template: impl Into<String>,
        at: Point<f64>,
        orientation: Orientation,
        size: f64,
        net: Option<NetId>,
    ) -> NodeId {
        self.add_node(Node {
            name: name.into(),
            kind: NodeKind::Via {
                template: template.into(),
            },
            origin: at,
            orientation,
            size,
            net,
        })
    }

    pub fn add_instance(
        &mut self,
        name: impl Into<String>,
        cell: CellId,
        origin: Point<f64>,
        orientation: Orientation,
        connections: Vec<PortConnection>,
    ) -> NodeId {
        self.add_node(Node {
            name: name.into(),
            kind: NodeKind::Instance { cell, connections },
            origin,
            orientation,
            size: 0.0,
            net: None,
        })
    }

    pub fn add_shape(&mut self, layer: ShapeLayer, geometry: Geometry, net: Option<NetId>) {
        self.shapes.push(Shape {
            layer,
            geometry,
            net,
        });
    }

    pub fn add_wire(&mut self, wire: Wire) -> WireId {
        self.wires.push(wire);
        WireId::new(self.wires.len() - 1)
    }

    pub fn add_unrouted(&mut self, net: NetId, head: PortRef, tail: PortRef) {
        self.unrouted.push(UnroutedWire { net, head, tail });
    }

    pub fn add_export(&mut self, name: impl Into<String>, port: PortRef, net: NetId) -> usize {
        self.exports.push(Export {
            name: name.into(),
            port,
            net,
        });
        self.exports.len() - 1
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, DbError> {
        self.nodes.get(id.index()).ok_or_else(|| DbError::UnknownNode {
            cell: self.name.clone(),
            node: id.index(),
        })
    }

    /// Nets with at least one unrouted placeholder, in net order.
    pub fn nets_to_route(&self) -> Vec<NetId> {
        let mut nets: Vec<NetId> = self.unrouted.iter().map(|u| u.net).collect();
        nets.sort();
        nets.dedup();
        nets
    }

    /// Indices into `unrouted` belonging to `net`.
    pub fn unrouted_on(&self, net: NetId) -> Vec<usize> {
        self.unrouted
            .iter()
            .enumerate()
            .filter(|(_, u)| u.net == net)
            .map(|(i, _)| i)
            .collect()
    }

    /// Distinct placeholder endpoints of `net`, in order of first appearance.
    pub fn net_terminals(&self, net: NetId) -> Vec<PortRef> {
        let mut ports = Vec::new();
        for u in self.unrouted.iter().filter(|u| u.net == net) {
            for p in [u.head, u.tail] {
                if !ports.contains(&p) {
                    ports.push(p);
                }
            }
        }
        ports
    }

    pub fn wires_at(&self, port: PortRef) -> impl Iterator<Item = &Wire> {
        self.wires
            .iter()
            .filter(move |w| w.head == port || w.tail == port)
    }

    pub fn describe_port(&self, port: PortRef) -> String {
        match self.nodes.get(port.node.index()) {
            Some(node) => format!("port {} of node '{}'", port.port, node.name),
            None => format!("port {} of missing node {}", port.port, port.node.index()),
        }
    }
}

/// Where a port sits and which metals can reach it, in the coordinates of
/// the cell owning the port's node.
#[derive(Clone, Debug, PartialEq)]
pub struct PortInfo {
    pub center: Point<f64>,
    pub bounds: Rect,
    pub layers: Vec<usize>,
    pub technology: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub technologies: Vec<Technology>,
    pub cells: Vec<CellDef>,
    pub top: CellId,
}

pub const MAX_HIERARCHY_DEPTH: usize = 64;

impl Layout {
    pub fn new(technology: Technology, top: CellDef) -> Self {
        Self {
            technologies: vec![technology],
            cells: vec![top],
            top: CellId::new(0),
        }
    }

    pub fn add_cell(&mut self, cell: CellDef) -> CellId {
        self.cells.push(cell);
        CellId::new(self.cells.len() - 1)
    }

    pub fn technology(&self, name: &str) -> Result<&Technology, DbError> {
        self.technologies
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| DbError::UnknownTechnology(name.to_string()))
    }

    pub fn cell(&self, id: CellId) -> Result<&CellDef, DbError> {
        self.cells
            .get(id.index())
            .ok_or(DbError::UnknownCell(id.index()))
    }

    pub fn top_cell(&self) -> Result<&CellDef, DbError> {
        self.cell(self.top)
    }

    pub fn top_cell_mut(&mut self) -> Result<&mut CellDef, DbError> {
        let top = self.top.index();
        self.cells.get_mut(top).ok_or(DbError::UnknownCell(top))
    }

    pub fn port_info(&self, cell: CellId, port: PortRef) -> Result<PortInfo, DbError> {
        self.port_info_at(cell, port, 0)
    }

    fn port_info_at(&self, cell_id: CellId, port: PortRef, depth: usize) -> Result<PortInfo, DbError> {
        if depth > MAX_HIERARCHY_DEPTH {
            return Err(DbError::RecursiveHierarchy(MAX_HIERARCHY_DEPTH));
        }
        let cell = self.cell(cell_id)?;
        let node = cell.node(port.node)?;
        match &node.kind {
            NodeKind::Pin { layer } => {
                let bounds = Rect::from_center(node.origin, node.size / 2.0, node.size / 2.0);
                Ok(PortInfo {
                    center: node.origin,
                    bounds,
                    layers: vec![*layer],
                    technology: cell.technology.clone(),
                })
            }
            NodeKind::Via { template } => {
                let tech = self.technology(&cell.technology)?;
                let via = tech.via(template).ok_or_else(|| DbError::UnknownVia {
                    tech: tech.name.clone(),
                    via: template.clone(),
                })?;
                let [(lo, a), (hi, b)] = via.metal_rects(node.size, node.orientation);
                Ok(PortInfo {
                    center: node.origin,
                    bounds: a.union(&b).translate(node.origin),
                    layers: vec![lo, hi],
                    technology: cell.technology.clone(),
                })
            }
            NodeKind::Instance { cell: child, .. } => {
                let export = self
                    .cell(*child)?
                    .exports
                    .get(port.port)
                    .ok_or_else(|| DbError::UnknownPort {
                        cell: cell.name.clone(),
                        node: node.name.clone(),
                        port: port.port,
                    })?;
                let inner = self.port_info_at(*child, export.port, depth + 1)?;
                let t = node.placement();
                Ok(PortInfo {
                    center: t.apply(inner.center),
                    bounds: t.apply_rect(&inner.bounds),
                    layers: inner.layers,
                    technology: inner.technology,
                })
            }
        }
    }

    /// Widest wire already attached to `port`, looking down through exports.
    pub fn widest_wire_at(&self, cell: CellId, port: PortRef) -> Result<f64, DbError> {
        self.widest_wire_at_depth(cell, port, 0)
    }

    fn widest_wire_at_depth(&self, cell_id: CellId, port: PortRef, depth: usize) -> Result<f64, DbError> {
        if depth > MAX_HIERARCHY_DEPTH {
            return Err(DbError::RecursiveHierarchy(MAX_HIERARCHY_DEPTH));
        }
        let cell = self.cell(cell_id)?;
        let mut width = cell.wires_at(port).map(|w| w.width).fold(0.0, f64::max);
        if let NodeKind::Instance { cell: child, .. } = &cell.node(port.node)?.kind {
            if let Some(export) = self.cell(*child)?.exports.get(port.port) {
                width = width.max(self.widest_wire_at_depth(*child, export.port, depth + 1)?);
            }
        }
        Ok(width)
    }
}
