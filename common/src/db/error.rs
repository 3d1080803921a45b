use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("unknown technology '{0}'")]
    UnknownTechnology(String),
    #[error("technology '{tech}' has no via template '{via}'")]
    UnknownVia { tech: String, via: String },
    #[error("technology '{tech}' has no metal layer {layer}")]
    UnknownLayer { tech: String, layer: usize },
    #[error("cell '{cell}' has no node {node}")]
    UnknownNode { cell: String, node: usize },
    #[error("node '{node}' in cell '{cell}' has no port {port}")]
    UnknownPort {
        cell: String,
        node: String,
        port: usize,
    },
    #[error("cell index {0} out of range")]
    UnknownCell(usize),
    #[error("hierarchy deeper than {0} levels (recursive instance?)")]
    RecursiveHierarchy(usize),
}
