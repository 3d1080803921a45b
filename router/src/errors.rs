use eda_common::db::error::DbError;
use eda_common::geom::point::Point;
use eda_common::geom::rect::Rect;
use thiserror::Error;

/// Why a single segment or net could not be routed. Never fatal to a run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteFailure {
    #[error("{port} is blocked on layer {layer}")]
    BlockedPort {
        port: String,
        layer: String,
        blocker: Rect,
    },
    #[error("unable to route from {from} to {to}")]
    UnreachableDestination { from: String, to: String },
    #[error("search too complex (exceeded the {limit} step limit)")]
    SearchTooComplex { limit: usize },
    #[error("{port} uses technology '{found}' but routing is in '{expected}'")]
    TechnologyMismatch {
        port: String,
        found: String,
        expected: String,
    },
    #[error("{0} has no routable metal layer")]
    UnconnectablePort(String),
    #[error("net has {0} connectable terminals (need at least 2)")]
    NoValidTerminals(usize),
}

/// Problems that stop a run before any net is attempted.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("technology '{0}' has no metal layers")]
    NoMetalLayers(String),
    #[error("no via template joins {lower} and {upper}")]
    MissingVia { lower: String, upper: String },
    #[error("routing options name unknown layer '{0}'")]
    UnknownLayer(String),
    #[error("unknown routing strategy '{0}'")]
    UnknownStrategy(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorEntry {
    pub message: String,
    pub net: Option<String>,
    /// Geometry to highlight.
    pub shapes: Vec<Rect>,
    pub lines: Vec<(Point<f64>, Point<f64>)>,
}

/// Collected routing failures, each also written to the `log` error stream.
#[derive(Debug, Clone, Default)]
pub struct ErrorLog {
    entries: Vec<ErrorEntry>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(
        &mut self,
        net: &str,
        failure: &RouteFailure,
        shapes: Vec<Rect>,
        lines: Vec<(Point<f64>, Point<f64>)>,
    ) {
        let message = failure.to_string();
        log::error!("Net '{}': {}", net, message);
        self.entries.push(ErrorEntry {
            message,
            net: Some(net.to_string()),
            shapes,
            lines,
        });
    }

    pub fn entries(&self) -> &[ErrorEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
