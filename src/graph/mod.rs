//! Renderer-independent core of the explorer: the graph model, expansion
//! state, local placement and the small view policies around them.

pub mod color;
pub mod drag;
pub mod expansion;
pub mod labels;
pub mod model;
pub mod placement;
pub mod types;

pub use color::ColorAssignment;
pub use drag::DragPropagation;
pub use expansion::{Activation, AncestorPath, ExpansionController, ExpansionOutcome, ExpansionSettings};
pub use labels::{LabelStyle, ZoomLabelController};
pub use model::GraphModel;
pub use placement::{LocalPlacementEngine, PlacementSettings, PlacementSurface};
pub use types::{GraphBatch, GraphEdge, GraphNode, Point, PropertyMap, Rect};
