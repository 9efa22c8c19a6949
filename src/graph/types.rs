use std::collections::HashMap;

/// A point in graph (world) coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
	pub x: f64,
	pub y: f64,
}

impl Point {
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	pub fn distance(&self, other: Point) -> f64 {
		(self.x - other.x).hypot(self.y - other.y)
	}

	/// Vector from `self` to `other`.
	pub fn offset_to(&self, other: Point) -> Point {
		Point::new(other.x - self.x, other.y - self.y)
	}

	pub fn translate(&self, by: Point) -> Point {
		Point::new(self.x + by.x, self.y + by.y)
	}

	/// Point at `radius` from `self` in the direction of `angle` (radians).
	pub fn polar(&self, angle: f64, radius: f64) -> Point {
		Point::new(self.x + angle.cos() * radius, self.y + angle.sin() * radius)
	}
}

/// Axis-aligned rectangle, used for both viewport extents and bounding boxes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
	pub x1: f64,
	pub y1: f64,
	pub x2: f64,
	pub y2: f64,
}

impl Rect {
	pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
		Self { x1, y1, x2, y2 }
	}

	pub fn center(&self) -> Point {
		Point::new((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
	}

	/// Strict containment after shrinking every side by `margin`.
	pub fn contains_within(&self, p: Point, margin: f64) -> bool {
		p.x > self.x1 + margin && p.x < self.x2 - margin && p.y > self.y1 + margin && p.y < self.y2 - margin
	}

	/// Smallest rectangle covering all `points`, `None` when empty.
	pub fn bounding(points: impl IntoIterator<Item = Point>) -> Option<Rect> {
		points.into_iter().fold(None, |acc, p| {
			Some(match acc {
				None => Rect::new(p.x, p.y, p.x, p.y),
				Some(r) => Rect::new(r.x1.min(p.x), r.y1.min(p.y), r.x2.max(p.x), r.y2.max(p.y)),
			})
		})
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct GraphNode {
	pub id: String,
	pub node_type: String,
	pub caption: String,
	pub size_metric: Option<f64>,
	/// Derived per type, see [`GraphModel::recompute_relative_sizes`](super::GraphModel::recompute_relative_sizes).
	pub relative_size: f64,
	/// `None` until the node has been placed.
	pub position: Option<Point>,
	pub expanded: bool,
	/// Backend identity, equal to `id` unless the id is synthetic.
	pub original_id: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GraphEdge {
	pub id: String,
	pub source_id: String,
	pub target_id: String,
	pub edge_type: String,
	pub weight: Option<f64>,
}

/// A node as delivered by the query service, before it is merged.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeRecord {
	pub id: String,
	pub node_type: String,
	pub caption: String,
	pub size_metric: Option<f64>,
	pub original_id: Option<String>,
}

/// An edge as delivered by the query service, before it is merged.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeRecord {
	pub id: String,
	pub source_id: String,
	pub target_id: String,
	pub edge_type: String,
	pub weight: Option<f64>,
}

/// One decoded query or neighbor result.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphBatch {
	pub nodes: Vec<NodeRecord>,
	pub edges: Vec<EdgeRecord>,
}

impl GraphBatch {
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty() && self.edges.is_empty()
	}
}

/// Full property map of a node or edge, as shown in the properties panel.
pub type PropertyMap = HashMap<String, serde_json::Value>;
