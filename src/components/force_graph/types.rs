use serde_json::Value;

use crate::graph::PropertyMap;
use crate::service::QueryDescriptor;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementKind {
	Node,
	Edge,
}

/// The element whose properties the side panel shows.
#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
	pub kind: ElementKind,
	/// Id in the graph model.
	pub element_id: String,
	/// Id used for the properties lookup.
	pub backend_id: String,
	pub title: String,
}

/// A top-level search to run on the canvas. `nonce` distinguishes repeated
/// searches with identical parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphRequest {
	pub query: QueryDescriptor,
	pub text_search: String,
	pub limit: u32,
	pub nonce: u64,
}

/// Body of the hover tooltip.
#[derive(Clone, Debug, PartialEq)]
pub enum TooltipBody {
	Loading,
	Properties(Vec<(String, String)>),
	Missing,
}

/// Hover tooltip for a node or edge, anchored at a canvas position.
#[derive(Clone, Debug, PartialEq)]
pub struct Tooltip {
	pub target: Selection,
	pub x: f64,
	pub y: f64,
	pub body: TooltipBody,
}

pub fn display_value(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		Value::Null => String::new(),
		other => other.to_string(),
	}
}

/// Property map as `(key, value)` rows sorted by key.
pub fn property_rows(map: PropertyMap) -> Vec<(String, String)> {
	let mut rows: Vec<(String, String)> = map.iter().map(|(k, v)| (k.clone(), display_value(v))).collect();
	rows.sort();
	rows
}
