//! Wire format of the query service and its decoding into [`GraphBatch`]es.

use std::collections::HashMap;

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::graph::types::{EdgeRecord, GraphBatch, NodeRecord};

/// One entry of the query catalog.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryDescriptor {
	pub name: String,
	#[serde(default)]
	pub display_name: Option<String>,
	#[serde(default)]
	pub description: String,
	/// Node property shown as caption, falling back to `name`.
	#[serde(default)]
	pub caption_property: Option<String>,
	#[serde(default)]
	pub mapping: QueryMapping,
	/// Predefined type -> color palette.
	#[serde(default)]
	pub colors: Option<HashMap<String, String>>,
	/// Column keys shown in the result table; all keys when absent.
	#[serde(default)]
	pub table_display: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryMapping {
	/// Node property driving relative node size.
	#[serde(default)]
	pub node_size: Option<String>,
}

impl QueryDescriptor {
	/// `display_name`, or the name with underscores split and words capitalized.
	pub fn title(&self) -> String {
		match &self.display_name {
			Some(name) if !name.is_empty() => name.clone(),
			_ => self
				.name
				.split('_')
				.filter(|w| !w.is_empty())
				.map(|w| {
					let mut chars = w.chars();
					match chars.next() {
						Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
						None => String::new(),
					}
				})
				.collect::<Vec<String>>()
				.join(" "),
		}
	}

	pub fn sizing_enabled(&self) -> bool {
		self.mapping.node_size.is_some()
	}
}

/// A single `{ "data": { ... } }` element.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementPayload {
	pub data: Map<String, Value>,
}

/// Flat node/edge element list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphPayload(pub Vec<ElementPayload>);

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TablePayload {
	#[serde(default)]
	pub records: Vec<Map<String, Value>>,
	#[serde(default)]
	pub keys: Vec<String>,
}

/// Envelope returned by both search and neighbor queries.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
	#[serde(default)]
	pub graph: GraphPayload,
	#[serde(default)]
	pub table: TablePayload,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionInfo {
	#[serde(default)]
	pub user_name: String,
	#[serde(default)]
	pub database_name: String,
}

/// Query-specific rules for turning elements into records.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ElementDecoder {
	caption_property: Option<String>,
	size_property: Option<String>,
}

impl ElementDecoder {
	pub fn for_query(query: Option<&QueryDescriptor>) -> Self {
		Self {
			caption_property: query.and_then(|q| q.caption_property.clone()),
			size_property: query.and_then(|q| q.mapping.node_size.clone()),
		}
	}

	/// Elements with `source` and `target` are edges, everything else is a
	/// node. Elements without an id are skipped.
	pub fn decode(&self, payload: GraphPayload) -> GraphBatch {
		let mut batch = GraphBatch::default();
		for element in payload.0 {
			let data = element.data;
			let Some(id) = string_field(&data, "id") else {
				warn!("Skipping element without an id");
				continue;
			};
			let element_type = string_field(&data, "label");

			match (string_field(&data, "source"), string_field(&data, "target")) {
				(Some(source_id), Some(target_id)) => batch.edges.push(EdgeRecord {
					id,
					source_id,
					target_id,
					edge_type: element_type.unwrap_or_default(),
					weight: data.get("weight").and_then(Value::as_f64),
				}),
				_ => {
					let node_type = element_type.unwrap_or_else(|| "Node".to_string());
					let caption = self
						.caption_property
						.as_deref()
						.and_then(|p| string_field(&data, p))
						.or_else(|| string_field(&data, "name"))
						.unwrap_or_else(|| node_type.clone());
					let size_metric = self
						.size_property
						.as_deref()
						.and_then(|p| data.get(p))
						.or_else(|| data.get("size"))
						.and_then(Value::as_f64);
					let original_id = string_field(&data, "original_id").or_else(|| string_field(&data, "originalId"));
					batch.nodes.push(NodeRecord {
						id,
						node_type,
						caption,
						size_metric,
						original_id,
					});
				}
			}
		}
		batch
	}
}

// Strings pass through, numbers and booleans are stringified.
fn string_field(data: &Map<String, Value>, key: &str) -> Option<String> {
	match data.get(key)? {
		Value::String(s) => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		Value::Bool(b) => Some(b.to_string()),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn payload(value: Value) -> GraphPayload {
		serde_json::from_value(value).expect("valid payload")
	}

	#[test]
	fn decodes_nodes_and_edges() {
		let graph = payload(json!([
			{"data": {"id": "4:a:1", "label": "Person", "name": "Ada", "size": 3}},
			{"data": {"id": "4:a:2", "label": "Company", "name": "Acme", "original_id": "4:a:9"}},
			{"data": {"id": "5:a:1", "source": "4:a:1", "target": "4:a:2", "label": "WORKS_AT", "weight": 2.5}}
		]));
		let batch = ElementDecoder::default().decode(graph);

		assert_eq!(batch.nodes.len(), 2);
		assert_eq!(batch.nodes[0].caption, "Ada");
		assert_eq!(batch.nodes[0].size_metric, Some(3.0));
		assert_eq!(batch.nodes[1].original_id.as_deref(), Some("4:a:9"));
		assert_eq!(batch.edges.len(), 1);
		assert_eq!(batch.edges[0].edge_type, "WORKS_AT");
		assert_eq!(batch.edges[0].weight, Some(2.5));
	}

	#[test]
	fn caption_and_size_follow_the_query() {
		let query: QueryDescriptor = serde_json::from_value(json!({
			"name": "top_accounts",
			"caption_property": "handle",
			"mapping": {"node_size": "followers"}
		}))
		.expect("valid descriptor");
		let graph = payload(json!([
			{"data": {"id": 1, "label": "Account", "name": "fallback", "handle": "@ada", "followers": 120}},
			{"data": {"id": 2, "label": "Account", "name": "only-name"}},
			{"data": {"id": 3}}
		]));
		let batch = ElementDecoder::for_query(Some(&query)).decode(graph);

		assert_eq!(batch.nodes[0].id, "1");
		assert_eq!(batch.nodes[0].caption, "@ada");
		assert_eq!(batch.nodes[0].size_metric, Some(120.0));
		assert_eq!(batch.nodes[1].caption, "only-name");
		assert_eq!(batch.nodes[2].node_type, "Node");
		assert_eq!(batch.nodes[2].caption, "Node");
	}

	#[test]
	fn skips_elements_without_id() {
		let graph = payload(json!([{"data": {"label": "Person"}}, {"data": {"id": "x"}}]));
		let batch = ElementDecoder::default().decode(graph);
		assert_eq!(batch.nodes.len(), 1);
	}

	#[test]
	fn catalog_defaults() {
		let query: QueryDescriptor = serde_json::from_value(json!({"name": "default_graph"})).expect("valid");
		assert_eq!(query.title(), "Default Graph");
		assert!(!query.sizing_enabled());

		let named: QueryDescriptor =
			serde_json::from_value(json!({"name": "x", "display_name": "Fraud Rings"})).expect("valid");
		assert_eq!(named.title(), "Fraud Rings");
	}

	#[test]
	fn search_envelope_tolerates_missing_table() {
		let result: SearchResult = serde_json::from_value(json!({"graph": []})).expect("valid");
		assert!(result.graph.0.is_empty());
		assert!(result.table.records.is_empty());
	}
}
