//! In-memory [`QueryService`] for tests.

use std::cell::RefCell;
use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::{
	ConnectionInfo, ElementPayload, GraphPayload, NeighborRequest, QueryDescriptor, QueryService, SearchRequest,
	SearchResult,
};
use crate::error::{ExplorerError, Result};
use crate::graph::types::{GraphBatch, PropertyMap};

#[derive(Default)]
pub struct MockService {
	neighbors: HashMap<String, GraphPayload>,
	failing: bool,
	requests: RefCell<Vec<NeighborRequest>>,
}

impl MockService {
	pub fn with_neighbors(mut self, original_id: &str, batch: GraphBatch) -> Self {
		self.neighbors.insert(original_id.to_string(), to_payload(&batch));
		self
	}

	pub fn failing(mut self) -> Self {
		self.failing = true;
		self
	}

	pub fn neighbor_requests(&self) -> Vec<NeighborRequest> {
		self.requests.borrow().clone()
	}

	fn fail<T>(&self) -> Result<T> {
		Err(ExplorerError::Status {
			status: 500,
			url: "mock://".into(),
		})
	}
}

fn element(value: Value) -> ElementPayload {
	let data: Map<String, Value> = value.as_object().cloned().unwrap_or_default();
	ElementPayload { data }
}

/// Encodes a batch the way the HTTP API would deliver it.
pub fn to_payload(batch: &GraphBatch) -> GraphPayload {
	let nodes = batch.nodes.iter().map(|n| {
		let mut value = json!({"id": n.id, "label": n.node_type, "name": n.caption});
		if let Some(size) = n.size_metric {
			value["size"] = json!(size);
		}
		if let Some(original) = &n.original_id {
			value["original_id"] = json!(original);
		}
		element(value)
	});
	let edges = batch.edges.iter().map(|e| {
		let mut value = json!({"id": e.id, "source": e.source_id, "target": e.target_id, "label": e.edge_type});
		if let Some(weight) = e.weight {
			value["weight"] = json!(weight);
		}
		element(value)
	});
	GraphPayload(nodes.chain(edges).collect())
}

#[async_trait(?Send)]
impl QueryService for MockService {
	async fn queries(&self) -> Result<Vec<QueryDescriptor>> {
		Ok(vec![QueryDescriptor {
			name: "default_graph".into(),
			..Default::default()
		}])
	}

	async fn search(&self, _request: &SearchRequest) -> Result<SearchResult> {
		if self.failing {
			return self.fail();
		}
		Ok(SearchResult::default())
	}

	async fn neighbors(&self, request: &NeighborRequest) -> Result<GraphPayload> {
		self.requests.borrow_mut().push(request.clone());
		if self.failing {
			return self.fail();
		}
		Ok(self.neighbors.get(&request.original_id).cloned().unwrap_or_default())
	}

	async fn node_properties(&self, node_id: &str) -> Result<PropertyMap> {
		if self.failing {
			return self.fail();
		}
		Ok(PropertyMap::from([("id".to_string(), json!(node_id))]))
	}

	async fn edge_properties(&self, edge_id: &str) -> Result<PropertyMap> {
		self.node_properties(edge_id).await
	}

	async fn connection_info(&self) -> Result<ConnectionInfo> {
		Ok(ConnectionInfo::default())
	}
}
