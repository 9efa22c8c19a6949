//! Per-node expand/collapse state machine.
//!
//! A node starts collapsed. Activating a collapsed node derives its ancestor
//! path and yields a [`NeighborRequest`]; the caller fetches the neighbors and
//! hands the result back through [`ExpansionController::complete`]. Activating
//! an expanded node removes its successor closure immediately.
//!
//! While a request is outstanding the node is marked in flight and further
//! activations of it are rejected. Requests issued before the last
//! [`ExpansionController::reset`] are discarded on completion.

use std::collections::{HashSet, VecDeque};

use log::{debug, info, warn};
use serde::Serialize;

use super::model::GraphModel;
use crate::error::{ExplorerError, Result};
use crate::graph::types::GraphBatch;
use crate::service::{ElementDecoder, NeighborRequest, QueryDescriptor, QueryService};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AncestorStep {
	pub node_type: String,
	/// Backend identity (`original_id`) of the predecessor.
	pub id: String,
	pub name: String,
}

/// Ordered type -> identity chain leading to a node, nearest first.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AncestorPath {
	steps: Vec<AncestorStep>,
}

impl AncestorPath {
	/// Walks incoming edges backwards from `node_id`, breadth first. Each node
	/// type is recorded once, by its nearest predecessor.
	pub fn derive(model: &GraphModel, node_id: &str) -> Self {
		let mut steps: Vec<AncestorStep> = Vec::new();
		let mut visited: HashSet<&str> = HashSet::from([node_id]);
		let mut queue = VecDeque::from([node_id]);

		while let Some(current) = queue.pop_front() {
			for pred in model.predecessors(current) {
				if !visited.insert(pred.id.as_str()) {
					continue;
				}
				if !steps.iter().any(|s| s.node_type == pred.node_type) {
					steps.push(AncestorStep {
						node_type: pred.node_type.clone(),
						id: pred.original_id.clone(),
						name: pred.caption.clone(),
					});
				}
				queue.push_back(pred.id.as_str());
			}
		}
		Self { steps }
	}

	pub fn steps(&self) -> &[AncestorStep] {
		&self.steps
	}

	pub fn is_empty(&self) -> bool {
		self.steps.is_empty()
	}

	pub fn get(&self, node_type: &str) -> Option<&AncestorStep> {
		self.steps.iter().find(|s| s.node_type == node_type)
	}

	/// `(type, id)` pairs, as sent to the neighbor query.
	pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
		self.steps.iter().map(|s| (s.node_type.as_str(), s.id.as_str()))
	}
}

/// What an activation decided.
#[derive(Clone, Debug, PartialEq)]
pub enum Activation {
	/// The node was collapsed; these nodes were removed.
	Collapsed { removed: Vec<String> },
	/// The node needs its neighbors fetched.
	Expand(NeighborRequest),
}

/// Result of completing an expansion request.
#[derive(Clone, Debug, PartialEq)]
pub enum ExpansionOutcome {
	/// At least one node was added; the node is now expanded.
	Expanded { added_nodes: Vec<String>, added_edges: Vec<String> },
	/// Nothing new arrived (or the request failed); the node stays collapsed.
	Empty,
	/// The request predates a reset, or its node is gone.
	Discarded,
}

/// Request parameters shared by every expansion in a session.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpansionSettings {
	pub neighbor_limit: u32,
	pub months: u32,
	/// Name of the query whose neighbor query is used.
	pub query_key: Option<String>,
	pub decoder: ElementDecoder,
}

impl ExpansionSettings {
	pub fn for_query(neighbor_limit: u32, months: u32, query: Option<&QueryDescriptor>) -> Self {
		Self {
			neighbor_limit,
			months,
			query_key: query.map(|q| q.name.clone()),
			decoder: ElementDecoder::for_query(query),
		}
	}
}

#[derive(Debug)]
pub struct ExpansionController {
	settings: ExpansionSettings,
	in_flight: HashSet<String>,
	generation: u64,
}

impl ExpansionController {
	pub fn new(settings: ExpansionSettings) -> Self {
		Self {
			settings,
			in_flight: HashSet::new(),
			generation: 0,
		}
	}

	pub fn settings(&self) -> &ExpansionSettings {
		&self.settings
	}

	pub fn is_in_flight(&self, node_id: &str) -> bool {
		self.in_flight.contains(node_id)
	}

	/// Forgets in-flight requests and switches to a new query scope.
	pub fn reset(&mut self, query: Option<&QueryDescriptor>) {
		self.in_flight.clear();
		self.generation += 1;
		self.settings.query_key = query.map(|q| q.name.clone());
		self.settings.decoder = ElementDecoder::for_query(query);
	}

	pub fn activate(&mut self, model: &mut GraphModel, node_id: &str) -> Result<Activation> {
		let node = model
			.node(node_id)
			.ok_or_else(|| ExplorerError::UnknownNode(node_id.to_string()))?;
		if self.in_flight.contains(node_id) {
			return Err(ExplorerError::InFlight(node_id.to_string()));
		}

		if node.expanded {
			let removed = model.successor_closure(node_id);
			model.remove_nodes(&removed);
			if let Some(node) = model.node_mut(node_id) {
				node.expanded = false;
			}
			info!("Collapsed {node_id}, removed {} nodes", removed.len());
			return Ok(Activation::Collapsed { removed });
		}

		let ancestors = AncestorPath::derive(model, node_id);
		let request = NeighborRequest {
			node_id: node_id.to_string(),
			original_id: node.original_id.clone(),
			node_type: node.node_type.clone(),
			limit: self.settings.neighbor_limit,
			months: self.settings.months,
			query_key: self.settings.query_key.clone(),
			ancestors,
			generation: self.generation,
		};
		self.in_flight.insert(node_id.to_string());
		debug!("Expanding {node_id} ({}) with {} ancestors", request.node_type, request.ancestors.steps().len());
		Ok(Activation::Expand(request))
	}

	/// Merges a neighbor result. Failures degrade to an empty result.
	pub fn complete(
		&mut self,
		model: &mut GraphModel,
		request: &NeighborRequest,
		result: Result<GraphBatch>,
	) -> ExpansionOutcome {
		if request.generation != self.generation {
			debug!("Discarding stale expansion of {}", request.node_id);
			return ExpansionOutcome::Discarded;
		}
		self.in_flight.remove(&request.node_id);
		if !model.contains_node(&request.node_id) {
			return ExpansionOutcome::Discarded;
		}

		let batch = match result {
			Ok(batch) => batch,
			Err(e) => {
				warn!("Neighbor request for {} failed: {e}", request.node_id);
				return ExpansionOutcome::Empty;
			}
		};

		let merged = model.merge(batch);
		if merged.added_nodes.is_empty() {
			debug!("No new neighbors for {}", request.node_id);
			return ExpansionOutcome::Empty;
		}
		if let Some(node) = model.node_mut(&request.node_id) {
			node.expanded = true;
		}
		info!("Expanded {} with {} nodes", request.node_id, merged.added_nodes.len());
		ExpansionOutcome::Expanded {
			added_nodes: merged.added_nodes,
			added_edges: merged.added_edges,
		}
	}

	/// Activates `node_id` and, when expanding, awaits the neighbor query.
	pub async fn toggle<S>(&mut self, model: &mut GraphModel, service: &S, node_id: &str) -> Result<ExpansionOutcome>
	where
		S: QueryService + ?Sized,
	{
		match self.activate(model, node_id)? {
			Activation::Collapsed { .. } => Ok(ExpansionOutcome::Empty),
			Activation::Expand(request) => {
				let result = service
					.neighbors(&request)
					.await
					.map(|payload| self.settings.decoder.decode(payload));
				Ok(self.complete(model, &request, result))
			}
		}
	}
}
