use std::collections::{HashMap, HashSet, VecDeque};

use log::warn;

use super::types::{GraphBatch, GraphEdge, GraphNode, Point, Rect};

/// Relative size given to every node when sizing is off or a type's maximum is zero.
pub const DEFAULT_RELATIVE_SIZE: f64 = 0.5;

/// Node ids added and edge ids added by one [`GraphModel::merge`], in payload order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MergeOutcome {
	pub added_nodes: Vec<String>,
	pub added_edges: Vec<String>,
}

/// The in-memory node/edge collection. Nodes keep insertion order.
#[derive(Clone, Debug, Default)]
pub struct GraphModel {
	nodes: Vec<GraphNode>,
	node_index: HashMap<String, usize>,
	edges: Vec<GraphEdge>,
	edge_ids: HashSet<String>,
	revision: u64,
}

impl GraphModel {
	pub fn new() -> Self {
		Self::default()
	}

	/// Bumped on every structural change (nodes or edges added/removed).
	pub fn revision(&self) -> u64 {
		self.revision
	}

	pub fn nodes(&self) -> &[GraphNode] {
		&self.nodes
	}

	pub fn edges(&self) -> &[GraphEdge] {
		&self.edges
	}

	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn contains_node(&self, id: &str) -> bool {
		self.node_index.contains_key(id)
	}

	pub fn node(&self, id: &str) -> Option<&GraphNode> {
		self.node_index.get(id).map(|&i| &self.nodes[i])
	}

	pub fn node_mut(&mut self, id: &str) -> Option<&mut GraphNode> {
		self.node_index.get(id).map(|&i| &mut self.nodes[i])
	}

	pub fn edge(&self, id: &str) -> Option<&GraphEdge> {
		self.edges.iter().find(|e| e.id == id)
	}

	pub fn position_of(&self, id: &str) -> Option<Point> {
		self.node(id).and_then(|n| n.position)
	}

	pub fn set_position(&mut self, id: &str, position: Point) {
		if let Some(node) = self.node_mut(id) {
			node.position = Some(position);
		}
	}

	/// Drops every node and edge (loading a new top-level query).
	pub fn clear(&mut self) {
		self.nodes.clear();
		self.node_index.clear();
		self.edges.clear();
		self.edge_ids.clear();
		self.revision += 1;
	}

	/// Adds the batch's unseen nodes, then every unseen edge whose endpoints
	/// are present. Existing elements are left untouched.
	pub fn merge(&mut self, batch: GraphBatch) -> MergeOutcome {
		let mut outcome = MergeOutcome::default();

		for record in batch.nodes {
			if self.node_index.contains_key(&record.id) {
				continue;
			}
			let original_id = record.original_id.unwrap_or_else(|| record.id.clone());
			self.node_index.insert(record.id.clone(), self.nodes.len());
			outcome.added_nodes.push(record.id.clone());
			self.nodes.push(GraphNode {
				id: record.id,
				node_type: record.node_type,
				caption: record.caption,
				size_metric: record.size_metric,
				relative_size: DEFAULT_RELATIVE_SIZE,
				position: None,
				expanded: false,
				original_id,
			});
		}

		for record in batch.edges {
			if self.edge_ids.contains(&record.id) {
				continue;
			}
			if !self.contains_node(&record.source_id) || !self.contains_node(&record.target_id) {
				warn!("Dropping edge {} with a missing endpoint", record.id);
				continue;
			}
			self.edge_ids.insert(record.id.clone());
			outcome.added_edges.push(record.id.clone());
			self.edges.push(GraphEdge {
				id: record.id,
				source_id: record.source_id,
				target_id: record.target_id,
				edge_type: record.edge_type,
				weight: record.weight,
			});
		}

		if !outcome.added_nodes.is_empty() || !outcome.added_edges.is_empty() {
			self.revision += 1;
		}
		outcome
	}

	/// Sources of the edges pointing at `id`, in edge order, without duplicates.
	pub fn predecessors(&self, id: &str) -> Vec<&GraphNode> {
		let mut seen = HashSet::new();
		self.edges
			.iter()
			.filter(|e| e.target_id == id && seen.insert(e.source_id.as_str()))
			.filter_map(|e| self.node(&e.source_id))
			.collect()
	}

	/// Direct neighbors in either direction, excluding `id` itself.
	pub fn neighbors(&self, id: &str) -> Vec<&str> {
		let mut seen = HashSet::new();
		self.edges
			.iter()
			.filter_map(|e| {
				if e.source_id == id {
					Some(e.target_id.as_str())
				} else if e.target_id == id {
					Some(e.source_id.as_str())
				} else {
					None
				}
			})
			.filter(|n| *n != id && seen.insert(*n))
			.collect()
	}

	/// Every node reachable from `id` along outgoing edges, excluding `id`.
	pub fn successor_closure(&self, id: &str) -> Vec<String> {
		let mut outgoing: HashMap<&str, Vec<&str>> = HashMap::new();
		for e in &self.edges {
			outgoing.entry(e.source_id.as_str()).or_default().push(e.target_id.as_str());
		}

		let mut visited: HashSet<&str> = HashSet::from([id]);
		let mut queue = VecDeque::from([id]);
		let mut closure = Vec::new();
		while let Some(current) = queue.pop_front() {
			for &next in outgoing.get(current).into_iter().flatten() {
				if visited.insert(next) {
					closure.push(next.to_string());
					queue.push_back(next);
				}
			}
		}
		closure
	}

	/// Removes the given nodes and every edge touching them.
	pub fn remove_nodes(&mut self, ids: &[String]) {
		if ids.is_empty() {
			return;
		}
		let doomed: HashSet<&str> = ids.iter().map(String::as_str).collect();
		self.nodes.retain(|n| !doomed.contains(n.id.as_str()));
		self.edges
			.retain(|e| !doomed.contains(e.source_id.as_str()) && !doomed.contains(e.target_id.as_str()));
		self.node_index = self.nodes.iter().enumerate().map(|(i, n)| (n.id.clone(), i)).collect();
		self.edge_ids = self.edges.iter().map(|e| e.id.clone()).collect();
		self.revision += 1;
	}

	/// `relative_size = size_metric / max(size_metric of the same type)`,
	/// or [`DEFAULT_RELATIVE_SIZE`] when sizing is off or the maximum is 0.
	pub fn recompute_relative_sizes(&mut self, sizing_enabled: bool) {
		if !sizing_enabled {
			for node in &mut self.nodes {
				node.relative_size = DEFAULT_RELATIVE_SIZE;
			}
			return;
		}

		let mut max_by_type: HashMap<String, f64> = HashMap::new();
		for node in &self.nodes {
			let size = metric(node);
			let max = max_by_type.entry(node.node_type.clone()).or_insert(0.0);
			if size > *max {
				*max = size;
			}
		}

		for node in &mut self.nodes {
			let max = max_by_type.get(&node.node_type).copied().unwrap_or(0.0);
			node.relative_size = if max > 0.0 {
				(metric(node) / max).clamp(0.0, 1.0)
			} else {
				DEFAULT_RELATIVE_SIZE
			};
		}
	}

	/// Bounding box of every positioned node.
	pub fn bounding_box(&self) -> Option<Rect> {
		Rect::bounding(self.nodes.iter().filter_map(|n| n.position))
	}
}

// Negative or non-finite metrics count as zero.
fn metric(node: &GraphNode) -> f64 {
	match node.size_metric {
		Some(v) if v.is_finite() && v > 0.0 => v,
		_ => 0.0,
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use crate::graph::types::{EdgeRecord, NodeRecord};

	pub(crate) fn node(id: &str, node_type: &str) -> NodeRecord {
		NodeRecord {
			id: id.into(),
			node_type: node_type.into(),
			caption: format!("{id} caption"),
			size_metric: None,
			original_id: None,
		}
	}

	pub(crate) fn edge(source: &str, target: &str) -> EdgeRecord {
		EdgeRecord {
			id: format!("{source}->{target}"),
			source_id: source.into(),
			target_id: target.into(),
			edge_type: "LINKS".into(),
			weight: None,
		}
	}

	fn chain_model() -> GraphModel {
		// a -> b -> c -> d, b -> e, x -> a
		let mut model = GraphModel::new();
		model.merge(GraphBatch {
			nodes: ["a", "b", "c", "d", "e", "x"].iter().map(|id| node(id, "Thing")).collect(),
			edges: vec![edge("a", "b"), edge("b", "c"), edge("c", "d"), edge("b", "e"), edge("x", "a")],
		});
		model
	}

	#[test]
	fn merge_skips_duplicates_and_dangling_edges() {
		let mut model = GraphModel::new();
		let first = model.merge(GraphBatch {
			nodes: vec![node("a", "A"), node("b", "B")],
			edges: vec![edge("a", "b")],
		});
		assert_eq!(first.added_nodes, vec!["a", "b"]);
		assert_eq!(first.added_edges, vec!["a->b"]);

		let rev = model.revision();
		let second = model.merge(GraphBatch {
			nodes: vec![node("a", "A")],
			edges: vec![edge("a", "b"), edge("b", "ghost")],
		});
		assert_eq!(second, MergeOutcome::default());
		assert_eq!(model.revision(), rev);
		assert_eq!(model.node_count(), 2);
		assert_eq!(model.edges().len(), 1);
	}

	#[test]
	fn original_id_defaults_to_id() {
		let mut model = GraphModel::new();
		let mut synthetic = node("path/1", "A");
		synthetic.original_id = Some("1".into());
		model.merge(GraphBatch {
			nodes: vec![synthetic, node("2", "A")],
			edges: vec![],
		});
		assert_eq!(model.node("path/1").map(|n| n.original_id.as_str()), Some("1"));
		assert_eq!(model.node("2").map(|n| n.original_id.as_str()), Some("2"));
	}

	#[test]
	fn successor_closure_follows_outgoing_edges_only() {
		let model = chain_model();
		let mut closure = model.successor_closure("b");
		closure.sort();
		assert_eq!(closure, vec!["c", "d", "e"]);
		assert!(model.successor_closure("d").is_empty());
	}

	#[test]
	fn successor_closure_excludes_root_on_cycles() {
		let mut model = chain_model();
		model.merge(GraphBatch {
			nodes: vec![],
			edges: vec![edge("d", "b")],
		});
		let closure = model.successor_closure("b");
		assert!(!closure.contains(&"b".to_string()));
		assert_eq!(closure.len(), 3);
	}

	#[test]
	fn remove_nodes_drops_incident_edges() {
		let mut model = chain_model();
		model.remove_nodes(&["c".to_string()]);
		assert!(!model.contains_node("c"));
		assert!(model.edges().iter().all(|e| e.source_id != "c" && e.target_id != "c"));
		assert_eq!(model.node("d").map(|n| n.id.as_str()), Some("d"));
		assert_eq!(model.node("x").map(|n| n.id.as_str()), Some("x"));
	}

	#[test]
	fn neighbors_and_predecessors() {
		let model = chain_model();
		let mut around_b = model.neighbors("b");
		around_b.sort();
		assert_eq!(around_b, vec!["a", "c", "e"]);
		let preds: Vec<_> = model.predecessors("a").iter().map(|n| n.id.clone()).collect();
		assert_eq!(preds, vec!["x"]);
	}

	#[test]
	fn relative_sizes_are_per_type() {
		let mut model = GraphModel::new();
		let sized = |id: &str, t: &str, s: Option<f64>| NodeRecord {
			size_metric: s,
			..node(id, t)
		};
		model.merge(GraphBatch {
			nodes: vec![
				sized("a1", "A", Some(10.0)),
				sized("a2", "A", Some(5.0)),
				sized("a3", "A", None),
				sized("b1", "B", Some(0.0)),
				sized("c1", "C", Some(-3.0)),
			],
			edges: vec![],
		});

		model.recompute_relative_sizes(true);
		let size = |id: &str| model.node(id).map(|n| n.relative_size);
		assert_eq!(size("a1"), Some(1.0));
		assert_eq!(size("a2"), Some(0.5));
		assert_eq!(size("a3"), Some(0.0));
		assert_eq!(size("b1"), Some(DEFAULT_RELATIVE_SIZE));
		assert_eq!(size("c1"), Some(DEFAULT_RELATIVE_SIZE));

		model.recompute_relative_sizes(false);
		assert!(model.nodes().iter().all(|n| n.relative_size == DEFAULT_RELATIVE_SIZE));
	}

	#[test]
	fn bounding_box_ignores_unplaced_nodes() {
		let mut model = chain_model();
		assert_eq!(model.bounding_box(), None);
		model.set_position("a", Point::new(-10.0, 4.0));
		model.set_position("b", Point::new(30.0, -2.0));
		assert_eq!(model.bounding_box(), Some(Rect::new(-10.0, -2.0, 30.0, 4.0)));
	}
}
