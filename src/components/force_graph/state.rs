use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};
use log::{debug, info, warn};

use super::types::{ElementKind, Selection};
use crate::config::{ExplorerConfig, LayoutParameters};
use crate::error::Result;
use crate::graph::color::PALETTE;
use crate::graph::placement::Placement;
use crate::graph::{
	Activation, ColorAssignment, DragPropagation, ExpansionController, ExpansionOutcome, ExpansionSettings, GraphBatch,
	GraphModel, LabelStyle, LocalPlacementEngine, PlacementSettings, PlacementSurface, Point, Rect,
	ZoomLabelController,
};
use crate::service::{GraphPayload, NeighborRequest, QueryDescriptor};

pub const HIT_PADDING: f64 = 4.0;
pub const EDGE_HIT_DISTANCE: f64 = 4.0;
/// Duration of the placement tween, in seconds.
pub const PLACEMENT_TWEEN: f64 = 0.22;

pub fn node_radius(relative_size: f64) -> f64 {
	4.0 + relative_size * 10.0
}

#[derive(Clone, Debug, Default)]
pub struct NodeInfo {
	pub id: String,
}

#[derive(Clone, Debug, Default)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub node: Option<String>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start: Point,
	/// Set once the pointer actually moves the node.
	pub moved: bool,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

#[derive(Clone, Debug, Default)]
pub struct HoverState {
	pub node: Option<String>,
	pub neighbors: HashSet<String>,
	pub highlight_t: f64,
	pub prev_node: Option<String>,
	pub prev_neighbors: HashSet<String>,
	delay_t: f64,
}

#[derive(Clone, Debug)]
struct Tween {
	from: Point,
	to: Point,
	elapsed: f64,
}

/// Session context of one explorer view: the graph, everything derived from
/// it, and the simulation mirror used as the global layout engine.
pub struct ForceGraphState {
	pub model: GraphModel,
	pub colors: ColorAssignment,
	pub query: Option<QueryDescriptor>,
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub hover: HoverState,
	pub selected: Option<Selection>,
	pub label_style: LabelStyle,
	pub width: f64,
	pub height: f64,
	pub animation_running: bool,
	pub flow_time: f64,
	expansion: ExpansionController,
	placement: LocalPlacementEngine,
	labels: ZoomLabelController,
	neighbors_drag: DragPropagation,
	layout: LayoutParameters,
	edge_length: f64,
	graph: ForceGraph<NodeInfo, ()>,
	mirror_revision: Option<u64>,
	pinned: HashSet<String>,
	locked: HashSet<String>,
	tweens: HashMap<String, Tween>,
}

impl ForceGraphState {
	pub fn new(config: &ExplorerConfig, width: f64, height: f64) -> Self {
		let labels = ZoomLabelController {
			threshold: config.label_threshold,
			node_font_size: config.node_font_size,
			edge_font_size: config.edge_font_size,
			min_font_size: config.min_font_size,
		};
		let placement = LocalPlacementEngine::new(PlacementSettings {
			margin: config.viewport_margin,
			..PlacementSettings::with_spacing(config.node_spacing)
		});

		Self {
			model: GraphModel::new(),
			colors: ColorAssignment::new(),
			query: None,
			transform: ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: 1.0,
			},
			drag: DragState::default(),
			pan: PanState::default(),
			hover: HoverState::default(),
			selected: None,
			label_style: labels.style(1.0),
			width,
			height,
			animation_running: config.global_layout,
			flow_time: 0.0,
			expansion: ExpansionController::new(ExpansionSettings::for_query(
				config.neighbor_limit,
				config.months,
				None,
			)),
			placement,
			labels,
			neighbors_drag: DragPropagation::default(),
			graph: ForceGraph::new(SimulationParameters::from(&config.simulation)),
			layout: config.simulation.clone(),
			edge_length: config.edge_length,
			mirror_revision: None,
			pinned: HashSet::new(),
			locked: HashSet::new(),
			tweens: HashMap::new(),
		}
	}

	/// Replaces the whole graph with a fresh query result.
	pub fn load(&mut self, query: QueryDescriptor, payload: GraphPayload) {
		self.model.clear();
		self.colors.reset(query.colors.as_ref());
		self.expansion.reset(Some(&query));
		self.pinned.clear();
		self.locked.clear();
		self.tweens.clear();
		self.hover = HoverState::default();
		self.selected = None;
		self.drag = DragState::default();
		self.neighbors_drag.end();

		let batch: GraphBatch = self.expansion.settings().decoder.decode(payload);
		let merged = self.model.merge(batch);
		self.model.recompute_relative_sizes(query.sizing_enabled());
		self.query = Some(query);
		self.refresh_colors();
		self.seed_circle(&merged.added_nodes);
		self.fit_view();
		info!("Loaded {} nodes, {} edges", self.model.node_count(), self.model.edges().len());
	}

	// Circle around the origin, wide enough to keep `spacing` between neighbors.
	fn seed_circle(&mut self, ids: &[String]) {
		let n = ids.len().max(1) as f64;
		let spacing = self.placement.settings().spacing;
		let radius = self.edge_length.max(n * spacing / (2.0 * PI));
		for (i, id) in ids.iter().enumerate() {
			let angle = i as f64 * 2.0 * PI / n;
			self.model.set_position(id, Point::new(0.0, 0.0).polar(angle, radius));
		}
	}

	/// Centers the graph and zooms so it fits with some padding.
	pub fn fit_view(&mut self) {
		let Some(bb) = self.model.bounding_box() else {
			return;
		};
		let padding = 50.0;
		let (bw, bh) = ((bb.x2 - bb.x1).max(1.0), (bb.y2 - bb.y1).max(1.0));
		let k = ((self.width - 2.0 * padding) / bw)
			.min((self.height - 2.0 * padding) / bh)
			.clamp(0.1, 2.0);
		let c = bb.center();
		self.transform = ViewTransform {
			x: self.width / 2.0 - c.x * k,
			y: self.height / 2.0 - c.y * k,
			k,
		};
		self.refresh_labels();
	}

	fn refresh_colors(&mut self) {
		for node in self.model.nodes() {
			self.colors.color_of(&node.node_type);
		}
	}

	pub fn color_of(&self, node_type: &str) -> &str {
		self.colors.get(node_type).unwrap_or(PALETTE[0])
	}

	/// `(type, color)` for every type currently on screen.
	pub fn legend(&self) -> Vec<(String, String)> {
		self.colors.legend(self.model.nodes().iter().map(|n| n.node_type.as_str()))
	}

	pub fn refresh_labels(&mut self) {
		self.label_style = self.labels.style(self.transform.k);
	}

	/// Expand/collapse entry point. Returns a request when neighbors must be fetched.
	pub fn activate(&mut self, node_id: &str) -> Option<NeighborRequest> {
		match self.expansion.activate(&mut self.model, node_id) {
			Ok(Activation::Collapsed { removed }) => {
				for id in &removed {
					self.pinned.remove(id);
					self.tweens.remove(id);
					self.hover.neighbors.remove(id);
				}
				if self.selected.as_ref().is_some_and(|s| s.kind == ElementKind::Node && removed.contains(&s.element_id)) {
					self.selected = None;
				}
				None
			}
			Ok(Activation::Expand(request)) => Some(request),
			Err(e) => {
				warn!("Ignoring activation of {node_id}: {e}");
				None
			}
		}
	}

	/// Merges a neighbor result and places whatever it added.
	pub fn finish_expansion(&mut self, request: &NeighborRequest, result: Result<GraphPayload>) -> ExpansionOutcome {
		let result = result.map(|payload| self.expansion.settings().decoder.decode(payload));
		let outcome = self.expansion.complete(&mut self.model, request, result);
		if let ExpansionOutcome::Expanded { added_nodes, .. } = &outcome {
			let sizing = self.query.as_ref().is_some_and(QueryDescriptor::sizing_enabled);
			self.model.recompute_relative_sizes(sizing);
			self.refresh_colors();
			if let Err(e) = self.place(&request.node_id, added_nodes) {
				warn!("Placement around {} failed: {e}", request.node_id);
				self.seed_circle(added_nodes);
			}
		}
		outcome
	}

	fn place(&mut self, center: &str, batch: &[String]) -> Result<Vec<Placement>> {
		let engine = self.placement.clone();
		let placed = engine.place(self, center, batch)?;
		debug!("Placed {} nodes around {center}", placed.len());
		Ok(placed)
	}

	pub fn is_expanding(&self, node_id: &str) -> bool {
		self.expansion.is_in_flight(node_id)
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> Point {
		Point::new(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<String> {
		let p = self.screen_to_graph(sx, sy);
		// Topmost (last drawn) wins.
		self.model
			.nodes()
			.iter()
			.rev()
			.find(|n| {
				n.position
					.is_some_and(|pos| pos.distance(p) < node_radius(n.relative_size) + HIT_PADDING)
			})
			.map(|n| n.id.clone())
	}

	pub fn edge_at_position(&self, sx: f64, sy: f64) -> Option<String> {
		let p = self.screen_to_graph(sx, sy);
		let tolerance = EDGE_HIT_DISTANCE / self.transform.k;
		self.model
			.edges()
			.iter()
			.find(|e| {
				match (self.model.position_of(&e.source_id), self.model.position_of(&e.target_id)) {
					(Some(a), Some(b)) => segment_distance(p, a, b) < tolerance,
					_ => false,
				}
			})
			.map(|e| e.id.clone())
	}

	/// Whatever is under the pointer, preferring nodes.
	pub fn element_at(&self, sx: f64, sy: f64) -> Option<Selection> {
		if let Some(id) = self.node_at_position(sx, sy) {
			self.model.node(&id).map(|n| Selection {
				kind: ElementKind::Node,
				element_id: n.id.clone(),
				backend_id: n.original_id.clone(),
				title: n.caption.clone(),
			})
		} else {
			self.edge_at_position(sx, sy).and_then(|id| {
				self.model.edge(&id).map(|e| Selection {
					kind: ElementKind::Edge,
					element_id: e.id.clone(),
					backend_id: e.id.clone(),
					title: e.edge_type.clone(),
				})
			})
		}
	}

	pub fn select_at(&mut self, sx: f64, sy: f64) -> Option<Selection> {
		let selection = self.element_at(sx, sy);
		self.selected = selection.clone();
		selection
	}

	pub fn begin_drag(&mut self, node_id: &str, sx: f64, sy: f64) {
		let Some(start) = self.model.position_of(node_id) else {
			return;
		};
		self.tweens.remove(node_id);
		self.neighbors_drag.begin(&self.model, node_id);
		self.drag = DragState {
			active: true,
			node: Some(node_id.to_string()),
			start_x: sx,
			start_y: sy,
			node_start: start,
			moved: false,
		};
	}

	pub fn drag_to(&mut self, sx: f64, sy: f64) {
		if !self.drag.active {
			return;
		}
		let delta = Point::new(
			(sx - self.drag.start_x) / self.transform.k,
			(sy - self.drag.start_y) / self.transform.k,
		);
		if delta.x != 0.0 || delta.y != 0.0 {
			self.drag.moved = true;
		}
		let target = self.drag.node_start.translate(delta);
		for id in self.neighbors_drag.drag_to(&mut self.model, target) {
			self.tweens.remove(&id);
		}
	}

	/// Pins the dragged node where it was dropped. A press without movement
	/// pins nothing.
	pub fn end_drag(&mut self) {
		if let Some(id) = self.drag.node.take() {
			if self.drag.moved {
				self.pinned.insert(id);
			}
		}
		self.drag.active = false;
		self.drag.moved = false;
		self.neighbors_drag.end();
	}

	pub fn node_spacing(&self) -> f64 {
		self.placement.settings().spacing
	}

	pub fn edge_length(&self) -> f64 {
		self.edge_length
	}

	/// Changes the spacing used by placement and lays the graph out again.
	pub fn set_node_spacing(&mut self, spacing: f64) {
		if spacing <= 0.0 || !spacing.is_finite() || spacing == self.node_spacing() {
			return;
		}
		self.placement = LocalPlacementEngine::new(PlacementSettings {
			spacing,
			..self.placement.settings().clone()
		});
		self.relayout();
	}

	pub fn set_edge_length(&mut self, edge_length: f64) {
		if edge_length <= 0.0 || !edge_length.is_finite() || edge_length == self.edge_length {
			return;
		}
		self.edge_length = edge_length;
		self.relayout();
	}

	/// Re-seeds every node on the initial circle, drops pins and restarts the
	/// simulation from there.
	pub fn relayout(&mut self) {
		if self.model.is_empty() {
			return;
		}
		self.pinned.clear();
		self.locked.clear();
		self.tweens.clear();
		let ids: Vec<String> = self.model.nodes().iter().map(|n| n.id.clone()).collect();
		self.seed_circle(&ids);
		self.mirror_revision = None;
		self.fit_view();
		info!("Relayout of {} nodes (spacing {}, edge length {})", ids.len(), self.node_spacing(), self.edge_length);
	}

	/// Sets the zoom level, keeping the canvas center fixed.
	pub fn set_zoom(&mut self, k: f64) {
		if self.transform.k > 0.0 {
			self.zoom_at(self.width / 2.0, self.height / 2.0, k / self.transform.k);
		}
	}

	pub fn zoom_at(&mut self, sx: f64, sy: f64, factor: f64) {
		let new_k = (self.transform.k * factor).clamp(0.1, 10.0);
		let ratio = new_k / self.transform.k;
		self.transform.x = sx - (sx - self.transform.x) * ratio;
		self.transform.y = sy - (sy - self.transform.y) * ratio;
		self.transform.k = new_k;
		self.refresh_labels();
	}

	pub fn set_hover(&mut self, node: Option<String>) {
		if self.hover.node == node {
			return;
		}
		let was_hovering = self.hover.node.is_some();

		// Keep the previous highlight around for the fade-out.
		if was_hovering && node.is_none() {
			self.hover.prev_node = self.hover.node.take();
			self.hover.prev_neighbors = std::mem::take(&mut self.hover.neighbors);
		} else {
			self.hover.prev_node = None;
			self.hover.prev_neighbors.clear();
		}

		self.hover.neighbors.clear();
		if let Some(id) = &node {
			if !was_hovering {
				self.hover.delay_t = 0.0;
			}
			self.hover.neighbors = self.model.neighbors(id).into_iter().map(str::to_string).collect();
		}
		self.hover.node = node;
	}

	pub fn is_highlighted(&self, id: &str) -> bool {
		self.is_hovered(id) || self.hover.neighbors.contains(id) || self.hover.prev_neighbors.contains(id)
	}

	pub fn is_hovered(&self, id: &str) -> bool {
		self.hover.node.as_deref() == Some(id) || self.hover.prev_node.as_deref() == Some(id)
	}

	pub fn has_active_highlight(&self) -> bool {
		self.hover.node.is_some() || self.hover.prev_node.is_some()
	}

	pub fn tick(&mut self, dt: f32) {
		self.flow_time += dt as f64;
		self.advance_tweens(dt as f64);
		self.step_layout(dt);
		self.step_hover(dt as f64);
	}

	fn advance_tweens(&mut self, dt: f64) {
		let mut done = Vec::new();
		for (id, tween) in self.tweens.iter_mut() {
			tween.elapsed += dt;
			let t = ease_out_cubic((tween.elapsed / PLACEMENT_TWEEN).min(1.0));
			let p = Point::new(
				tween.from.x + (tween.to.x - tween.from.x) * t,
				tween.from.y + (tween.to.y - tween.from.y) * t,
			);
			self.model.set_position(id, p);
			if tween.elapsed >= PLACEMENT_TWEEN {
				done.push(id.clone());
			}
		}
		for id in done {
			self.tweens.remove(&id);
		}
		if self.tweens.is_empty() && !self.locked.is_empty() {
			debug!("Placement animation done, releasing {} locks", self.locked.len());
			self.locked.clear();
		}
	}

	/// Rebuilds the simulation mirror after structural changes.
	fn sync_layout(&mut self) {
		if self.mirror_revision == Some(self.model.revision()) {
			return;
		}
		let mut graph = ForceGraph::new(SimulationParameters::from(&self.layout));
		let mut id_to_idx: HashMap<&str, DefaultNodeIdx> = HashMap::new();
		for node in self.model.nodes() {
			let Some(p) = node.position else {
				continue;
			};
			let idx = graph.add_node(NodeData {
				x: p.x as f32,
				y: p.y as f32,
				mass: 10.0,
				is_anchor: false,
				user_data: NodeInfo { id: node.id.clone() },
			});
			id_to_idx.insert(node.id.as_str(), idx);
		}
		for edge in self.model.edges() {
			if let (Some(&src), Some(&tgt)) = (
				id_to_idx.get(edge.source_id.as_str()),
				id_to_idx.get(edge.target_id.as_str()),
			) {
				graph.add_edge(src, tgt, EdgeData::default());
			}
		}
		self.graph = graph;
		self.mirror_revision = Some(self.model.revision());
	}

	fn step_layout(&mut self, dt: f32) {
		if !self.animation_running {
			return;
		}
		self.sync_layout();

		let mut anchored: HashSet<&str> = self.pinned.iter().map(String::as_str).collect();
		anchored.extend(self.locked.iter().map(String::as_str));
		anchored.extend(self.tweens.keys().map(String::as_str));
		anchored.extend(self.neighbors_drag.members());

		// Anchored nodes follow the model, everything else follows the simulation.
		let model = &self.model;
		self.graph.visit_nodes_mut(|node| {
			let id = node.data.user_data.id.as_str();
			node.data.is_anchor = anchored.contains(id);
			if let Some(p) = model.position_of(id) {
				if node.data.is_anchor {
					node.data.x = p.x as f32;
					node.data.y = p.y as f32;
				}
			}
		});
		self.graph.update(dt);

		let mut moved = Vec::new();
		self.graph.visit_nodes(|node| {
			if !node.data.is_anchor {
				moved.push((node.data.user_data.id.clone(), Point::new(node.x() as f64, node.y() as f64)));
			}
		});
		for (id, p) in moved {
			self.model.set_position(&id, p);
		}
	}

	fn step_hover(&mut self, dt: f64) {
		let (target, delay, speed) = if self.hover.node.is_some() {
			(1.0, 0.08, 1.8)
		} else {
			(0.0, 0.0, 1.26)
		};

		if self.hover.node.is_some() {
			self.hover.delay_t = (self.hover.delay_t + dt).min(delay);
			if self.hover.delay_t >= delay {
				self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
			}
		} else {
			self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
			if self.hover.highlight_t < 0.01 {
				self.hover.highlight_t = 0.0;
				self.hover.prev_node = None;
				self.hover.prev_neighbors.clear();
			}
		}
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}
}

impl PlacementSurface for ForceGraphState {
	fn viewport(&self) -> Rect {
		let top_left = self.screen_to_graph(0.0, 0.0);
		let bottom_right = self.screen_to_graph(self.width, self.height);
		Rect::new(top_left.x, top_left.y, bottom_right.x, bottom_right.y)
	}

	fn position_of(&self, id: &str) -> Option<Point> {
		self.model.position_of(id)
	}

	fn positions(&self) -> Vec<(String, Point)> {
		self.model
			.nodes()
			.iter()
			.filter_map(|n| n.position.map(|p| (n.id.clone(), p)))
			.collect()
	}

	fn set_position(&mut self, id: &str, position: Point) {
		self.tweens.remove(id);
		self.model.set_position(id, position);
	}

	fn lock_except(&mut self, except: &[String]) {
		self.locked = self
			.model
			.nodes()
			.iter()
			.filter(|n| !except.contains(&n.id))
			.map(|n| n.id.clone())
			.collect();
	}

	/// Locks outlive the placement call while its moves are still
	/// animating; `advance_tweens` releases them once the last one lands.
	fn unlock_all(&mut self) {
		if self.tweens.is_empty() {
			self.locked.clear();
		}
	}

	fn animate_to(&mut self, id: &str, target: Point) {
		let Some(from) = self.model.position_of(id) else {
			self.model.set_position(id, target);
			return;
		};
		self.tweens.insert(
			id.to_string(),
			Tween {
				from,
				to: target,
				elapsed: 0.0,
			},
		);
	}
}

pub fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

fn segment_distance(p: Point, a: Point, b: Point) -> f64 {
	let ab = a.offset_to(b);
	let len2 = ab.x * ab.x + ab.y * ab.y;
	if len2 < f64::EPSILON {
		return p.distance(a);
	}
	let t = (((p.x - a.x) * ab.x + (p.y - a.y) * ab.y) / len2).clamp(0.0, 1.0);
	p.distance(Point::new(a.x + ab.x * t, a.y + ab.y * t))
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn query() -> QueryDescriptor {
		QueryDescriptor {
			name: "default_graph".into(),
			..Default::default()
		}
	}

	fn payload(value: serde_json::Value) -> GraphPayload {
		serde_json::from_value(value).expect("valid payload")
	}

	fn loaded() -> ForceGraphState {
		let mut state = ForceGraphState::new(&ExplorerConfig::default(), 800.0, 600.0);
		state.load(
			query(),
			payload(json!([
				{"data": {"id": "a", "label": "Person", "name": "Ada"}},
				{"data": {"id": "b", "label": "Company", "name": "Acme"}},
				{"data": {"id": "ab", "source": "a", "target": "b", "label": "WORKS_AT"}}
			])),
		);
		state
	}

	#[test]
	fn load_seeds_positions_colors_and_view() {
		let state = loaded();
		assert!(state.model.nodes().iter().all(|n| n.position.is_some()));
		assert_eq!(state.color_of("Person"), PALETTE[0]);
		assert_eq!(state.color_of("Company"), PALETTE[1]);
		assert_eq!(state.legend().len(), 2);
		let view = state.viewport();
		for n in state.model.nodes() {
			let p = n.position.expect("placed");
			assert!(view.contains_within(p, 0.0));
		}
	}

	#[test]
	fn expansion_places_new_nodes_and_collapse_removes_them() {
		let mut state = loaded();
		let request = state.activate("b").expect("expansion request");
		assert!(state.is_expanding("b"));
		assert!(state.activate("b").is_none());

		let outcome = state.finish_expansion(
			&request,
			Ok(payload(json!([
				{"data": {"id": "c1", "label": "Office", "name": "HQ"}},
				{"data": {"id": "c2", "label": "Office", "name": "Branch"}},
				{"data": {"id": "b-c1", "source": "b", "target": "c1", "label": "HAS"}},
				{"data": {"id": "b-c2", "source": "b", "target": "c2", "label": "HAS"}}
			]))),
		);
		assert!(matches!(outcome, ExpansionOutcome::Expanded { .. }));
		assert_eq!(state.locked, HashSet::from(["a".to_string(), "b".to_string()]));
		assert_eq!(state.tweens.len(), 2);
		assert_eq!(state.color_of("Office"), PALETTE[2]);

		for _ in 0..30 {
			state.tick(0.016);
		}
		assert!(state.tweens.is_empty());
		assert!(state.locked.is_empty());
		let center = state.model.position_of("b").expect("center");
		for id in ["c1", "c2"] {
			let p = state.model.position_of(id).expect("placed");
			assert!(p.distance(center) > 1.0);
		}

		assert!(state.activate("b").is_none());
		assert!(!state.model.contains_node("c1"));
		assert!(state.model.contains_node("a"));
	}

	#[test]
	fn existing_nodes_hold_still_while_placement_animates() {
		let mut state = loaded();
		let request = state.activate("b").expect("expansion request");
		state.finish_expansion(
			&request,
			Ok(payload(json!([
				{"data": {"id": "c1", "label": "Office", "name": "HQ"}},
				{"data": {"id": "b-c1", "source": "b", "target": "c1", "label": "HAS"}}
			]))),
		);
		let before: Vec<Point> = ["a", "b"]
			.iter()
			.map(|id| state.model.position_of(id).expect("placed"))
			.collect();

		let mut ticks = 0;
		while !state.tweens.is_empty() && ticks < 100 {
			assert!(state.locked.contains("a") && state.locked.contains("b"));
			state.tick(0.016);
			ticks += 1;
			if !state.tweens.is_empty() {
				for (id, p) in ["a", "b"].iter().zip(&before) {
					assert_eq!(state.model.position_of(id), Some(*p), "{id} moved mid-animation");
				}
			}
		}
		assert!(ticks > 1);
		assert!(state.tweens.is_empty());
		assert!(state.locked.is_empty());
	}

	#[test]
	fn press_without_movement_does_not_pin() {
		let mut state = loaded();
		state.begin_drag("a", 10.0, 10.0);
		state.drag_to(10.0, 10.0);
		state.end_drag();
		assert!(state.pinned.is_empty());

		state.begin_drag("a", 10.0, 10.0);
		state.end_drag();
		assert!(state.pinned.is_empty());
	}

	#[test]
	fn layout_controls_reseed_and_unpin() {
		let mut state = loaded();
		state.begin_drag("a", 0.0, 0.0);
		state.drag_to(5.0, 0.0);
		state.end_drag();
		assert!(state.pinned.contains("a"));

		state.set_node_spacing(60.0);
		assert_eq!(state.node_spacing(), 60.0);
		assert!(state.pinned.is_empty());

		state.set_edge_length(250.0);
		assert_eq!(state.edge_length(), 250.0);
		for n in state.model.nodes() {
			let p = n.position.expect("seeded");
			assert!((p.distance(Point::new(0.0, 0.0)) - 250.0).abs() < 1e-6);
		}

		state.set_node_spacing(-1.0);
		assert_eq!(state.node_spacing(), 60.0);
	}

	#[test]
	fn set_zoom_keeps_the_canvas_center() {
		let mut state = loaded();
		let center = state.screen_to_graph(400.0, 300.0);
		state.set_zoom(2.5);
		assert!((state.transform.k - 2.5).abs() < 1e-9);
		assert!(state.screen_to_graph(400.0, 300.0).distance(center) < 1e-9);
		assert!(state.label_style.visible);
	}

	#[test]
	fn failed_expansion_keeps_node_collapsed() {
		let mut state = loaded();
		let request = state.activate("a").expect("expansion request");
		let err = crate::error::ExplorerError::Status {
			status: 502,
			url: "http://x".into(),
		};
		assert_eq!(state.finish_expansion(&request, Err(err)), ExpansionOutcome::Empty);
		assert_eq!(state.model.node("a").map(|n| n.expanded), Some(false));
		assert!(state.activate("a").is_some());
	}

	#[test]
	fn reload_discards_inflight_expansions() {
		let mut state = loaded();
		let request = state.activate("a").expect("expansion request");
		state.load(query(), payload(json!([{"data": {"id": "a", "label": "Person"}}])));
		let late = payload(json!([{"data": {"id": "z", "label": "Person"}}]));
		assert_eq!(state.finish_expansion(&request, Ok(late)), ExpansionOutcome::Discarded);
		assert!(!state.model.contains_node("z"));
	}

	#[test]
	fn dragging_moves_neighbors_and_pins() {
		let mut state = loaded();
		let a = state.model.position_of("a").expect("a");
		let b = state.model.position_of("b").expect("b");
		let screen = Point::new(
			a.x * state.transform.k + state.transform.x,
			a.y * state.transform.k + state.transform.y,
		);
		state.begin_drag("a", screen.x, screen.y);
		state.drag_to(screen.x + 10.0 * state.transform.k, screen.y);
		let moved_b = state.model.position_of("b").expect("b");
		assert!((moved_b.x - (b.x + 10.0)).abs() < 1e-9);
		state.end_drag();
		assert!(state.pinned.contains("a"));
		assert!(state.neighbors_drag.anchor().is_none());
	}

	#[test]
	fn zoom_updates_label_policy() {
		let mut state = loaded();
		state.transform.k = 1.0;
		state.zoom_at(400.0, 300.0, 1.5);
		assert!(state.label_style.visible);
		state.zoom_at(400.0, 300.0, 0.5);
		assert!(!state.label_style.visible);
	}

	#[test]
	fn hit_testing_prefers_nodes_then_edges() {
		let mut state = loaded();
		state.transform = ViewTransform { x: 0.0, y: 0.0, k: 1.0 };
		state.model.set_position("a", Point::new(100.0, 100.0));
		state.model.set_position("b", Point::new(300.0, 100.0));

		let node = state.select_at(101.0, 100.0).expect("node");
		assert_eq!(node.kind, ElementKind::Node);
		assert_eq!(node.title, "Ada");

		let edge = state.select_at(200.0, 102.0).expect("edge");
		assert_eq!(edge.kind, ElementKind::Edge);
		assert_eq!(edge.title, "WORKS_AT");

		assert!(state.select_at(200.0, 300.0).is_none());
		assert!(state.selected.is_none());
	}
}
