use super::model::GraphModel;
use super::types::Point;

/// Moves a dragged node's direct neighbors with it.
///
/// Offsets are captured on grab and dropped on release, so every gesture
/// starts from the current layout.
#[derive(Clone, Debug, Default)]
pub struct DragPropagation {
	anchor: Option<String>,
	offsets: Vec<(String, Point)>,
}

impl DragPropagation {
	pub fn begin(&mut self, model: &GraphModel, node_id: &str) {
		self.offsets.clear();
		self.anchor = None;
		let Some(origin) = model.position_of(node_id) else {
			return;
		};
		self.offsets = model
			.neighbors(node_id)
			.into_iter()
			.filter_map(|n| model.position_of(n).map(|p| (n.to_string(), origin.offset_to(p))))
			.collect();
		self.anchor = Some(node_id.to_string());
	}

	pub fn anchor(&self) -> Option<&str> {
		self.anchor.as_deref()
	}

	/// The anchor followed by every neighbor moving with it.
	pub fn members(&self) -> impl Iterator<Item = &str> {
		self.anchor
			.as_deref()
			.into_iter()
			.chain(self.offsets.iter().map(|(id, _)| id.as_str()))
	}

	/// Moves the anchor to `position` and its neighbors along with it.
	/// Returns the ids that moved.
	pub fn drag_to(&self, model: &mut GraphModel, position: Point) -> Vec<String> {
		let Some(anchor) = &self.anchor else {
			return Vec::new();
		};
		model.set_position(anchor, position);
		let mut moved = vec![anchor.clone()];
		for (id, offset) in &self.offsets {
			if model.contains_node(id) {
				model.set_position(id, position.translate(*offset));
				moved.push(id.clone());
			}
		}
		moved
	}

	pub fn end(&mut self) {
		self.anchor = None;
		self.offsets.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::model::tests::{edge, node};
	use crate::graph::types::GraphBatch;

	fn model() -> GraphModel {
		let mut model = GraphModel::new();
		model.merge(GraphBatch {
			nodes: vec![node("p", "A"), node("in", "A"), node("out", "A"), node("far", "A")],
			edges: vec![edge("in", "p"), edge("p", "out"), edge("out", "far")],
		});
		model.set_position("p", Point::new(0.0, 0.0));
		model.set_position("in", Point::new(-10.0, 5.0));
		model.set_position("out", Point::new(20.0, 0.0));
		model.set_position("far", Point::new(40.0, 0.0));
		model
	}

	#[test]
	fn neighbors_keep_their_offset() {
		let mut model = model();
		let mut drag = DragPropagation::default();
		drag.begin(&model, "p");
		assert_eq!(drag.members().count(), 3);

		let mut moved = drag.drag_to(&mut model, Point::new(100.0, 50.0));
		moved.sort();
		assert_eq!(moved, vec!["in", "out", "p"]);
		assert_eq!(model.position_of("in"), Some(Point::new(90.0, 55.0)));
		assert_eq!(model.position_of("out"), Some(Point::new(120.0, 50.0)));
		assert_eq!(model.position_of("far"), Some(Point::new(40.0, 0.0)));

		drag.drag_to(&mut model, Point::new(0.0, 0.0));
		assert_eq!(model.position_of("in"), Some(Point::new(-10.0, 5.0)));
	}

	#[test]
	fn offsets_are_recomputed_per_gesture() {
		let mut model = model();
		let mut drag = DragPropagation::default();
		drag.begin(&model, "p");
		drag.end();
		assert!(drag.drag_to(&mut model, Point::new(5.0, 5.0)).is_empty());

		model.set_position("out", Point::new(0.0, 30.0));
		drag.begin(&model, "p");
		drag.drag_to(&mut model, Point::new(1.0, 1.0));
		assert_eq!(model.position_of("out"), Some(Point::new(1.0, 31.0)));
	}

	#[test]
	fn grabbing_an_unplaced_node_does_nothing() {
		let mut model = GraphModel::new();
		model.merge(GraphBatch {
			nodes: vec![node("x", "A")],
			edges: vec![],
		});
		let mut drag = DragPropagation::default();
		drag.begin(&model, "x");
		assert_eq!(drag.anchor(), None);
	}
}
