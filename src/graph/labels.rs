/// Zoom-driven caption policy for nodes and edges.
#[derive(Clone, Debug, PartialEq)]
pub struct ZoomLabelController {
	pub threshold: f64,
	pub node_font_size: f64,
	pub edge_font_size: f64,
	pub min_font_size: f64,
}

/// Caption style for one zoom level, in graph units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabelStyle {
	pub visible: bool,
	pub node_font_size: f64,
	pub edge_font_size: f64,
}

impl Default for ZoomLabelController {
	fn default() -> Self {
		Self {
			threshold: 1.2,
			node_font_size: 10.0,
			edge_font_size: 9.0,
			min_font_size: 4.0,
		}
	}
}

impl ZoomLabelController {
	pub fn style(&self, zoom: f64) -> LabelStyle {
		// Graph units: constant on-screen size until the floor.
		let z = if zoom > 0.0 { zoom } else { f64::MIN_POSITIVE };
		LabelStyle {
			visible: zoom > self.threshold,
			node_font_size: (self.node_font_size / z).max(self.min_font_size),
			edge_font_size: (self.edge_font_size / z).max(self.min_font_size),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn captions_appear_only_above_threshold() {
		let labels = ZoomLabelController::default();
		assert!(!labels.style(1.0).visible);
		assert!(!labels.style(1.2).visible);
		assert!(labels.style(1.21).visible);
	}

	#[test]
	fn font_size_shrinks_with_zoom_down_to_the_floor() {
		let labels = ZoomLabelController::default();
		let style = labels.style(2.0);
		assert_eq!(style.node_font_size, 5.0);
		assert_eq!(style.edge_font_size, 4.5);

		let deep = labels.style(10.0);
		assert_eq!(deep.node_font_size, 4.0);
		assert_eq!(deep.edge_font_size, 4.0);

		let out = labels.style(0.5);
		assert_eq!(out.node_font_size, 20.0);
	}
}
