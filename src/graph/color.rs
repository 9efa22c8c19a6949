use std::collections::HashMap;

/// Colors handed out to node types in first-seen order.
pub const PALETTE: &[&str] = &[
	"#5B8FF9", "#61DDAA", "#65789B", "#F6BD16", "#7262FD", "#78D3F8", "#9661BC", "#F6903D",
	"#008685", "#F08BB4",
];

/// Session-scoped type -> color table.
///
/// Unseen types take the next palette slot, wrapping around once the palette
/// is exhausted. Predefined colors (from the active query) are returned as-is
/// and do not consume palette slots.
#[derive(Clone, Debug)]
pub struct ColorAssignment {
	palette: Vec<String>,
	assigned: HashMap<String, String>,
	order: Vec<String>,
	next_slot: usize,
}

impl Default for ColorAssignment {
	fn default() -> Self {
		Self::with_palette(PALETTE.iter().map(|c| c.to_string()).collect())
	}
}

impl ColorAssignment {
	pub fn new() -> Self {
		Self::default()
	}

	/// An empty `palette` falls back to [`PALETTE`].
	pub fn with_palette(palette: Vec<String>) -> Self {
		let palette = if palette.is_empty() {
			PALETTE.iter().map(|c| c.to_string()).collect()
		} else {
			palette
		};
		Self {
			palette,
			assigned: HashMap::new(),
			order: Vec::new(),
			next_slot: 0,
		}
	}

	pub fn color_of(&mut self, node_type: &str) -> &str {
		if !self.assigned.contains_key(node_type) {
			let color = self.palette[self.next_slot % self.palette.len()].clone();
			self.next_slot += 1;
			self.order.push(node_type.to_string());
			self.assigned.insert(node_type.to_string(), color);
		}
		&self.assigned[node_type]
	}

	/// Read-only lookup, `None` for types that were never seen.
	pub fn get(&self, node_type: &str) -> Option<&str> {
		self.assigned.get(node_type).map(String::as_str)
	}

	/// Forgets every assignment and installs the query's predefined colors.
	pub fn reset(&mut self, predefined: Option<&HashMap<String, String>>) {
		self.assigned.clear();
		self.order.clear();
		self.next_slot = 0;
		if let Some(colors) = predefined {
			let mut types: Vec<_> = colors.keys().collect();
			types.sort();
			for t in types {
				self.order.push(t.clone());
				self.assigned.insert(t.clone(), colors[t].clone());
			}
		}
	}

	/// `(type, color)` for the given types, in assignment order.
	pub fn legend<'a>(&self, present: impl IntoIterator<Item = &'a str>) -> Vec<(String, String)> {
		let present: std::collections::HashSet<&str> = present.into_iter().collect();
		self.order
			.iter()
			.filter(|t| present.contains(t.as_str()))
			.map(|t| (t.clone(), self.assigned[t].clone()))
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn colors_are_stable_and_first_seen() {
		let mut colors = ColorAssignment::new();
		assert_eq!(colors.color_of("Person"), PALETTE[0]);
		assert_eq!(colors.color_of("Company"), PALETTE[1]);
		assert_eq!(colors.color_of("Person"), PALETTE[0]);
		assert_eq!(colors.get("Company"), Some(PALETTE[1]));
		assert_eq!(colors.get("Unknown"), None);
	}

	#[test]
	fn palette_wraps_when_exhausted() {
		let mut colors = ColorAssignment::with_palette(vec!["red".into(), "blue".into()]);
		let got: Vec<String> = ["a", "b", "c", "d"].iter().map(|t| colors.color_of(t).to_string()).collect();
		assert_eq!(got, vec!["red", "blue", "red", "blue"]);
	}

	#[test]
	fn reset_installs_predefined_without_consuming_slots() {
		let mut colors = ColorAssignment::new();
		colors.color_of("Old");
		let predefined = HashMap::from([("Account".to_string(), "#000000".to_string())]);
		colors.reset(Some(&predefined));
		assert_eq!(colors.get("Old"), None);
		assert_eq!(colors.color_of("Account"), "#000000");
		assert_eq!(colors.color_of("Fresh"), PALETTE[0]);
	}

	#[test]
	fn legend_keeps_assignment_order() {
		let mut colors = ColorAssignment::new();
		for t in ["B", "A", "C"] {
			colors.color_of(t);
		}
		let legend = colors.legend(["C", "B"]);
		assert_eq!(
			legend,
			vec![("B".to_string(), PALETTE[0].to_string()), ("C".to_string(), PALETTE[2].to_string())]
		);
	}
}
