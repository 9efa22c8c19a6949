//! Explorer configuration.
//!
//! Every field has a default, so an empty object is a valid config. The page
//! may override any subset through an inline JSON block:
//!
//! ```html
//! <script id="explorer-config" type="application/json">{"neighbor_limit": 25}</script>
//! ```

use force_graph::SimulationParameters;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{ExplorerError, Result};

/// Id of the inline config element read by [`ExplorerConfig::load`].
pub const CONFIG_ELEMENT_ID: &str = "explorer-config";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
	/// Base URL of the query service. Empty means the page origin.
	pub api_base: String,
	pub search_limit: u32,
	pub neighbor_limit: u32,
	/// Time window, in months, passed to search and neighbor queries.
	pub months: u32,
	/// Node separation used by local placement.
	pub node_spacing: f64,
	/// Radius scale of the initial circular arrangement.
	pub edge_length: f64,
	pub label_threshold: f64,
	pub node_font_size: f64,
	pub edge_font_size: f64,
	pub min_font_size: f64,
	pub viewport_margin: f64,
	/// Run the force simulation after placement; `false` keeps positions local-only.
	pub global_layout: bool,
	pub simulation: LayoutParameters,
}

impl Default for ExplorerConfig {
	fn default() -> Self {
		Self {
			api_base: String::new(),
			search_limit: 25,
			neighbor_limit: 15,
			months: 1,
			node_spacing: 30.0,
			edge_length: 100.0,
			label_threshold: 1.2,
			node_font_size: 10.0,
			edge_font_size: 9.0,
			min_font_size: 4.0,
			viewport_margin: 30.0,
			global_layout: true,
			simulation: LayoutParameters::default(),
		}
	}
}

/// Parameter contract of the global layout engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutParameters {
	pub force_charge: f32,
	pub force_spring: f32,
	pub force_max: f32,
	pub node_speed: f32,
	pub damping_factor: f32,
}

impl Default for LayoutParameters {
	fn default() -> Self {
		Self {
			force_charge: 150.0,
			force_spring: 0.05,
			force_max: 100.0,
			node_speed: 3000.0,
			damping_factor: 0.9,
		}
	}
}

impl From<&LayoutParameters> for SimulationParameters {
	fn from(p: &LayoutParameters) -> Self {
		SimulationParameters {
			force_charge: p.force_charge,
			force_spring: p.force_spring,
			force_max: p.force_max,
			node_speed: p.node_speed,
			damping_factor: p.damping_factor,
		}
	}
}

impl ExplorerConfig {
	pub fn from_json(raw: &str) -> Result<Self> {
		let config: Self = serde_json::from_str(raw)?;
		config.validate()?;
		Ok(config)
	}

	fn validate(&self) -> Result<()> {
		if self.node_spacing <= 0.0 || !self.node_spacing.is_finite() {
			return Err(ExplorerError::Config(format!(
				"node_spacing must be positive, got {}",
				self.node_spacing
			)));
		}
		if self.label_threshold <= 0.0 {
			return Err(ExplorerError::Config(format!(
				"label_threshold must be positive, got {}",
				self.label_threshold
			)));
		}
		Ok(())
	}

	/// Reads the inline config block from the current page, falling back to
	/// defaults. An empty `api_base` is replaced with the page origin.
	pub fn load() -> Self {
		let window = web_sys::window();
		let inline = window
			.as_ref()
			.and_then(|w| w.document())
			.and_then(|d| d.get_element_by_id(CONFIG_ELEMENT_ID))
			.and_then(|el| el.text_content());

		let mut config = match inline {
			Some(raw) => Self::from_json(&raw).unwrap_or_else(|e| {
				warn!("Ignoring inline explorer config: {e}");
				Self::default()
			}),
			None => Self::default(),
		};

		if config.api_base.is_empty() {
			if let Some(origin) = window.and_then(|w| w.location().origin().ok()) {
				config.api_base = origin;
			}
		}
		info!("Explorer config loaded (api base: {})", config.api_base);
		config
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_object_is_default() {
		assert_eq!(ExplorerConfig::from_json("{}").ok(), Some(ExplorerConfig::default()));
	}

	#[test]
	fn partial_override_keeps_other_defaults() {
		let config = ExplorerConfig::from_json(
			r#"{"neighbor_limit": 40, "global_layout": false, "simulation": {"force_charge": 90.0}}"#,
		)
		.expect("valid config");
		assert_eq!(config.neighbor_limit, 40);
		assert!(!config.global_layout);
		assert_eq!(config.simulation.force_charge, 90.0);
		assert_eq!(config.simulation.damping_factor, 0.9);
		assert_eq!(config.search_limit, 25);
	}

	#[test]
	fn rejects_non_positive_spacing() {
		let err = ExplorerConfig::from_json(r#"{"node_spacing": 0}"#).unwrap_err();
		assert!(matches!(err, ExplorerError::Config(_)));
	}

	#[test]
	fn rejects_malformed_json() {
		let err = ExplorerConfig::from_json("{not json").unwrap_err();
		assert!(matches!(err, ExplorerError::Payload(_)));
	}
}
