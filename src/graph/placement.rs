//! Local placement of freshly merged nodes around an expansion center.
//!
//! New nodes are fanned out on an arc pointing away from the centroid of the
//! graph. Each node first tries small angular nudges at the base radius, then
//! a bounded radius growth, and finally a deterministic position on the
//! viewport-bounded ring. Every other node is locked against the global
//! layout while this runs.

use std::f64::consts::PI;
use std::ops::{Deref, DerefMut};

use log::debug;

use super::types::{Point, Rect};
use crate::error::{ExplorerError, Result};

/// The rendering surface as seen by the placement engine.
pub trait PlacementSurface {
	/// Visible extent, in graph coordinates.
	fn viewport(&self) -> Rect;

	fn position_of(&self, id: &str) -> Option<Point>;

	/// Every positioned element.
	fn positions(&self) -> Vec<(String, Point)>;

	fn set_position(&mut self, id: &str, position: Point);

	/// Freezes every element not in `except` against the global layout.
	fn lock_except(&mut self, except: &[String]);

	fn unlock_all(&mut self);

	/// Moves `id` from its current position to `target`.
	fn animate_to(&mut self, id: &str, target: Point);
}

/// Unlocks the surface when dropped.
struct LockGuard<'a, S: PlacementSurface + ?Sized> {
	surface: &'a mut S,
}

impl<'a, S: PlacementSurface + ?Sized> LockGuard<'a, S> {
	fn new(surface: &'a mut S, except: &[String]) -> Self {
		surface.lock_except(except);
		Self { surface }
	}
}

impl<S: PlacementSurface + ?Sized> Deref for LockGuard<'_, S> {
	type Target = S;

	fn deref(&self) -> &S {
		self.surface
	}
}

impl<S: PlacementSurface + ?Sized> DerefMut for LockGuard<'_, S> {
	fn deref_mut(&mut self) -> &mut S {
		self.surface
	}
}

impl<S: PlacementSurface + ?Sized> Drop for LockGuard<'_, S> {
	fn drop(&mut self) {
		self.surface.unlock_all();
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlacementSettings {
	/// Configured node separation.
	pub spacing: f64,
	/// Distance kept from every viewport edge.
	pub margin: f64,
	/// Angular nudge between attempts.
	pub angle_step: f64,
	pub angular_attempts: usize,
	pub radial_attempts: usize,
	/// Floor applied to each viewport clearance.
	pub min_clearance: f64,
}

impl Default for PlacementSettings {
	fn default() -> Self {
		Self {
			spacing: 30.0,
			margin: 30.0,
			angle_step: PI / 18.0,
			angular_attempts: 12,
			radial_attempts: 10,
			min_clearance: 10.0,
		}
	}
}

impl PlacementSettings {
	pub fn with_spacing(spacing: f64) -> Self {
		Self {
			spacing,
			..Self::default()
		}
	}

	pub fn min_separation(&self) -> f64 {
		self.spacing.max(24.0)
	}
}

/// How a node's position was found.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Resolution {
	/// At the base radius, after `attempt` angular nudges.
	Angular { attempt: usize },
	/// At the nominal angle, on a grown radius.
	Radial { radius: f64 },
	/// Viewport-edge fallback; may overlap.
	Fallback,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Placement {
	pub id: String,
	pub position: Point,
	pub resolution: Resolution,
}

/// Ring geometry derived once per batch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ring {
	pub center: Point,
	pub view_radius: f64,
	pub base_radius: f64,
	pub max_radius: f64,
	pub center_angle: f64,
	pub spread: f64,
}

impl Ring {
	pub fn new(settings: &PlacementSettings, center: Point, viewport: Rect, centroid: Point, count: usize) -> Self {
		let m = settings.margin;
		let floor = settings.min_clearance;
		let clearance = [
			(center.x - viewport.x1 - m).max(floor),
			(viewport.x2 - center.x - m).max(floor),
			(center.y - viewport.y1 - m).max(floor),
			(viewport.y2 - center.y - m).max(floor),
		];
		let view_radius = 0.9 * clearance.into_iter().fold(f64::INFINITY, f64::min);

		let min_sep = settings.min_separation();
		let base_radius = view_radius.min(settings.spacing * 3.0 + 60.0).max(min_sep + 40.0);
		let max_radius = (min_sep + 40.0).max(view_radius);

		let dir = centroid.offset_to(center);
		let center_angle = if dir.x.hypot(dir.y) > f64::EPSILON {
			dir.y.atan2(dir.x)
		} else {
			0.0
		};
		let spread = (0.85 * PI).min(0.6_f64.max(count.saturating_sub(1) as f64 * 0.22));

		Self {
			center,
			view_radius,
			base_radius,
			max_radius,
			center_angle,
			spread,
		}
	}

	/// Nominal angle of the `index`-th of `count` nodes.
	pub fn angle(&self, index: usize, count: usize) -> f64 {
		let t = if count <= 1 {
			0.5
		} else {
			index as f64 / (count - 1) as f64
		};
		self.center_angle - self.spread / 2.0 + self.spread * t
	}
}

#[derive(Clone, Debug, Default)]
pub struct LocalPlacementEngine {
	settings: PlacementSettings,
}

impl LocalPlacementEngine {
	pub fn new(settings: PlacementSettings) -> Self {
		Self { settings }
	}

	pub fn settings(&self) -> &PlacementSettings {
		&self.settings
	}

	/// Places `batch` around `center`, in batch order.
	pub fn place<S>(&self, surface: &mut S, center: &str, batch: &[String]) -> Result<Vec<Placement>>
	where
		S: PlacementSurface + ?Sized,
	{
		if batch.is_empty() {
			return Ok(Vec::new());
		}
		let origin = surface
			.position_of(center)
			.ok_or_else(|| ExplorerError::UnknownNode(center.to_string()))?;

		let mut surface = LockGuard::new(surface, batch);
		for id in batch {
			surface.set_position(id, origin);
		}

		let all = surface.positions();
		let centroid = Rect::bounding(all.iter().map(|(_, p)| *p)).map_or(origin, |r| r.center());
		let existing: Vec<Point> = all
			.iter()
			.filter(|(id, _)| !batch.contains(id))
			.map(|(_, p)| *p)
			.collect();

		let viewport = surface.viewport();
		let ring = Ring::new(&self.settings, origin, viewport, centroid, batch.len());
		debug!(
			"Placing {} nodes around {center}: base radius {:.1}, view radius {:.1}",
			batch.len(),
			ring.base_radius,
			ring.view_radius
		);

		let mut placements = Vec::with_capacity(batch.len());
		for (i, id) in batch.iter().enumerate() {
			let angle = ring.angle(i, batch.len());
			let (position, resolution) = self.resolve(&ring, angle, viewport, &existing);
			surface.animate_to(id, position);
			placements.push(Placement {
				id: id.clone(),
				position,
				resolution,
			});
		}
		Ok(placements)
	}

	fn resolve(&self, ring: &Ring, angle: f64, viewport: Rect, existing: &[Point]) -> (Point, Resolution) {
		let s = &self.settings;
		let min_sep = s.min_separation();
		let fits = |p: Point| viewport.contains_within(p, s.margin) && nearest_distance(p, existing) >= min_sep;

		for attempt in 0..s.angular_attempts {
			let sign = if attempt % 2 == 0 { 1.0 } else { -1.0 };
			let nudge = sign * attempt.div_ceil(2) as f64 * s.angle_step;
			let candidate = ring.center.polar(angle + nudge, ring.base_radius);
			if fits(candidate) {
				return (candidate, Resolution::Angular { attempt });
			}
		}

		let step = (s.spacing * 0.6).max(20.0);
		let mut radius = ring.base_radius;
		let mut tries = 0;
		while tries < s.radial_attempts && radius < ring.max_radius {
			radius += step;
			let candidate = ring.center.polar(angle, radius);
			if fits(candidate) {
				return (candidate, Resolution::Radial { radius });
			}
			tries += 1;
		}

		let clamp = (ring.view_radius - s.margin).max(s.min_clearance);
		(ring.center.polar(angle, clamp), Resolution::Fallback)
	}
}

fn nearest_distance(p: Point, others: &[Point]) -> f64 {
	others.iter().map(|o| o.distance(p)).fold(f64::INFINITY, f64::min)
}
