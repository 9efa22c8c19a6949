use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::state::{ForceGraphState, ease_out_cubic, node_radius};
use super::types::ElementKind;
use crate::graph::GraphNode;

const SELECTED_BORDER: &str = "#f1c40f";

pub fn render(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str("#1a1a2e");
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_edges(state, ctx);
	draw_nodes(state, ctx);
	ctx.restore();
}

fn is_selected(state: &ForceGraphState, kind: ElementKind, id: &str) -> bool {
	state
		.selected
		.as_ref()
		.is_some_and(|s| s.kind == kind && s.element_id == id)
}

fn draw_edges(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	let (dash, gap, arrow_size) = (8.0 / k, 4.0 / k, 8.0 / k);
	let dash_offset = -(state.flow_time * 30.0) % (dash + gap);
	let t = ease_out_cubic(state.hover.highlight_t);
	let labels = state.label_style;

	for edge in state.model.edges() {
		let (Some(source), Some(target)) = (state.model.node(&edge.source_id), state.model.node(&edge.target_id)) else {
			continue;
		};
		let (Some(p1), Some(p2)) = (source.position, target.position) else {
			continue;
		};
		let (dx, dy) = (p2.x - p1.x, p2.y - p1.y);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < 0.001 {
			continue;
		}
		let (r1, r2) = (node_radius(source.relative_size), node_radius(target.relative_size));

		let is_highlighted = state.is_highlighted(&edge.source_id) && state.is_highlighted(&edge.target_id);
		let base_width = edge.weight.map_or(1.0, |w| w.clamp(1.0, 10.0)) * 1.5 / k;

		// t=0: every edge at base alpha; t=1: highlighted edges bright, others dim.
		let (edge_alpha, arrow_alpha, width) = if is_highlighted {
			(0.6 + 0.3 * t, 0.8 + 0.1 * t, base_width * (1.0 + 0.3 * t))
		} else {
			(0.6 - 0.45 * t, 0.8 - 0.45 * t, base_width * (1.0 - 0.3 * t))
		};
		let color = if is_selected(state, ElementKind::Edge, &edge.id) {
			format!("rgba(241, 196, 15, {})", edge_alpha.max(0.8))
		} else {
			format!("rgba(100, 180, 255, {})", edge_alpha)
		};

		ctx.set_stroke_style_str(&color);
		ctx.set_line_width(width);
		let _ = ctx.set_line_dash(&js_sys::Array::of2(
			&JsValue::from_f64(dash),
			&JsValue::from_f64(gap),
		));
		ctx.set_line_dash_offset(dash_offset);

		let (ux, uy) = (dx / dist, dy / dist);
		ctx.begin_path();
		ctx.move_to(p1.x + ux * r1, p1.y + uy * r1);
		ctx.line_to(p2.x - ux * (r2 + arrow_size), p2.y - uy * (r2 + arrow_size));
		ctx.stroke();

		let _ = ctx.set_line_dash(&js_sys::Array::new());
		ctx.set_fill_style_str(&format!("rgba(100, 180, 255, {})", arrow_alpha));
		let (tip_x, tip_y) = (p2.x - ux * r2, p2.y - uy * r2);
		let (back_x, back_y) = (tip_x - ux * arrow_size, tip_y - uy * arrow_size);
		let (px, py) = (-uy * arrow_size * 0.5, ux * arrow_size * 0.5);
		ctx.begin_path();
		ctx.move_to(tip_x, tip_y);
		ctx.line_to(back_x + px, back_y + py);
		ctx.line_to(back_x - px, back_y - py);
		ctx.close_path();
		ctx.fill();

		if labels.visible && !edge.edge_type.is_empty() {
			ctx.set_fill_style_str("rgba(200, 200, 220, 0.8)");
			ctx.set_font(&format!("{}px sans-serif", labels.edge_font_size));
			let _ = ctx.fill_text(&edge.edge_type, (p1.x + p2.x) / 2.0, (p1.y + p2.y) / 2.0);
		}
	}
	let _ = ctx.set_line_dash(&js_sys::Array::new());
}

fn draw_caption(state: &ForceGraphState, ctx: &CanvasRenderingContext2d, node: &GraphNode, x: f64, y: f64, radius: f64, fill: &str) {
	ctx.set_fill_style_str(fill);
	ctx.set_font(&format!("{}px sans-serif", state.label_style.node_font_size));
	let _ = ctx.fill_text(&node.caption, x + radius + 3.0, y + 3.0);
}

fn draw_nodes(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	let (has_highlight, t, k) = (
		state.has_active_highlight(),
		ease_out_cubic(state.hover.highlight_t),
		state.transform.k,
	);
	let captions = state.label_style.visible;

	for node in state.model.nodes() {
		if has_highlight && state.is_highlighted(&node.id) {
			continue;
		}
		let Some(p) = node.position else {
			continue;
		};
		let base = node_radius(node.relative_size);
		let (alpha, radius) = (1.0 - 0.7 * t, base * (1.0 - 0.15 * t));

		ctx.set_global_alpha(alpha);
		ctx.begin_path();
		let _ = ctx.arc(p.x, p.y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(state.color_of(&node.node_type));
		ctx.fill();
		draw_outline(state, ctx, node, p.x, p.y, radius, k);
		ctx.set_global_alpha(1.0);

		if captions {
			draw_caption(state, ctx, node, p.x, p.y, radius, &format!("rgba(255, 255, 255, {})", alpha * 0.8));
		}
	}

	if !has_highlight {
		return;
	}

	for node in state.model.nodes() {
		if !state.is_highlighted(&node.id) {
			continue;
		}
		let Some(p) = node.position else {
			continue;
		};
		let base = node_radius(node.relative_size);
		let is_hovered = state.is_hovered(&node.id);
		let (radius, glow_radius) = if is_hovered {
			(base * (1.0 + 0.35 * t), base * (1.8 + 1.2 * t))
		} else {
			(base * (1.0 + 0.2 * t), base * (1.4 + 0.6 * t))
		};

		if t > 0.01 {
			if let Ok(gradient) = ctx.create_radial_gradient(p.x, p.y, radius * 0.3, p.x, p.y, glow_radius) {
				let alpha = if is_hovered { 0.35 * t } else { 0.2 * t };
				let _ = gradient.add_color_stop(0.0, &format!("rgba(255, 255, 255, {})", alpha));
				let _ = gradient.add_color_stop(0.6, &format!("rgba(200, 220, 255, {})", alpha * 0.3));
				let _ = gradient.add_color_stop(1.0, "rgba(255, 255, 255, 0)");
				ctx.begin_path();
				let _ = ctx.arc(p.x, p.y, glow_radius, 0.0, 2.0 * PI);
				#[allow(deprecated)]
				ctx.set_fill_style(&gradient);
				ctx.fill();
			}
		}

		ctx.begin_path();
		let _ = ctx.arc(p.x, p.y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(state.color_of(&node.node_type));
		ctx.fill();
		draw_outline(state, ctx, node, p.x, p.y, radius, k);

		if is_hovered && t > 0.01 {
			ctx.begin_path();
			let _ = ctx.arc(p.x, p.y, radius + 2.0 / k, 0.0, 2.0 * PI);
			ctx.set_stroke_style_str(&format!("rgba(255, 255, 255, {})", 0.7 * t));
			ctx.set_line_width(1.5 / k);
			ctx.stroke();
		}

		// The hovered node always shows its caption, like a tooltip.
		if captions || is_hovered {
			draw_caption(state, ctx, node, p.x, p.y, radius, "white");
		}
	}
}

// Selection border, plus a dashed ring while neighbors are loading.
fn draw_outline(state: &ForceGraphState, ctx: &CanvasRenderingContext2d, node: &GraphNode, x: f64, y: f64, radius: f64, k: f64) {
	if is_selected(state, ElementKind::Node, &node.id) {
		ctx.begin_path();
		let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
		ctx.set_stroke_style_str(SELECTED_BORDER);
		ctx.set_line_width(3.0 / k);
		ctx.stroke();
	}
	if state.is_expanding(&node.id) {
		ctx.begin_path();
		let _ = ctx.arc(x, y, radius + 4.0 / k, 0.0, 2.0 * PI);
		let _ = ctx.set_line_dash(&js_sys::Array::of2(&JsValue::from_f64(3.0 / k), &JsValue::from_f64(3.0 / k)));
		ctx.set_stroke_style_str("rgba(255, 255, 255, 0.6)");
		ctx.set_line_width(1.0 / k);
		ctx.stroke();
		let _ = ctx.set_line_dash(&js_sys::Array::new());
	} else if node.expanded {
		ctx.begin_path();
		let _ = ctx.arc(x, y, radius + 2.5 / k, 0.0, 2.0 * PI);
		ctx.set_stroke_style_str("rgba(255, 255, 255, 0.35)");
		ctx.set_line_width(1.0 / k);
		ctx.stroke();
	}
}
