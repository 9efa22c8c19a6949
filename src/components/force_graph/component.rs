use std::cell::RefCell;
use std::rc::Rc;

use leptos::html::Canvas;
use leptos::prelude::*;
use leptos::task::spawn_local;
use log::{debug, error, info, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent};

use super::render;
use super::state::ForceGraphState;
use super::types::{ElementKind, GraphRequest, Selection, Tooltip, TooltipBody, property_rows};
use crate::config::ExplorerConfig;
use crate::graph::ExpansionOutcome;
use crate::service::{HttpQueryService, QueryService, SearchRequest, TablePayload};

type Shared<T> = Rc<RefCell<Option<T>>>;

fn pointer(canvas_ref: NodeRef<Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get_untracked()?;
	let rect = canvas.get_bounding_client_rect();
	Some((ev.client_x() as f64 - rect.left(), ev.client_y() as f64 - rect.top()))
}

/// Follows the pointer with a tooltip, fetching properties once per element.
fn track_tooltip(
	tooltip: RwSignal<Option<Tooltip>>,
	service: Option<Rc<HttpQueryService>>,
	target: Option<Selection>,
	x: f64,
	y: f64,
) {
	let Some(target) = target else {
		if tooltip.with_untracked(Option::is_some) {
			tooltip.set(None);
		}
		return;
	};
	if tooltip.with_untracked(|t| t.as_ref().is_some_and(|t| t.target == target)) {
		tooltip.update(|t| {
			if let Some(t) = t {
				t.x = x;
				t.y = y;
			}
		});
		return;
	}
	let Some(service) = service else {
		tooltip.set(Some(Tooltip {
			target,
			x,
			y,
			body: TooltipBody::Missing,
		}));
		return;
	};
	tooltip.set(Some(Tooltip {
		target: target.clone(),
		x,
		y,
		body: TooltipBody::Loading,
	}));
	spawn_local(async move {
		let result = match target.kind {
			ElementKind::Node => service.node_properties(&target.backend_id).await,
			ElementKind::Edge => service.edge_properties(&target.backend_id).await,
		};
		let body = match result {
			Ok(map) => TooltipBody::Properties(property_rows(map)),
			Err(e) => {
				debug!("Tooltip properties of {} unavailable: {e}", target.backend_id);
				TooltipBody::Missing
			}
		};
		tooltip.update(|t| {
			if let Some(t) = t.as_mut().filter(|t| t.target == target) {
				t.body = body;
			}
		});
	});
}

fn parent_size(canvas: &HtmlCanvasElement) -> (f64, f64) {
	canvas
		.parent_element()
		.map(|p| (p.client_width() as f64, p.client_height() as f64))
		.filter(|(w, h)| *w > 0.0 && *h > 0.0)
		.unwrap_or((800.0, 600.0))
}

/// Canvas explorer view. Runs `request` searches, expands nodes on
/// double-click and reports selection, legend and table changes upward.
/// `zoom` is kept in sync both ways; `node_spacing` and `edge_length`
/// changes lay the graph out again.
#[component]
pub fn ForceGraphCanvas(
	config: ExplorerConfig,
	#[prop(into)] request: Signal<Option<GraphRequest>>,
	selection: RwSignal<Option<Selection>>,
	legend: RwSignal<Vec<(String, String)>>,
	table: RwSignal<Option<TablePayload>>,
	status: RwSignal<Option<String>>,
	zoom: RwSignal<f64>,
	#[prop(into)] node_spacing: Signal<f64>,
	#[prop(into)] edge_length: Signal<f64>,
) -> impl IntoView {
	let tooltip = RwSignal::new(None::<Tooltip>);
	let canvas_ref = NodeRef::<Canvas>::new();
	let state: Shared<ForceGraphState> = Rc::new(RefCell::new(None));
	let animate: Shared<Closure<dyn FnMut()>> = Rc::new(RefCell::new(None));
	let resize_cb: Shared<Closure<dyn FnMut()>> = Rc::new(RefCell::new(None));
	let service = match HttpQueryService::new(&config.api_base) {
		Ok(service) => Some(Rc::new(service)),
		Err(e) => {
			error!("Query service unavailable: {e}");
			None
		}
	};
	let months = config.months;

	let (state_init, animate_init, resize_cb_init) = (state.clone(), animate.clone(), resize_cb.clone());
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let Some(window) = web_sys::window() else {
			return;
		};
		let (w, h) = parent_size(&canvas);
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let ctx = match canvas.get_context("2d") {
			Ok(Some(ctx)) => ctx.dyn_into::<CanvasRenderingContext2d>().ok(),
			_ => None,
		};
		let Some(ctx) = ctx else {
			error!("Canvas 2d context unavailable");
			return;
		};
		*state_init.borrow_mut() = Some(ForceGraphState::new(&config, w, h));
		info!("Explorer canvas ready ({w}x{h})");

		let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
		*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
			let (nw, nh) = parent_size(&canvas_resize);
			canvas_resize.set_width(nw as u32);
			canvas_resize.set_height(nh as u32);
			if let Some(ref mut s) = *state_resize.borrow_mut() {
				s.resize(nw, nh);
			}
		}));
		if let Some(ref cb) = *resize_cb_init.borrow() {
			let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
		}

		let (state_anim, animate_inner) = (state_init.clone(), animate_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			if let Some(ref mut s) = *state_anim.borrow_mut() {
				s.tick(0.016);
				render::render(s, &ctx);
			}
			if let (Some(cb), Some(win)) = (animate_inner.borrow().as_ref(), web_sys::window()) {
				let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let (state_search, service_search) = (state.clone(), service.clone());
	Effect::new(move |_| {
		let Some(req) = request.get() else {
			return;
		};
		let Some(service) = service_search.clone() else {
			return;
		};
		let state = state_search.clone();
		status.set(Some(format!("Loading {}...", req.query.title())));
		spawn_local(async move {
			let search = SearchRequest {
				query: req.query.name.clone(),
				text_search: Some(req.text_search.clone()),
				limit: req.limit,
				months,
			};
			let result = service.search(&search).await;
			// A newer search supersedes this one.
			if request.get_untracked().is_some_and(|current| current.nonce != req.nonce) {
				debug!("Dropping stale search result for {}", req.query.name);
				return;
			}
			match result {
				Ok(result) => {
					let fitted = state.borrow_mut().as_mut().map(|s| {
						s.load(req.query.clone(), result.graph);
						(s.legend(), s.transform.k)
					});
					match fitted {
						Some((types, k)) => {
							legend.set(types);
							zoom.set(k);
						}
						None => warn!("Search finished before the canvas was ready"),
					}
					tooltip.set(None);
					table.set(Some(result.table));
					selection.set(None);
					status.set(None);
				}
				Err(e) => {
					error!("Search {} failed: {e}", req.query.name);
					status.set(Some(format!("Search failed: {e}")));
				}
			}
		});
	});

	let state_zoom = state.clone();
	Effect::new(move |_| {
		let k = zoom.get();
		if let Some(ref mut s) = *state_zoom.borrow_mut() {
			if (s.transform.k - k).abs() > 1e-6 {
				s.set_zoom(k);
			}
		}
	});

	let state_layout = state.clone();
	Effect::new(move |_| {
		let (spacing, length) = (node_spacing.get(), edge_length.get());
		let fitted = state_layout.borrow_mut().as_mut().map(|s| {
			s.set_node_spacing(spacing);
			s.set_edge_length(length);
			s.transform.k
		});
		if let Some(k) = fitted {
			zoom.set(k);
		}
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_md.borrow_mut() {
			if let Some(id) = s.node_at_position(x, y) {
				s.begin_drag(&id, x, y);
			} else {
				s.pan.active = true;
				s.pan.start_x = x;
				s.pan.start_y = y;
				s.pan.transform_start_x = s.transform.x;
				s.pan.transform_start_y = s.transform.y;
			}
		}
	};

	let (state_mm, service_tip) = (state.clone(), service.clone());
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		let target = {
			let mut guard = state_mm.borrow_mut();
			let Some(s) = guard.as_mut() else {
				return;
			};
			if s.drag.active {
				s.drag_to(x, y);
				None
			} else {
				let hovered = s.node_at_position(x, y);
				s.set_hover(hovered);
				if s.pan.active {
					s.transform.x = s.pan.transform_start_x + (x - s.pan.start_x);
					s.transform.y = s.pan.transform_start_y + (y - s.pan.start_y);
					s.refresh_labels();
					None
				} else {
					s.element_at(x, y)
				}
			}
		};
		track_tooltip(tooltip, service_tip.clone(), target, x, y);
	};

	let state_mu = state.clone();
	let on_mouseup = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_mu.borrow_mut() {
			s.end_drag();
			s.pan.active = false;
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			s.end_drag();
			s.pan.active = false;
			s.set_hover(None);
		}
		tooltip.set(None);
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		let factor = if ev.delta_y() > 0.0 { 0.9 } else { 1.1 };
		let zoomed = state_wh.borrow_mut().as_mut().map(|s| {
			s.zoom_at(x, y, factor);
			s.transform.k
		});
		if let Some(k) = zoomed {
			zoom.set(k);
		}
	};

	let state_click = state.clone();
	let on_click = move |ev: MouseEvent| {
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_click.borrow_mut() {
			let picked = s.select_at(x, y);
			if selection.get_untracked() != picked {
				selection.set(picked);
			}
		}
	};

	let state_dbl = state.clone();
	let on_dblclick = move |ev: MouseEvent| {
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		let pending = {
			let mut guard = state_dbl.borrow_mut();
			let Some(s) = guard.as_mut() else {
				return;
			};
			let Some(id) = s.node_at_position(x, y) else {
				return;
			};
			let pending = s.activate(&id);
			legend.set(s.legend());
			if selection.get_untracked() != s.selected {
				selection.set(s.selected.clone());
			}
			pending
		};
		let (Some(req), Some(service)) = (pending, service.clone()) else {
			return;
		};
		let state = state_dbl.clone();
		spawn_local(async move {
			let result = service.neighbors(&req).await;
			if let Some(ref mut s) = *state.borrow_mut() {
				match s.finish_expansion(&req, result) {
					ExpansionOutcome::Expanded { added_nodes, added_edges } => {
						debug!("Expanded {}: +{} nodes, +{} edges", req.node_id, added_nodes.len(), added_edges.len())
					}
					ExpansionOutcome::Empty => status.set(Some(format!("No further neighbors for {}", req.node_id))),
					ExpansionOutcome::Discarded => debug!("Discarded stale expansion of {}", req.node_id),
				}
				legend.set(s.legend());
			}
		});
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="force-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			on:click=on_click
			on:dblclick=on_dblclick
			style="display: block; cursor: grab;"
		/>
		{move || {
			tooltip
				.get()
				.map(|tip| {
					let body = match tip.body {
						TooltipBody::Loading => view! { <p>"Loading properties..."</p> }.into_any(),
						TooltipBody::Missing => view! { <p>"No properties found."</p> }.into_any(),
						TooltipBody::Properties(rows) => view! {
							<ul>
								{rows
									.into_iter()
									.map(|(k, v)| view! { <li><strong>{k}": "</strong>{v}</li> })
									.collect_view()}
							</ul>
						}
						.into_any(),
					};
					view! {
						<div
							class="graph-tooltip"
							style=format!(
								"position: absolute; left: {}px; top: {}px; pointer-events: none;",
								tip.x + 12.0,
								tip.y + 12.0,
							)
						>
							<b>{tip.target.title}</b>
							{body}
						</div>
					}
				})
		}}
	}
}
