use std::rc::Rc;

use leptos::prelude::*;
use leptos::task::spawn_local;
use log::{error, info, warn};

use crate::components::force_graph::{
	ElementKind, ForceGraphCanvas, GraphRequest, Selection, display_value, property_rows,
};
use crate::config::ExplorerConfig;
use crate::service::{ConnectionInfo, HttpQueryService, QueryDescriptor, QueryService, TablePayload};

#[derive(Clone, Debug, PartialEq)]
enum PropertiesView {
	Idle,
	Loading,
	Loaded(Vec<(String, String)>),
	Failed,
}

/// Columns of the result table: the query's display list, else every key.
fn table_columns(query: Option<&QueryDescriptor>, table: &TablePayload) -> Vec<String> {
	match query.and_then(|q| q.table_display.as_ref()) {
		Some(keys) if !keys.is_empty() => keys.clone(),
		_ => table.keys.clone(),
	}
}

/// Makes `query` the active one. A new query starts without a filter.
fn choose_query(active_query: RwSignal<Option<QueryDescriptor>>, text_search: RwSignal<String>, query: QueryDescriptor) {
	active_query.set(Some(query));
	text_search.set(String::new());
}

/// Explorer page: query catalog, search form, canvas and side panels.
#[component]
pub fn Home() -> impl IntoView {
	let config = ExplorerConfig::load();
	let service = match HttpQueryService::new(&config.api_base) {
		Ok(service) => Some(Rc::new(service)),
		Err(e) => {
			error!("Query service unavailable: {e}");
			None
		}
	};

	let queries = RwSignal::new(Vec::<QueryDescriptor>::new());
	let connection = RwSignal::new(None::<ConnectionInfo>);
	let active_query = RwSignal::new(None::<QueryDescriptor>);
	let text_search = RwSignal::new(String::new());
	let limit = RwSignal::new(config.search_limit);
	let nonce = RwSignal::new(0u64);
	let request = RwSignal::new(None::<GraphRequest>);
	let selection = RwSignal::new(None::<Selection>);
	let legend = RwSignal::new(Vec::<(String, String)>::new());
	let table = RwSignal::new(None::<TablePayload>);
	let status = RwSignal::new(None::<String>);
	let properties = RwSignal::new(PropertiesView::Idle);
	let zoom = RwSignal::new(1.0_f64);
	let node_spacing = RwSignal::new(config.node_spacing);
	let edge_length = RwSignal::new(config.edge_length);

	let run_search = move || {
		let Some(query) = active_query.get_untracked() else {
			return;
		};
		nonce.update(|n| *n += 1);
		request.set(Some(GraphRequest {
			query,
			text_search: text_search.get_untracked(),
			limit: limit.get_untracked(),
			nonce: nonce.get_untracked(),
		}));
	};

	if let Some(service) = service.clone() {
		spawn_local(async move {
			match service.queries().await {
				Ok(list) => {
					info!("Loaded {} catalog queries", list.len());
					let first = list.first().cloned();
					queries.set(list);
					if first.is_some() {
						active_query.set(first);
						run_search();
					}
				}
				Err(e) => {
					error!("Loading the query catalog failed: {e}");
					status.set(Some(format!("Could not load queries: {e}")));
				}
			}
			match service.connection_info().await {
				Ok(info) => connection.set(Some(info)),
				Err(e) => warn!("Connection info unavailable: {e}"),
			}
		});
	}

	let service_props = service.clone();
	Effect::new(move |_| {
		let Some(selected) = selection.get() else {
			properties.set(PropertiesView::Idle);
			return;
		};
		let Some(service) = service_props.clone() else {
			return;
		};
		properties.set(PropertiesView::Loading);
		spawn_local(async move {
			let result = match selected.kind {
				ElementKind::Node => service.node_properties(&selected.backend_id).await,
				ElementKind::Edge => service.edge_properties(&selected.backend_id).await,
			};
			if selection.get_untracked().as_ref() != Some(&selected) {
				return;
			}
			match result {
				Ok(map) => properties.set(PropertiesView::Loaded(property_rows(map))),
				Err(e) => {
					warn!("Properties of {} failed: {e}", selected.backend_id);
					properties.set(PropertiesView::Failed);
				}
			}
		});
	});

	let query_nav = move || {
		queries
			.get()
			.into_iter()
			.map(|q| {
				let is_active = active_query.with(|a| a.as_ref().is_some_and(|a| a.name == q.name));
				let title = q.title();
				let description = q.description.clone();
				view! {
					<li class:active=is_active title=description>
						<a href="#" on:click=move |ev| {
							ev.prevent_default();
							choose_query(active_query, text_search, q.clone());
							run_search();
						}>{title}</a>
					</li>
				}
			})
			.collect_view()
	};

	let properties_panel = move || match properties.get() {
		PropertiesView::Idle => view! { <p class="hint">"Click a node or edge to see its properties."</p> }.into_any(),
		PropertiesView::Loading => view! { <p class="hint">"Loading"</p> }.into_any(),
		PropertiesView::Failed => view! { <p class="error">"Error loading properties."</p> }.into_any(),
		PropertiesView::Loaded(rows) => view! {
			<h3>{move || selection.get().map(|s| s.title).unwrap_or_default()}</h3>
			<dl>
				{rows
					.into_iter()
					.map(|(k, v)| view! { <dt>{k}</dt><dd>{v}</dd> })
					.collect_view()}
			</dl>
		}
		.into_any(),
	};

	let legend_panel = move || {
		legend
			.get()
			.into_iter()
			.map(|(node_type, color)| {
				view! {
					<li>
						<span class="swatch" style=format!("background-color: {color}")></span>
						{node_type}
					</li>
				}
			})
			.collect_view()
	};

	let result_table = move || {
		let table = table.get()?;
		let columns = table_columns(active_query.get().as_ref(), &table);
		let header = columns.iter().map(|c| view! { <th>{c.clone()}</th> }).collect_view();
		let rows = table
			.records
			.iter()
			.map(|record| {
				let cells = columns
					.iter()
					.map(|c| view! { <td>{record.get(c).map(display_value).unwrap_or_default()}</td> })
					.collect_view();
				view! { <tr>{cells}</tr> }
			})
			.collect_view();
		Some(view! {
			<table class="result-table">
				<thead><tr>{header}</tr></thead>
				<tbody>{rows}</tbody>
			</table>
		})
	};

	let banner = move || {
		connection
			.get()
			.map(|c| format!("Connected as {} to {}", c.user_name, c.database_name))
			.unwrap_or_default()
	};

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>
			<header class="explorer-header">
				<h1>"Graph Explorer"</h1>
				<span class="connection">{banner}</span>
				<span class="status">{move || status.get().unwrap_or_default()}</span>
			</header>
			<div class="explorer">
				<nav class="query-list">
					<ul>{query_nav}</ul>
				</nav>
				<main class="explorer-main">
					<form class="search" on:submit=move |ev| {
						ev.prevent_default();
						run_search();
					}>
						<input
							type="text"
							placeholder="Filter"
							prop:value=move || text_search.get()
							on:input=move |ev| text_search.set(event_target_value(&ev))
						/>
						<input
							type="number"
							min="1"
							prop:value=move || limit.get().to_string()
							on:input=move |ev| {
								if let Ok(n) = event_target_value(&ev).parse::<u32>() {
									limit.set(n.max(1));
								}
							}
						/>
						<button type="submit">"Search"</button>
					</form>
					<div class="graph-controls">
						<label>
							"Zoom"
							<input
								type="range"
								min="0.1"
								max="10"
								step="0.1"
								prop:value=move || zoom.get().to_string()
								on:input=move |ev| {
									if let Ok(k) = event_target_value(&ev).parse::<f64>() {
										zoom.set(k);
									}
								}
							/>
						</label>
						<label>
							"Edge length"
							<input
								type="range"
								min="20"
								max="400"
								step="10"
								prop:value=move || edge_length.get().to_string()
								on:change=move |ev| {
									if let Ok(n) = event_target_value(&ev).parse::<f64>() {
										edge_length.set(n);
									}
								}
							/>
						</label>
						<label>
							"Node spacing"
							<input
								type="range"
								min="5"
								max="150"
								step="5"
								prop:value=move || node_spacing.get().to_string()
								on:change=move |ev| {
									if let Ok(n) = event_target_value(&ev).parse::<f64>() {
										node_spacing.set(n);
									}
								}
							/>
						</label>
					</div>
					<div class="graph-container" style="position: relative;">
						<ForceGraphCanvas
							config=config
							request=request
							selection=selection
							legend=legend
							table=table
							status=status
							zoom=zoom
							node_spacing=node_spacing
							edge_length=edge_length
						/>
					</div>
					{result_table}
				</main>
				<aside class="side-panel">
					<section class="properties">{properties_panel}</section>
					<section class="legend">
						<ul>{legend_panel}</ul>
					</section>
				</aside>
			</div>
		</ErrorBoundary>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn choosing_a_query_clears_the_filter() {
		let owner = Owner::new();
		owner.with(|| {
			let active_query = RwSignal::new(None::<QueryDescriptor>);
			let text_search = RwSignal::new("ada".to_string());
			let query = QueryDescriptor {
				name: "fraud_rings".into(),
				..Default::default()
			};
			choose_query(active_query, text_search, query);
			assert_eq!(text_search.get_untracked(), "");
			assert_eq!(active_query.get_untracked().map(|q| q.name), Some("fraud_rings".to_string()));
		});
	}

	#[test]
	fn table_columns_prefer_the_query_display_list() {
		let table = TablePayload {
			records: vec![],
			keys: vec!["a".into(), "b".into()],
		};
		let mut query = QueryDescriptor::default();
		assert_eq!(table_columns(Some(&query), &table), vec!["a", "b"]);
		query.table_display = Some(vec!["b".into()]);
		assert_eq!(table_columns(Some(&query), &table), vec!["b"]);
		assert_eq!(table_columns(None, &table), vec!["a", "b"]);
	}
}
