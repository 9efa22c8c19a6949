use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use url::Url;

use super::{
	ConnectionInfo, GraphPayload, NeighborRequest, QueryDescriptor, QueryService, SearchRequest, SearchResult,
};
use crate::error::{ExplorerError, Result};
use crate::graph::expansion::AncestorPath;
use crate::graph::types::PropertyMap;

/// [`QueryService`] over the explorer's JSON HTTP API.
#[derive(Clone, Debug)]
pub struct HttpQueryService {
	client: reqwest::Client,
	base: Url,
}

impl HttpQueryService {
	pub fn new(api_base: &str) -> Result<Self> {
		Ok(Self {
			client: reqwest::Client::new(),
			base: Url::parse(api_base)?,
		})
	}

	/// Joins percent-encoded path segments onto the base URL.
	pub fn endpoint(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Url> {
		let mut url = self.base.clone();
		url.path_segments_mut()
			.map_err(|_| ExplorerError::Config(format!("{} cannot be a base URL", self.base)))?
			.pop_if_empty()
			.extend(segments);
		if !query.is_empty() {
			url.query_pairs_mut().extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
		}
		Ok(url)
	}

	async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
		debug!("GET {url}");
		let response = self.client.get(url.clone()).send().await?;
		let status = response.status();
		if !status.is_success() {
			return Err(ExplorerError::Status {
				status: status.as_u16(),
				url: url.to_string(),
			});
		}
		let body = response.text().await?;
		Ok(serde_json::from_str(&body)?)
	}

	pub fn neighbors_url(&self, request: &NeighborRequest) -> Result<Url> {
		let mut query = vec![
			("limit", request.limit.to_string()),
			("months", request.months.to_string()),
			("node_type", request.node_type.clone()),
		];
		if let Some(key) = &request.query_key {
			query.push(("query_key", key.clone()));
		}
		if !request.ancestors.is_empty() {
			query.push(("ancestors", serde_json::to_string(&AncestorObject(&request.ancestors))?));
		}
		self.endpoint(&["api", "nodes", &request.original_id, "neighbors"], &query)
	}

	pub fn search_url(&self, request: &SearchRequest) -> Result<Url> {
		let mut query = vec![("limit", request.limit.to_string()), ("months", request.months.to_string())];
		if let Some(text) = request.text_search.as_deref().filter(|t| !t.is_empty()) {
			query.push(("text_search", text.to_string()));
		}
		self.endpoint(&["api", "search", &request.query], &query)
	}
}

/// The ancestor path as a `{type: id}` object, nearest ancestor first.
struct AncestorObject<'a>(&'a AncestorPath);

impl Serialize for AncestorObject<'_> {
	fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		serializer.collect_map(self.0.pairs())
	}
}

#[async_trait(?Send)]
impl QueryService for HttpQueryService {
	async fn queries(&self) -> Result<Vec<QueryDescriptor>> {
		self.get_json(self.endpoint(&["api", "queries"], &[])?).await
	}

	async fn search(&self, request: &SearchRequest) -> Result<SearchResult> {
		self.get_json(self.search_url(request)?).await
	}

	async fn neighbors(&self, request: &NeighborRequest) -> Result<GraphPayload> {
		let result: SearchResult = self.get_json(self.neighbors_url(request)?).await?;
		Ok(result.graph)
	}

	async fn node_properties(&self, node_id: &str) -> Result<PropertyMap> {
		self.get_json(self.endpoint(&["api", "nodes", node_id, "properties"], &[])?).await
	}

	async fn edge_properties(&self, edge_id: &str) -> Result<PropertyMap> {
		self.get_json(self.endpoint(&["api", "edges", edge_id, "properties"], &[])?).await
	}

	async fn connection_info(&self) -> Result<ConnectionInfo> {
		self.get_json(self.endpoint(&["api", "connection-info"], &[])?).await
	}
}
