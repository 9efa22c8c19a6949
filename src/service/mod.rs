//! Client side of the graph query service.

use async_trait::async_trait;

use crate::error::Result;
use crate::graph::expansion::AncestorPath;
use crate::graph::types::PropertyMap;

mod http;
#[cfg(test)]
pub(crate) mod mock;
mod payload;

pub use http::HttpQueryService;
pub use payload::{
	ConnectionInfo, ElementDecoder, ElementPayload, GraphPayload, QueryDescriptor, QueryMapping, SearchResult,
	TablePayload,
};

/// Top-level search for one catalog query.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchRequest {
	pub query: String,
	pub text_search: Option<String>,
	pub limit: u32,
	pub months: u32,
}

/// Neighborhood fetch for one node, scoped by the path that led to it.
#[derive(Clone, Debug, PartialEq)]
pub struct NeighborRequest {
	/// Model id of the node being expanded.
	pub node_id: String,
	/// Backend identity sent to the service.
	pub original_id: String,
	pub node_type: String,
	pub limit: u32,
	pub months: u32,
	pub query_key: Option<String>,
	pub ancestors: AncestorPath,
	/// Session generation the request was issued in.
	pub generation: u64,
}

/// The external services the explorer consumes.
#[async_trait(?Send)]
pub trait QueryService {
	async fn queries(&self) -> Result<Vec<QueryDescriptor>>;

	async fn search(&self, request: &SearchRequest) -> Result<SearchResult>;

	async fn neighbors(&self, request: &NeighborRequest) -> Result<GraphPayload>;

	async fn node_properties(&self, node_id: &str) -> Result<PropertyMap>;

	async fn edge_properties(&self, edge_id: &str) -> Result<PropertyMap>;

	async fn connection_info(&self) -> Result<ConnectionInfo>;
}
