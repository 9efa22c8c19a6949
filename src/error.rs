//! Error types for the explorer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExplorerError {
	#[error("Transport error: {0}")]
	Transport(#[from] reqwest::Error),

	#[error("Request to {url} failed with status {status}")]
	Status { status: u16, url: String },

	#[error("Malformed payload: {0}")]
	Payload(#[from] serde_json::Error),

	#[error("Invalid URL: {0}")]
	Url(#[from] url::ParseError),

	#[error("Unknown node: {0}")]
	UnknownNode(String),

	#[error("Expansion already in flight for node {0}")]
	InFlight(String),

	#[error("Configuration error: {0}")]
	Config(String),
}

pub type Result<T> = std::result::Result<T, ExplorerError>;
