use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Deserialize;
use tracing::debug;

use crate::config::ResolvedConfig;
use crate::domain::Hit;
use crate::error::ToolkitError;
use crate::http;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    pub results: SearchResults,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub hits: Vec<Hit>,
}

pub trait SequenceSearchClient: Send + Sync {
    /// Submits a raw FASTA payload against the full sequence database.
    fn search(&self, sequence: &str) -> Result<SearchResponse, ToolkitError>;
}

#[derive(Clone)]
pub struct SearchHttpClient {
    client: Client,
    url: String,
}

impl SearchHttpClient {
    pub fn new(config: &ResolvedConfig) -> Result<Self, ToolkitError> {
        let client = http::build_client(config.timeout)
            .map_err(|err| ToolkitError::SearchHttp(err.to_string()))?;
        Ok(Self {
            client,
            url: config.search_url.clone(),
        })
    }
}

impl SequenceSearchClient for SearchHttpClient {
    fn search(&self, sequence: &str) -> Result<SearchResponse, ToolkitError> {
        debug!("POST {}", self.url);
        let response = self
            .client
            .post(&self.url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&[("seqdb", "full"), ("seq", sequence)])
            .send()
            .map_err(|err| ToolkitError::SearchHttp(err.to_string()))?;
        if !response.status().is_success() {
            let (status, message) = http::failure_parts(response, "sequence search failed");
            return Err(ToolkitError::SearchStatus { status, message });
        }
        response
            .json()
            .map_err(|err| ToolkitError::SearchHttp(err.to_string()))
    }
}
