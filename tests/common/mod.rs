#![allow(dead_code)]

pub mod loopback;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use serde_json::Value;

use mg_toolkit::bulk::FileFetcher;
use mg_toolkit::domain::StudyAccession;
use mg_toolkit::ena::{EnaClient, SampleAttribute};
use mg_toolkit::error::ToolkitError;
use mg_toolkit::jsonapi::{JsonApiClient, Resource};
use mg_toolkit::search::{SearchResponse, SequenceSearchClient};

pub fn resource(value: Value) -> Resource {
    serde_json::from_value(value).unwrap()
}

pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{name}")).unwrap()
}

#[derive(Default)]
pub struct MockSearch {
    pub response: Value,
    pub calls: Mutex<Vec<String>>,
}

impl MockSearch {
    pub fn new(response: Value) -> Self {
        Self {
            response,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl SequenceSearchClient for MockSearch {
    fn search(&self, sequence: &str) -> Result<SearchResponse, ToolkitError> {
        self.calls.lock().unwrap().push(sequence.to_string());
        serde_json::from_value(self.response.clone())
            .map_err(|err| ToolkitError::SearchHttp(err.to_string()))
    }
}

/// In-memory metadata API. Lookups of resources that were never added fail
/// with `ResourceNotFound`, except for ids listed in `broken`.
#[derive(Default)]
pub struct MockApi {
    pub resources: HashMap<(String, String), Resource>,
    pub pages: HashMap<String, Vec<Resource>>,
    pub analyses: Vec<Resource>,
    pub broken: Vec<String>,
    pub calls: Mutex<Vec<String>>,
    pub filters: Mutex<Vec<(String, String)>>,
}

impl MockApi {
    pub fn with(mut self, value: Value) -> Self {
        let res = resource(value);
        self.resources
            .insert((res.kind.clone(), res.id.clone()), res);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl JsonApiClient for MockApi {
    fn get(&self, collection: &str, id: &str) -> Result<Resource, ToolkitError> {
        self.calls.lock().unwrap().push(format!("{collection}/{id}"));
        if self.broken.iter().any(|b| b == id) {
            return Err(ToolkitError::ApiStatus {
                status: 500,
                message: "internal error".to_string(),
            });
        }
        self.resources
            .get(&(collection.to_string(), id.to_string()))
            .cloned()
            .ok_or_else(|| ToolkitError::ResourceNotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })
    }

    fn fetch_all(&self, url: &str) -> Result<Vec<Resource>, ToolkitError> {
        self.calls.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| ToolkitError::ApiStatus {
                status: 404,
                message: format!("{url} not found"),
            })
    }

    fn iterate(
        &self,
        collection: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<Resource>, ToolkitError> {
        self.calls.lock().unwrap().push(collection.to_string());
        let mut recorded = self.filters.lock().unwrap();
        for (key, value) in filters {
            recorded.push((key.to_string(), value.clone()));
        }
        Ok(self.analyses.clone())
    }
}

#[derive(Default)]
pub struct MockEna {
    pub studies: HashMap<String, Vec<String>>,
    pub samples: HashMap<String, Vec<SampleAttribute>>,
}

impl EnaClient for MockEna {
    fn sample_accessions(&self, study: &StudyAccession) -> Result<Vec<String>, ToolkitError> {
        self.studies
            .get(study.as_str())
            .cloned()
            .ok_or_else(|| ToolkitError::InvalidAccession(study.to_string()))
    }

    fn sample_attributes(&self, sample: &str) -> Result<Vec<SampleAttribute>, ToolkitError> {
        self.samples
            .get(sample)
            .cloned()
            .ok_or_else(|| ToolkitError::EnaStatus {
                status: 404,
                message: sample.to_string(),
            })
    }
}

/// Writes the URL into the destination instead of downloading it.
#[derive(Default)]
pub struct MockFetcher {
    pub urls: Mutex<Vec<String>>,
}

impl FileFetcher for MockFetcher {
    fn fetch(&self, url: &str, destination: &Path) -> Result<(), ToolkitError> {
        self.urls.lock().unwrap().push(url.to_string());
        std::fs::write(destination, url).map_err(|err| ToolkitError::Filesystem(err.to_string()))
    }
}
