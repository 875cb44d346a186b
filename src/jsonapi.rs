//! Minimal JSON:API client for the MGnify metadata service.
//!
//! Only the parts of the document model the toolkit reads are modelled:
//! primary data, error objects, relationships and pagination links.

use std::collections::BTreeMap;

use reqwest::{StatusCode, Url};
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::ResolvedConfig;
use crate::error::ToolkitError;
use crate::http;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub data: Option<PrimaryData>,
    #[serde(default)]
    pub errors: Vec<ErrorObject>,
    #[serde(default)]
    pub links: Option<Links>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PrimaryData {
    Many(Vec<Resource>),
    One(Box<Resource>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorObject {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Links {
    #[serde(default, rename = "self")]
    pub self_link: Option<Link>,
    #[serde(default)]
    pub related: Option<Link>,
    #[serde(default)]
    pub next: Option<Link>,
}

/// A link is either a bare URL or a link object with an `href`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Link {
    Href(String),
    Object { href: String },
}

impl Link {
    pub fn href(&self) -> &str {
        match self {
            Link::Href(href) | Link::Object { href } => href.as_str(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Identifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Linkage {
    Many(Vec<Identifier>),
    One(Identifier),
}

impl Linkage {
    pub fn identifiers(&self) -> Vec<&Identifier> {
        match self {
            Linkage::Many(items) => items.iter().collect(),
            Linkage::One(item) => vec![item],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Relationship {
    #[serde(default)]
    pub data: Option<Linkage>,
    #[serde(default)]
    pub links: Option<Links>,
}

impl Relationship {
    pub fn related_url(&self) -> Option<&str> {
        self.links
            .as_ref()
            .and_then(|links| links.related.as_ref())
            .map(Link::href)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub relationships: BTreeMap<String, Relationship>,
    #[serde(default)]
    pub links: Option<Links>,
}

impl Resource {
    /// Looks up an attribute, accepting either the dasherized member name the
    /// API emits or its underscored form.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes
            .get(name)
            .or_else(|| self.attributes.get(&name.replace('_', "-")))
            .or_else(|| self.attributes.get(&name.replace('-', "_")))
    }

    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(Value::as_str)
    }

    pub fn self_link(&self) -> Option<&str> {
        self.links
            .as_ref()
            .and_then(|links| links.self_link.as_ref())
            .map(Link::href)
    }

    fn not_found(&self, relationship: &str) -> ToolkitError {
        ToolkitError::ResourceNotFound {
            collection: self.kind.clone(),
            id: format!("{}/{relationship}", self.id),
        }
    }
}

pub trait JsonApiClient: Send + Sync {
    /// Fetches `<collection>/<id>`. A missing resource is reported as
    /// [`ToolkitError::ResourceNotFound`].
    fn get(&self, collection: &str, id: &str) -> Result<Resource, ToolkitError>;

    /// Fetches every resource reachable from `url`, following `links.next`.
    fn fetch_all(&self, url: &str) -> Result<Vec<Resource>, ToolkitError>;

    /// Walks all pages of a filtered collection.
    fn iterate(
        &self,
        collection: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<Resource>, ToolkitError>;

    /// Dereferences a relationship, preferring resource linkage over the
    /// `related` link.
    fn related(
        &self,
        resource: &Resource,
        relationship: &str,
    ) -> Result<Vec<Resource>, ToolkitError> {
        let rel = resource
            .relationships
            .get(relationship)
            .ok_or_else(|| resource.not_found(relationship))?;
        if let Some(linkage) = &rel.data {
            return linkage
                .identifiers()
                .into_iter()
                .map(|ident| self.get(&ident.kind, &ident.id))
                .collect();
        }
        match rel.related_url() {
            Some(url) => self.fetch_all(url),
            None => Err(resource.not_found(relationship)),
        }
    }

    /// Dereferences a to-one relationship.
    fn related_one(
        &self,
        resource: &Resource,
        relationship: &str,
    ) -> Result<Resource, ToolkitError> {
        self.related(resource, relationship)?
            .into_iter()
            .next()
            .ok_or_else(|| resource.not_found(relationship))
    }
}

#[derive(Clone)]
pub struct JsonApiHttpClient {
    client: Client,
    base_url: String,
}

impl JsonApiHttpClient {
    pub fn new(config: &ResolvedConfig) -> Result<Self, ToolkitError> {
        let client = http::build_client(config.timeout)
            .map_err(|err| ToolkitError::ApiHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: config.api_base.clone(),
        })
    }

    /// Appends percent-encoded path segments to the API base.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ToolkitError> {
        endpoint_url(&self.base_url, segments)
    }

    fn fetch_document(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<(StatusCode, Document), ToolkitError> {
        debug!("GET {url}");
        let response = self
            .client
            .get(url)
            .query(query)
            .header(ACCEPT, "application/vnd.api+json, application/json")
            .send()
            .map_err(|err| ToolkitError::ApiHttp(err.to_string()))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok((status, Document::default()));
        }
        if !status.is_success() {
            let (status, message) = http::failure_parts(response, "metadata API request failed");
            return Err(ToolkitError::ApiStatus { status, message });
        }
        let document: Document = response
            .json()
            .map_err(|err| ToolkitError::ApiHttp(err.to_string()))?;
        Ok((status, document))
    }
}

impl JsonApiClient for JsonApiHttpClient {
    fn get(&self, collection: &str, id: &str) -> Result<Resource, ToolkitError> {
        let url = self.endpoint(&[collection, id])?;
        let (status, document) = self.fetch_document(url.as_str(), &[])?;
        let not_found = || ToolkitError::ResourceNotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        };
        if status == StatusCode::NOT_FOUND {
            return Err(not_found());
        }
        check_errors(&document, &not_found)?;
        match document.data {
            Some(PrimaryData::One(resource)) => Ok(*resource),
            Some(PrimaryData::Many(_)) => Err(ToolkitError::ApiHttp(format!(
                "expected a single resource at {url}"
            ))),
            None => Err(not_found()),
        }
    }

    fn fetch_all(&self, url: &str) -> Result<Vec<Resource>, ToolkitError> {
        self.collect_pages(url.to_string(), &[])
    }

    fn iterate(
        &self,
        collection: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<Resource>, ToolkitError> {
        let url = self.endpoint(&[collection])?;
        self.collect_pages(url.into(), filters)
    }
}

impl JsonApiHttpClient {
    fn collect_pages(
        &self,
        first: String,
        filters: &[(&str, String)],
    ) -> Result<Vec<Resource>, ToolkitError> {
        let mut resources = Vec::new();
        let mut next = Some(first);
        let mut query = filters;
        while let Some(url) = next.take() {
            let (status, document) = self.fetch_document(&url, query)?;
            if status == StatusCode::NOT_FOUND {
                return Err(ToolkitError::ApiStatus {
                    status: status.as_u16(),
                    message: format!("{url} not found"),
                });
            }
            check_errors(&document, || ToolkitError::ApiStatus {
                status: 404,
                message: format!("{url} not found"),
            })?;
            match document.data {
                Some(PrimaryData::Many(items)) => resources.extend(items),
                Some(PrimaryData::One(item)) => resources.push(*item),
                None => {}
            }
            // `next` links already carry the filter query.
            query = &[];
            next = document
                .links
                .and_then(|links| links.next)
                .map(|link| link.href().to_string());
        }
        Ok(resources)
    }
}

fn endpoint_url(base: &str, segments: &[&str]) -> Result<Url, ToolkitError> {
    let invalid = || ToolkitError::ApiHttp(format!("invalid metadata API base URL {base}"));
    let mut url = Url::parse(base).map_err(|_| invalid())?;
    url.path_segments_mut()
        .map_err(|_| invalid())?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Turns a JSON:API `errors` document into an error; a 404 error object maps
/// to `not_found`.
fn check_errors<F>(document: &Document, not_found: F) -> Result<(), ToolkitError>
where
    F: FnOnce() -> ToolkitError,
{
    let Some(first) = document.errors.first() else {
        return Ok(());
    };
    if document
        .errors
        .iter()
        .any(|err| err.status.as_deref() == Some("404"))
    {
        return Err(not_found());
    }
    let status = first
        .status
        .as_deref()
        .and_then(|status| status.parse().ok())
        .unwrap_or(0);
    let message = first
        .detail
        .clone()
        .unwrap_or_else(|| "metadata API reported an error".to_string());
    Err(ToolkitError::ApiStatus { status, message })
}
