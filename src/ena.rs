use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::ResolvedConfig;
use crate::domain::StudyAccession;
use crate::error::ToolkitError;
use crate::http;

/// Tag/value pair from an ENA sample record. The value is optional in the
/// XML.
pub type SampleAttribute = (String, Option<String>);

pub trait EnaClient: Send + Sync {
    /// Secondary sample accessions of every run in a study, in portal order.
    fn sample_accessions(&self, study: &StudyAccession) -> Result<Vec<String>, ToolkitError>;
    fn sample_attributes(&self, sample: &str) -> Result<Vec<SampleAttribute>, ToolkitError>;
}

#[derive(Clone)]
pub struct EnaHttpClient {
    client: Client,
    portal_url: String,
    browser_url: String,
}

impl EnaHttpClient {
    pub fn new(config: &ResolvedConfig) -> Result<Self, ToolkitError> {
        let client = http::build_client(config.timeout)
            .map_err(|err| ToolkitError::EnaHttp(err.to_string()))?;
        Ok(Self {
            client,
            portal_url: config.ena_portal_url.clone(),
            browser_url: config.ena_browser_url.clone(),
        })
    }
}

impl EnaClient for EnaHttpClient {
    fn sample_accessions(&self, study: &StudyAccession) -> Result<Vec<String>, ToolkitError> {
        debug!("GET {} for {study}", self.portal_url);
        let response = self
            .client
            .get(&self.portal_url)
            .query(&[
                ("result", "read_run".to_string()),
                ("query", format!("study_accession=\"{study}\"")),
                ("fields", "secondary_sample_accession".to_string()),
                ("format", "json".to_string()),
            ])
            .send()
            .map_err(|err| ToolkitError::EnaHttp(err.to_string()))?;
        match response.status() {
            StatusCode::NO_CONTENT => return Ok(Vec::new()),
            StatusCode::BAD_REQUEST => {
                return Err(ToolkitError::InvalidAccession(study.to_string()));
            }
            status if !status.is_success() => {
                let (status, message) = http::failure_parts(response, "ENA portal request failed");
                return Err(ToolkitError::EnaStatus { status, message });
            }
            _ => {}
        }
        let body = response
            .text()
            .map_err(|err| ToolkitError::EnaHttp(err.to_string()))?;
        parse_portal_runs(&body).ok_or_else(|| ToolkitError::InvalidAccession(study.to_string()))
    }

    fn sample_attributes(&self, sample: &str) -> Result<Vec<SampleAttribute>, ToolkitError> {
        let url = format!("{}/{}", self.browser_url, sample);
        debug!("GET {url}");
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| ToolkitError::EnaHttp(err.to_string()))?;
        if !response.status().is_success() {
            let (status, message) = http::failure_parts(response, "ENA browser request failed");
            return Err(ToolkitError::EnaStatus { status, message });
        }
        let body = response
            .text()
            .map_err(|err| ToolkitError::EnaHttp(err.to_string()))?;
        parse_sample_attributes(&body)
    }
}

#[derive(Debug, Deserialize)]
struct PortalRun {
    #[serde(default)]
    secondary_sample_accession: Option<String>,
}

/// Sample accessions from a portal JSON body, or `None` when the body is not
/// JSON (the portal answers unknown studies with plain text).
pub fn parse_portal_runs(body: &str) -> Option<Vec<String>> {
    if body.trim().is_empty() {
        return Some(Vec::new());
    }
    let runs: Vec<PortalRun> = serde_json::from_str(body).ok()?;
    Some(
        runs.into_iter()
            .filter_map(|run| run.secondary_sample_accession)
            .filter(|acc| !acc.is_empty())
            .collect(),
    )
}

#[derive(Debug, Default, Deserialize)]
struct SampleSetXml {
    #[serde(rename = "SAMPLE", default)]
    samples: Vec<SampleXml>,
}

#[derive(Debug, Default, Deserialize)]
struct SampleXml {
    #[serde(rename = "SAMPLE_ATTRIBUTES", default)]
    attributes: Option<SampleAttributesXml>,
}

#[derive(Debug, Default, Deserialize)]
struct SampleAttributesXml {
    #[serde(rename = "SAMPLE_ATTRIBUTE", default)]
    items: Vec<SampleAttributeXml>,
}

#[derive(Debug, Default, Deserialize)]
struct SampleAttributeXml {
    #[serde(rename = "TAG", default)]
    tag: Option<String>,
    #[serde(rename = "VALUE", default)]
    value: Option<String>,
}

/// Reads `SAMPLE/SAMPLE_ATTRIBUTES/SAMPLE_ATTRIBUTE` entries from an ENA
/// sample record. Attributes without a tag are skipped.
pub fn parse_sample_attributes(xml: &str) -> Result<Vec<SampleAttribute>, ToolkitError> {
    let set: SampleSetXml =
        quick_xml::de::from_str(xml).map_err(|err| ToolkitError::EnaParse(err.to_string()))?;
    Ok(set
        .samples
        .into_iter()
        .filter_map(|sample| sample.attributes)
        .flat_map(|attributes| attributes.items)
        .filter_map(|item| item.tag.map(|tag| (tag, item.value)))
        .collect())
}
