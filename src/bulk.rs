use std::fs::{self, File};
use std::path::Path;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ResolvedConfig;
use crate::domain::{PipelineVersion, ResultGroup, StudyAccession};
use crate::error::ToolkitError;
use crate::http;
use crate::jsonapi::{JsonApiClient, Resource};

pub const ANALYSES: &str = "analyses";
const PAGE_SIZE: usize = 25;

/// Labels that amplicon analyses list but never actually produce.
pub const NON_AMPLICON_LABELS: [&str; 6] = [
    "Predicted CDS with annotation",
    "Predicted CDS without annotation",
    "Processed reads with annotation",
    "Processed reads without annotation",
    "Predicted ORF without annotation",
    "Processed reads with pCDS",
];

pub trait FileFetcher: Send + Sync {
    fn fetch(&self, url: &str, destination: &Path) -> Result<(), ToolkitError>;
}

#[derive(Clone)]
pub struct HttpFileFetcher {
    client: Client,
}

impl HttpFileFetcher {
    pub fn new(config: &ResolvedConfig) -> Result<Self, ToolkitError> {
        let client = http::build_client(config.timeout)
            .map_err(|err| ToolkitError::DownloadHttp(err.to_string()))?;
        Ok(Self { client })
    }
}

impl FileFetcher for HttpFileFetcher {
    fn fetch(&self, url: &str, destination: &Path) -> Result<(), ToolkitError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|err| ToolkitError::DownloadHttp(err.to_string()))?;
        if !response.status().is_success() {
            let (status, message) = http::failure_parts(response, "download failed");
            return Err(ToolkitError::DownloadStatus { status, message });
        }
        let mut file =
            File::create(destination).map_err(|err| ToolkitError::Filesystem(err.to_string()))?;
        std::io::copy(&mut response, &mut file)
            .map_err(|err| ToolkitError::DownloadHttp(err.to_string()))?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct BulkDownloadRequest {
    pub study: StudyAccession,
    pub pipeline_version: Option<PipelineVersion>,
    pub result_group: Option<ResultGroup>,
    pub output_path: Utf8PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct BulkDownloadSummary {
    pub analyses: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub files: Vec<Utf8PathBuf>,
}

/// Attributes of an analysis download the filtering rules look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadEntry {
    pub alias: String,
    pub label: String,
    pub group_type: String,
    pub url: String,
}

impl DownloadEntry {
    pub fn from_resource(resource: &Resource) -> Option<Self> {
        let alias = resource.attribute_str("alias")?.to_string();
        let label = resource
            .attribute("description")
            .and_then(|desc| desc.get("label"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let group_type = resource.attribute_str("group_type")?.to_string();
        let url = resource.self_link()?.to_string();
        Some(Self {
            alias,
            label,
            group_type,
            url,
        })
    }
}

/// Why a listed download is not fetched; `None` means keep it.
pub fn skip_reason(
    experiment_type: &str,
    pipeline_version: &str,
    entry: &DownloadEntry,
    wanted: Option<ResultGroup>,
) -> Option<&'static str> {
    if experiment_type == "amplicon" && NON_AMPLICON_LABELS.contains(&entry.label.as_str()) {
        return Some("not produced for amplicon analyses");
    }
    if entry.label == "Phylogenetic tree" && pipeline_version == PipelineVersion::V2.as_str() {
        return Some("phylogenetic trees are unavailable for pipeline 2.0");
    }
    let group = ResultGroup::from_group_type(&entry.group_type);
    match (wanted, group) {
        (_, None) => Some("unknown result group"),
        (Some(wanted), Some(group)) if wanted != group => Some("other result group"),
        _ => None,
    }
}

/// True when `name` is exactly one normal path component, so joining it
/// cannot leave the target directory.
pub fn is_plain_name(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Utf8Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Utf8Component::Normal(_)), None)
    )
}

pub struct BulkDownloader<'a, J: JsonApiClient, F: FileFetcher> {
    api: &'a J,
    fetcher: &'a F,
}

impl<'a, J: JsonApiClient, F: FileFetcher> BulkDownloader<'a, J, F> {
    pub fn new(api: &'a J, fetcher: &'a F) -> Self {
        Self { api, fetcher }
    }

    pub fn run(
        &self,
        request: &BulkDownloadRequest,
    ) -> Result<BulkDownloadSummary, ToolkitError> {
        let version_label = request
            .pipeline_version
            .map(|v| v.to_string())
            .unwrap_or_else(|| "Not specified".to_string());
        info!("Project: {}", request.study);
        info!("Pipeline version: {version_label}");
        info!(
            "Result group: {}",
            request
                .result_group
                .map(|g| g.to_string())
                .unwrap_or_else(|| "Not specified".to_string())
        );
        info!("Output directory: {}", request.output_path);

        let mut filters = vec![
            ("study_accession", request.study.to_string()),
            ("page_size", PAGE_SIZE.to_string()),
        ];
        if let Some(version) = request.pipeline_version {
            filters.push(("pipeline_version", version.api_filter().to_string()));
        }

        let mut summary = BulkDownloadSummary::default();
        for analysis in self.api.iterate(ANALYSES, &filters)? {
            summary.analyses += 1;
            self.download_analysis(&analysis, request, &mut summary)?;
        }

        if summary.downloaded == 0 {
            warn!(
                "Could not retrieve any results for study {} (pipeline version: {version_label})",
                request.study
            );
        }
        Ok(summary)
    }

    fn download_analysis(
        &self,
        analysis: &Resource,
        request: &BulkDownloadRequest,
        summary: &mut BulkDownloadSummary,
    ) -> Result<(), ToolkitError> {
        let accession = analysis.attribute_str("accession").unwrap_or(&analysis.id);
        let pipeline_version = analysis.attribute_str("pipeline_version").unwrap_or_default();
        let experiment_type = analysis.attribute_str("experiment_type").unwrap_or_default();
        let run = analysis
            .relationships
            .get("run")
            .and_then(|rel| rel.data.as_ref())
            .and_then(|linkage| linkage.identifiers().first().map(|ident| ident.id.clone()))
            .unwrap_or_default();
        info!("{accession}, {pipeline_version}, {run}, {experiment_type}");

        for resource in self.api.related(analysis, "downloads")? {
            let Some(entry) = DownloadEntry::from_resource(&resource) else {
                debug!("download {} has no alias, group or link", resource.id);
                summary.skipped += 1;
                continue;
            };
            if let Some(reason) =
                skip_reason(experiment_type, pipeline_version, &entry, request.result_group)
            {
                debug!("skipping {}: {reason}", entry.alias);
                summary.skipped += 1;
                continue;
            }
            let Some(group) = ResultGroup::from_group_type(&entry.group_type) else {
                summary.skipped += 1;
                continue;
            };
            if !is_plain_name(&entry.alias) || !is_plain_name(pipeline_version) {
                warn!(
                    "skipping {:?} (pipeline {pipeline_version:?}): not a plain file name",
                    entry.alias
                );
                summary.skipped += 1;
                continue;
            }
            let dir = request
                .output_path
                .join(request.study.as_str())
                .join(pipeline_version)
                .join(group.folder());
            let destination = dir.join(&entry.alias);
            self.fetch_into(&entry.url, &dir, &destination)?;
            summary.downloaded += 1;
            summary.files.push(destination);
        }
        Ok(())
    }

    fn fetch_into(
        &self,
        url: &str,
        dir: &Utf8Path,
        destination: &Utf8Path,
    ) -> Result<(), ToolkitError> {
        info!("Downloading {url}");
        info!("Saving file in: {destination}");
        fs::create_dir_all(dir.as_std_path())
            .map_err(|err| ToolkitError::Filesystem(err.to_string()))?;
        let part = Utf8PathBuf::from(format!("{destination}.part"));
        if let Err(err) = self.fetcher.fetch(url, part.as_std_path()) {
            let _ = fs::remove_file(part.as_std_path());
            return Err(err);
        }
        fs::rename(part.as_std_path(), destination.as_std_path())
            .map_err(|err| ToolkitError::Filesystem(err.to_string()))?;
        info!("Download finished.");
        Ok(())
    }
}
