use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, error, info};

use crate::bulk::{BulkDownloadRequest, BulkDownloadSummary, BulkDownloader, FileFetcher};
use crate::domain::StudyAccession;
use crate::ena::EnaClient;
use crate::error::ToolkitError;
use crate::jsonapi::JsonApiClient;
use crate::resolver::MetadataResolver;
use crate::search::SequenceSearchClient;
use crate::table::{Row, RowTable};

pub const DEFAULT_SEARCH_EXPORT: &str = "search_metadata.csv";

#[derive(Debug, Clone)]
pub struct SearchFileResult {
    pub sequence_file: Utf8PathBuf,
    pub output: Utf8PathBuf,
    pub hits: usize,
    pub rows: usize,
}

#[derive(Debug, Clone)]
pub struct StudyMetadataResult {
    pub accession: String,
    pub samples: usize,
    pub output: Option<Utf8PathBuf>,
}

/// Runs the toolkit operations against a set of service clients.
#[derive(Clone)]
pub struct Toolkit<S, J, E, F>
where
    S: SequenceSearchClient,
    J: JsonApiClient,
    E: EnaClient,
    F: FileFetcher,
{
    search: S,
    api: J,
    ena: E,
    fetcher: F,
}

impl<S, J, E, F> Toolkit<S, J, E, F>
where
    S: SequenceSearchClient,
    J: JsonApiClient,
    E: EnaClient,
    F: FileFetcher,
{
    pub fn new(search: S, api: J, ena: E, fetcher: F) -> Self {
        Self {
            search,
            api,
            ena,
            fetcher,
        }
    }

    /// Searches every FASTA file in turn and writes the resolved metadata
    /// table. Each file's table replaces the previous one at `export`.
    pub fn sequence_search(
        &self,
        sequence_files: &[Utf8PathBuf],
        export: Option<&Utf8Path>,
    ) -> Result<Vec<SearchFileResult>, ToolkitError> {
        let output = export
            .map(Utf8Path::to_path_buf)
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_SEARCH_EXPORT));
        let mut results = Vec::with_capacity(sequence_files.len());
        for file in sequence_files {
            let result = self.search_file(file, &output)?;
            results.push(result);
        }
        Ok(results)
    }

    fn search_file(
        &self,
        file: &Utf8Path,
        output: &Utf8Path,
    ) -> Result<SearchFileResult, ToolkitError> {
        let sequence =
            fs::read_to_string(file.as_std_path()).map_err(|err| ToolkitError::SequenceRead {
                path: file.as_std_path().to_path_buf(),
                message: err.to_string(),
            })?;
        debug!("Sequence {sequence}");

        let response = self.search.search(&sequence)?;
        let hits = response.results.hits;
        info!("{file}: {} hits", hits.len());

        let table = MetadataResolver::new(&self.api).resolve(&hits)?;
        table.write_csv(output)?;
        info!("{file}: wrote {} rows to {output}", table.len());

        Ok(SearchFileResult {
            sequence_file: file.to_path_buf(),
            output: output.to_path_buf(),
            hits: hits.len(),
            rows: table.len(),
        })
    }

    /// Collects ENA sample attributes for each study. Unknown studies are
    /// logged and skipped.
    pub fn original_metadata(
        &self,
        accessions: &[String],
        export: Option<&str>,
    ) -> Result<Vec<StudyMetadataResult>, ToolkitError> {
        let mut results = Vec::new();
        for accession in accessions {
            debug!("{accession}");
            let table = match self.study_table(accession) {
                Ok(table) => table,
                Err(ToolkitError::InvalidAccession(value)) => {
                    error!("{value:?} is not valid.");
                    continue;
                }
                Err(err) => return Err(err),
            };

            let output = match export {
                Some(export) => {
                    let path = Utf8PathBuf::from(format!("{accession}_{export}"));
                    table.write_csv(&path)?;
                    info!("{accession}: wrote {} samples to {path}", table.len());
                    Some(path)
                }
                None => {
                    info!("\n{}", table.to_pretty_string());
                    None
                }
            };
            results.push(StudyMetadataResult {
                accession: accession.clone(),
                samples: table.len(),
                output,
            });
        }
        Ok(results)
    }

    fn study_table(&self, accession: &str) -> Result<RowTable, ToolkitError> {
        let study: StudyAccession = accession.parse()?;
        // Sample tables carry an unnamed index column.
        let mut table = RowTable::with_index("");
        for sample in self.ena.sample_accessions(&study)? {
            if table.get(&sample).is_some() {
                continue;
            }
            let row: Row = self
                .ena
                .sample_attributes(&sample)?
                .into_iter()
                .map(|(tag, value)| (tag, value.unwrap_or_default()))
                .collect();
            table.insert(sample, row);
        }
        Ok(table)
    }

    pub fn bulk_download(
        &self,
        request: &BulkDownloadRequest,
    ) -> Result<BulkDownloadSummary, ToolkitError> {
        BulkDownloader::new(&self.api, &self.fetcher).run(request)
    }
}
