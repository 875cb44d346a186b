use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{HIT_COLUMNS, Hit, SampleMetadataEntry};
use crate::error::ToolkitError;
use crate::jsonapi::{JsonApiClient, Resource};
use crate::table::{Row, RowTable};

pub const SAMPLES: &str = "samples";
pub const RUNS: &str = "runs";
const SAMPLE_RELATIONSHIP: &str = "sample";
const SAMPLE_METADATA: &str = "sample-metadata";

/// Turns search hits into metadata rows by looking every accession up in the
/// metadata API.
pub struct MetadataResolver<'a, J: JsonApiClient> {
    api: &'a J,
}

impl<'a, J: JsonApiClient> MetadataResolver<'a, J> {
    pub fn new(api: &'a J) -> Self {
        Self { api }
    }

    /// Builds one row per hit/accession pair. A later pair with the same key
    /// replaces the earlier row.
    pub fn resolve(&self, hits: &[Hit]) -> Result<RowTable, ToolkitError> {
        let mut table = RowTable::new();
        for hit in hits {
            for accession in hit.accessions() {
                debug!("Accession {accession}");
                let key = hit.row_key(&accession);
                let row = self.resolve_accession(hit, &accession)?;
                table.insert(key, row);
            }
        }
        Ok(table)
    }

    fn resolve_accession(&self, hit: &Hit, accession: &str) -> Result<Row, ToolkitError> {
        let mut row: Row = hit
            .scalar_fields(accession)
            .into_iter()
            .map(|(column, value)| (column.to_string(), value))
            .collect();

        let Some(sample) = self.find_sample(accession)? else {
            debug!("no sample metadata for {accession}");
            return Ok(row);
        };

        for entry in sample_metadata(&sample)? {
            let column = entry.column();
            let value = entry.rendered_value();
            let previous = row.insert(column.clone(), value);
            if previous.is_some() && HIT_COLUMNS.contains(&column.as_str()) {
                warn!("metadata key {column} replaces hit field of {accession}");
            }
        }
        Ok(row)
    }

    /// Sample lookup with run fallback; `None` when neither exists.
    pub fn find_sample(&self, accession: &str) -> Result<Option<Resource>, ToolkitError> {
        match self.api.get(SAMPLES, accession) {
            Ok(sample) => return Ok(Some(sample)),
            Err(err) if err.is_not_found() => {
                debug!("{accession} is not a sample, trying runs");
            }
            Err(err) => return Err(err),
        }

        let run = match self.api.get(RUNS, accession) {
            Ok(run) => run,
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(err),
        };
        match self.api.related_one(&run, SAMPLE_RELATIONSHIP) {
            Ok(sample) => Ok(Some(sample)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// Metadata entries of a sample resource; absent or null means none.
pub fn sample_metadata(sample: &Resource) -> Result<Vec<SampleMetadataEntry>, ToolkitError> {
    match sample.attribute(SAMPLE_METADATA) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone()).map_err(|err| {
            ToolkitError::ApiHttp(format!(
                "malformed sample metadata for {}: {err}",
                sample.id
            ))
        }),
    }
}
