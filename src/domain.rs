use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ToolkitError;

static STUDY_ACCESSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(PRJ(EB|NA|DB)|[EDS]RP)\d+$").expect("study accession regex"));

/// Row columns filled from a hit, in output order.
pub const HIT_COLUMNS: [&str; 11] = [
    "accessions",
    "kg",
    "taxid",
    "name",
    "desc",
    "pvalue",
    "species",
    "score",
    "evalue",
    "nreported",
    "uniprot",
];

/// One record of `results.hits` in a sequence search response.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Hit {
    #[serde(default)]
    pub acc2: Option<String>,
    #[serde(default)]
    pub kg: Option<Value>,
    #[serde(default)]
    pub taxid: Option<Value>,
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub desc: Option<Value>,
    #[serde(default)]
    pub pvalue: Option<Value>,
    #[serde(default)]
    pub species: Option<Value>,
    #[serde(default)]
    pub score: Option<Value>,
    #[serde(default)]
    pub evalue: Option<Value>,
    #[serde(default)]
    pub nreported: Option<Value>,
    #[serde(default)]
    pub uniprot_link: Option<Vec<Value>>,
}

impl Hit {
    /// Accessions listed in `acc2`, with the `...` truncation marker and
    /// surrounding whitespace removed. Empty when `acc2` is absent.
    pub fn accessions(&self) -> Vec<String> {
        let Some(acc2) = self.acc2.as_deref() else {
            return Vec::new();
        };
        acc2.split(',')
            .map(clean_accession)
            .filter(|acc| !acc.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn name(&self) -> String {
        render_scalar(self.name.as_ref())
    }

    pub fn row_key(&self, accession: &str) -> String {
        format!("{} {}", self.name(), accession)
    }

    /// First element of every `uniprot_link` pair, comma-joined.
    pub fn uniprot_ids(&self) -> String {
        self.uniprot_link
            .iter()
            .flatten()
            .filter_map(|link| match link {
                Value::Array(items) => items.first().map(|id| render_scalar(Some(id))),
                other => Some(render_scalar(Some(other))),
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Scalar columns in output order, starting with the accession itself.
    pub fn scalar_fields(&self, accession: &str) -> Vec<(&'static str, String)> {
        vec![
            ("accessions", accession.to_string()),
            ("kg", render_scalar(self.kg.as_ref())),
            ("taxid", render_scalar(self.taxid.as_ref())),
            ("name", self.name()),
            ("desc", render_scalar(self.desc.as_ref())),
            ("pvalue", render_scalar(self.pvalue.as_ref())),
            ("species", render_scalar(self.species.as_ref())),
            ("score", render_scalar(self.score.as_ref())),
            ("evalue", render_scalar(self.evalue.as_ref())),
            ("nreported", render_scalar(self.nreported.as_ref())),
            ("uniprot", self.uniprot_ids()),
        ]
    }
}

fn clean_accession(raw: &str) -> &str {
    raw.trim().trim_matches('.').trim()
}

/// Text form of a JSON scalar as it appears in a CSV cell; null and missing
/// values are empty.
pub fn render_scalar(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SampleMetadataEntry {
    pub key: String,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub unit: Option<String>,
}

impl SampleMetadataEntry {
    pub fn column(&self) -> String {
        self.key.replace(' ', "_")
    }

    /// `"<value> <unit>"` with HTML entities in the unit decoded. The
    /// separator is kept even when the unit is empty.
    pub fn rendered_value(&self) -> String {
        let unit = match self.unit.as_deref() {
            Some(unit) if !unit.is_empty() => {
                html_escape::decode_html_entities(unit).into_owned()
            }
            _ => String::new(),
        };
        format!("{} {}", render_scalar(self.value.as_ref()), unit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudyAccession(String);

impl StudyAccession {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StudyAccession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StudyAccession {
    type Err = ToolkitError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_uppercase();
        if !STUDY_ACCESSION.is_match(&normalized) {
            return Err(ToolkitError::InvalidAccession(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// Pipeline release as shown on the MGnify website, e.g. `4.1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineVersion {
    V1,
    V2,
    V3,
    V4,
    V4_1,
}

impl PipelineVersion {
    pub const ALL: [PipelineVersion; 5] = [
        PipelineVersion::V1,
        PipelineVersion::V2,
        PipelineVersion::V3,
        PipelineVersion::V4,
        PipelineVersion::V4_1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineVersion::V1 => "1.0",
            PipelineVersion::V2 => "2.0",
            PipelineVersion::V3 => "3.0",
            PipelineVersion::V4 => "4.0",
            PipelineVersion::V4_1 => "4.1",
        }
    }

    /// Value of the `pipeline_version` filter on the analyses endpoint.
    pub fn api_filter(&self) -> &'static str {
        match self {
            PipelineVersion::V1 => "1",
            PipelineVersion::V2 => "2",
            PipelineVersion::V3 => "3",
            PipelineVersion::V4 => "4",
            PipelineVersion::V4_1 => "5",
        }
    }
}

impl fmt::Display for PipelineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PipelineVersion {
    type Err = ToolkitError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|version| version.as_str() == trimmed)
            .ok_or_else(|| ToolkitError::InvalidPipelineVersion(value.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultGroup {
    SequenceData,
    FunctionalAnalysis,
    TaxonomicAnalysis,
    TaxonomicAnalysisSsu,
    TaxonomicAnalysisLsu,
    Statistics,
    NonCodingRna,
}

impl ResultGroup {
    pub const ALL: [ResultGroup; 7] = [
        ResultGroup::SequenceData,
        ResultGroup::FunctionalAnalysis,
        ResultGroup::TaxonomicAnalysis,
        ResultGroup::TaxonomicAnalysisSsu,
        ResultGroup::TaxonomicAnalysisLsu,
        ResultGroup::Statistics,
        ResultGroup::NonCodingRna,
    ];

    /// `group-type` attribute of a download resource.
    pub fn group_type(&self) -> &'static str {
        match self {
            ResultGroup::SequenceData => "Sequence data",
            ResultGroup::FunctionalAnalysis => "Functional analysis",
            ResultGroup::TaxonomicAnalysis => "Taxonomic analysis",
            ResultGroup::TaxonomicAnalysisSsu => "Taxonomic analysis SSU rRNA",
            ResultGroup::TaxonomicAnalysisLsu => "Taxonomic analysis LSU rRNA",
            ResultGroup::Statistics => "Statistics",
            ResultGroup::NonCodingRna => "non-coding RNAs",
        }
    }

    pub fn folder(&self) -> &'static str {
        match self {
            ResultGroup::SequenceData => "sequence_data",
            ResultGroup::FunctionalAnalysis => "functional_analysis",
            ResultGroup::TaxonomicAnalysis => "taxonomic_analysis",
            ResultGroup::TaxonomicAnalysisSsu => "taxonomic_analysis_ssu",
            ResultGroup::TaxonomicAnalysisLsu => "taxonomic_analysis_lsu",
            ResultGroup::Statistics => "stats",
            ResultGroup::NonCodingRna => "non_coding_rna",
        }
    }

    pub fn from_group_type(group_type: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|group| group.group_type() == group_type)
    }
}

impl fmt::Display for ResultGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.folder())
    }
}

impl FromStr for ResultGroup {
    type Err = ToolkitError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|group| group.folder() == trimmed)
            .ok_or_else(|| ToolkitError::InvalidResultGroup(value.to_string()))
    }
}
