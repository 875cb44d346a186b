use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use miette::IntoDiagnostic;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mg_toolkit::app::Toolkit;
use mg_toolkit::bulk::{BulkDownloadRequest, HttpFileFetcher};
use mg_toolkit::config::{ConfigLoader, ResolvedConfig};
use mg_toolkit::domain::{PipelineVersion, ResultGroup, StudyAccession};
use mg_toolkit::ena::EnaHttpClient;
use mg_toolkit::error::ToolkitError;
use mg_toolkit::jsonapi::JsonApiHttpClient;
use mg_toolkit::search::SearchHttpClient;

type HttpToolkit = Toolkit<SearchHttpClient, JsonApiHttpClient, EnaHttpClient, HttpFileFetcher>;

#[derive(Parser)]
#[command(name = "mg-toolkit")]
#[command(about = "EBI metagenomics toolkit")]
#[command(version, author)]
struct Cli {
    /// Tool to run
    tool: Tool,

    /// Study accessions, e.g. PRJEB1787 or ERP001736
    #[arg(short, long, num_args = 1..)]
    accession: Vec<String>,

    /// FASTA files to submit to the sequence search
    #[arg(short, long, num_args = 1..)]
    sequence: Vec<String>,

    /// Output file name
    #[arg(short, long)]
    export: Option<String>,

    /// Download directory for bulk_download (default: current directory)
    #[arg(short, long)]
    output_path: Option<String>,

    /// Pipeline version filter for bulk_download, e.g. 4.1
    #[arg(short = 'v', long)]
    pipeline_version: Option<String>,

    /// Result group filter for bulk_download, e.g. taxonomic_analysis
    #[arg(short = 'g', long)]
    result_group: Option<String>,

    /// JSON config file overriding service endpoints
    #[arg(long)]
    config: Option<String>,

    /// Print debugging information
    #[arg(short, long)]
    debug: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Tool {
    #[value(name = "sequence_search", alias = "sequence-search")]
    SequenceSearch,
    #[value(name = "original_metadata", alias = "original-metadata")]
    OriginalMetadata,
    #[value(name = "bulk_download", alias = "bulk-download")]
    BulkDownload,
}

impl Tool {
    fn name(self) -> &'static str {
        match self {
            Tool::SequenceSearch => "sequence_search",
            Tool::OriginalMetadata => "original_metadata",
            Tool::BulkDownload => "bulk_download",
        }
    }
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<ToolkitError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ToolkitError) -> u8 {
    match error {
        ToolkitError::InvalidAccession(_)
        | ToolkitError::InvalidPipelineVersion(_)
        | ToolkitError::InvalidResultGroup(_)
        | ToolkitError::MissingArgument { .. }
        | ToolkitError::ConfigRead(_)
        | ToolkitError::ConfigParse(_)
        | ToolkitError::SequenceRead { .. }
        | ToolkitError::ResourceNotFound { .. } => 2,
        ToolkitError::SearchHttp(_)
        | ToolkitError::SearchStatus { .. }
        | ToolkitError::ApiHttp(_)
        | ToolkitError::ApiStatus { .. }
        | ToolkitError::EnaHttp(_)
        | ToolkitError::EnaStatus { .. }
        | ToolkitError::EnaParse(_)
        | ToolkitError::DownloadHttp(_)
        | ToolkitError::DownloadStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let toolkit = build_toolkit(&config)?;

    match cli.tool {
        Tool::SequenceSearch => run_sequence_search(&cli, &toolkit),
        Tool::OriginalMetadata => run_original_metadata(&cli, &toolkit),
        Tool::BulkDownload => run_bulk_download(&cli, &toolkit),
    }
}

fn build_toolkit(config: &ResolvedConfig) -> Result<HttpToolkit, ToolkitError> {
    Ok(Toolkit::new(
        SearchHttpClient::new(config)?,
        JsonApiHttpClient::new(config)?,
        EnaHttpClient::new(config)?,
        HttpFileFetcher::new(config)?,
    ))
}

fn missing(tool: Tool, argument: &str) -> ToolkitError {
    ToolkitError::MissingArgument {
        tool: tool.name().to_string(),
        argument: argument.to_string(),
    }
}

fn run_sequence_search(cli: &Cli, toolkit: &HttpToolkit) -> miette::Result<()> {
    if cli.sequence.is_empty() {
        return Err(missing(cli.tool, "--sequence").into());
    }
    let files: Vec<Utf8PathBuf> = cli.sequence.iter().map(Utf8PathBuf::from).collect();
    let export = cli.export.as_deref().map(Utf8PathBuf::from);
    let results = toolkit.sequence_search(&files, export.as_deref())?;
    for result in &results {
        info!(
            "{} -> {} ({} hits, {} rows)",
            result.sequence_file, result.output, result.hits, result.rows
        );
    }
    Ok(())
}

fn run_original_metadata(cli: &Cli, toolkit: &HttpToolkit) -> miette::Result<()> {
    if cli.accession.is_empty() {
        return Err(missing(cli.tool, "--accession").into());
    }
    toolkit.original_metadata(&cli.accession, cli.export.as_deref())?;
    Ok(())
}

fn run_bulk_download(cli: &Cli, toolkit: &HttpToolkit) -> miette::Result<()> {
    let Some(accession) = cli.accession.first() else {
        return Err(missing(cli.tool, "--accession").into());
    };
    let study: StudyAccession = accession.parse()?;
    let pipeline_version = cli
        .pipeline_version
        .as_deref()
        .map(str::parse::<PipelineVersion>)
        .transpose()?;
    let result_group = cli
        .result_group
        .as_deref()
        .map(str::parse::<ResultGroup>)
        .transpose()?;
    let output_path = match cli.output_path.as_deref() {
        Some(path) => Utf8PathBuf::from(path),
        None => {
            let cwd = std::env::current_dir().into_diagnostic()?;
            Utf8PathBuf::from_path_buf(cwd).map_err(|path| {
                ToolkitError::Filesystem(format!("non UTF-8 working directory {}", path.display()))
            })?
        }
    };

    let request = BulkDownloadRequest {
        study,
        pipeline_version,
        result_group,
        output_path,
    };
    let summary = toolkit.bulk_download(&request)?;
    info!(
        "Program finished: {} analyses, {} files downloaded, {} skipped",
        summary.analyses, summary.downloaded, summary.skipped
    );
    Ok(())
}
