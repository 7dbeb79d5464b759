//! Cohort CLI - command-line interface for neurocohort
//!
//! Commands:
//! - subjects: Reconcile the registries and fuse the questionnaire
//! - assemble: Run the full pipeline to a longitudinal table
//! - split: Split a longitudinal table into first/last visit subtables
//! - scan: List metric files matching the naming grammar

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use neurocohort::pipeline::{CohortPipeline, PipelineConfig};
use neurocohort::restructure::{split_sessions, DEFAULT_MIN_SESSIONS};
use neurocohort::types::{LongitudinalRow, LongitudinalTable, MatchParams};
use neurocohort::{naming, sources, CohortError, COHORT_VERSION};

/// Cohort - assemble subject metadata and MRI metrics into longitudinal tables
#[derive(Parser)]
#[command(name = "cohort")]
#[command(version = COHORT_VERSION)]
#[command(about = "Assemble longitudinal cohort tables from MRI derivatives", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct RegistryArgs {
    /// Scanner-derived subject table (NDJSON or JSON array)
    #[arg(long)]
    scanner_table: PathBuf,

    /// Clinical-database subject table (NDJSON or JSON array)
    #[arg(long)]
    clinical_table: PathBuf,

    /// Self-report questionnaire table (NDJSON or JSON array)
    #[arg(long)]
    questionnaire: PathBuf,
}

#[derive(clap::Args)]
struct MatchArgs {
    /// Brain atlas the metrics were aggregated over
    #[arg(long, default_value = "brainnetome")]
    parcellation_scheme: String,

    #[arg(long, default_value = "wholeBrain")]
    parcellation_type: String,

    /// MRI acquisition code
    #[arg(long, default_value = "dt")]
    acquisition: String,

    /// Reconstruction software directory name
    #[arg(long, default_value = "dipy")]
    reconstruction_software: String,

    /// Aggregation measure (also a filename substring)
    #[arg(long, default_value = "nanmean")]
    measure: String,
}

impl From<MatchArgs> for MatchParams {
    fn from(args: MatchArgs) -> Self {
        MatchParams {
            parcellation_scheme: args.parcellation_scheme,
            parcellation_type: args.parcellation_type,
            acquisition: args.acquisition,
            reconstruction_software: args.reconstruction_software,
            measure: args.measure,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the registries and fuse the questionnaire
    Subjects {
        #[command(flatten)]
        registries: RegistryArgs,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Run the full pipeline to a longitudinal table
    Assemble {
        #[command(flatten)]
        registries: RegistryArgs,

        /// Root of the derivatives tree holding per-subject metric files
        #[arg(long)]
        metrics_root: PathBuf,

        #[command(flatten)]
        matching: MatchArgs,

        /// Minimum distinct sessions per participant
        #[arg(long, default_value_t = DEFAULT_MIN_SESSIONS)]
        min_sessions: usize,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Split a longitudinal table into first/last visit subtables
    Split {
        /// Longitudinal table (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output path for the first-visit subtable
        #[arg(long)]
        first: PathBuf,

        /// Output path for the last-visit subtable
        #[arg(long)]
        last: PathBuf,

        /// Keep participants whose first and last timestamps are identical
        #[arg(long)]
        keep_single_session: bool,

        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// List metric files matching the naming grammar
    Scan {
        /// Root of the derivatives tree
        #[arg(long)]
        metrics_root: PathBuf,

        #[command(flatten)]
        matching: MatchArgs,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one row per line)
    Ndjson,
    /// JSON array of rows
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CohortCliError> {
    match cli.command {
        Commands::Subjects {
            registries,
            output,
            output_format,
        } => cmd_subjects(registries, &output, output_format),

        Commands::Assemble {
            registries,
            metrics_root,
            matching,
            min_sessions,
            output,
            output_format,
        } => cmd_assemble(
            registries,
            metrics_root,
            matching.into(),
            min_sessions,
            &output,
            output_format,
        ),

        Commands::Split {
            input,
            first,
            last,
            keep_single_session,
            output_format,
        } => cmd_split(&input, &first, &last, keep_single_session, output_format),

        Commands::Scan {
            metrics_root,
            matching,
        } => cmd_scan(&metrics_root, &matching.into()),
    }
}

fn cmd_subjects(
    registries: RegistryArgs,
    output: &Path,
    output_format: OutputFormat,
) -> Result<(), CohortCliError> {
    let pipeline = CohortPipeline::new(PipelineConfig::new(
        registries.scanner_table,
        registries.clinical_table,
        registries.questionnaire,
        // The subjects stage never touches the metrics root
        PathBuf::new(),
    ));

    let subjects = pipeline.subjects()?;
    if subjects.is_empty() {
        return Err(CohortCliError::NoSubjects);
    }

    let rows: Vec<_> = subjects.iter().collect();
    write_output(output, &format_rows(&rows, &output_format)?)
}

fn cmd_assemble(
    registries: RegistryArgs,
    metrics_root: PathBuf,
    params: MatchParams,
    min_sessions: usize,
    output: &Path,
    output_format: OutputFormat,
) -> Result<(), CohortCliError> {
    let mut config = PipelineConfig::new(
        registries.scanner_table,
        registries.clinical_table,
        registries.questionnaire,
        metrics_root,
    );
    config.params = params;
    config.min_sessions = min_sessions;

    let table = CohortPipeline::new(config).assemble()?;
    if table.is_empty() {
        return Err(CohortCliError::EmptyTable);
    }

    write_output(output, &format_rows(&table.rows, &output_format)?)
}

fn cmd_split(
    input: &Path,
    first: &Path,
    last: &Path,
    keep_single_session: bool,
    output_format: OutputFormat,
) -> Result<(), CohortCliError> {
    let text = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let rows: Vec<LongitudinalRow> = if text.trim_start().starts_with('[') {
        sources::parse_array(&text)?
    } else {
        sources::parse_ndjson(&text)?
    };
    let table = LongitudinalTable { rows };

    let split = split_sessions(&table, !keep_single_session);
    write_output(first, &format_rows(&split.first.rows, &output_format)?)?;
    write_output(last, &format_rows(&split.last.rows, &output_format)?)
}

fn cmd_scan(metrics_root: &Path, params: &MatchParams) -> Result<(), CohortCliError> {
    let mut matched = 0usize;
    for entry in walkdir::WalkDir::new(metrics_root).sort_by_file_name() {
        let entry = entry.map_err(CohortError::from)?;
        if !entry.file_type().is_file()
            || !naming::matches_metric_file(entry.path(), params)
        {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        let subject = naming::subject_from_filename(&name)?;
        println!("{}\t{}", subject, entry.path().display());
        matched += 1;
    }
    println!("{} matching metric files", matched);
    Ok(())
}

// Helper functions

fn format_rows<T: Serialize>(
    rows: &[T],
    format: &OutputFormat,
) -> Result<String, CohortCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for row in rows {
                lines.push(serde_json::to_string(row)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(rows)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(rows)?),
    }
}

fn write_output(path: &Path, data: &str) -> Result<(), CohortCliError> {
    if path.to_string_lossy() == "-" {
        print!("{}", data);
    } else {
        fs::write(path, data)?;
    }
    Ok(())
}

// Error types

#[derive(Debug)]
enum CohortCliError {
    Io(io::Error),
    Cohort(CohortError),
    Json(serde_json::Error),
    NoSubjects,
    EmptyTable,
}

impl From<io::Error> for CohortCliError {
    fn from(e: io::Error) -> Self {
        CohortCliError::Io(e)
    }
}

impl From<CohortError> for CohortCliError {
    fn from(e: CohortError) -> Self {
        CohortCliError::Cohort(e)
    }
}

impl From<serde_json::Error> for CohortCliError {
    fn from(e: serde_json::Error) -> Self {
        CohortCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CohortCliError> for CliError {
    fn from(e: CohortCliError) -> Self {
        match e {
            CohortCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CohortCliError::Cohort(e) => CliError {
                code: "PIPELINE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check registry files and the derivatives tree".to_string()),
            },
            CohortCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            CohortCliError::NoSubjects => CliError {
                code: "NO_SUBJECTS".to_string(),
                message: "No subjects found in the registries".to_string(),
                hint: Some("Ensure the registry files are not empty".to_string()),
            },
            CohortCliError::EmptyTable => CliError {
                code: "EMPTY_TABLE".to_string(),
                message: "No participants left after session filtering".to_string(),
                hint: Some("Lower --min-sessions or check the metrics root".to_string()),
            },
        }
    }
}
