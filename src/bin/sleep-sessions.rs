//! Sleep Sessions CLI - command-line interface for the reconstruction engine
//!
//! Commands:
//! - reconstruct: Turn sample records into daily sleep summaries
//! - validate: Report problems in sample records
//! - doctor: Diagnose configuration and environment

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use sleep_sessions::schema::{SampleAdapter, SampleRecord, SCHEMA_VERSION};
use sleep_sessions::{
    DailySleepSummary, ReconstructError, ReconstructionConfig, SessionReconstructor,
    ENGINE_VERSION, PRODUCER_NAME,
};

/// Reconstruct daily sleep sessions from wearable interval samples
#[derive(Parser)]
#[command(name = "sleep-sessions")]
#[command(author = "Synheart AI Inc")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Reconstruct daily sleep sessions from wearable samples", long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct daily sleep summaries from sample records
    Reconstruct {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Reconstruction config file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Offset from UTC in minutes used for calendar days (overrides config)
        #[arg(long, allow_hyphen_values = true)]
        utc_offset_minutes: Option<i32>,

        /// Emit the full report (summaries plus stage statistics)
        #[arg(long)]
        report: bool,
    },

    /// Validate sample records
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check a reconstruction config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one daily summary per line)
    Ndjson,
    /// JSON array of daily summaries
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

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

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> Result<(), CliFailure> {
    match cli.command {
        Commands::Reconstruct {
            input,
            output,
            input_format,
            output_format,
            config,
            utc_offset_minutes,
            report,
        } => cmd_reconstruct(
            &input,
            &output,
            input_format,
            output_format,
            config.as_deref(),
            utc_offset_minutes,
            report,
        ),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn cmd_reconstruct(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    config_path: Option<&Path>,
    utc_offset_minutes: Option<i32>,
    report: bool,
) -> Result<(), CliFailure> {
    let mut config = match config_path {
        Some(path) => ReconstructionConfig::from_json(&fs::read_to_string(path)?)?,
        None => ReconstructionConfig::default(),
    };
    if let Some(offset) = utc_offset_minutes {
        config = config.with_utc_offset_minutes(offset);
    }
    let reconstructor = SessionReconstructor::with_config(config)?;

    let records = read_records(input, &input_format)?;
    if records.is_empty() {
        return Err(CliFailure::NoRecords);
    }

    let result = reconstructor.reconstruct_records(&records);
    log::info!(
        "{} record(s) -> {} session(s) over {} day(s)",
        result.stats.input_samples,
        result.stats.sessions,
        result.summaries.len()
    );

    let output_data = if report {
        match output_format {
            OutputFormat::JsonPretty => serde_json::to_string_pretty(&result)?,
            OutputFormat::Ndjson | OutputFormat::Json => serde_json::to_string(&result)? + "\n",
        }
    } else {
        format_summaries(&result.summaries, &output_format)?
    };

    write_output(output, &output_data)
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), CliFailure> {
    let records = read_records(input, &input_format)?;
    let issues = SampleAdapter::validate_records(&records);

    let mut invalid_indices: Vec<usize> = issues.iter().map(|i| i.index).collect();
    invalid_indices.dedup();

    let report = ValidationReport {
        total_records: records.len(),
        valid_records: records.len() - invalid_indices.len(),
        invalid_records: invalid_indices.len(),
        issues: issues
            .iter()
            .map(|i| ValidationIssueDetail {
                index: i.index,
                source: i.source.clone(),
                issue: i.issue.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.issues.is_empty() {
            println!("\nIssues:");
            for issue in &report.issues {
                println!(
                    "  - Record {} (source {}): {}",
                    issue.index,
                    issue.source.as_deref().unwrap_or("unknown"),
                    issue.issue
                );
            }
        }
    }

    if report.invalid_records > 0 {
        Err(CliFailure::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

fn cmd_doctor(config_path: Option<&Path>, json: bool) -> Result<(), CliFailure> {
    let mut checks: Vec<DoctorCheck> = vec![
        DoctorCheck {
            name: "engine_version".to_string(),
            status: CheckStatus::Ok,
            message: format!("Engine version {}", ENGINE_VERSION),
        },
        DoctorCheck {
            name: "schema_version".to_string(),
            status: CheckStatus::Ok,
            message: format!("Input schema: {}", SCHEMA_VERSION),
        },
    ];

    if let Some(path) = config_path {
        checks.push(check_config(path));
    }

    checks.push(if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass -i <file>)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (-i - ready)".to_string(),
        }
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Sleep Sessions Doctor Report");
        println!("============================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(CliFailure::DoctorFailed)
    } else {
        Ok(())
    }
}

fn check_config(path: &Path) -> DoctorCheck {
    if !path.exists() {
        return DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Warning,
            message: "Config file does not exist; defaults apply".to_string(),
        };
    }

    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            return DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: format!("Cannot read config: {}", e),
            }
        }
    };

    match ReconstructionConfig::from_json(&content) {
        Ok(config) => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: format!(
                "Config valid (gap {} min, envelope ceiling {} h, noise floor {} min, offset {} min)",
                config.gap_threshold_minutes,
                config.max_envelope_hours,
                config.min_session_minutes,
                config.utc_offset_minutes
            ),
        },
        Err(e) => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        },
    }
}

// Helper functions

fn read_records(input: &Path, format: &InputFormat) -> Result<Vec<SampleRecord>, CliFailure> {
    let input_data = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let records = match format {
        InputFormat::Ndjson => SampleAdapter::parse_ndjson(&input_data)?,
        InputFormat::Json => SampleAdapter::parse_array(&input_data)?,
    };
    Ok(records)
}

fn write_output(output: &Path, data: &str) -> Result<(), CliFailure> {
    if output.to_string_lossy() == "-" {
        print!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

fn format_summaries(
    summaries: &[DailySleepSummary],
    format: &OutputFormat,
) -> Result<String, CliFailure> {
    match format {
        OutputFormat::Ndjson => {
            let mut out = String::new();
            for summary in summaries {
                out.push_str(&serde_json::to_string(summary)?);
                out.push('\n');
            }
            Ok(out)
        }
        OutputFormat::Json => Ok(serde_json::to_string(summaries)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(summaries)?),
    }
}

// Error types

#[derive(Debug)]
enum CliFailure {
    Io(io::Error),
    Engine(ReconstructError),
    Json(serde_json::Error),
    NoRecords,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for CliFailure {
    fn from(e: io::Error) -> Self {
        CliFailure::Io(e)
    }
}

impl From<ReconstructError> for CliFailure {
    fn from(e: ReconstructError) -> Self {
        CliFailure::Engine(e)
    }
}

impl From<serde_json::Error> for CliFailure {
    fn from(e: serde_json::Error) -> Self {
        CliFailure::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CliFailure> for CliError {
    fn from(e: CliFailure) -> Self {
        match e {
            CliFailure::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CliFailure::Engine(ReconstructError::InvalidConfig(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Run 'sleep-sessions doctor --config <file>'".to_string()),
            },
            CliFailure::Engine(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(format!("Ensure input matches the {} schema", SCHEMA_VERSION)),
            },
            CliFailure::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            CliFailure::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "No records found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            CliFailure::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Invalid records are skipped during reconstruct".to_string()),
            },
            CliFailure::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(Serialize)]
struct ValidationReport {
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    issues: Vec<ValidationIssueDetail>,
}

#[derive(Serialize)]
struct ValidationIssueDetail {
    index: usize,
    source: Option<String>,
    issue: String,
}

#[derive(Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
