//! Last Stand CLI - Command-line interface for the activity timeline engine
//!
//! Commands:
//! - summarize: Build an activity report from sample records
//! - validate: Validate sample record schema
//! - schema: Print input/output schema information
//! - doctor: Diagnose engine health and configuration

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use last_stand::encoder::REPORT_VERSION;
use last_stand::pipeline::{parse_now, ActivityEngine};
use last_stand::schema::{SampleAdapter, SampleRecord, SCHEMA_VERSION};
use last_stand::{EngineConfig, EngineError, ENGINE_VERSION, PRODUCER_NAME};

/// Last Stand - On-device activity timeline engine
#[derive(Parser)]
#[command(name = "laststand")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Turn step and stand-hour samples into an activity timeline", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an activity report from sample records
    Summarize {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Reference time (RFC 3339), e.g. 2024-01-01T09:12:00Z
        #[arg(long)]
        now: String,

        /// Engine config JSON file
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        overrides: ConfigOverrides,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Validate sample record schema
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

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },

    /// Diagnose engine health and configuration
    Doctor {
        /// Check an engine config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Per-field overrides applied on top of the config file
#[derive(Args)]
struct ConfigOverrides {
    /// Timeline bucket width (minutes)
    #[arg(long)]
    bucket_width: Option<u32>,

    /// Steps per bucket needed to be active
    #[arg(long)]
    active_threshold: Option<u64>,

    /// Last-activity freshness window (seconds)
    #[arg(long)]
    freshness_secs: Option<u32>,

    /// First hour of the work window
    #[arg(long)]
    work_start: Option<u32>,

    /// Hour the work window ends (exclusive)
    #[arg(long)]
    work_end: Option<u32>,

    /// Slot width for streak analysis (minutes)
    #[arg(long)]
    streak_resolution: Option<u32>,

    /// Steps per streak slot needed to be active
    #[arg(long)]
    minute_threshold: Option<u64>,

    /// Fixed UTC offset for day boundaries (minutes, e.g. -300)
    #[arg(long, allow_hyphen_values = true)]
    utc_offset_minutes: Option<i32>,
}

impl ConfigOverrides {
    fn apply(&self, mut config: EngineConfig) -> EngineConfig {
        if let Some(v) = self.bucket_width {
            config.bucket_width_minutes = v;
        }
        if let Some(v) = self.active_threshold {
            config.active_threshold = v;
        }
        if let Some(v) = self.freshness_secs {
            config.freshness_window_secs = v;
        }
        if let Some(v) = self.work_start {
            config.work_window.start_hour = v;
        }
        if let Some(v) = self.work_end {
            config.work_window.end_hour = v;
        }
        if let Some(v) = self.streak_resolution {
            config.streak_resolution_minutes = v;
        }
        if let Some(v) = self.minute_threshold {
            config.minute_active_threshold = v;
        }
        if let Some(v) = self.utc_offset_minutes {
            config.utc_offset_minutes = v;
        }
        config
    }
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
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input schema (activity.sample.v1)
    Input,
    /// Output schema (activity report)
    Output,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), LastStandCliError> {
    match cli.command {
        Commands::Summarize {
            input,
            output,
            now,
            config,
            overrides,
            input_format,
            output_format,
        } => cmd_summarize(
            &input,
            &output,
            &now,
            config.as_deref(),
            &overrides,
            input_format,
            output_format,
        ),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn cmd_summarize(
    input: &Path,
    output: &Path,
    now: &str,
    config_path: Option<&Path>,
    overrides: &ConfigOverrides,
    input_format: InputFormat,
    output_format: OutputFormat,
) -> Result<(), LastStandCliError> {
    let now = parse_now(now)?;

    let base = match config_path {
        Some(path) => EngineConfig::from_json(&fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };
    let engine = ActivityEngine::new(overrides.apply(base))?;

    let records = read_records(input, &input_format)?;
    if records.is_empty() {
        tracing::warn!("no sample records in input; every bucket will be unknown");
    }

    let report = engine.process(&records, now)?;
    tracing::debug!(
        records = records.len(),
        buckets = report.summary.total_bucket_count,
        "summarized input"
    );

    let output_data = match output_format {
        OutputFormat::Json => serde_json::to_string(&report)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&report)?,
    };

    if output.to_string_lossy() == "-" {
        println!("{}", output_data);
    } else {
        fs::write(output, output_data + "\n")?;
    }

    Ok(())
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), LastStandCliError> {
    let records = read_records(input, &input_format)?;
    let results = SampleAdapter::validate_records(&records);

    let report = ValidationReport {
        total_records: records.len(),
        valid_records: records.len() - results.len(),
        invalid_records: results.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                sample_id: r.sample_id.clone(),
                error: r.error.to_string(),
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

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Sample {} (index {}): {}",
                    err.sample_id.as_deref().unwrap_or("unknown"),
                    err.index,
                    err.error
                );
            }
        }
    }

    if report.invalid_records > 0 {
        Err(LastStandCliError::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), LastStandCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", get_input_json_schema());
            } else {
                println!("Input Schema: {}", SCHEMA_VERSION);
                println!();
                println!("Each record describes one sample over [start, end]:");
                println!();
                println!("- kind: step_count or stand_hour");
                println!("- start, end: RFC 3339 timestamps, end >= start");
                println!("- value:");
                println!("  - step_count: non-negative step count (fractions round)");
                println!("  - stand_hour: \"stood\" / \"idle\" or 1 / 0");
                println!("- sample_id: optional unique identifier");
                println!("- source: optional {{ name, device_id }}");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", get_output_json_schema());
            } else {
                println!("Output Schema: activity report {}", REPORT_VERSION);
                println!();
                println!("- report_version: Schema version ({})", REPORT_VERSION);
                println!("- producer: {{ name, version, instance_id }}");
                println!("- computed_at: the supplied reference time");
                println!("- config: the engine config used");
                println!("- quality: {{ coverage, total_samples, used_samples, discarded_future_samples, flags }}");
                println!("- summary:");
                println!("  - last_activity_at, longest_sedentary_streak_minutes");
                println!("  - timeline: [{{ start, end, count, has_data, classification }}]");
                println!("  - hourly: [{{ hour, active_minutes, observed_minutes, activity_ratio }}]");
                println!("  - stand_hours, stood_hour_count, last_stand_at");
            }
        }
    }

    Ok(())
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), LastStandCliError> {
    let mut checks: Vec<DoctorCheck> = vec![
        DoctorCheck {
            name: "engine_version".to_string(),
            status: CheckStatus::Ok,
            message: format!("Last Stand version {}", ENGINE_VERSION),
        },
        DoctorCheck {
            name: "schema_version".to_string(),
            status: CheckStatus::Ok,
            message: format!("Input schema: {}", SCHEMA_VERSION),
        },
    ];

    if let Some(config_path) = config {
        let check = if !config_path.exists() {
            DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist".to_string(),
            }
        } else {
            match fs::read_to_string(config_path) {
                Ok(content) => match EngineConfig::from_json(&content) {
                    Ok(cfg) => DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Ok,
                        message: format!(
                            "Config valid ({}-minute buckets, work window {}:00-{}:00)",
                            cfg.bucket_width_minutes, cfg.work_window.start_hour, cfg.work_window.end_hour
                        ),
                    },
                    Err(e) => DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Error,
                        message: format!("Invalid config: {}", e),
                    },
                },
                Err(e) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot read config file: {}", e),
                },
            }
        };
        checks.push(check);
    }

    let stdin_message = if atty::is(atty::Stream::Stdin) {
        "stdin is a TTY (pass -i <file>)"
    } else {
        "stdin is a pipe (-i - ready)"
    };
    checks.push(DoctorCheck {
        name: "stdin".to_string(),
        status: CheckStatus::Ok,
        message: stdin_message.to_string(),
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Last Stand Doctor Report");
        println!("========================");
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

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(LastStandCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn read_input(input: &Path) -> Result<String, LastStandCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn read_records(input: &Path, input_format: &InputFormat) -> Result<Vec<SampleRecord>, LastStandCliError> {
    let input_data = read_input(input)?;
    let records = match input_format {
        InputFormat::Ndjson => SampleAdapter::parse_ndjson(&input_data)?,
        InputFormat::Json => SampleAdapter::parse_array(&input_data)?,
    };
    Ok(records)
}

fn get_input_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": SCHEMA_VERSION,
        "description": "Step-count and stand-hour sample record",
        "type": "object",
        "required": ["schema_version", "kind", "start", "end", "value"],
        "properties": {
            "schema_version": { "type": "string", "const": SCHEMA_VERSION },
            "sample_id": { "type": "string" },
            "kind": { "type": "string", "enum": ["step_count", "stand_hour"] },
            "start": { "type": "string", "format": "date-time" },
            "end": { "type": "string", "format": "date-time" },
            "value": {
                "oneOf": [
                    { "type": "number", "minimum": 0 },
                    { "type": "string", "enum": ["stood", "idle"] }
                ]
            },
            "source": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "device_id": { "type": "string" }
                }
            }
        }
    })
    .to_string()
}

fn get_output_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "activity report",
        "description": "Last Stand activity report",
        "type": "object",
        "required": ["report_version", "producer", "computed_at", "config", "quality", "summary"],
        "properties": {
            "report_version": { "type": "string", "const": REPORT_VERSION },
            "producer": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "version": { "type": "string" },
                    "instance_id": { "type": "string" }
                }
            },
            "computed_at": { "type": "string", "format": "date-time" },
            "config": { "type": "object" },
            "quality": {
                "type": "object",
                "properties": {
                    "coverage": { "type": "number" },
                    "total_samples": { "type": "integer" },
                    "used_samples": { "type": "integer" },
                    "discarded_future_samples": { "type": "integer" },
                    "flags": { "type": "array", "items": { "type": "string" } }
                }
            },
            "summary": {
                "type": "object",
                "properties": {
                    "last_activity_at": { "type": ["string", "null"], "format": "date-time" },
                    "longest_sedentary_streak_minutes": { "type": "integer" },
                    "timeline": { "type": "array", "items": { "type": "object" } },
                    "hourly": { "type": "array", "items": { "type": "object" } },
                    "stand_hours": { "type": "array", "items": { "type": "object" } }
                }
            }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum LastStandCliError {
    Io(io::Error),
    Engine(EngineError),
    Json(serde_json::Error),
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for LastStandCliError {
    fn from(e: io::Error) -> Self {
        LastStandCliError::Io(e)
    }
}

impl From<EngineError> for LastStandCliError {
    fn from(e: EngineError) -> Self {
        LastStandCliError::Engine(e)
    }
}

impl From<serde_json::Error> for LastStandCliError {
    fn from(e: serde_json::Error) -> Self {
        LastStandCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<LastStandCliError> for CliError {
    fn from(e: LastStandCliError) -> Self {
        match e {
            LastStandCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            LastStandCliError::Engine(e) => {
                let (code, hint) = match &e {
                    EngineError::InvalidWindow(_) | EngineError::InvalidConfig(_) => {
                        ("CONFIG_ERROR", "Run 'laststand doctor --config <file>' to check the config")
                    }
                    EngineError::InvalidTimestamp(_) => {
                        ("TIMESTAMP_ERROR", "Pass --now as RFC 3339, e.g. 2024-01-01T09:12:00Z")
                    }
                    EngineError::InvalidSample(_) => {
                        ("VALIDATION_ERROR", "Run 'laststand validate' for details")
                    }
                    EngineError::ParseError(_) | EngineError::JsonError(_) => (
                        "PARSE_ERROR",
                        "Ensure input matches activity.sample.v1 and --input-format",
                    ),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            LastStandCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            LastStandCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            LastStandCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    sample_id: Option<String>,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
