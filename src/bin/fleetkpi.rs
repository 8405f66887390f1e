//! fleetkpi CLI - command-line front end for the fleet KPI pipeline
//!
//! Commands:
//! - compute: raw record JSON in, KPI report JSON out
//! - clean: raw record JSON in, cleaned records JSON out
//! - validate: print row accounting for a cleaning pass

use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use fleet_kpi::pipeline::DEFAULT_ANCHOR_YEAR;
use fleet_kpi::{
    fallback_report, CleanStats, KpiPipeline, PipelineConfig, PipelineError, ReportEnvelope,
    ENGINE_VERSION,
};

/// fleetkpi - derive fleet performance indicators from raw trip records
#[derive(Parser)]
#[command(name = "fleetkpi")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Clean fleet trip records and compute KPIs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the KPI report from a raw record collection
    Compute {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Wrap the report in a provenance envelope
        #[arg(long)]
        envelope: bool,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,

        /// Substitute the static fallback report when the source yields no KPIs
        #[arg(long)]
        fallback: bool,

        /// Year assumed for day-month date strings
        #[arg(long, default_value_t = DEFAULT_ANCHOR_YEAR)]
        anchor_year: i32,

        /// Month buckets kept per monthly series
        #[arg(long, default_value_t = 6)]
        window: usize,
    },

    /// Clean a raw record collection and emit the surviving records
    Clean {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,

        /// Year assumed for day-month date strings
        #[arg(long, default_value_t = DEFAULT_ANCHOR_YEAR)]
        anchor_year: i32,
    },

    /// Report how many rows a cleaning pass keeps and drops
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Error body mirrors the REST contract: {"error": "..."}
            let body = serde_json::json!({ "error": e.to_string() });
            eprintln!("{}", body);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Compute {
            input,
            output,
            envelope,
            pretty,
            fallback,
            anchor_year,
            window,
        } => cmd_compute(
            &input,
            output.as_deref(),
            envelope,
            pretty,
            fallback,
            anchor_year,
            window,
        ),
        Commands::Clean {
            input,
            output,
            pretty,
            anchor_year,
        } => cmd_clean(&input, output.as_deref(), pretty, anchor_year),
        Commands::Validate { input, json } => cmd_validate(&input, json),
    }
}

fn cmd_compute(
    input: &Path,
    output: Option<&Path>,
    envelope: bool,
    pretty: bool,
    fallback: bool,
    anchor_year: i32,
    window: usize,
) -> Result<(), CliError> {
    let raw = read_input(input)?;
    let pipeline = KpiPipeline::new(PipelineConfig {
        anchor_year,
        series_window: window,
    });

    let mut report = pipeline.run(&raw)?;
    if report.is_empty() {
        if !fallback {
            return Err(CliError::EmptyReport);
        }
        report = fallback_report();
    }

    let pretty = pretty || use_pretty_tty(output);
    let body = if envelope {
        let wrapped = ReportEnvelope::new(report);
        if pretty {
            wrapped.to_json_pretty()?
        } else {
            wrapped.to_json()?
        }
    } else if pretty {
        report.to_json_pretty()?
    } else {
        report.to_json()?
    };

    write_output(output, &body)
}

fn cmd_clean(
    input: &Path,
    output: Option<&Path>,
    pretty: bool,
    anchor_year: i32,
) -> Result<(), CliError> {
    let raw = read_input(input)?;
    let pipeline = KpiPipeline::new(PipelineConfig {
        anchor_year,
        ..PipelineConfig::default()
    });

    let (dataset, stats) = pipeline.clean(&raw)?;
    tracing::debug!(?stats, "clean pass finished");

    let pretty = pretty || use_pretty_tty(output);
    let body = if pretty {
        serde_json::to_string_pretty(dataset.rows())?
    } else {
        serde_json::to_string(dataset.rows())?
    };

    write_output(output, &body)
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), CliError> {
    let raw = read_input(input)?;
    let (_, stats) = KpiPipeline::default().clean(&raw)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_stats(&stats);
    }

    if stats.output_rows == 0 {
        Err(CliError::NoRows)
    } else {
        Ok(())
    }
}

fn print_stats(stats: &CleanStats) {
    println!("Clean Report");
    println!("============");
    println!("Input rows:         {}", stats.input_rows);
    println!("Dropped missing:    {}", stats.dropped_missing);
    println!("Dropped negative:   {}", stats.dropped_negative);
    println!("Dropped duplicates: {}", stats.dropped_duplicates);
    println!("Output rows:        {}", stats.output_rows);
}

fn read_input(input: &Path) -> Result<String, CliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn write_output(output: Option<&Path>, body: &str) -> Result<(), CliError> {
    match output {
        Some(path) if path.to_string_lossy() != "-" => {
            fs::write(path, body)?;
        }
        _ => {
            let mut stdout = io::stdout();
            writeln!(stdout, "{}", body)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn use_pretty_tty(output: Option<&Path>) -> bool {
    output.is_none() && atty::is(atty::Stream::Stdout)
}

#[derive(Debug)]
enum CliError {
    Io(io::Error),
    Pipeline(PipelineError),
    Json(serde_json::Error),
    EmptyReport,
    NoRows,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Io(e) => write!(f, "{}", e),
            CliError::Pipeline(e) => write!(f, "{}", e),
            CliError::Json(e) => write!(f, "{}", e),
            CliError::EmptyReport => write!(f, "no KPIs could be computed from the record source"),
            CliError::NoRows => write!(f, "no rows survived cleaning"),
        }
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}

impl From<PipelineError> for CliError {
    fn from(e: PipelineError) -> Self {
        CliError::Pipeline(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Json(e)
    }
}
