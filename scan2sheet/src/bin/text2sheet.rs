use std::io::Read;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use chrono::Local;
use clap::{Args, Parser, Subcommand, ValueEnum};
use scan2sheet::{
    BuildOptions, ExportFormat, ExportOptions, ImageSize, LayoutMode, RunMetadata, TableReport,
    TableSource, build_table, evaluate, export_table, format_number, parse_structured_response,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "text2sheet",
    version,
    about = "Turn OCR text or vision model tables into CSV/XLSX spreadsheets"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Build a table from OCR text and export it.
    Extract(ExtractArgs),
    /// Export a vision model reply of the form {"headers": [...], "rows": [[...]]}.
    Structured(StructuredArgs),
    /// Evaluate a four-operator arithmetic expression.
    Eval(EvalArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LayoutArg {
    /// Detect columns and header keywords.
    Auto,
    /// One row per line.
    Column,
    /// All text in one cell.
    Cell,
    /// Fixed column count (requires --columns).
    Manual,
}

#[derive(Debug, Args)]
struct OutputArgs {
    /// Output path; the extension (.csv or .xlsx) selects the format.
    #[arg(short, long)]
    output: PathBuf,

    /// CSV delimiter character.
    #[arg(long, default_value = ",")]
    delimiter: char,

    /// Add a Metadata worksheet (XLSX only).
    #[arg(long)]
    metadata: bool,

    /// Source file name recorded in the metadata sheet.
    #[arg(long, requires = "metadata")]
    source_name: Option<String>,

    /// Source image dimensions like 1024x768.
    #[arg(long, requires = "metadata")]
    image_size: Option<String>,

    /// Evaluate arithmetic found in quantity columns (e.g. 2+1 becomes 3).
    #[arg(long)]
    evaluate: bool,

    /// Enable verbose warning output.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Args)]
struct ExtractArgs {
    /// Input text path, or - for stdin.
    #[arg(short, long)]
    input: PathBuf,

    #[arg(long, value_enum, default_value_t = LayoutArg::Auto)]
    layout: LayoutArg,

    /// Column count for --layout manual.
    #[arg(long)]
    columns: Option<usize>,

    /// Use the first line as column names for --layout manual.
    #[arg(long)]
    first_row_header: bool,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, Args)]
struct StructuredArgs {
    /// JSON reply path, or - for stdin.
    #[arg(short, long)]
    input: PathBuf,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, Args)]
struct EvalArgs {
    /// Expression such as 12*3-1.
    #[arg(allow_hyphen_values = true)]
    expression: String,
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read '{}'", path.display()))
}

fn parse_layout(args: &ExtractArgs) -> Result<LayoutMode> {
    match args.layout {
        LayoutArg::Auto => Ok(LayoutMode::AutoTable),
        LayoutArg::Column => Ok(LayoutMode::SingleColumn),
        LayoutArg::Cell => Ok(LayoutMode::SingleCell),
        LayoutArg::Manual => {
            let columns = args
                .columns
                .ok_or_else(|| anyhow!("--layout manual requires --columns"))?;
            let columns = NonZeroUsize::new(columns)
                .ok_or_else(|| anyhow!("--columns must be at least 1"))?;
            Ok(LayoutMode::Manual {
                columns,
                first_row_is_header: args.first_row_header,
            })
        }
    }
}

fn parse_metadata(args: &OutputArgs, input: &Path) -> Result<Option<RunMetadata>> {
    if !args.metadata {
        return Ok(None);
    }

    let source_name = args.source_name.clone().unwrap_or_else(|| {
        input
            .file_name()
            .map_or_else(|| "stdin".to_string(), |name| name.to_string_lossy().into_owned())
    });
    let mut metadata = RunMetadata::new(source_name, Local::now().naive_local());
    if let Some(size) = args.image_size.as_deref() {
        let size = ImageSize::from_str(size)
            .map_err(|error| anyhow!("invalid image size: {error}"))
            .context("failed to parse --image-size")?;
        metadata = metadata.with_image_size(size);
    }
    Ok(Some(metadata))
}

fn log_report(report: &TableReport, verbose: bool) {
    if report.warnings.is_empty() {
        return;
    }

    eprintln!("warning: {} issue(s) detected", report.warnings.len());
    if verbose {
        for warning in &report.warnings {
            eprintln!(
                "  - {:?} row={:?}: {}",
                warning.code, warning.row, warning.message
            );
        }
    }
}

fn run_export(source: TableSource, args: &OutputArgs, input: &Path) -> Result<TableReport> {
    if !args.delimiter.is_ascii() {
        anyhow::bail!("delimiter must be a single ASCII character");
    }
    let format = ExportFormat::from_path(&args.output).map_err(|error| anyhow!(error))?;
    let options = ExportOptions {
        delimiter: u8::try_from(args.delimiter).context("delimiter must be ASCII")?,
        metadata: parse_metadata(args, input)?,
    };

    let report = build_table(
        source,
        &BuildOptions {
            evaluate_quantities: args.evaluate,
        },
    );
    export_table(&report.table, &args.output, format, &options)
        .with_context(|| format!("failed to write '{}'", args.output.display()))?;
    Ok(report)
}

fn run_extract(args: &ExtractArgs) -> Result<TableReport> {
    let layout = parse_layout(args)?;
    let text = read_input(&args.input)?;
    run_export(TableSource::OcrText { text, layout }, &args.output, &args.input)
}

fn run_structured(args: &StructuredArgs) -> Result<TableReport> {
    let reply = read_input(&args.input)?;
    let source = parse_structured_response(&reply)
        .with_context(|| format!("failed to parse '{}'", args.input.display()))?;
    run_export(source, &args.output, &args.input)
}

fn finish(result: Result<TableReport>, verbose: bool) -> ExitCode {
    match result {
        Ok(report) => {
            log_report(&report, verbose);
            if report.table.row_count() > 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(1)
        }
    }
}

fn main() -> ExitCode {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scan2sheet=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Extract(args) => finish(run_extract(&args), args.output.verbose),
        Commands::Structured(args) => finish(run_structured(&args), args.output.verbose),
        Commands::Eval(args) => match evaluate(&args.expression) {
            Ok(value) => {
                println!("{}", format_number(value));
                ExitCode::SUCCESS
            }
            Err(error) => {
                eprintln!("error: {error}");
                ExitCode::from(1)
            }
        },
    }
}
