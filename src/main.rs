use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use pch2csv::convert::{read_inputs, write_outputs, ConvertOptions, ConvertResult, OutputMode};
use pch2csv::files::{default_output_path, has_suffix};
use pch2csv::layout::LineLayout;
use pch2csv::reader::ReadSettings;
use pch2csv::warnings::DEFAULT_WARNING_LIMIT;
use pch2csv::writer::HeaderPolicy;

const PUNCH_SUFFIX: &str = ".pch";

/// Convert Nastran Punch format to Comma-Separated Values (CSV).
#[derive(Parser, Debug)]
#[command(name = "pch2csv")]
#[command(version)]
struct Cli {
    /// Punch files to convert, merged in the order given. Each must have a .pch extension.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Name of the output file. Defaults to the first input with a .csv extension.
    #[arg(short, long, env = "PCH2CSV_OUTPUT")]
    output: Option<PathBuf>,

    /// Text printed after the prefix columns instead of the "unknown" column headers,
    /// for instance -c "CBUSH ID;;CS;X in mm;Y [mm];CSout"
    #[arg(short, long, env = "PCH2CSV_COLUMN_HEADER")]
    column_header: Option<String>,

    /// Do not print the CSV header. Data begins at the first line.
    #[arg(short, long, env = "PCH2CSV_SKIP_HEADER")]
    skip_header: bool,

    /// Produce a single CSV, even if several element types or totals are detected.
    #[arg(short, long, env = "PCH2CSV_UNIQUE")]
    unique: bool,

    /// Column layout of a punch line, as a Fortran edit descriptor list.
    #[arg(long, default_value = "(4a18,8x)", value_parser = LineLayout::parse, env = "PCH2CSV_LAYOUT")]
    layout: LineLayout,

    /// Number of warnings kept per input file before the rest are dropped.
    #[arg(long, default_value_t = DEFAULT_WARNING_LIMIT, env = "PCH2CSV_MAX_WARNINGS")]
    max_warnings: usize,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(report) => {
            eprintln!("Error: {report:?}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> ConvertResult<ExitCode> {
    if let Some(bad) = cli.inputs.iter().find(|p| !has_suffix(&p.to_string_lossy(), PUNCH_SUFFIX)) {
        eprintln!("Error: The file must have a '.pch' extension. Wrong extension in '{}'. Maybe not a punch file?",
                  bad.display());
        return Ok(ExitCode::FAILURE);
    }

    let output = cli.output.unwrap_or_else(|| default_output_path(&cli.inputs[0]));
    let settings = ReadSettings::default()
        .layout(cli.layout)
        .warning_limit(cli.max_warnings);
    let mode = if cli.unique { OutputMode::Unique } else { OutputMode::PerFingerprint };
    let options = ConvertOptions::default()
        .header(HeaderPolicy::from_options(cli.column_header.as_deref(), cli.skip_header))
        .mode(mode)
        .read_settings(settings);

    let inputs = read_inputs(&cli.inputs, options.get_read_settings());
    for (path, warnings) in &inputs.warnings {
        for warning in warnings {
            eprintln!("{}: {warning}", path.display());
        }
    }

    if inputs.unreadable.len() == cli.inputs.len() {
        eprintln!("Error: None of the input files could be read.");
        return Ok(ExitCode::FAILURE);
    }

    let written = write_outputs(&inputs.document, &output, &options)?;
    if mode == OutputMode::PerFingerprint && written.len() > 1 {
        println!("pch2csv detected {} different formats, so {} files were produced.", written.len(), written.len());
    }
    for path in &written {
        println!("file output: '{}'.", path.display());
    }

    Ok(ExitCode::SUCCESS)
}
