use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use hepconduit::convert::{ConvertOptions, ProvenanceMode};
use hepconduit::report::{ReportFormat, ReportSink};
use hepconduit::validator::ValidatorConfig;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "lower")]
pub(crate) enum ReportFormatArg {
    #[default]
    Json,
    Sarif,
}

impl From<ReportFormatArg> for ReportFormat {
    fn from(value: ReportFormatArg) -> Self {
        match value {
            ReportFormatArg::Json => ReportFormat::Json,
            ReportFormatArg::Sarif => ReportFormat::Sarif,
        }
    }
}

/// Convert one event-record file to another format.
#[derive(Debug, Parser)]
pub(crate) struct ConvertArgs {
    /// Input event-record file.
    pub(crate) input: PathBuf,

    /// Output event-record file.
    pub(crate) output: PathBuf,

    /// Input format tag, guessed from the input's extension when omitted.
    #[clap(long = "from")]
    pub(crate) from: Option<String>,

    /// Output format tag, guessed from the output's extension when omitted.
    #[clap(long = "to")]
    pub(crate) to: Option<String>,

    /// Safe filter expression over the fixed event environment.
    ///
    /// See `--help` on the crate's filter sub-language for the available
    /// identifiers and functions.
    #[clap(long)]
    pub(crate) filter: Option<String>,

    /// Stop after this many input events.
    #[clap(long)]
    pub(crate) max_events: Option<usize>,

    /// Validate every event while converting and record issues on it.
    #[clap(long, default_value_t)]
    pub(crate) validate: bool,

    /// Abort the conversion on the first validation error instead of
    /// merely recording it. Implies `--validate`.
    #[clap(long, default_value_t)]
    pub(crate) strict: bool,

    /// Momentum-conservation tolerance used when `--validate` is set.
    #[clap(long, default_value_t = ValidatorConfig::default().momentum_tolerance)]
    pub(crate) momentum_tolerance: f64,

    /// Write Parquet output with the columnar schema instead of the flat one.
    #[clap(long, default_value_t)]
    pub(crate) columnar: bool,

    /// Suppress progress logging.
    #[clap(short, long, default_value_t)]
    pub(crate) quiet: bool,

    /// Where to write the conversion report: `auto`, `-` (stdout),
    /// `none`, or an explicit path.
    #[clap(long, default_value = "auto")]
    pub(crate) report: String,

    /// Conversion report format.
    #[clap(long = "report-format", value_enum, default_value_t)]
    pub(crate) report_format: ReportFormatArg,

    /// Provenance mode: `auto`, `sidecar`, or `none`.
    #[clap(long, default_value = "auto")]
    pub(crate) provenance: String,
}

pub(crate) fn run(args: ConvertArgs, argv: Vec<String>, utc_timestamp: String) -> anyhow::Result<i32> {
    hepconduit::formats::register_builtin_formats();

    let mut validator_config = ValidatorConfig::default();
    validator_config.momentum_tolerance = args.momentum_tolerance;

    let opts = ConvertOptions::builder()
        .input_path(args.input)
        .output_path(args.output)
        .input_format(args.from)
        .output_format(args.to)
        .filter_expr(args.filter)
        .max_events(args.max_events)
        .validate(args.validate || args.strict)
        .strict_validation(args.strict)
        .validator_config(validator_config)
        .columnar(args.columnar)
        .quiet(args.quiet)
        .report_sink(ReportSink::parse(&args.report))
        .report_format(ReportFormat::from(args.report_format))
        .provenance_mode(ProvenanceMode::parse(&args.provenance))
        .argv(argv)
        .utc_timestamp(utc_timestamp)
        .build();

    let outcome = hepconduit::convert::run_convert(&opts)?;
    if !args.quiet {
        log::info!(
            "converted {} -> {} events (loss_hash {})",
            outcome.n_input,
            outcome.n_output,
            outcome.report.loss_hash
        );
    }

    if args.strict && outcome.n_validation_errors > 0 {
        return Ok(super::EXIT_FAILURE);
    }
    Ok(super::EXIT_OK)
}
