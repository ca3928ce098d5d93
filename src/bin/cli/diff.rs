use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use hepconduit::diff::{diff_files, DiffMode};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "lower")]
pub(crate) enum DiffModeArg {
    #[default]
    Fingerprint,
    Index,
}

/// Compare two event-record files, by fingerprint multiset or positionally.
#[derive(Debug, Parser)]
pub(crate) struct DiffArgs {
    /// First input file.
    pub(crate) a: PathBuf,

    /// Second input file.
    pub(crate) b: PathBuf,

    /// Format tag for `a`, guessed from its extension when omitted.
    #[clap(long = "format-a")]
    pub(crate) format_a: Option<String>,

    /// Format tag for `b`, guessed from its extension when omitted.
    #[clap(long = "format-b")]
    pub(crate) format_b: Option<String>,

    /// Comparison mode.
    #[clap(long = "by", value_enum, default_value_t)]
    pub(crate) by: DiffModeArg,

    /// Fingerprint quantization tolerance, used when `--by fingerprint`.
    #[clap(long, default_value_t = 1e-4)]
    pub(crate) abs_tol: f64,

    /// Emit machine-readable JSON instead of a human summary.
    #[clap(long, default_value_t)]
    pub(crate) json: bool,
}

pub(crate) fn run(args: DiffArgs) -> anyhow::Result<i32> {
    hepconduit::formats::register_builtin_formats();

    let mode = match args.by {
        DiffModeArg::Fingerprint => DiffMode::Fingerprint,
        DiffModeArg::Index => DiffMode::Index,
    };
    let report = diff_files(&args.a, &args.b, args.format_a.as_deref(), args.format_b.as_deref(), mode, args.abs_tol)?;

    if args.json {
        super::print_json(&report)?;
    } else {
        println!("{report:#?}");
    }

    Ok(super::EXIT_OK)
}
