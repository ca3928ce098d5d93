use std::path::PathBuf;

use clap::Parser;

use hepconduit::file::File;
use hepconduit::formats;
use hepconduit::validator::{validate, ValidatorConfig};

/// Validate an event-record file's physics (momentum conservation, PDG
/// validity, mass consistency, energy sign).
#[derive(Debug, Parser)]
pub(crate) struct ValidateArgs {
    /// Input event-record file.
    pub(crate) input: PathBuf,

    /// Input format tag, guessed from the extension when omitted.
    #[clap(long)]
    pub(crate) format: Option<String>,

    /// Stop after this many events.
    #[clap(long)]
    pub(crate) max_events: Option<usize>,

    /// Momentum-conservation tolerance.
    #[clap(long, default_value_t = ValidatorConfig::default().momentum_tolerance)]
    pub(crate) momentum_tolerance: f64,

    /// Mass-consistency tolerance.
    #[clap(long, default_value_t = ValidatorConfig::default().mass_tolerance)]
    pub(crate) mass_tolerance: f64,

    /// Emit machine-readable JSON instead of a human summary.
    #[clap(long, default_value_t)]
    pub(crate) json: bool,
}

pub(crate) fn run(args: ValidateArgs) -> anyhow::Result<i32> {
    hepconduit::formats::register_builtin_formats();

    let tag = match &args.format {
        Some(tag) => tag.clone(),
        None => formats::detect_format(&args.input)?.to_string(),
    };
    let reader = formats::reader_for(&tag, File::open(&args.input)?)?;
    let run_info = reader.run_info();
    let mut events = Vec::new();
    for event in reader {
        events.push(event?);
    }
    let file = hepconduit::event::EventFile {
        run_info,
        events,
        format_name: tag,
    };

    let cfg = ValidatorConfig {
        momentum_tolerance: args.momentum_tolerance,
        mass_tolerance: args.mass_tolerance,
        ..ValidatorConfig::default()
    };
    let report = validate(&file, &cfg, args.max_events);

    if args.json {
        super::print_json(&report)?;
    } else {
        println!("{}", report.summary());
        for issue in &report.issues {
            println!("  {issue}");
        }
    }

    if report.is_valid() {
        Ok(super::EXIT_OK)
    } else {
        Ok(super::EXIT_FAILURE)
    }
}
