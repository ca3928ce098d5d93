use std::path::PathBuf;

use clap::Parser;

use hepconduit::contracts::{available_contracts, available_packs, certify, certify_pack};

/// Run a certification contract or pack against an input file.
#[derive(Debug, Parser)]
pub(crate) struct CertifyArgs {
    /// Input event-record file.
    pub(crate) input: PathBuf,

    /// Name of a single built-in contract to run.
    #[clap(long, conflicts_with = "pack")]
    pub(crate) contract: Option<String>,

    /// Name of a built-in contract pack to run.
    #[clap(long, conflicts_with = "contract")]
    pub(crate) pack: Option<String>,

    /// Intermediate/target format used by round-trip contracts.
    #[clap(long = "to", default_value = "hepmc3")]
    pub(crate) to_format: String,

    /// Use tighter momentum/mass tolerances.
    #[clap(long, default_value_t)]
    pub(crate) strict: bool,

    /// Emit machine-readable JSON instead of a human summary.
    #[clap(long, default_value_t)]
    pub(crate) json: bool,
}

pub(crate) fn run(args: CertifyArgs) -> anyhow::Result<i32> {
    hepconduit::formats::register_builtin_formats();

    let report = match (&args.contract, &args.pack) {
        (Some(contract), None) => certify(&args.input, contract, &args.to_format, args.strict)?,
        (None, Some(pack)) => certify_pack(&args.input, pack, &args.to_format, args.strict)?,
        (None, None) => certify_pack(&args.input, "generator_level_v1", &args.to_format, args.strict)?,
        (Some(_), Some(_)) => unreachable!("clap enforces --contract/--pack are mutually exclusive"),
    };

    if args.json {
        super::print_json(&report)?;
    } else {
        print!("{report}");
        if args.contract.is_none() && args.pack.is_none() {
            println!(
                "(no --contract/--pack given; available contracts: {}; available packs: {})",
                available_contracts().join(", "),
                available_packs().join(", ")
            );
        }
    }

    if report.ok {
        Ok(super::EXIT_OK)
    } else {
        Ok(super::EXIT_FAILURE)
    }
}
