use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;

use hepconduit::file::File;
use hepconduit::formats;

/// Print a summary of an event-record file.
#[derive(Debug, Parser)]
pub(crate) struct InfoArgs {
    /// Input event-record file.
    pub(crate) input: PathBuf,

    /// Input format tag, guessed from the extension when omitted.
    #[clap(long)]
    pub(crate) format: Option<String>,

    /// Emit machine-readable JSON instead of a human summary.
    #[clap(long, default_value_t)]
    pub(crate) json: bool,
}

#[derive(Debug, Serialize)]
struct Summary {
    format: String,
    n_events: i64,
    total_particles: i64,
    beam_pdg_id: (i32, i32),
    beam_energy: (f64, f64),
    generator_name: String,
    generator_version: String,
    weight_names: Vec<String>,
}

pub(crate) fn run(args: InfoArgs) -> anyhow::Result<i32> {
    hepconduit::formats::register_builtin_formats();

    let tag = match &args.format {
        Some(tag) => tag.clone(),
        None => formats::detect_format(&args.input)?.to_string(),
    };
    let reader = formats::reader_for(&tag, File::open(&args.input)?)?;
    let run_info = reader.run_info();

    let mut n_events = 0i64;
    let mut total_particles = 0i64;
    for event in reader {
        let event = event?;
        total_particles += event.particles.len() as i64;
        n_events += 1;
    }

    let summary = Summary {
        format: tag,
        n_events,
        total_particles,
        beam_pdg_id: run_info.beam_pdg_id,
        beam_energy: run_info.beam_energy,
        generator_name: run_info.generator_name,
        generator_version: run_info.generator_version,
        weight_names: run_info.weight_names,
    };

    if args.json {
        super::print_json(&summary)?;
    } else {
        println!("format:            {}", summary.format);
        println!("n_events:          {}", summary.n_events);
        println!("total_particles:   {}", summary.total_particles);
        println!("beam_pdg_id:       ({}, {})", summary.beam_pdg_id.0, summary.beam_pdg_id.1);
        println!("beam_energy:       ({}, {})", summary.beam_energy.0, summary.beam_energy.1);
        if !summary.generator_name.is_empty() {
            println!("generator:         {} {}", summary.generator_name, summary.generator_version);
        }
        if !summary.weight_names.is_empty() {
            println!("weight_names:      {}", summary.weight_names.join(", "));
        }
    }

    Ok(super::EXIT_OK)
}
