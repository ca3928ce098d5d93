mod cli;

use clap::{Parser, Subcommand};
use env_logger::Env;

use cli::{certify, convert, diff, doctor, info, schema, validate};

/// Universal converter for HEP event-record files.
#[derive(Debug, Parser)]
#[clap(about, author, version)]
struct Opt {
    /// Verbosity level: 'off', 'error', 'warn', 'info', 'debug', 'trace'.
    #[clap(long, default_value = "info")]
    loglevel: String,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Convert one event-record file to another format.
    Convert(convert::ConvertArgs),
    /// Print a summary of an event-record file.
    Info(info::InfoArgs),
    /// Validate an event-record file's physics.
    Validate(validate::ValidateArgs),
    /// Compare two event-record files.
    Diff(diff::DiffArgs),
    /// Run a certification contract or pack.
    Certify(certify::CertifyArgs),
    /// Inspect or upgrade the Parquet schema generation.
    Schema(schema::SchemaArgs),
    /// Check the local environment and format registry.
    Doctor(doctor::DoctorArgs),
}

fn utc_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn main() {
    let opt = Opt::parse();
    let env = Env::default().filter_or("HEPCONDUIT_LOG", &opt.loglevel);
    env_logger::init_from_env(env);

    let argv: Vec<String> = std::env::args().collect();

    let result = match opt.command {
        Command::Convert(args) => convert::run(args, argv, utc_timestamp()),
        Command::Info(args) => info::run(args),
        Command::Validate(args) => validate::run(args),
        Command::Diff(args) => diff::run(args),
        Command::Certify(args) => certify::run(args),
        Command::Schema(args) => schema::run(args),
        Command::Doctor(args) => doctor::run(args),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("ERROR: {err:#}");
            std::process::exit(cli::EXIT_INVOCATION);
        }
    }
}
