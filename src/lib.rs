//! `hepconduit` is a crate for converting between high-energy physics
//! event-record formats — LHE, HepMC3 Asciiv3, CSV/TSV, and Parquet —
//! while tracking exactly what information each target format cannot
//! represent.
//!
//! # How to use
//!
//! The [`bin/hepconduit`](https://crates.io/crates/hepconduit) command
//! line tool is the primary interface; see its `--help` output for the
//! `convert`, `info`, `validate`, `diff`, `certify`, `schema`, and
//! `doctor` subcommands. Library users typically start from
//! [`convert::run_convert`] for end-to-end conversion, or from
//! [`formats::reader_for`]/[`formats::writer_for`] to stream events
//! directly.
//!
//! ## Most relevant modules
//!
//! - [event] for the internal event/particle/vertex model shared by all formats
//! - [formats] for the format registry and extension-based detection
//! - [convert] for the end-to-end convert pipeline (read, filter, validate, write, report)
//! - [loss] and [fingerprint] for the capability-based loss accounting and event fingerprinting
//! - [contracts] for certification contracts and packs
//! - [traits] for the streaming [`traits::EventSource`]/[`traits::EventSink`] abstractions

/// Certification contracts and packs
pub mod contracts;
/// End-to-end convert pipeline
pub mod convert;
/// CSV/TSV reader and writer
pub mod csv;
/// Semantic diff between two event files
pub mod diff;
/// Top-level error taxonomy
pub mod error;
/// Scattering event class
pub mod event;
/// Attributes without a place in the core model
pub mod extra;
/// Thin wrapper around [std::fs::File]
pub mod file;
/// Safe event filter expressions
pub mod filter;
/// Content-addressed event fingerprinting
pub mod fingerprint;
/// Format registry and detection
pub mod formats;
/// HepMC3 Asciiv3 reader and writer
pub mod hepmc3;
/// LHE reader and writer
pub mod lhe;
/// Capability-based loss planning and observation
pub mod loss;
/// Fixed-significant-digit float formatting
pub mod numfmt;
/// Parquet reader, writer, and schemas
pub mod parquet;
/// Shared `nom` parser combinators
pub mod parsing;
/// PDG particle ID validity and names
pub mod pdg;
/// Deterministic conversion provenance
pub mod provenance;
/// Conversion report assembly and emission
pub mod report;
/// Common streaming traits
pub mod traits;
/// Small filesystem/string helpers
pub mod util;
/// Event-level physics validation
pub mod validator;
/// Vertex graph reconstruction
pub mod vertex;

use lazy_static::lazy_static;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
lazy_static! {
    pub static ref VERSION_MAJOR: u32 =
        env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap();
    pub static ref VERSION_MINOR: u32 =
        env!("CARGO_PKG_VERSION_MINOR").parse().unwrap();
    pub static ref VERSION_PATCH: u32 =
        env!("CARGO_PKG_VERSION_PATCH").parse().unwrap();
}
pub const GIT_REV: Option<&str> = option_env!("VERGEN_GIT_SHA_SHORT");
pub const GIT_BRANCH: Option<&str> = option_env!("VERGEN_GIT_BRANCH");
