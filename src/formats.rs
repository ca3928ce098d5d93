//! Format registry and detection (§4.1).
//!
//! A process-wide mapping from a format tag to a reader/writer factory
//! pair, generalising the teacher's `reader.rs` magic-byte `FileReader`
//! dispatch (which hardcoded one branch per format) into an explicit,
//! re-registrable table — this is the "plugin registration as an explicit
//! API" design note of §9. Registration is idempotent: registering the
//! same tag twice replaces the previous entry, which is how an external
//! format plugin would extend the system.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, RwLock};

use lazy_static::lazy_static;
use thiserror::Error;

use crate::event::RunInfo;
use crate::file::File;
use crate::traits::{EventSink, EventSource};

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed {format} framing: {detail}")]
    Framing { format: &'static str, detail: String },
    #[error("unknown format for path `{0}`")]
    UnknownExtension(String),
    #[error("unregistered format tag `{0}`")]
    UnregisteredTag(String),
}

/// Options a writer factory may consult; formats that don't need a given
/// option ignore it.
#[derive(Debug, Clone, Default)]
pub struct WriterOptions {
    /// Use the columnar Parquet schema instead of the flat one (§4.6).
    pub columnar: bool,
    /// Gzip-compress the output stream.
    pub gzip: bool,
    /// Extra key-value pairs a writer should fold into its own metadata,
    /// verbatim and unprefixed (§4.11 step 8: `hepconduit_provenance`,
    /// `hepconduit_loss_hash`, `hepconduit_report_kind`, ...). Formats that
    /// have no metadata sidecar (LHE, HepMC3, CSV/TSV) ignore this.
    pub extra_metadata: BTreeMap<String, String>,
}

pub type ReaderFactory =
    Arc<dyn Fn(File) -> Result<Box<dyn EventSource>, FormatError> + Send + Sync>;
pub type WriterFactory =
    Arc<dyn Fn(File, RunInfo, WriterOptions) -> Result<Box<dyn EventSink>, FormatError> + Send + Sync>;

#[derive(Clone)]
struct FormatEntry {
    reader: ReaderFactory,
    writer: WriterFactory,
}

lazy_static! {
    static ref REGISTRY: RwLock<HashMap<String, FormatEntry>> = RwLock::new(HashMap::new());
}

/// Register a reader/writer factory pair under `tag`. Replaces any
/// previous registration for the same tag.
pub fn register(tag: &str, reader: ReaderFactory, writer: WriterFactory) {
    REGISTRY
        .write()
        .unwrap()
        .insert(tag.to_string(), FormatEntry { reader, writer });
}

pub fn reader_for(tag: &str, source: File) -> Result<Box<dyn EventSource>, FormatError> {
    let entry = REGISTRY
        .read()
        .unwrap()
        .get(tag)
        .cloned()
        .ok_or_else(|| FormatError::UnregisteredTag(tag.to_string()))?;
    (entry.reader)(source)
}

pub fn writer_for(
    tag: &str,
    sink: File,
    run_info: RunInfo,
    options: WriterOptions,
) -> Result<Box<dyn EventSink>, FormatError> {
    let entry = REGISTRY
        .read()
        .unwrap()
        .get(tag)
        .cloned()
        .ok_or_else(|| FormatError::UnregisteredTag(tag.to_string()))?;
    (entry.writer)(sink, run_info, options)
}

pub fn is_registered(tag: &str) -> bool {
    REGISTRY.read().unwrap().contains_key(tag)
}

pub fn registered_tags() -> Vec<String> {
    let mut tags: Vec<_> = REGISTRY.read().unwrap().keys().cloned().collect();
    tags.sort();
    tags
}

/// Register the formats this crate ships with. Called once at process
/// startup (from `main`, or lazily by tests); registering twice is
/// harmless since registration replaces.
pub fn register_builtin_formats() {
    crate::lhe::register();
    crate::hepmc3::register();
    crate::csv::register();
    crate::parquet::register();
}

/// Strip a trailing `.gz` suffix, then map the remaining extension to a
/// format tag: `.lhe`→`lhe`, `.hepmc`/`.hepmc3`→`hepmc3`, `.csv`→`csv`,
/// `.tsv`/`.tab`→`tsv`, `.parquet`/`.pq`→`parquet`.
pub fn detect_format(path: &Path) -> Result<&'static str, FormatError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(name);
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        "lhe" => Ok("lhe"),
        "hepmc" | "hepmc3" => Ok("hepmc3"),
        "csv" => Ok("csv"),
        "tsv" | "tab" => Ok("tsv"),
        "parquet" | "pq" => Ok("parquet"),
        _ => Err(FormatError::UnknownExtension(path.display().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_gzipped_lhe() {
        assert_eq!(detect_format(Path::new("events.lhe.gz")).unwrap(), "lhe");
    }

    #[test]
    fn detects_hepmc3_extension() {
        assert_eq!(detect_format(Path::new("run.hepmc3")).unwrap(), "hepmc3");
    }

    #[test]
    fn unknown_extension_is_an_error() {
        assert!(detect_format(Path::new("events.xyz")).is_err());
    }
}
