//! Flat CSV/TSV reader and writer: one row per particle, grouped into
//! events by a repeated `event_number` column.
//!
//! Grounded on `original_source/hepconduit/io/csv_tsv.py`.

pub mod reader;
pub mod writer;

pub use reader::CsvReader;
pub use writer::CsvWriter;

use std::sync::Arc;

use crate::formats::{self, WriterOptions};

pub const DEFAULT_FIELDS: &[&str] = &[
    "event_number",
    "pdg_id",
    "status",
    "mother1",
    "mother2",
    "color1",
    "color2",
    "px",
    "py",
    "pz",
    "energy",
    "mass",
    "spin",
    "barcode",
    "vertex_barcode",
    "end_vertex_barcode",
];

pub fn register() {
    formats::register(
        "csv",
        Arc::new(|source| Ok(Box::new(CsvReader::new(source, b',')?) as _)),
        Arc::new(|sink, _run_info, options: WriterOptions| {
            Ok(Box::new(CsvWriter::create(sink, b',', options.gzip)?) as _)
        }),
    );
    formats::register(
        "tsv",
        Arc::new(|source| Ok(Box::new(CsvReader::new(source, b'\t')?) as _)),
        Arc::new(|sink, _run_info, options: WriterOptions| {
            Ok(Box::new(CsvWriter::create(sink, b'\t', options.gzip)?) as _)
        }),
    );
}
