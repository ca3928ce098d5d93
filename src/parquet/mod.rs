//! Parquet reader and writer, in two schemas distinguished by the
//! presence of a `particles` list column (§4.6): a flat, one-row-per-particle
//! layout, and a columnar, one-row-per-event layout with `particles`/
//! `vertices` list-of-struct columns.
//!
//! Grounded on `examples/denehoffman-rustitude` and
//! `other_examples/55932e8d_qntx-erc8004__erc8004-events-src-parquet.rs.rs`
//! for the `arrow`/`parquet` crate idiom (`ArrowWriter`,
//! `ParquetRecordBatchReaderBuilder`, schema `key_value_metadata`); content
//! grammar transcribed from `original_source/hepconduit/io/parquet.py`.

pub mod schema;
pub mod reader;
pub mod writer;

pub use reader::ParquetReader;
pub use writer::ParquetWriter;

use std::sync::Arc;

use crate::formats::{self, WriterOptions};

/// Schema tag recorded in `hepconduit_schema` metadata for the flat layout.
pub const SCHEMA_FLAT: &str = "hepconduit.event.v1.flat";
/// Schema tag recorded in `hepconduit_schema` metadata for the columnar layout.
pub const SCHEMA_COLUMNAR: &str = "hepconduit.event.v1.columnar";

pub fn register() {
    formats::register(
        "parquet",
        Arc::new(|source| Ok(Box::new(reader::ParquetReader::new(source)?) as _)),
        Arc::new(|sink, run_info, options: WriterOptions| {
            Ok(Box::new(writer::ParquetWriter::create(sink, run_info, options)?) as _)
        }),
    );
}
