//! LHE (Les Houches Event File) reader and writer.
//!
//! LHE is XML-framed but not well-formed XML: we scan it line-oriented,
//! the way the teacher's `lhef` wrapper treats `<event>`/`</event>` as
//! delimiters, rather than invoking a real XML parser.

mod parse;
pub mod reader;
pub mod writer;

pub use reader::LheReader;
pub use writer::LheWriter;

use std::sync::Arc;

use crate::formats::{self, WriterOptions};

pub fn register() {
    formats::register(
        "lhe",
        Arc::new(|source| Ok(Box::new(LheReader::new(source)?) as _)),
        Arc::new(|sink, run_info, options: WriterOptions| {
            Ok(Box::new(LheWriter::create(sink, &run_info, options.gzip)?) as _)
        }),
    );
}
