//! HepMC3 Asciiv3 reader and writer.
//!
//! Grounded on the teacher's `hepmc2::{reader,writer}` I/O shape (combined
//! reader, lazy header-on-first-event writer) but reading/writing the
//! Asciiv3 tag grammar directly rather than delegating to the external
//! `hepmc2` crate, since HepMC3's explicit vertex graph is core to this
//! crate's semantics.

pub mod reader;
pub mod writer;

pub use reader::HepMc3Reader;
pub use writer::HepMc3Writer;

use std::sync::Arc;

use crate::formats::{self, WriterOptions};

pub fn register() {
    formats::register(
        "hepmc3",
        Arc::new(|source| Ok(Box::new(HepMc3Reader::new(source)?) as _)),
        Arc::new(|sink, run_info, options: WriterOptions| {
            Ok(Box::new(HepMc3Writer::create(sink, &run_info, options.gzip)?) as _)
        }),
    );
}
