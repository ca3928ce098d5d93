use flate2::write::GzEncoder;
use flate2::Compression;

use crate::event::Event;
use crate::file::File;
use crate::formats::FormatError;
use crate::traits::EventSink;

use super::DEFAULT_FIELDS;

/// Flat CSV/TSV writer: one row per particle, `event_number` repeated on
/// every row belonging to that event.
///
/// Grounded on `original_source/hepconduit/io/csv_tsv.py`'s `CSVWriter`.
pub struct CsvWriter {
    out: csv::Writer<Box<dyn std::io::Write>>,
}

impl CsvWriter {
    pub fn create(sink: File, delimiter: u8, gzip: bool) -> Result<Self, FormatError> {
        let out: Box<dyn std::io::Write> = if gzip {
            Box::new(GzEncoder::new(sink, Compression::default()))
        } else {
            Box::new(sink)
        };
        let mut writer = csv::WriterBuilder::new().delimiter(delimiter).from_writer(out);
        writer.write_record(DEFAULT_FIELDS)?;
        Ok(CsvWriter { out: writer })
    }
}

impl EventSink for CsvWriter {
    fn write_event(&mut self, event: &Event) -> Result<(), FormatError> {
        for p in &event.particles {
            self.out.write_record(&[
                event.event_number.to_string(),
                p.pdg_id.to_string(),
                p.status.to_string(),
                p.mother1.to_string(),
                p.mother2.to_string(),
                p.color1.to_string(),
                p.color2.to_string(),
                p.px.to_string(),
                p.py.to_string(),
                p.pz.to_string(),
                p.energy.to_string(),
                p.mass.to_string(),
                p.spin.to_string(),
                p.barcode.to_string(),
                p.vertex_barcode.to_string(),
                p.end_vertex_barcode.to_string(),
            ])?;
        }
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<(), FormatError> {
        self.out.flush()?;
        Ok(())
    }
}

impl From<csv::Error> for FormatError {
    fn from(err: csv::Error) -> Self {
        FormatError::Framing {
            format: "csv",
            detail: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Particle;
    use std::io::{Read, Seek};

    #[test]
    fn writes_one_row_per_particle_with_repeated_event_number() {
        let mut tmp = tempfile::tempfile().unwrap();
        {
            let sink = File(tmp.try_clone().unwrap());
            let mut writer = CsvWriter::create(sink, b',', false).unwrap();
            let event = Event {
                event_number: 7,
                particles: vec![Particle::default(), Particle::default()],
                ..Default::default()
            };
            writer.write_event(&event).unwrap();
            Box::new(writer).finish().unwrap();
        }
        tmp.rewind().unwrap();
        let mut contents = String::new();
        tmp.read_to_string(&mut contents).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("7,"));
        assert!(lines[2].starts_with("7,"));
    }
}
