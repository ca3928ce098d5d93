use audec::auto_decompress;

use crate::event::{Event, Particle, RunInfo};
use crate::file::File;
use crate::formats::FormatError;
use crate::traits::{EventSource, Rewind, TryClone};

/// Streaming CSV/TSV reader: groups contiguous rows sharing an
/// `event_number` into one [`Event`], preserving file order (matching
/// `original_source/hepconduit/io/csv_tsv.py`'s `CSVReader.iter_events`,
/// which never sorts by event number either).
pub struct CsvReader {
    source: File,
    delimiter: u8,
    records: csv::Reader<Box<dyn std::io::Read>>,
    /// A row belonging to the next event, read one row too far while
    /// detecting the boundary of the current one.
    peeked: Option<csv::StringRecord>,
    headers: csv::StringRecord,
}

impl CsvReader {
    pub fn new(source: File, delimiter: u8) -> Result<Self, FormatError> {
        let mut records = Self::open(&source, delimiter)?;
        let headers = records.headers()?.clone();
        let peeked = records.records().next().transpose()?;
        Ok(CsvReader {
            source,
            delimiter,
            records,
            peeked,
            headers,
        })
    }

    fn open(source: &File, delimiter: u8) -> Result<csv::Reader<Box<dyn std::io::Read>>, FormatError> {
        let cloned = source.try_clone()?;
        let decompressed: Box<dyn std::io::Read> = Box::new(auto_decompress(std::io::BufReader::new(cloned)));
        Ok(csv::ReaderBuilder::new().delimiter(delimiter).has_headers(true).from_reader(decompressed))
    }

    fn field<'a>(&self, row: &'a csv::StringRecord, name: &str) -> Option<&'a str> {
        self.headers.iter().position(|h| h == name).and_then(|i| row.get(i))
    }

    fn parse_particle(&self, row: &csv::StringRecord) -> Particle {
        let int = |name: &str| self.field(row, name).and_then(|v| v.parse().ok()).unwrap_or(0);
        let float = |name: &str| self.field(row, name).and_then(|v| v.parse().ok()).unwrap_or(0.0);
        Particle {
            pdg_id: int("pdg_id"),
            status: int("status"),
            mother1: int("mother1"),
            mother2: int("mother2"),
            color1: int("color1"),
            color2: int("color2"),
            px: float("px"),
            py: float("py"),
            pz: float("pz"),
            energy: self
                .field(row, "energy")
                .or_else(|| self.field(row, "E"))
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.0),
            mass: self
                .field(row, "mass")
                .or_else(|| self.field(row, "m"))
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.0),
            spin: self.field(row, "spin").and_then(|v| v.parse().ok()).unwrap_or(9.0),
            barcode: int("barcode"),
            vertex_barcode: int("vertex_barcode"),
            end_vertex_barcode: int("end_vertex_barcode"),
            ..Default::default()
        }
    }

    fn event_number(&self, row: &csv::StringRecord) -> i64 {
        self.field(row, "event_number").and_then(|v| v.parse().ok()).unwrap_or(0)
    }
}

impl Rewind for CsvReader {
    type Error = FormatError;

    fn rewind(&mut self) -> Result<(), Self::Error> {
        let mut records = Self::open(&self.source, self.delimiter)?;
        self.headers = records.headers()?.clone();
        self.peeked = records.records().next().transpose()?;
        self.records = records;
        Ok(())
    }
}

impl EventSource for CsvReader {
    fn run_info(&self) -> RunInfo {
        RunInfo::default()
    }
}

impl Iterator for CsvReader {
    type Item = Result<Event, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.peeked.take()?;
        let event_number = self.event_number(&first);
        let mut particles = vec![self.parse_particle(&first)];

        loop {
            let next = match self.records.records().next() {
                Some(Ok(row)) => row,
                Some(Err(err)) => return Some(Err(err.into())),
                None => break,
            };
            if self.event_number(&next) != event_number {
                self.peeked = Some(next);
                break;
            }
            particles.push(self.parse_particle(&next));
        }

        Some(Ok(Event {
            event_number,
            n_particles: particles.len() as i32,
            particles,
            ..Default::default()
        }))
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
    use std::io::{Seek, Write};

    fn csv_file(contents: &str) -> File {
        let mut tmp = tempfile::tempfile().unwrap();
        tmp.write_all(contents.as_bytes()).unwrap();
        tmp.rewind().unwrap();
        File(tmp)
    }

    const SAMPLE: &str = "event_number,pdg_id,status,mother1,mother2,color1,color2,px,py,pz,energy,mass,spin,barcode,vertex_barcode,end_vertex_barcode\n\
                          0,11,-1,0,0,0,0,0,0,50,50,0,9,1,0,0\n\
                          0,22,1,1,0,0,0,0,0,50,50,0,9,2,0,0\n\
                          1,11,-1,0,0,0,0,0,0,60,60,0,9,1,0,0\n";

    #[test]
    fn groups_rows_into_events_by_event_number() {
        let reader = CsvReader::new(csv_file(SAMPLE), b',').unwrap();
        let events: Vec<_> = reader.map(|e| e.unwrap()).collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].particles.len(), 2);
        assert_eq!(events[1].particles.len(), 1);
    }

    #[test]
    fn parses_particle_fields() {
        let reader = CsvReader::new(csv_file(SAMPLE), b',').unwrap();
        let events: Vec<_> = reader.map(|e| e.unwrap()).collect();
        assert_eq!(events[0].particles[0].pdg_id, 11);
        assert_eq!(events[0].particles[0].status, -1);
        assert_eq!(events[0].particles[0].energy, 50.0);
    }
}
