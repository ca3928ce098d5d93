use std::io::Write as IoWrite;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::event::{Event, RunInfo};
use crate::file::File;
use crate::formats::FormatError;
use crate::numfmt::sig17;
use crate::traits::EventSink;
use crate::vertex;

/// Writes the HepMC3 Asciiv3 tag grammar, grounded on the teacher's
/// `hepmc2::Writer` lazy-header idiom and on
/// `original_source/hepconduit/io/hepmc3.py`'s `HepMC3Writer.write()`.
pub struct HepMc3Writer {
    out: Box<dyn IoWrite>,
}

impl HepMc3Writer {
    pub fn create(sink: File, run_info: &RunInfo, gzip: bool) -> Result<Self, FormatError> {
        let out: Box<dyn IoWrite> = if gzip {
            Box::new(GzEncoder::new(sink, Compression::default()))
        } else {
            Box::new(sink)
        };
        let mut writer = HepMc3Writer { out };
        writer.write_header(run_info)?;
        Ok(writer)
    }

    fn write_header(&mut self, run_info: &RunInfo) -> Result<(), FormatError> {
        writeln!(self.out, "HepMC::Version 3.02.05")?;
        writeln!(self.out, "HepMC::Asciiv3-START_EVENT_LISTING")?;
        match &run_info.extra.units {
            Some(units) => writeln!(self.out, "U {} {}", units.momentum, units.length)?,
            None => writeln!(self.out, "U GEV MM")?,
        }
        if !run_info.weight_names.is_empty() {
            write!(self.out, "N {}", run_info.weight_names.len())?;
            for name in &run_info.weight_names {
                write!(self.out, " \"{name}\"")?;
            }
            writeln!(self.out)?;
        }
        for f in &run_info.extra.hepmc3_f {
            writeln!(self.out, "{f}")?;
        }
        for c in &run_info.extra.hepmc3_c {
            writeln!(self.out, "{c}")?;
        }
        Ok(())
    }
}

impl EventSink for HepMc3Writer {
    fn write_event(&mut self, event: &Event) -> Result<(), FormatError> {
        writeln!(self.out, "E {} {} {}", event.event_number, 0, event.n_particles)?;

        if event.weights.len() > 1 || (event.weights.len() == 1 && event.weights[0] != 1.0) {
            write!(self.out, "W")?;
            for w in &event.weights {
                write!(self.out, " {}", sig17(*w))?;
            }
            writeln!(self.out)?;
        }

        for c in &event.extra.hepmc3_c {
            writeln!(self.out, "{c}")?;
        }

        let mut event = event.clone();
        vertex::reconstruct(&mut event);

        let mut vertices = event.vertices.clone();
        vertices.sort_by_key(|v| std::cmp::Reverse(v.barcode));
        for v in &vertices {
            write!(
                self.out,
                "V {} {} {} {} {} {} {}",
                v.barcode,
                sig17(v.x),
                sig17(v.y),
                sig17(v.z),
                sig17(v.t),
                v.incoming.len(),
                v.outgoing.len(),
            )?;
            for barcode in &v.incoming {
                write!(self.out, " {barcode}")?;
            }
            for barcode in &v.outgoing {
                write!(self.out, " {barcode}")?;
            }
            writeln!(self.out)?;
        }

        for p in &event.particles {
            let status = p
                .attributes
                .hepmc_status_raw
                .unwrap_or_else(|| match p.status {
                    crate::event::STATUS_INCOMING => 4,
                    crate::event::STATUS_FINAL => 1,
                    crate::event::STATUS_INTERMEDIATE | crate::event::STATUS_DOCUMENTATION => 2,
                    other => other,
                });
            writeln!(
                self.out,
                "P {} {} {} {} {} {} {} {} {} {}",
                p.barcode,
                p.pdg_id,
                status,
                sig17(p.px),
                sig17(p.py),
                sig17(p.pz),
                sig17(p.energy),
                sig17(p.mass),
                p.vertex_barcode,
                p.end_vertex_barcode,
            )?;
        }

        for a in &event.extra.hepmc3_a {
            writeln!(self.out, "{a}")?;
        }
        for line in &event.extra.hepmc3_unknown_records {
            writeln!(self.out, "{line}")?;
        }

        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<(), FormatError> {
        writeln!(self.out, "HepMC::Asciiv3-END_EVENT_LISTING")?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Particle;
    use std::io::Seek;

    fn write_one(event: &Event, run_info: &RunInfo) -> String {
        let mut tmp = tempfile::tempfile().unwrap();
        {
            let sink = File(tmp.try_clone().unwrap());
            let mut writer = HepMc3Writer::create(sink, run_info, false).unwrap();
            writer.write_event(event).unwrap();
            Box::new(writer).finish().unwrap();
        }
        tmp.rewind().unwrap();
        let mut contents = String::new();
        std::io::Read::read_to_string(&mut tmp, &mut contents).unwrap();
        contents
    }

    #[test]
    fn single_weight_of_one_is_not_emitted() {
        let event = Event::default();
        let contents = write_one(&event, &RunInfo::default());
        assert!(!contents.contains("\nW "));
    }

    #[test]
    fn multi_weight_event_emits_w_line() {
        let mut event = Event::default();
        event.weights = vec![1.0, 0.5];
        let contents = write_one(&event, &RunInfo::default());
        assert!(contents.lines().any(|l| l.starts_with("W ")));
    }

    #[test]
    fn status_round_trips_through_raw_code_when_present() {
        let mut event = Event::default();
        let mut p = Particle {
            status: -1,
            pdg_id: 11,
            energy: 50.0,
            barcode: 1,
            ..Default::default()
        };
        p.attributes.hepmc_status_raw = Some(4);
        event.particles.push(p);
        let contents = write_one(&event, &RunInfo::default());
        let p_line = contents.lines().find(|l| l.starts_with("P 1 ")).unwrap();
        let fields: Vec<&str> = p_line.split_whitespace().collect();
        assert_eq!(fields[3], "4");
    }

    #[test]
    fn vertices_are_reconstructed_and_sorted_descending_by_barcode() {
        let mut event = Event::default();
        event.particles.push(Particle {
            status: -1,
            pdg_id: 11,
            barcode: 1,
            mother1: 0,
            mother2: 0,
            energy: 50.0,
            ..Default::default()
        });
        event.particles.push(Particle {
            status: 1,
            pdg_id: 22,
            barcode: 2,
            mother1: 1,
            mother2: 0,
            energy: 50.0,
            ..Default::default()
        });
        let contents = write_one(&event, &RunInfo::default());
        assert!(contents.lines().any(|l| l.starts_with("V -1 ")));
    }
}
