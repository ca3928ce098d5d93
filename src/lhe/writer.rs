use std::io::Write as IoWrite;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::event::{Event, RunInfo};
use crate::file::File;
use crate::formats::FormatError;
use crate::numfmt::sig16;
use crate::traits::EventSink;

/// Writes the `<LesHouchesEvents>` framing, grounded on the teacher's
/// `lhef::Writer` lazy-header idiom but emitting the XML-ish text
/// directly instead of delegating to an external LHE crate.
pub struct LheWriter {
    out: Box<dyn IoWrite>,
}

impl LheWriter {
    pub fn create(sink: File, run_info: &RunInfo, gzip: bool) -> Result<Self, FormatError> {
        let out: Box<dyn IoWrite> = if gzip {
            Box::new(GzEncoder::new(sink, Compression::default()))
        } else {
            Box::new(sink)
        };
        let mut writer = LheWriter { out };
        writer.write_header(run_info)?;
        Ok(writer)
    }

    fn write_header(&mut self, run_info: &RunInfo) -> Result<(), FormatError> {
        writeln!(self.out, "<LesHouchesEvents version=\"3.0\">")?;
        writeln!(self.out, "<init>")?;
        writeln!(
            self.out,
            "{} {} {} {} 0 0 0 0 0 0",
            run_info.beam_pdg_id.0,
            run_info.beam_pdg_id.1,
            sig16(run_info.beam_energy.0),
            sig16(run_info.beam_energy.1),
        )?;
        for proc in &run_info.processes {
            writeln!(
                self.out,
                "{} {} {} {}",
                sig16(proc.cross_section),
                sig16(proc.cross_section_error),
                sig16(proc.max_weight),
                proc.process_id,
            )?;
        }
        writeln!(self.out, "</init>")?;
        if !run_info.generator_name.is_empty() {
            let mut tag = run_info.generator_name.clone();
            if !run_info.generator_version.is_empty() {
                tag.push_str(" v");
                tag.push_str(&run_info.generator_version);
            }
            writeln!(self.out, "<generator>{tag}</generator>")?;
        }
        Ok(())
    }
}

impl EventSink for LheWriter {
    fn write_event(&mut self, event: &Event) -> Result<(), FormatError> {
        writeln!(self.out, "<event>")?;
        writeln!(
            self.out,
            "{} {} {} {} {} {}",
            event.particles.len(),
            event.process_id,
            sig16(event.weight()),
            sig16(event.scale),
            sig16(event.alpha_qed),
            sig16(event.alpha_qcd),
        )?;
        for p in &event.particles {
            // lifetime is not modelled; always written as 0.0
            writeln!(
                self.out,
                "{} {} {} {} {} {} {} {} {} {} {} 0 {}",
                p.pdg_id,
                p.status,
                p.mother1,
                p.mother2,
                p.color1,
                p.color2,
                sig16(p.px),
                sig16(p.py),
                sig16(p.pz),
                sig16(p.energy),
                sig16(p.mass),
                sig16(p.spin),
            )?;
        }
        writeln!(self.out, "</event>")?;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<(), FormatError> {
        writeln!(self.out, "</LesHouchesEvents>")?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Seek;

    #[test]
    fn writes_event_and_particle_rows() {
        let run_info = RunInfo::default();
        let mut tmp = tempfile::tempfile().unwrap();
        {
            let sink = File(tmp.try_clone().unwrap());
            let mut writer = LheWriter::create(sink, &run_info, false).unwrap();
            let mut event = Event::default();
            event.particles.push(crate::event::Particle {
                pdg_id: 11,
                status: -1,
                energy: 50.0,
                ..Default::default()
            });
            writer.write_event(&event).unwrap();
            Box::new(writer).finish().unwrap();
        }
        tmp.rewind().unwrap();
        let mut contents = String::new();
        std::io::Read::read_to_string(&mut tmp, &mut contents).unwrap();
        assert!(contents.contains("<event>"));
        assert!(contents.contains("11 -1"));
    }

    #[test]
    fn header_contains_beam_line() {
        let mut run_info = RunInfo::default();
        run_info.beam_pdg_id = (2212, 2212);
        run_info.beam_energy = (6500.0, 6500.0);

        let mut tmp = tempfile::tempfile().unwrap();
        {
            let sink = File(tmp.try_clone().unwrap());
            let writer = LheWriter::create(sink, &run_info, false).unwrap();
            Box::new(writer).finish().unwrap();
        }
        tmp.rewind().unwrap();
        let mut contents = String::new();
        std::io::Read::read_to_string(&mut tmp, &mut contents).unwrap();
        assert!(contents.contains("2212 2212"));
        assert!(contents.contains("</LesHouchesEvents>"));
    }
}
