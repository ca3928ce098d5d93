use std::collections::BTreeMap;
use std::io::{BufRead, BufReader};

use audec::auto_decompress;

use crate::event::{Event, Particle, RunInfo, Vertex};
use crate::extra::{ExtraAttributes, LengthUnit, MomentumUnit, Units};
use crate::file::File;
use crate::formats::FormatError;
use crate::traits::{EventSource, Rewind, TryClone};

/// Streaming HepMC3 Asciiv3 reader.
///
/// Run-scope records (`HepMC::`, `U`, `N`, `F`, `C`) are scanned eagerly
/// into [`RunInfo`] on construction; everything from the first `E` record
/// onward is parsed lazily, one event at a time, mirroring the teacher's
/// `hepmc2::CombinedReader` clone-and-rescan idiom.
pub struct HepMc3Reader {
    source: File,
    lines: std::io::Lines<Box<dyn BufRead>>,
    run_info: RunInfo,
    /// An already-read `E ...` line starting the next event, buffered
    /// because detecting "end of current event" means reading one line
    /// too far.
    peeked: Option<String>,
}

impl HepMc3Reader {
    pub fn new(source: File) -> Result<Self, FormatError> {
        let run_info = Self::scan_run_info(&source)?;
        let mut lines = Self::open_lines(&source)?;
        let peeked = Self::advance_to_event(&mut lines)?;
        Ok(HepMc3Reader {
            source,
            lines,
            run_info,
            peeked,
        })
    }

    fn open_lines(source: &File) -> Result<std::io::Lines<Box<dyn BufRead>>, FormatError> {
        let cloned = source.try_clone()?;
        Ok(auto_decompress(BufReader::new(cloned)).lines())
    }

    fn advance_to_event(
        lines: &mut std::io::Lines<Box<dyn BufRead>>,
    ) -> Result<Option<String>, FormatError> {
        for line in lines {
            let line = line?;
            if is_event_tag(&line) {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }

    fn scan_run_info(source: &File) -> Result<RunInfo, FormatError> {
        let cloned = source.try_clone()?;
        let lines = auto_decompress(BufReader::new(cloned)).lines();
        let mut run_info = RunInfo::default();

        for line in lines {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with("HepMC::") {
                continue;
            }
            let tag = trimmed.split_whitespace().next().unwrap_or("");
            match tag {
                "U" => {
                    let parts: Vec<&str> = trimmed.split_whitespace().collect();
                    if parts.len() >= 3 {
                        run_info.extra.units = Some(Units {
                            momentum: parse_momentum_unit(parts[1]),
                            length: parse_length_unit(parts[2]),
                        });
                    }
                }
                "N" => {
                    let parts: Vec<&str> = trimmed.split_whitespace().collect();
                    if parts.len() >= 2 {
                        let n: usize = parts[1].parse().unwrap_or(0);
                        let names: Vec<String> =
                            parts[2..].iter().map(|s| s.to_string()).collect();
                        run_info.weight_names = if n > 0 && names.len() >= n {
                            names[..n].to_vec()
                        } else {
                            names
                        };
                    }
                }
                "F" => run_info.extra.hepmc3_f.push(trimmed.to_string()),
                "C" => run_info.extra.hepmc3_c.push(trimmed.to_string()),
                "E" => break,
                _ => {}
            }
        }
        Ok(run_info)
    }
}

fn is_event_tag(line: &str) -> bool {
    line.trim().split_whitespace().next() == Some("E")
}

fn parse_momentum_unit(s: &str) -> MomentumUnit {
    match s.to_ascii_uppercase().as_str() {
        "MEV" => MomentumUnit::Mev,
        _ => MomentumUnit::Gev,
    }
}

fn parse_length_unit(s: &str) -> LengthUnit {
    match s.to_ascii_uppercase().as_str() {
        "CM" => LengthUnit::Cm,
        _ => LengthUnit::Mm,
    }
}

fn parse_event_number(line: &str) -> i64 {
    line.split_whitespace()
        .nth(1)
        .and_then(|t| t.parse().ok())
        .unwrap_or(0)
}

fn parse_vertex_line(line: &str, vertices: &mut BTreeMap<i32, Vertex>) {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 6 {
        return;
    }
    let Ok(barcode) = parts[1].parse::<i32>() else {
        return;
    };
    let (Ok(x), Ok(y), Ok(z), Ok(t)) = (
        parts[2].parse(),
        parts[3].parse(),
        parts[4].parse(),
        parts[5].parse(),
    ) else {
        return;
    };
    let mut vertex = Vertex {
        barcode,
        x,
        y,
        z,
        t,
        ..Default::default()
    };
    if parts.len() >= 8 {
        if let (Ok(nin), Ok(nout)) = (parts[6].parse::<usize>(), parts[7].parse::<usize>()) {
            let mut idx = 8;
            for _ in 0..nin {
                if idx >= parts.len() {
                    break;
                }
                if let Ok(v) = parts[idx].parse() {
                    vertex.incoming.push(v);
                }
                idx += 1;
            }
            for _ in 0..nout {
                if idx >= parts.len() {
                    break;
                }
                if let Ok(v) = parts[idx].parse() {
                    vertex.outgoing.push(v);
                }
                idx += 1;
            }
        }
    }
    vertices.insert(barcode, vertex);
}

fn parse_particle_line(line: &str, event: &mut Event) {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 9 {
        return;
    }
    let (Ok(barcode), Ok(pdg_id), Ok(raw_status)) = (
        parts[1].parse::<i32>(),
        parts[2].parse::<i32>(),
        parts[3].parse::<i32>(),
    ) else {
        return;
    };
    let (Ok(px), Ok(py), Ok(pz), Ok(energy), Ok(mass)) = (
        parts[4].parse::<f64>(),
        parts[5].parse::<f64>(),
        parts[6].parse::<f64>(),
        parts[7].parse::<f64>(),
        parts[8].parse::<f64>(),
    ) else {
        return;
    };
    let (mut vertex_barcode, mut end_vertex_barcode) = (0, 0);
    if parts.len() >= 11 {
        vertex_barcode = parts[9].parse().unwrap_or(0);
        end_vertex_barcode = parts[10].parse().unwrap_or(0);
    }
    let mapped_status = match raw_status {
        4 => -1,
        1 => 1,
        2 | 3 => 2,
        other => other,
    };
    let mut attributes = ExtraAttributes::default();
    if mapped_status != raw_status {
        attributes.hepmc_status_raw = Some(raw_status);
    }
    event.particles.push(Particle {
        pdg_id,
        status: mapped_status,
        px,
        py,
        pz,
        energy,
        mass,
        barcode,
        vertex_barcode,
        end_vertex_barcode,
        attributes,
        ..Default::default()
    });
}

impl Rewind for HepMc3Reader {
    type Error = FormatError;

    fn rewind(&mut self) -> Result<(), Self::Error> {
        let mut lines = Self::open_lines(&self.source)?;
        let peeked = Self::advance_to_event(&mut lines)?;
        self.lines = lines;
        self.peeked = peeked;
        Ok(())
    }
}

impl EventSource for HepMc3Reader {
    fn run_info(&self) -> RunInfo {
        self.run_info.clone()
    }
}

impl Iterator for HepMc3Reader {
    type Item = Result<Event, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        let e_line = self.peeked.take()?;
        let mut event = Event {
            event_number: parse_event_number(&e_line),
            weights: Vec::new(),
            ..Default::default()
        };
        let mut vertices: BTreeMap<i32, Vertex> = BTreeMap::new();

        loop {
            let line = match self.lines.next() {
                Some(Ok(l)) => l,
                Some(Err(err)) => return Some(Err(err.into())),
                None => break,
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let tag = trimmed.split_whitespace().next().unwrap_or("");
            if tag == "E" {
                self.peeked = Some(line);
                break;
            }
            match tag {
                "W" => {
                    let ws: Vec<f64> = trimmed
                        .split_whitespace()
                        .skip(1)
                        .filter_map(|t| t.parse().ok())
                        .collect();
                    if !ws.is_empty() {
                        event.weights = ws;
                    }
                }
                "V" => parse_vertex_line(trimmed, &mut vertices),
                "P" => parse_particle_line(trimmed, &mut event),
                "A" => event.extra.hepmc3_a.push(trimmed.to_string()),
                "C" => event.extra.hepmc3_c.push(trimmed.to_string()),
                _ => event.extra.hepmc3_unknown_records.push(trimmed.to_string()),
            }
        }

        if event.weights.is_empty() {
            event.weights = vec![1.0];
        }
        event.vertices = vertices.into_values().collect();
        event.n_particles = event.particles.len() as i32;
        Some(Ok(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Seek, Write};

    fn hepmc_file(contents: &str) -> File {
        let mut tmp = tempfile::tempfile().unwrap();
        tmp.write_all(contents.as_bytes()).unwrap();
        tmp.rewind().unwrap();
        File(tmp)
    }

    const SAMPLE: &str = "HepMC::Version 3.0.0\n\
                           HepMC::Asciiv3\n\
                           U GEV MM\n\
                           N 1 nominal\n\
                           E 0\n\
                           W 1.0\n\
                           V -1 0.0 0.0 0.0 0.0 2 1 1 2 3\n\
                           P 1 11 4 0.0 0.0 50.0 50.0 0.0 0 -1\n\
                           P 2 -11 4 0.0 0.0 -50.0 50.0 0.0 0 -1\n\
                           P 3 22 1 0.0 0.0 0.0 100.0 0.0 -1 0\n";

    #[test]
    fn reads_units_and_weight_names() {
        let reader = HepMc3Reader::new(hepmc_file(SAMPLE)).unwrap();
        let run_info = reader.run_info();
        assert_eq!(run_info.weight_names, vec!["nominal".to_string()]);
        assert!(run_info.extra.units.is_some());
    }

    #[test]
    fn maps_beam_status_and_preserves_raw_code() {
        let reader = HepMc3Reader::new(hepmc_file(SAMPLE)).unwrap();
        let events: Vec<_> = reader.map(|e| e.unwrap()).collect();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.particles[0].status, -1);
        assert_eq!(event.particles[0].attributes.hepmc_status_raw, Some(4));
        assert_eq!(event.vertices.len(), 1);
        assert_eq!(event.vertices[0].barcode, -1);
    }
}
