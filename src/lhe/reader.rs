use std::io::{BufRead, BufReader};

use audec::auto_decompress;

use crate::event::{Event, RunInfo};
use crate::file::File;
use crate::formats::FormatError;
use crate::traits::{EventSource, Rewind, TryClone};

use super::parse::{parse_event_block, parse_init_block, sniff_generator};

/// Streaming LHE reader: a lazy sequence of [`Event`]s plus an eagerly
/// computed [`RunInfo`], grounded on the teacher's `lhef::FileReader`
/// (clone-the-source-handle, auto-decompress, line/tag scanning) but
/// parsing the grammar itself rather than delegating to an external LHE
/// crate.
pub struct LheReader {
    source: File,
    lines: std::io::Lines<Box<dyn BufRead>>,
    run_info: RunInfo,
    event_number: i64,
}

impl LheReader {
    pub fn new(source: File) -> Result<Self, FormatError> {
        let run_info = Self::scan_run_info(&source)?;
        let lines = Self::open_lines(&source)?;
        Ok(LheReader {
            source,
            lines,
            run_info,
            event_number: 0,
        })
    }

    fn open_lines(source: &File) -> Result<std::io::Lines<Box<dyn BufRead>>, FormatError> {
        let cloned = source.try_clone()?;
        let decoded = auto_decompress(BufReader::new(cloned));
        Ok(decoded.lines())
    }

    /// One forward pass collecting both the `<generator>` sniff (first
    /// ~200 lines) and the `<init>...</init>` block.
    fn scan_run_info(source: &File) -> Result<RunInfo, FormatError> {
        let cloned = source.try_clone()?;
        let decoded = auto_decompress(BufReader::new(cloned));

        let mut head = String::new();
        let mut head_lines = 0usize;
        let mut init_lines = Vec::new();
        let mut in_init = false;

        for line in decoded.lines() {
            let line = line?;
            if head_lines < 200 {
                head.push_str(&line);
                head.push('\n');
                head_lines += 1;
            }
            if !in_init {
                if line.contains("<init") {
                    in_init = true;
                }
            } else if line.contains("</init>") {
                break;
            } else {
                init_lines.push(line);
            }
        }

        let mut run_info = parse_init_block(&init_lines);
        let (name, version) = sniff_generator(&head);
        run_info.generator_name = name;
        run_info.generator_version = version;
        Ok(run_info)
    }
}

impl Rewind for LheReader {
    type Error = FormatError;

    fn rewind(&mut self) -> Result<(), Self::Error> {
        self.lines = Self::open_lines(&self.source)?;
        self.event_number = 0;
        Ok(())
    }
}

impl EventSource for LheReader {
    fn run_info(&self) -> RunInfo {
        self.run_info.clone()
    }
}

impl Iterator for LheReader {
    type Item = Result<Event, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.lines.next()? {
                Ok(line) => {
                    if line.contains("<event") {
                        break;
                    }
                }
                Err(err) => return Some(Err(err.into())),
            }
        }

        let mut buf = Vec::new();
        loop {
            match self.lines.next() {
                Some(Ok(line)) => {
                    if line.contains("</event>") {
                        break;
                    }
                    buf.push(line);
                }
                Some(Err(err)) => return Some(Err(err.into())),
                None => break,
            }
        }

        self.event_number += 1;
        Some(Ok(parse_event_block(&buf, self.event_number)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Seek, Write};

    fn lhe_file(contents: &str) -> File {
        let mut tmp = tempfile::tempfile().unwrap();
        tmp.write_all(contents.as_bytes()).unwrap();
        tmp.rewind().unwrap();
        File(tmp)
    }

    const SAMPLE: &str = r#"<LesHouchesEvents version="3.0">
<init>
2212 2212 6500.0 6500.0 0 0 0 0 3 1
0.5 0.01 1.0 1
</init>
<generator>MadGraph5_aMC@NLO v2.9.18</generator>
<event>
2 1 1.0 91.188 0.00729735 0.118
11 -1 0 0 0 0 0.0 0.0 50.0 50.0 0.0 0 9
-11 -1 0 0 0 0 0.0 0.0 -50.0 50.0 0.0 0 9
</event>
</LesHouchesEvents>
"#;

    #[test]
    fn reads_beam_and_process_info() {
        let reader = LheReader::new(lhe_file(SAMPLE)).unwrap();
        let run_info = reader.run_info();
        assert_eq!(run_info.beam_pdg_id, (2212, 2212));
        assert_eq!(run_info.beam_energy, (6500.0, 6500.0));
        assert_eq!(run_info.processes.len(), 1);
        assert_eq!(run_info.generator_name, "MadGraph5_aMC@NLO");
        assert_eq!(run_info.generator_version, "2.9.18");
    }

    #[test]
    fn reads_single_event_with_two_particles() {
        let reader = LheReader::new(lhe_file(SAMPLE)).unwrap();
        let events: Vec<_> = reader.map(|e| e.unwrap()).collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].particles.len(), 2);
        assert_eq!(events[0].particles[0].pdg_id, 11);
    }
}
