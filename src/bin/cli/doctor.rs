use clap::Parser;

use hepconduit::event::{EventFile, RunInfo};
use hepconduit::file::File;
use hepconduit::formats::{self, WriterOptions};

/// Check the local environment and format registry for obvious problems.
#[derive(Debug, Parser)]
pub(crate) struct DoctorArgs {}

fn git_on_path() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Round-trip an empty event file through `tag`'s reader/writer pair,
/// grounded on `original_source/hepconduit/doctor.py`'s per-plugin
/// self-check (there, a lightweight import probe; here, there is no
/// dynamic loading to probe, so the check that actually matters is that
/// the registered pair agrees on an empty, degenerate file).
fn round_trips(tag: &str) -> Result<(), String> {
    let dir = tempfile::tempdir().map_err(|e| e.to_string())?;
    let path = dir.path().join(format!("doctor.{tag}"));

    let sink = File::create(&path).map_err(|e| e.to_string())?;
    let mut writer = formats::writer_for(tag, sink, RunInfo::default(), WriterOptions::default()).map_err(|e| e.to_string())?;
    writer.finish().map_err(|e| e.to_string())?;

    let source = File::open(&path).map_err(|e| e.to_string())?;
    let reader = formats::reader_for(tag, source).map_err(|e| e.to_string())?;
    let mut events = Vec::new();
    for event in reader {
        events.push(event.map_err(|e| e.to_string())?);
    }
    let _ = EventFile {
        run_info: RunInfo::default(),
        events,
        format_name: tag.to_string(),
    };
    Ok(())
}

pub(crate) fn run(_args: DoctorArgs) -> anyhow::Result<i32> {
    hepconduit::formats::register_builtin_formats();

    let mut ok = true;

    if git_on_path() {
        println!("[ok]   git binary found on PATH");
    } else {
        println!("[warn] no git binary on PATH; provenance `git_sha` will be empty");
    }

    let tags = formats::registered_tags();
    if tags.is_empty() {
        println!("[fail] no formats registered");
        ok = false;
    } else {
        println!("[ok]   {} formats registered: {}", tags.len(), tags.join(", "));
    }

    for tag in &tags {
        match round_trips(tag) {
            Ok(()) => println!("[ok]   {tag}: empty-file round trip"),
            Err(err) => {
                println!("[fail] {tag}: empty-file round trip failed: {err}");
                ok = false;
            }
        }
    }

    if ok {
        println!("doctor: all checks passed");
        Ok(super::EXIT_OK)
    } else {
        println!("doctor: one or more checks failed");
        Ok(super::EXIT_FAILURE)
    }
}
