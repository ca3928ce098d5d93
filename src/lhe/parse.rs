//! Line/column grammar for a single `<event>...</event>` or `<init>...
//! </init>` block, built on the teacher's `nom` column combinators
//! (`parsing.rs`) for the fixed-width particle rows, and plain tokenizing
//! for the variable-length event header and weight/rwgt tag scraping.

use std::borrow::Cow;

use lazy_static::lazy_static;
use log::warn;
use regex::Regex;

use crate::event::{Event, Particle, ProcessInfo, RunInfo};
use crate::extra::ExtraAttributes;
use crate::parsing::{double_entry, i32_entry};

lazy_static! {
    static ref WEIGHT_TAG: Regex =
        Regex::new(r#"<(?:weight|wgt)\s+id=['"]([^'"]+)['"]\s*>([^<]*)</(?:weight|wgt)>"#).unwrap();
    static ref WEIGHTS_BLOCK: Regex = Regex::new(r"(?s)<weights>(.*?)</weights>").unwrap();
    static ref RWGT_BLOCK: Regex = Regex::new(r"(?s)<rwgt>(.*?)</rwgt>").unwrap();
    static ref GENERATOR_TAG: Regex =
        Regex::new(r"(?is)<generator\b[^>]*>(.*?)</generator>").unwrap();
}

/// LHE uses Fortran double-exponent notation (`1.0D+01`); substitute
/// `D`/`d` with `E`/`e` before handing the token to a normal float parser.
/// These lines are purely numeric/tag text, so a blanket substitution is
/// safe.
pub(crate) fn normalize_exponents(line: &str) -> Cow<'_, str> {
    if line.bytes().any(|b| b == b'D' || b == b'd') {
        Cow::Owned(line.replace(['D', 'd'], "E"))
    } else {
        Cow::Borrowed(line)
    }
}

fn parse_f64(tok: &str) -> Option<f64> {
    normalize_exponents(tok).parse().ok()
}

pub(crate) struct EventHeader {
    pub nup: u32,
    pub process_id: i32,
    pub weight: f64,
    pub scale: f64,
    pub aqed: f64,
    pub aqcd: f64,
}

/// `nup idprup xwgtup scalup aqedup aqcdup`; trailing fields default when
/// the header is shortened (edge-case scenario 2).
pub(crate) fn parse_event_header(line: &str) -> Option<EventHeader> {
    let owned = normalize_exponents(line).into_owned();
    let mut it = owned.split_whitespace();
    let nup: u32 = it.next()?.parse().ok()?;
    let process_id = it.next().and_then(|t| t.parse().ok()).unwrap_or(0);
    let weight = it.next().and_then(parse_f64).unwrap_or(1.0);
    let scale = it.next().and_then(parse_f64).unwrap_or(0.0);
    let aqed = it.next().and_then(parse_f64).unwrap_or(0.0);
    let aqcd = it.next().and_then(parse_f64).unwrap_or(0.0);
    Some(EventHeader {
        nup,
        process_id,
        weight,
        scale,
        aqed,
        aqcd,
    })
}

/// 13-column particle row: `id status mother1 mother2 c1 c2 px py pz E M
/// lifetime spin`. Lifetime and spin are tolerated as 0/9 when absent.
/// Malformed rows default to a zeroed particle rather than aborting the
/// whole file (§4.2: robustness is an explicit design choice).
pub(crate) fn parse_particle_row(line: &str) -> Particle {
    parse_particle_row_inner(line).unwrap_or_default()
}

fn parse_particle_row_inner(line: &str) -> Option<Particle> {
    let normalized = normalize_exponents(line);
    let s = normalized.trim_start();
    let (s, pdg_id) = nom::character::complete::i32::<_, nom::error::Error<&str>>(s).ok()?;
    let (s, status) = i32_entry(s).ok()?;
    let (s, mother1) = i32_entry(s).ok()?;
    let (s, mother2) = i32_entry(s).ok()?;
    let (s, color1) = i32_entry(s).ok()?;
    let (s, color2) = i32_entry(s).ok()?;
    let (s, px) = double_entry(s).ok()?;
    let (s, py) = double_entry(s).ok()?;
    let (s, pz) = double_entry(s).ok()?;
    let (s, energy) = double_entry(s).ok()?;
    let (s, mass) = double_entry(s).ok()?;
    let (s, _lifetime) = double_entry(s).unwrap_or((s, 0.0));
    let (_, spin) = double_entry(s).unwrap_or((s, 9.0));
    Some(Particle {
        pdg_id,
        status,
        mother1,
        mother2,
        color1,
        color2,
        px,
        py,
        pz,
        energy,
        mass,
        spin,
        ..Default::default()
    })
}

/// Extract the `<weights>`/`<rwgt>` blocks and any leftover verbatim tail
/// text from the non-particle remainder of an event block, returning
/// additional weights (in file order) to append after the header weight.
pub(crate) fn parse_event_tail(rest: &str) -> (Vec<f64>, ExtraAttributes) {
    let mut extra = ExtraAttributes::default();
    let mut extra_weights = Vec::new();
    let mut consumed = rest.to_string();

    if let Some(caps) = WEIGHTS_BLOCK.captures(rest) {
        let inner = caps.get(1).unwrap().as_str();
        for cap in WEIGHT_TAG.captures_iter(inner) {
            let id = cap[1].to_string();
            if let Some(value) = parse_f64(cap[2].trim()) {
                extra_weights.push(value);
                extra.lhe_weights.insert(id, value);
            }
        }
        consumed = consumed.replace(caps.get(0).unwrap().as_str(), "");
    }
    if let Some(caps) = RWGT_BLOCK.captures(rest) {
        let inner = caps.get(1).unwrap().as_str();
        for cap in WEIGHT_TAG.captures_iter(inner) {
            let id = cap[1].to_string();
            if let Some(value) = parse_f64(cap[2].trim()) {
                extra_weights.push(value);
                extra.lhe_rwgt.insert(id, value);
            }
        }
        consumed = consumed.replace(caps.get(0).unwrap().as_str(), "");
    }

    let tail: String = consumed
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .collect::<Vec<_>>()
        .join(" ");
    if !tail.is_empty() {
        extra.lhe_tail = Some(tail);
    }

    (extra_weights, extra)
}

/// Parse a complete `<event>...</event>` block (tag lines excluded): a
/// header line, `nup` particle rows, then an optional `<weights>`/`<rwgt>`
/// tail.
pub(crate) fn parse_event_block(lines: &[String], event_number: i64) -> Event {
    let mut idx = 0;
    let mut header = None;
    while idx < lines.len() {
        let s = lines[idx].trim();
        idx += 1;
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        header = parse_event_header(s);
        break;
    }
    let Some(header) = header else {
        return Event {
            event_number,
            ..Default::default()
        };
    };

    let mut particles = Vec::with_capacity(header.nup as usize);
    let mut consumed = 0u32;
    while consumed < header.nup && idx < lines.len() {
        let s = lines[idx].trim();
        idx += 1;
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        particles.push(parse_particle_row(s));
        consumed += 1;
    }

    let rest = lines[idx..].join("\n");
    let (extra_weights, extra) = parse_event_tail(&rest);

    let mut weights = vec![header.weight];
    weights.extend(extra_weights);

    Event {
        event_number,
        n_particles: particles.len() as i32,
        particles,
        vertices: Vec::new(),
        weights,
        process_id: header.process_id,
        scale: header.scale,
        alpha_qed: header.aqed,
        alpha_qcd: header.aqcd,
        extra,
    }
}

/// Parse the contents of an `<init>` block into run-level metadata. The
/// first non-comment line carries beam PDG ids/energies; subsequent
/// 4-column rows are process lines unless the trailing integer matches a
/// beam PDG id, a known ambiguity between the two schemas that we resolve
/// by preferring the beam interpretation and logging (§9 open question a).
pub(crate) fn parse_init_block(lines: &[String]) -> RunInfo {
    let mut beam_pdg = (0, 0);
    let mut beam_energy = (0.0, 0.0);
    let mut processes = Vec::new();
    let mut seen_beam_line = false;

    for line in lines {
        let s = line.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let tokens: Vec<&str> = s.split_whitespace().collect();
        if !seen_beam_line && tokens.len() >= 4 {
            if let (Ok(b1), Ok(b2), Some(e1), Some(e2)) = (
                tokens[0].parse::<i32>(),
                tokens[1].parse::<i32>(),
                parse_f64(tokens[2]),
                parse_f64(tokens[3]),
            ) {
                beam_pdg = (b1, b2);
                beam_energy = (e1, e2);
                seen_beam_line = true;
                continue;
            }
        }
        if tokens.len() == 4 {
            let xsec = parse_f64(tokens[0]);
            let xerr = parse_f64(tokens[1]);
            let xmax = parse_f64(tokens[2]);
            let lprup = tokens[3].parse::<i32>().ok();
            if let (Some(xsec), Some(xerr), Some(xmax), Some(lprup)) = (xsec, xerr, xmax, lprup) {
                if lprup == beam_pdg.0 || lprup == beam_pdg.1 {
                    warn!(
                        "LHE <init> line `{s}` looks like a beam line by trailing PDG id {lprup}; \
                         keeping the beam-line heuristic and skipping it as a process line"
                    );
                    continue;
                }
                processes.push(ProcessInfo {
                    process_id: lprup,
                    cross_section: xsec,
                    cross_section_error: xerr,
                    max_weight: xmax,
                });
            }
        }
    }

    RunInfo {
        beam_pdg_id: beam_pdg,
        beam_energy,
        processes,
        ..Default::default()
    }
}

/// Scan the first ~200 lines of text for a `<generator>` tag, splitting
/// `"Name vVersion"` on the literal `" v"` when present.
pub(crate) fn sniff_generator(head: &str) -> (String, String) {
    let Some(caps) = GENERATOR_TAG.captures(head) else {
        return (String::new(), String::new());
    };
    let raw = caps.get(1).unwrap().as_str();
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if let Some((name, version)) = collapsed.split_once(" v") {
        (name.to_string(), version.to_string())
    } else {
        (collapsed, String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fortran_exponent_parses() {
        assert_eq!(parse_f64("1.0D+01"), Some(10.0));
    }

    #[test]
    fn shortened_header_defaults_trailing_fields() {
        let header = parse_event_header("5 1 0.5").unwrap();
        assert_eq!(header.nup, 5);
        assert_eq!(header.process_id, 1);
        assert_eq!(header.weight, 0.5);
        assert_eq!(header.scale, 0.0);
    }

    #[test]
    fn particle_row_tolerates_missing_spin() {
        let p = parse_particle_row("11 1 1 2 0 0 1.0 2.0 3.0 4.0 0.0 0");
        assert_eq!(p.pdg_id, 11);
        assert_eq!(p.spin, 9.0);
    }

    #[test]
    fn weight_and_rwgt_blocks_are_extracted() {
        let rest = "<weights>\n<weight id='1'>1.5</weight>\n</weights>\n\
                     <rwgt>\n<wgt id=\"mur=0.5_muf=0.5\">0.9</wgt>\n</rwgt>\ntrailer token";
        let (weights, extra) = parse_event_tail(rest);
        assert_eq!(weights, vec![1.5, 0.9]);
        assert_eq!(extra.lhe_rwgt.get("mur=0.5_muf=0.5"), Some(&0.9));
        assert_eq!(extra.lhe_tail.as_deref(), Some("trailer token"));
    }

    #[test]
    fn generator_tag_splits_name_and_version() {
        let (name, version) = sniff_generator("<generator>MadGraph5_aMC@NLO v2.9.18</generator>");
        assert_eq!(name, "MadGraph5_aMC@NLO");
        assert_eq!(version, "2.9.18");
    }
}
