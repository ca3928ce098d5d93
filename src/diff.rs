//! Semantic diff between two event files (§4 CLI `diff` subcommand).
//!
//! Grounded on `original_source/hepconduit/diff.py`: two comparison modes,
//! `fingerprint` (order-insensitive multiset comparison) and `index`
//! (pairwise positional drift statistics).

use std::path::Path;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::event::{Event, EventFile};
use crate::file::File;
use crate::fingerprint::{fingerprint_event, FingerprintConfig};
use crate::formats;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum DiffReport {
    Fingerprint {
        n_a: usize,
        n_b: usize,
        common: u64,
        added: u64,
        removed: u64,
        example_added: Vec<String>,
        example_removed: Vec<String>,
    },
    Index {
        n_a: usize,
        n_b: usize,
        compared_events: usize,
        weight: WeightDrift,
        final_state_drift: FinalStateDrift,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightDrift {
    pub mean_delta: f64,
    pub max_abs_delta: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalStateDrift {
    pub mean_l1: f64,
    pub max_l1: f64,
}

pub(crate) fn read_all(path: &Path, format: Option<&str>) -> Result<EventFile, crate::convert::ConvertError> {
    let tag = match format {
        Some(tag) => tag.to_string(),
        None => formats::detect_format(path)
            .map(|t| t.to_string())
            .map_err(|_| crate::error::InvocationError::UnknownFormat(path.to_path_buf()))?,
    };
    let file = File::open(path)?;
    let reader = formats::reader_for(&tag, file)?;
    let run_info = reader.run_info();
    let mut events = Vec::new();
    for event in reader {
        events.push(event?);
    }
    Ok(EventFile {
        run_info,
        events,
        format_name: tag,
    })
}

fn counter(events: &[Event], cfg: &FingerprintConfig) -> HashMap<String, u64> {
    let mut counts = HashMap::new();
    for event in events {
        *counts.entry(fingerprint_event(event, cfg)).or_insert(0u64) += 1;
    }
    counts
}

fn diff_by_fingerprint(ef_a: &EventFile, ef_b: &EventFile, abs_tol: f64) -> DiffReport {
    let cfg = FingerprintConfig {
        abs_tol,
        ..FingerprintConfig::default()
    };
    let ca = counter(&ef_a.events, &cfg);
    let cb = counter(&ef_b.events, &cfg);

    let mut common = 0u64;
    let mut added = 0u64;
    let mut removed = 0u64;
    let all_keys: std::collections::HashSet<&String> = ca.keys().chain(cb.keys()).collect();
    for key in &all_keys {
        let a = ca.get(*key).copied().unwrap_or(0);
        let b = cb.get(*key).copied().unwrap_or(0);
        common += a.min(b);
        added += b.saturating_sub(a);
        removed += a.saturating_sub(b);
    }

    let mut example_added: Vec<String> = cb
        .iter()
        .filter(|(k, b)| **b > ca.get(*k).copied().unwrap_or(0))
        .map(|(k, _)| k.clone())
        .collect();
    example_added.sort_unstable();
    example_added.truncate(5);

    let mut example_removed: Vec<String> = ca
        .iter()
        .filter(|(k, a)| **a > cb.get(*k).copied().unwrap_or(0))
        .map(|(k, _)| k.clone())
        .collect();
    example_removed.sort_unstable();
    example_removed.truncate(5);

    DiffReport::Fingerprint {
        n_a: ef_a.events.len(),
        n_b: ef_b.events.len(),
        common,
        added,
        removed,
        example_added,
        example_removed,
    }
}

fn diff_by_index(ef_a: &EventFile, ef_b: &EventFile) -> DiffReport {
    let n = ef_a.events.len().min(ef_b.events.len());
    let mut weight_diffs = Vec::with_capacity(n);
    let mut max_dp = 0.0f64;
    let mut mean_dp_sum = 0.0f64;
    let mut n_part_comp = 0u64;

    for i in 0..n {
        let ea = &ef_a.events[i];
        let eb = &ef_b.events[i];
        weight_diffs.push(eb.weight() - ea.weight());

        let mut fa: Vec<(i32, f64, f64, f64, f64)> = ea
            .particles
            .iter()
            .filter(|p| p.is_final())
            .map(|p| (p.pdg_id, p.px, p.py, p.pz, p.energy))
            .collect();
        let mut fb: Vec<(i32, f64, f64, f64, f64)> = eb
            .particles
            .iter()
            .filter(|p| p.is_final())
            .map(|p| (p.pdg_id, p.px, p.py, p.pz, p.energy))
            .collect();
        fa.sort_by(|a, b| a.partial_cmp(b).unwrap());
        fb.sort_by(|a, b| a.partial_cmp(b).unwrap());

        let m = fa.len().min(fb.len());
        for j in 0..m {
            let (_, ax, ay, az, ae) = fa[j];
            let (_, bx, by_, bz, be) = fb[j];
            let dp = (bx - ax).abs() + (by_ - ay).abs() + (bz - az).abs() + (be - ae).abs();
            if dp > max_dp {
                max_dp = dp;
            }
            mean_dp_sum += dp;
            n_part_comp += 1;
        }
    }

    let mean_dp = mean_dp_sum / n_part_comp.max(1) as f64;
    let mean_dw = if weight_diffs.is_empty() {
        0.0
    } else {
        weight_diffs.iter().sum::<f64>() / weight_diffs.len() as f64
    };
    let max_dw = weight_diffs.iter().fold(0.0f64, |acc, d| acc.max(d.abs()));

    DiffReport::Index {
        n_a: ef_a.events.len(),
        n_b: ef_b.events.len(),
        compared_events: n,
        weight: WeightDrift {
            mean_delta: mean_dw,
            max_abs_delta: max_dw,
        },
        final_state_drift: FinalStateDrift {
            mean_l1: mean_dp,
            max_l1: max_dp,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiffMode {
    #[default]
    Fingerprint,
    Index,
}

impl DiffMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fingerprint" => Some(DiffMode::Fingerprint),
            "index" => Some(DiffMode::Index),
            _ => None,
        }
    }
}

/// Compute a semantic diff summary between two event files (§4 `diff`).
pub fn diff_files(
    path_a: &Path,
    path_b: &Path,
    format_a: Option<&str>,
    format_b: Option<&str>,
    mode: DiffMode,
    abs_tol: f64,
) -> Result<DiffReport, crate::convert::ConvertError> {
    let ef_a = read_all(path_a, format_a)?;
    let ef_b = read_all(path_b, format_b)?;

    Ok(match mode {
        DiffMode::Fingerprint => diff_by_fingerprint(&ef_a, &ef_b, abs_tol),
        DiffMode::Index => diff_by_index(&ef_a, &ef_b),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Particle;

    fn file_with(events: Vec<Event>) -> EventFile {
        EventFile {
            events,
            ..Default::default()
        }
    }

    fn lepton_event(px: f64) -> Event {
        Event {
            particles: vec![Particle {
                status: 1,
                pdg_id: 11,
                px,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn identical_files_have_no_added_or_removed() {
        let ef_a = file_with(vec![lepton_event(1.0), lepton_event(2.0)]);
        let ef_b = file_with(vec![lepton_event(2.0), lepton_event(1.0)]);
        let report = diff_by_fingerprint(&ef_a, &ef_b, 1e-6);
        match report {
            DiffReport::Fingerprint { common, added, removed, .. } => {
                assert_eq!(common, 2);
                assert_eq!(added, 0);
                assert_eq!(removed, 0);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn one_extra_event_in_b_counts_as_added() {
        let ef_a = file_with(vec![lepton_event(1.0)]);
        let ef_b = file_with(vec![lepton_event(1.0), lepton_event(99.0)]);
        let report = diff_by_fingerprint(&ef_a, &ef_b, 1e-6);
        match report {
            DiffReport::Fingerprint { common, added, removed, .. } => {
                assert_eq!(common, 1);
                assert_eq!(added, 1);
                assert_eq!(removed, 0);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn index_mode_reports_zero_drift_for_equal_files() {
        let ef_a = file_with(vec![lepton_event(1.0)]);
        let ef_b = file_with(vec![lepton_event(1.0)]);
        let report = diff_by_index(&ef_a, &ef_b);
        match report {
            DiffReport::Index { final_state_drift, weight, .. } => {
                assert_eq!(final_state_drift.max_l1, 0.0);
                assert_eq!(weight.max_abs_delta, 0.0);
            }
            _ => panic!("wrong variant"),
        }
    }
}
