//! Physics validator (§4.9): per-event momentum conservation, energy sign,
//! mass consistency and PDG validity checks.
//!
//! Grounded on `original_source/hepconduit/validation.py`; the
//! issue/report shape is kept, the streaming variant is expressed as an
//! iterator adapter per §9's "chain of adapters, not callbacks" note.

use serde::{Deserialize, Serialize};

use crate::event::{Event, EventFile, STATUS_FINAL, STATUS_INCOMING};
use crate::pdg;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub level: Level,
    pub event_number: i64,
    pub particle_index: Option<usize>,
    pub message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.level {
            Level::Error => "ERROR",
            Level::Warning => "WARNING",
            Level::Info => "INFO",
        };
        write!(f, "[{level}] event {}", self.event_number)?;
        if let Some(idx) = self.particle_index {
            write!(f, ", particle {idx}")?;
        }
        write!(f, ": {}", self.message)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ValidatorConfig {
    pub check_pdg: bool,
    pub check_energy: bool,
    pub check_mass: bool,
    pub check_momentum: bool,
    pub momentum_tolerance: f64,
    pub mass_tolerance: f64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        ValidatorConfig {
            check_pdg: true,
            check_energy: true,
            check_mass: true,
            check_momentum: true,
            momentum_tolerance: 1e-4,
            mass_tolerance: 1e-2,
        }
    }
}

/// Validate a single event, returning every issue found.
pub fn validate_event(event: &Event, cfg: &ValidatorConfig) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let evt = event.event_number;

    if event.particles.is_empty() {
        issues.push(ValidationIssue {
            level: Level::Warning,
            event_number: evt,
            particle_index: None,
            message: "Event has no particles".to_string(),
        });
        return issues;
    }

    if cfg.check_pdg {
        for (i, p) in event.particles.iter().enumerate() {
            if !pdg::is_valid_pdg_id(p.pdg_id) {
                issues.push(ValidationIssue {
                    level: Level::Warning,
                    event_number: evt,
                    particle_index: Some(i),
                    message: format!("Unknown/invalid PDG ID: {}", p.pdg_id),
                });
            }
        }
    }

    if cfg.check_energy {
        for (i, p) in event.particles.iter().enumerate() {
            if p.energy < 0.0 {
                issues.push(ValidationIssue {
                    level: Level::Error,
                    event_number: evt,
                    particle_index: Some(i),
                    message: format!("Negative energy: {:.6e} GeV", p.energy),
                });
            }
        }
    }

    if cfg.check_mass {
        for (i, p) in event.particles.iter().enumerate() {
            if p.mass == 0.0 || p.mass.abs() < 1e-3 {
                continue;
            }
            let computed = p.computed_mass();
            let rel_diff = (computed - p.mass).abs() / p.mass.abs().max(1e-12);
            if rel_diff > cfg.mass_tolerance {
                issues.push(ValidationIssue {
                    level: Level::Warning,
                    event_number: evt,
                    particle_index: Some(i),
                    message: format!(
                        "Mass inconsistency: stored={:.6e}, computed={:.6e}, rel_diff={:.4e}",
                        p.mass, computed, rel_diff
                    ),
                });
            }
        }
    }

    if cfg.check_momentum {
        let incoming: Vec<_> = event.particles.iter().filter(|p| p.status == STATUS_INCOMING).collect();
        let outgoing: Vec<_> = event.particles.iter().filter(|p| p.status == STATUS_FINAL).collect();

        if !incoming.is_empty() && !outgoing.is_empty() {
            let sum_in = [
                incoming.iter().map(|p| p.px).sum::<f64>(),
                incoming.iter().map(|p| p.py).sum::<f64>(),
                incoming.iter().map(|p| p.pz).sum::<f64>(),
                incoming.iter().map(|p| p.energy).sum::<f64>(),
            ];
            let sum_out = [
                outgoing.iter().map(|p| p.px).sum::<f64>(),
                outgoing.iter().map(|p| p.py).sum::<f64>(),
                outgoing.iter().map(|p| p.pz).sum::<f64>(),
                outgoing.iter().map(|p| p.energy).sum::<f64>(),
            ];
            let total_energy = sum_in[3].abs().max(sum_out[3].abs()).max(1e-10);
            let labels = ["px", "py", "pz", "E"];
            for j in 0..4 {
                let diff = (sum_in[j] - sum_out[j]).abs();
                if diff / total_energy > cfg.momentum_tolerance {
                    issues.push(ValidationIssue {
                        level: Level::Error,
                        event_number: evt,
                        particle_index: None,
                        message: format!(
                            "Momentum non-conservation in {}: in={:.6e}, out={:.6e}, diff={:.6e} ({:.4e} relative)",
                            labels[j], sum_in[j], sum_out[j], diff, diff / total_energy
                        ),
                    });
                }
            }
        }
    }

    issues
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn n_errors(&self) -> usize {
        self.issues.iter().filter(|i| i.level == Level::Error).count()
    }

    pub fn n_warnings(&self) -> usize {
        self.issues.iter().filter(|i| i.level == Level::Warning).count()
    }

    pub fn is_valid(&self) -> bool {
        self.n_errors() == 0
    }

    pub fn summary(&self) -> String {
        format!(
            "{} errors, {} warnings across {} issues",
            self.n_errors(),
            self.n_warnings(),
            self.issues.len()
        )
    }
}

/// Validate every event in a materialised file.
pub fn validate(file: &EventFile, cfg: &ValidatorConfig, max_events: Option<usize>) -> ValidationReport {
    let mut report = ValidationReport::default();
    let limit = max_events.unwrap_or(usize::MAX);
    for event in file.events.iter().take(limit) {
        report.issues.extend(validate_event(event, cfg));
    }
    report
}

/// Error raised by [`ValidatingStream`] in strict mode on the first error-level issue.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct StrictValidationError(pub String);

/// Streaming validator: wraps an event iterator, annotating
/// `event.extra.validation_issues` with each issue found. In strict mode,
/// the first error-level issue aborts the stream.
pub struct ValidatingStream<I> {
    inner: I,
    cfg: ValidatorConfig,
    strict: bool,
}

impl<I> ValidatingStream<I> {
    pub fn new(inner: I, cfg: ValidatorConfig, strict: bool) -> Self {
        ValidatingStream { inner, cfg, strict }
    }
}

impl<I, E> Iterator for ValidatingStream<I>
where
    I: Iterator<Item = Result<Event, E>>,
    E: From<StrictValidationError>,
{
    type Item = Result<Event, E>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.inner.next()?;
        let mut event = match next {
            Ok(event) => event,
            Err(err) => return Some(Err(err)),
        };
        let issues = validate_event(&event, &self.cfg);
        if self.strict {
            if let Some(first_error) = issues.iter().find(|i| i.level == Level::Error) {
                return Some(Err(StrictValidationError(first_error.to_string()).into()));
            }
        }
        if !issues.is_empty() {
            event.extra.validation_issues = issues.iter().map(|i| i.to_string()).collect();
        }
        Some(Ok(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Particle;

    fn balanced_event() -> Event {
        Event {
            particles: vec![
                Particle { status: -1, pdg_id: 11, energy: 50.0, pz: 50.0, ..Default::default() },
                Particle { status: -1, pdg_id: -11, energy: 50.0, pz: -50.0, ..Default::default() },
                Particle { status: 1, pdg_id: 22, energy: 50.0, pz: 50.0, ..Default::default() },
                Particle { status: 1, pdg_id: 22, energy: 50.0, pz: -50.0, ..Default::default() },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn balanced_event_is_valid() {
        let cfg = ValidatorConfig::default();
        let issues = validate_event(&balanced_event(), &cfg);
        assert!(issues.iter().all(|i| i.level != Level::Error));
    }

    #[test]
    fn flipped_energy_sign_is_an_error_at_the_same_index() {
        let cfg = ValidatorConfig::default();
        let mut event = balanced_event();
        event.particles[2].energy = -50.0;
        let issues = validate_event(&event, &cfg);
        let errs: Vec<_> = issues.iter().filter(|i| i.level == Level::Error).collect();
        assert!(errs.iter().any(|i| i.particle_index == Some(2)));
    }

    #[test]
    fn report_is_valid_iff_no_errors() {
        let file = EventFile {
            events: vec![balanced_event()],
            ..Default::default()
        };
        let report = validate(&file, &ValidatorConfig::default(), None);
        assert!(report.is_valid());
    }
}
