//! Loss planner & observer (§4.10): capability-based diff between a source
//! and target format, plus a streaming observer counting non-default
//! values of fields the target cannot represent.
//!
//! Grounded on `original_source/hepconduit/audit.py`; the capability
//! manifests are transcribed verbatim (same field names per format) so the
//! loss plan this crate produces matches the original byte-for-byte modulo
//! JSON library formatting.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::event::Event;
use crate::extra::canonical_json;

#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    pub particle_fields: BTreeSet<&'static str>,
    pub event_fields: BTreeSet<&'static str>,
    pub run_fields: BTreeSet<&'static str>,
}

fn set(fields: &[&'static str]) -> BTreeSet<&'static str> {
    fields.iter().copied().collect()
}

/// Capability manifest for each supported format, per §4.10/audit.py.
pub fn format_capabilities(format: &str) -> Capabilities {
    match format {
        "lhe" => Capabilities {
            particle_fields: set(&[
                "pdg_id", "status", "mother1", "mother2", "color1", "color2", "px", "py", "pz",
                "energy", "mass", "spin",
            ]),
            event_fields: set(&["event_number", "weights", "process_id", "scale", "alpha_qed", "alpha_qcd"]),
            run_fields: set(&[
                "beam_pdg_id", "beam_energy", "weight_names", "processes", "generator_name",
                "generator_version", "extra",
            ]),
        },
        "hepmc3" => Capabilities {
            particle_fields: set(&[
                "pdg_id", "status", "px", "py", "pz", "energy", "mass", "barcode",
                "vertex_barcode", "end_vertex_barcode", "attributes",
            ]),
            event_fields: set(&["event_number", "weights", "extra"]),
            run_fields: set(&["beam_pdg_id", "beam_energy", "weight_names", "generator_name", "generator_version", "extra"]),
        },
        "csv" | "tsv" => Capabilities {
            particle_fields: set(&[
                "pdg_id", "status", "mother1", "mother2", "color1", "color2", "px", "py", "pz",
                "energy", "mass", "spin", "barcode", "vertex_barcode", "end_vertex_barcode",
            ]),
            event_fields: set(&["event_number"]),
            run_fields: BTreeSet::new(),
        },
        "parquet" => Capabilities {
            particle_fields: set(&[
                "pdg_id", "status", "mother1", "mother2", "color1", "color2", "px", "py", "pz",
                "energy", "mass", "spin", "barcode", "vertex_barcode", "end_vertex_barcode", "attributes",
            ]),
            event_fields: set(&["event_number", "weights", "process_id", "scale", "alpha_qed", "alpha_qcd", "extra"]),
            run_fields: set(&[
                "beam_pdg_id", "beam_energy", "weight_names", "processes", "generator_name",
                "generator_version", "extra",
            ]),
        },
        _ => Capabilities::default(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LossPlan {
    pub input_format: String,
    pub output_format: String,
    pub dropped_particle_fields: Vec<String>,
    pub dropped_event_fields: Vec<String>,
    pub dropped_run_fields: Vec<String>,
}

pub fn loss_plan(input_format: &str, output_format: &str) -> LossPlan {
    let ic = format_capabilities(input_format);
    let oc = format_capabilities(output_format);
    let diff = |a: &BTreeSet<&'static str>, b: &BTreeSet<&'static str>| -> Vec<String> {
        a.difference(b).map(|s| s.to_string()).collect()
    };
    LossPlan {
        input_format: input_format.to_string(),
        output_format: output_format.to_string(),
        dropped_particle_fields: diff(&ic.particle_fields, &oc.particle_fields),
        dropped_event_fields: diff(&ic.event_fields, &oc.event_fields),
        dropped_run_fields: diff(&ic.run_fields, &oc.run_fields),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LossLocation {
    pub event: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub particle_barcode: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LossCounter {
    pub dropped_fields: BTreeMap<String, u64>,
    pub dropped_weights: u64,
    pub dropped_runinfo_keys: BTreeMap<String, u64>,
    pub loss_examples: BTreeMap<String, Vec<LossLocation>>,
}

impl LossCounter {
    fn record_example(&mut self, key: &str, location: LossLocation) {
        let examples = self.loss_examples.entry(key.to_string()).or_default();
        if examples.len() < 5 {
            examples.push(location);
        }
    }
}

/// Non-default per the loss observer's semantics (§4.10): `None`/`0`/
/// `0.0`/`9.0`/`""`/empty collections are all "default" and don't count.
fn particle_field_nondefault(event: &crate::event::Particle, field: &str) -> bool {
    match field {
        "pdg_id" => event.pdg_id != 0,
        "status" => event.status != 0,
        "mother1" => event.mother1 != 0,
        "mother2" => event.mother2 != 0,
        "color1" => event.color1 != 0,
        "color2" => event.color2 != 0,
        "px" => event.px != 0.0,
        "py" => event.py != 0.0,
        "pz" => event.pz != 0.0,
        "energy" => event.energy != 0.0,
        "mass" => event.mass != 0.0,
        "spin" => event.spin != 0.0 && event.spin != 9.0,
        "barcode" => event.barcode != 0,
        "vertex_barcode" => event.vertex_barcode != 0,
        "end_vertex_barcode" => event.end_vertex_barcode != 0,
        "attributes" => !event.attributes.is_empty(),
        _ => false,
    }
}

fn event_field_nondefault(event: &Event, field: &str) -> bool {
    match field {
        "event_number" => event.event_number != 0,
        "process_id" => event.process_id != 0,
        "scale" => event.scale != 0.0,
        "alpha_qed" => event.alpha_qed != 0.0,
        "alpha_qcd" => event.alpha_qcd != 0.0,
        "extra" => !event.extra.is_empty(),
        "weights" => event.weights.len() > 1,
        _ => false,
    }
}

/// Wraps an event iterator, incrementing per-field counters for every
/// dropped field holding a non-default value. The iterator adapter shape
/// follows §9's "observer/counter is a chain of adapters" design note.
pub struct LossObserver<I> {
    inner: I,
    plan: LossPlan,
    counter: LossCounter,
}

impl<I> LossObserver<I> {
    pub fn new(inner: I, plan: LossPlan) -> Self {
        LossObserver {
            inner,
            plan,
            counter: LossCounter::default(),
        }
    }

    pub fn counter(&self) -> &LossCounter {
        &self.counter
    }

    pub fn into_counter(self) -> LossCounter {
        self.counter
    }
}

impl<I, E> Iterator for LossObserver<I>
where
    I: Iterator<Item = Result<Event, E>>,
{
    type Item = Result<Event, E>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.inner.next()?;
        let event = match next {
            Ok(event) => event,
            Err(err) => return Some(Err(err)),
        };

        if self.plan.dropped_event_fields.iter().any(|f| f == "weights") && event.weights.len() > 1 {
            self.counter.dropped_weights += 1;
        }
        for field in &self.plan.dropped_event_fields {
            if field == "weights" {
                continue;
            }
            if event_field_nondefault(&event, field) {
                let key = format!("event.{field}");
                *self.counter.dropped_fields.entry(key.clone()).or_insert(0) += 1;
                self.counter.record_example(
                    &key,
                    LossLocation {
                        event: event.event_number,
                        particle_barcode: None,
                    },
                );
            }
        }
        for p in &event.particles {
            for field in &self.plan.dropped_particle_fields {
                if particle_field_nondefault(p, field) {
                    let key = format!("particle.{field}");
                    *self.counter.dropped_fields.entry(key.clone()).or_insert(0) += 1;
                    self.counter.record_example(
                        &key,
                        LossLocation {
                            event: event.event_number,
                            particle_barcode: Some(p.barcode),
                        },
                    );
                }
            }
        }

        Some(Ok(event))
    }
}

/// SHA-256 over the canonical JSON of `{plan, observed}` (§4.10).
pub fn loss_hash(plan: &LossPlan, counter: &LossCounter) -> String {
    let observed = json!({
        "dropped_fields": counter.dropped_fields,
        "dropped_weights": counter.dropped_weights,
        "dropped_runinfo_keys": counter.dropped_runinfo_keys,
        "loss_examples": counter.loss_examples,
    });
    let payload: Value = json!({ "plan": plan, "observed": observed });
    let canonical = canonical_json(&payload).expect("loss payload is always serializable");
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lhe_to_hepmc3_drops_lhe_only_fields() {
        let plan = loss_plan("lhe", "hepmc3");
        assert!(plan.dropped_particle_fields.contains(&"mother1".to_string()));
        assert!(plan.dropped_particle_fields.contains(&"spin".to_string()));
    }

    #[test]
    fn hepmc3_to_hepmc3_drops_nothing() {
        let plan = loss_plan("hepmc3", "hepmc3");
        assert!(plan.dropped_particle_fields.is_empty());
        assert!(plan.dropped_event_fields.is_empty());
        assert!(plan.dropped_run_fields.is_empty());
    }

    #[test]
    fn loss_hash_is_deterministic() {
        let plan = loss_plan("lhe", "csv");
        let counter = LossCounter::default();
        assert_eq!(loss_hash(&plan, &counter), loss_hash(&plan, &counter));
    }

    #[test]
    fn observer_counts_non_default_dropped_spin() {
        let plan = loss_plan("lhe", "hepmc3");
        let events = vec![Ok::<_, std::convert::Infallible>(Event {
            particles: vec![crate::event::Particle {
                spin: 0.5,
                ..Default::default()
            }],
            ..Default::default()
        })];
        let mut observer = LossObserver::new(events.into_iter(), plan);
        let collected: Vec<_> = (&mut observer).collect();
        assert_eq!(collected.len(), 1);
        let counter = observer.into_counter();
        assert_eq!(counter.dropped_fields.get("particle.spin"), Some(&1));
    }
}
