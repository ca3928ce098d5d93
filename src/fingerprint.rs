//! Stable content-addressed event fingerprint (§4.8).
//!
//! Grounded on `original_source/hepconduit/fingerprint.py`: the same
//! canonicalisation order (version, optional process id, sorted particle
//! tuples, optional graph, optional weights) hashed with SHA-256 instead of
//! Python's `hashlib`.

use sha2::{Digest, Sha256};

use crate::event::{Event, STATUS_DOCUMENTATION, STATUS_INCOMING, STATUS_INTERMEDIATE};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FingerprintConfig {
    pub abs_tol: f64,
    pub include_intermediate: bool,
    pub include_incoming: bool,
    pub include_weights: bool,
    pub include_graph: bool,
    pub include_process_id: bool,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        FingerprintConfig {
            abs_tol: 1e-4,
            include_intermediate: true,
            include_incoming: true,
            include_weights: false,
            include_graph: false,
            include_process_id: false,
        }
    }
}

const VERSION: &str = "event_fingerprint_v1";

fn quantize(x: f64, abs_tol: f64) -> i64 {
    debug_assert!(abs_tol > 0.0, "abs_tol must be > 0");
    (x / abs_tol).round() as i64
}

/// Compute the fingerprint of `event` as a lowercase hex SHA-256 digest.
pub fn fingerprint_event(event: &Event, cfg: &FingerprintConfig) -> String {
    let mut hasher = Sha256::new();
    hasher.update(VERSION.as_bytes());
    hasher.update([0u8]);

    if cfg.include_process_id {
        hasher.update(event.process_id.to_string().as_bytes());
        hasher.update([0u8]);
    }

    let mut tuples: Vec<(i32, i32, i64, i64, i64, i64)> = event
        .particles
        .iter()
        .filter(|p| p.status != STATUS_DOCUMENTATION)
        .filter(|p| cfg.include_incoming || p.status != STATUS_INCOMING)
        .filter(|p| cfg.include_intermediate || p.status != STATUS_INTERMEDIATE)
        .map(|p| {
            (
                p.status,
                p.pdg_id,
                quantize(p.px, cfg.abs_tol),
                quantize(p.py, cfg.abs_tol),
                quantize(p.pz, cfg.abs_tol),
                quantize(p.energy, cfg.abs_tol),
            )
        })
        .collect();
    tuples.sort_unstable();
    for t in &tuples {
        hasher.update(format!("{},{},{},{},{},{}", t.0, t.1, t.2, t.3, t.4, t.5).as_bytes());
        hasher.update([b';']);
    }

    if cfg.include_graph {
        hasher.update(b"|g|");
        let mut graph: Vec<(i32, i32, i32)> = event
            .particles
            .iter()
            .filter(|p| p.status != STATUS_DOCUMENTATION)
            .map(|p| (p.barcode, p.vertex_barcode, p.end_vertex_barcode))
            .collect();
        graph.sort_unstable();
        for t in &graph {
            hasher.update(format!("{},{},{}", t.0, t.1, t.2).as_bytes());
            hasher.update([b';']);
        }
    }

    if cfg.include_weights && !event.weights.is_empty() {
        hasher.update(b"|w|");
        for w in &event.weights {
            hasher.update(quantize(*w, cfg.abs_tol).to_string().as_bytes());
            hasher.update([b',']);
        }
    }

    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Particle;

    fn event_with(px: f64, py: f64, pz: f64, energy: f64) -> Event {
        Event {
            particles: vec![Particle {
                status: 1,
                pdg_id: 11,
                px,
                py,
                pz,
                energy,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn small_perturbation_below_half_tolerance_is_stable() {
        let cfg = FingerprintConfig::default();
        let e1 = event_with(1.0, 2.0, 3.0, 4.0);
        let e2 = event_with(1.0 + cfg.abs_tol * 0.1, 2.0, 3.0, 4.0);
        assert_eq!(fingerprint_event(&e1, &cfg), fingerprint_event(&e2, &cfg));
    }

    #[test]
    fn large_perturbation_changes_fingerprint() {
        let cfg = FingerprintConfig::default();
        let e1 = event_with(1.0, 2.0, 3.0, 4.0);
        let e2 = event_with(1.0 + cfg.abs_tol * 3.0, 2.0, 3.0, 4.0);
        assert_ne!(fingerprint_event(&e1, &cfg), fingerprint_event(&e2, &cfg));
    }

    #[test]
    fn particle_order_is_irrelevant() {
        let cfg = FingerprintConfig::default();
        let mut e = Event {
            particles: vec![
                Particle { pdg_id: 11, status: 1, px: 1.0, ..Default::default() },
                Particle { pdg_id: 13, status: 1, px: 2.0, ..Default::default() },
            ],
            ..Default::default()
        };
        let fp1 = fingerprint_event(&e, &cfg);
        e.particles.reverse();
        let fp2 = fingerprint_event(&e, &cfg);
        assert_eq!(fp1, fp2);
    }

    #[test]
    fn documentation_particles_never_contribute() {
        let cfg = FingerprintConfig::default();
        let mut e = event_with(1.0, 2.0, 3.0, 4.0);
        let baseline = fingerprint_event(&e, &cfg);
        e.particles.push(Particle {
            status: STATUS_DOCUMENTATION,
            pdg_id: 999,
            px: 123.0,
            ..Default::default()
        });
        assert_eq!(fingerprint_event(&e, &cfg), baseline);
    }
}
