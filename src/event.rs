//! The internal event model: the lingua franca every reader produces and
//! every writer consumes.
//!
//! This replaces the resampling-oriented `Event`/`EventBuilder` pair the
//! cell-resampling pipeline used (weight vectors behind a lock, particles
//! compressed and sorted by PID for fast distance lookups) with a plain
//! data-owning representation matching the HEP generator formats directly:
//! particles keep mother/vertex indices, vertices keep incoming/outgoing
//! barcode lists, and nothing is reordered on construction.

use serde::{Deserialize, Serialize};

use crate::extra::ExtraAttributes;

/// Canonical internal particle status.
///
/// HepMC's richer status vocabulary collapses onto this on read; the raw
/// code is preserved in `Particle::attributes.hepmc_status_raw` whenever it
/// differs from the canonical one, so a writer can attempt to restore it.
pub const STATUS_INCOMING: i32 = -1;
pub const STATUS_FINAL: i32 = 1;
pub const STATUS_INTERMEDIATE: i32 = 2;
pub const STATUS_DOCUMENTATION: i32 = 3;

/// A single particle in an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub pdg_id: i32,
    pub status: i32,
    pub px: f64,
    pub py: f64,
    pub pz: f64,
    pub energy: f64,
    pub mass: f64,
    pub mother1: i32,
    pub mother2: i32,
    pub color1: i32,
    pub color2: i32,
    /// Cosine of the angle between the spin vector and 3-momentum; 9.0 is
    /// the LHE convention for "unknown".
    pub spin: f64,
    pub barcode: i32,
    pub vertex_barcode: i32,
    pub end_vertex_barcode: i32,
    #[serde(default, skip_serializing_if = "ExtraAttributes::is_empty")]
    pub attributes: ExtraAttributes,
}

impl Default for Particle {
    fn default() -> Self {
        Particle {
            pdg_id: 0,
            status: STATUS_FINAL,
            px: 0.0,
            py: 0.0,
            pz: 0.0,
            energy: 0.0,
            mass: 0.0,
            mother1: 0,
            mother2: 0,
            color1: 0,
            color2: 0,
            spin: 9.0,
            barcode: 0,
            vertex_barcode: 0,
            end_vertex_barcode: 0,
            attributes: ExtraAttributes::default(),
        }
    }
}

impl Particle {
    pub fn pt(&self) -> f64 {
        self.px.hypot(self.py)
    }

    pub fn p(&self) -> f64 {
        (self.px * self.px + self.py * self.py + self.pz * self.pz).sqrt()
    }

    /// Pseudorapidity; ±∞ when |p| == |pz|.
    pub fn eta(&self) -> f64 {
        let p = self.p();
        if p == self.pz.abs() {
            return if self.pz >= 0.0 {
                f64::INFINITY
            } else {
                f64::NEG_INFINITY
            };
        }
        0.5 * ((p + self.pz) / (p - self.pz)).ln()
    }

    pub fn phi(&self) -> f64 {
        self.py.atan2(self.px)
    }

    /// Rapidity; ±∞ when E == |pz|.
    pub fn rapidity(&self) -> f64 {
        if self.energy == self.pz.abs() {
            return if self.pz >= 0.0 {
                f64::INFINITY
            } else {
                f64::NEG_INFINITY
            };
        }
        0.5 * ((self.energy + self.pz) / (self.energy - self.pz)).ln()
    }

    /// Mass computed from four-momentum, `sign(m²)·√|m²|`, with small
    /// negative m² (numerical noise near the massless limit) clamped to 0.
    pub fn computed_mass(&self) -> f64 {
        let mut m2 = self.energy * self.energy
            - self.px * self.px
            - self.py * self.py
            - self.pz * self.pz;
        if m2 < 0.0 && m2.abs() < 1e-8 {
            m2 = 0.0;
        }
        if m2 >= 0.0 {
            m2.sqrt()
        } else {
            -(-m2).sqrt()
        }
    }

    pub fn is_incoming(&self) -> bool {
        self.status == STATUS_INCOMING
    }

    pub fn is_final(&self) -> bool {
        self.status == STATUS_FINAL
    }

    pub fn is_intermediate(&self) -> bool {
        self.status == STATUS_INTERMEDIATE
    }

    pub fn is_documentation(&self) -> bool {
        self.status == STATUS_DOCUMENTATION
    }
}

/// A vertex in the reconstructed or explicit event graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub barcode: i32,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub t: f64,
    pub incoming: Vec<i32>,
    pub outgoing: Vec<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub process_id: i32,
    pub cross_section: f64,
    pub cross_section_error: f64,
    pub max_weight: f64,
}

/// Run-level metadata shared by every event in a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    pub beam_pdg_id: (i32, i32),
    pub beam_energy: (f64, f64),
    pub weight_names: Vec<String>,
    pub processes: Vec<ProcessInfo>,
    pub generator_name: String,
    pub generator_version: String,
    #[serde(default, skip_serializing_if = "ExtraAttributes::is_empty")]
    pub extra: ExtraAttributes,
}

impl Default for RunInfo {
    fn default() -> Self {
        RunInfo {
            beam_pdg_id: (0, 0),
            beam_energy: (0.0, 0.0),
            weight_names: Vec::new(),
            processes: Vec::new(),
            generator_name: String::new(),
            generator_version: String::new(),
            extra: ExtraAttributes::default(),
        }
    }
}

/// A single physics event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_number: i64,
    pub particles: Vec<Particle>,
    pub vertices: Vec<Vertex>,
    pub weights: Vec<f64>,
    pub process_id: i32,
    pub scale: f64,
    pub alpha_qed: f64,
    pub alpha_qcd: f64,
    pub n_particles: i32,
    #[serde(default, skip_serializing_if = "ExtraAttributes::is_empty")]
    pub extra: ExtraAttributes,
}

impl Default for Event {
    fn default() -> Self {
        Event {
            event_number: 0,
            particles: Vec::new(),
            vertices: Vec::new(),
            weights: vec![1.0],
            process_id: 0,
            scale: 0.0,
            alpha_qed: 0.0,
            alpha_qcd: 0.0,
            n_particles: 0,
            extra: ExtraAttributes::default(),
        }
    }
}

impl Event {
    /// The nominal (first) weight.
    pub fn weight(&self) -> f64 {
        self.weights.first().copied().unwrap_or(1.0)
    }

    pub fn incoming_particles(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter().filter(|p| p.is_incoming())
    }

    pub fn final_particles(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter().filter(|p| p.is_final())
    }

    pub fn intermediate_particles(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter().filter(|p| p.is_intermediate())
    }

    pub fn n_final(&self) -> usize {
        self.final_particles().count()
    }

    pub fn vertex(&self, barcode: i32) -> Option<&Vertex> {
        if barcode == 0 {
            return None;
        }
        self.vertices.iter().find(|v| v.barcode == barcode)
    }
}

/// Top-level container produced by readers and consumed by writers when a
/// whole file (rather than a stream) is wanted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventFile {
    pub run_info: RunInfo,
    pub events: Vec<Event>,
    pub format_name: String,
}

impl EventFile {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn massless_particle(px: f64, py: f64, pz: f64) -> Particle {
        let energy = (px * px + py * py + pz * pz).sqrt();
        Particle {
            px,
            py,
            pz,
            energy,
            ..Default::default()
        }
    }

    #[test]
    fn computed_mass_is_zero_for_massless_particle() {
        let p = massless_particle(1.0, 2.0, 3.0);
        assert!(p.computed_mass().abs() < 1e-9);
    }

    #[test]
    fn eta_is_infinite_along_beam_axis() {
        let p = Particle {
            px: 0.0,
            py: 0.0,
            pz: 10.0,
            energy: 10.0,
            ..Default::default()
        };
        assert_eq!(p.eta(), f64::INFINITY);
    }

    #[test]
    fn event_weight_defaults_to_nominal() {
        let event = Event {
            weights: vec![2.5, 1.0],
            ..Default::default()
        };
        assert_eq!(event.weight(), 2.5);
    }
}
