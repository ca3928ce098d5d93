//! PDG code service: validity and display names.
//!
//! Pure and read-only, as required by the concurrency model (§5): nothing
//! here mutates shared state, so it is safe to call from any number of
//! concurrent conversions. Validity delegates to the `particle_id` crate's
//! classification tables (already a teacher dependency, used there for jet
//! clustering in `cluster.rs`); names fall back to a small built-in table
//! for the common particles the crate itself doesn't label with a string,
//! mirroring the original's fallback table.

use particle_id::{hadrons::HADRONS, ParticleID};

/// Fallback names for particles not otherwise labelled, grounded on
/// `hepconduit/pdg.py`'s `_FALLBACK_NAMES` table.
const FALLBACK_NAMES: &[(i32, &str)] = &[
    (1, "d"),
    (2, "u"),
    (3, "s"),
    (4, "c"),
    (5, "b"),
    (6, "t"),
    (11, "e-"),
    (-11, "e+"),
    (13, "mu-"),
    (-13, "mu+"),
    (15, "tau-"),
    (-15, "tau+"),
    (12, "nu_e"),
    (-12, "nu_ebar"),
    (14, "nu_mu"),
    (-14, "nu_mubar"),
    (16, "nu_tau"),
    (-16, "nu_taubar"),
    (21, "g"),
    (22, "gamma"),
    (23, "Z0"),
    (24, "W+"),
    (-24, "W-"),
    (25, "H"),
    (2212, "p"),
    (-2212, "pbar"),
];

/// Returns whether `pdg_id` is a recognised Standard Model quark, lepton,
/// gauge/Higgs boson, known hadron, or nucleus/ion code. Anything else
/// (including unassigned BSM codes) is reported invalid; the validator
/// treats that as a warning rather than an error.
pub fn is_valid_pdg_id(pdg_id: i32) -> bool {
    if pdg_id == 0 {
        return false;
    }
    let id = ParticleID::new(pdg_id);
    let abs_id = id.abs().id();
    if (1..=8).contains(&abs_id) {
        return true; // quarks (including 7,8 for a 4th generation placeholder)
    }
    if (11..=18).contains(&abs_id) {
        return true; // leptons
    }
    if matches!(abs_id, 21..=25 | 32..=37) {
        return true; // gauge/Higgs bosons, extended sector
    }
    if HADRONS.contains(&id.abs()) {
        return true;
    }
    if (1_000_000_000..1_100_000_000).contains(&abs_id) {
        return true; // nuclear codes (10LZZZAAAI)
    }
    false
}

/// A human-readable name for `pdg_id`, falling back to the decimal code
/// itself when nothing more specific is known.
pub fn name(pdg_id: i32) -> String {
    if let Some((_, name)) = FALLBACK_NAMES.iter().find(|(id, _)| *id == pdg_id) {
        return name.to_string();
    }
    pdg_id.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn electron_is_valid_and_named() {
        assert!(is_valid_pdg_id(11));
        assert_eq!(name(11), "e-");
    }

    #[test]
    fn zero_is_never_valid() {
        assert!(!is_valid_pdg_id(0));
    }

    #[test]
    fn unknown_code_falls_back_to_decimal_string() {
        assert_eq!(name(999999), "999999");
    }
}
