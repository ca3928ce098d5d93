//! Tagged free-form metadata carried alongside particles, events and runs.
//!
//! Every format has its own grab-bag of fields the others don't know about.
//! Rather than a bare `HashMap<String, Value>` everywhere, we give the
//! fields that recur across formats a name, and keep a catch-all map for
//! everything else. Both paths go through the same [`Serialize`] impl so
//! canonical JSON encoding (fingerprints, loss hashes, provenance, Parquet
//! metadata) never has to special-case which bucket a value lives in.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-particle/event/run catch-all metadata.
///
/// `BTreeMap` keeps iteration order deterministic without an explicit sort
/// at serialization time, which matters for the canonical-JSON guarantees
/// in the fingerprinter and loss hash.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtraAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<Units>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hepmc3_f: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hepmc3_c: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hepmc3_a: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hepmc3_unknown_records: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub lhe_weights: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub lhe_rwgt: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lhe_tail: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_issues: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hepmc_status_raw: Option<i32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub other: BTreeMap<String, Value>,
}

impl ExtraAttributes {
    pub fn is_empty(&self) -> bool {
        self == &ExtraAttributes::default()
    }

    /// Encode as a canonical JSON string: sorted keys, minimal separators.
    /// `BTreeMap`/derived-struct-field order already gives us sorted keys;
    /// `serde_json`'s compact writer gives minimal separators.
    pub fn to_canonical_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Momentum/length unit pair as declared by a HepMC3 `U` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Units {
    pub momentum: MomentumUnit,
    pub length: LengthUnit,
}

impl Default for Units {
    fn default() -> Self {
        Units {
            momentum: MomentumUnit::Gev,
            length: LengthUnit::Mm,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum MomentumUnit {
    #[strum(serialize = "GEV")]
    Gev,
    #[strum(serialize = "MEV")]
    Mev,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum LengthUnit {
    #[strum(serialize = "MM")]
    Mm,
    #[strum(serialize = "CM")]
    Cm,
}

/// Encode any serializable value as canonical JSON (sorted keys via
/// `BTreeMap`/`serde_json::Value::Object` reordering, minimal separators).
/// Used by the fingerprinter, loss planner and provenance builder so a
/// single definition of "canonical" backs every content hash in the crate.
pub fn canonical_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    let value = serde_json::to_value(value)?;
    let sorted = sort_json(value);
    serde_json::to_string(&sorted)
}

fn sort_json(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sort_json(v))).collect();
            let mut out = serde_json::Map::new();
            for (k, v) in sorted {
                out.insert(k, v);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_json).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_extra_serializes_to_empty_object() {
        let extra = ExtraAttributes::default();
        assert_eq!(extra.to_canonical_json().unwrap(), "{}");
    }

    #[test]
    fn canonical_json_sorts_keys() {
        let value = serde_json::json!({"b": 1, "a": 2});
        assert_eq!(canonical_json(&value).unwrap(), r#"{"a":2,"b":1}"#);
    }
}
