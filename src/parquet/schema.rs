//! Arrow schemas for both Parquet layouts, and the `hepconduit.*`
//! key-value metadata round-trip for `RunInfo` (§4.6).

use std::collections::BTreeMap;
use std::sync::Arc;

use arrow_schema::{DataType, Field, Fields, Schema};

use crate::event::RunInfo;
use crate::extra::canonical_json;

/// All `hepconduit.*` schema metadata keys are namespaced under this prefix;
/// the one exception is the writer-supplied keys from §4.11 step 8
/// (`hepconduit_schema`, `hepconduit_provenance`, `hepconduit_loss_hash`,
/// `hepconduit_report_kind`), which arrive already fully formed via
/// `WriterOptions::extra_metadata` and are copied through unprefixed.
const PREFIX: &str = "hepconduit.";

fn key(name: &str) -> String {
    format!("{PREFIX}{name}")
}

/// Encode `RunInfo` into the schema-level key-value metadata map (§4.6).
pub fn encode_run_info(run_info: &RunInfo) -> BTreeMap<String, String> {
    let mut md = BTreeMap::new();
    md.insert(
        key("run_info_json"),
        canonical_json(run_info).expect("RunInfo is always serializable"),
    );
    md.insert(
        key("beam_pdg_id"),
        canonical_json(&[run_info.beam_pdg_id.0, run_info.beam_pdg_id.1]).unwrap(),
    );
    md.insert(
        key("beam_energy"),
        canonical_json(&[run_info.beam_energy.0, run_info.beam_energy.1]).unwrap(),
    );
    md.insert(key("weight_names"), canonical_json(&run_info.weight_names).unwrap());
    md.insert(key("generator_name"), run_info.generator_name.clone());
    md.insert(key("generator_version"), run_info.generator_version.clone());
    if let Some(units) = &run_info.extra.units {
        md.insert(key("units"), canonical_json(units).unwrap());
    }
    md
}

/// Reconstruct `RunInfo` from schema metadata, preferring the full
/// `run_info_json` blob and falling back to individual keys (§4.6, §9
/// open question (c)).
pub fn decode_run_info(md: &BTreeMap<String, String>) -> RunInfo {
    if let Some(raw) = md.get(&key("run_info_json")) {
        if let Ok(mut run_info) = serde_json::from_str::<RunInfo>(raw) {
            run_info.extra.other.insert(
                "parquet_schema_metadata".to_string(),
                serde_json::to_value(md).unwrap_or_default(),
            );
            return run_info;
        }
    }

    let mut run_info = RunInfo::default();
    if let Some(v) = md.get(&key("beam_pdg_id")).and_then(|s| serde_json::from_str::<(i32, i32)>(s).ok()) {
        run_info.beam_pdg_id = v;
    }
    if let Some(v) = md.get(&key("beam_energy")).and_then(|s| serde_json::from_str::<(f64, f64)>(s).ok()) {
        run_info.beam_energy = v;
    }
    if let Some(v) = md
        .get(&key("weight_names"))
        .and_then(|s| serde_json::from_str::<Vec<String>>(s).ok())
    {
        run_info.weight_names = v;
    }
    if let Some(v) = md.get(&key("generator_name")) {
        run_info.generator_name = v.clone();
    }
    if let Some(v) = md.get(&key("generator_version")) {
        run_info.generator_version = v.clone();
    }
    run_info.extra.other.insert(
        "parquet_schema_metadata".to_string(),
        serde_json::to_value(md).unwrap_or_default(),
    );
    run_info
}

pub fn particle_struct_fields() -> Fields {
    Fields::from(vec![
        Field::new("pdg_id", DataType::Int32, false),
        Field::new("status", DataType::Int32, false),
        Field::new("mother1", DataType::Int32, false),
        Field::new("mother2", DataType::Int32, false),
        Field::new("color1", DataType::Int32, false),
        Field::new("color2", DataType::Int32, false),
        Field::new("px", DataType::Float64, false),
        Field::new("py", DataType::Float64, false),
        Field::new("pz", DataType::Float64, false),
        Field::new("energy", DataType::Float64, false),
        Field::new("mass", DataType::Float64, false),
        Field::new("spin", DataType::Float64, false),
        Field::new("barcode", DataType::Int32, false),
        Field::new("vertex_barcode", DataType::Int32, false),
        Field::new("end_vertex_barcode", DataType::Int32, false),
        Field::new("attributes_json", DataType::Utf8, true),
    ])
}

pub fn vertex_struct_fields() -> Fields {
    Fields::from(vec![
        Field::new("barcode", DataType::Int32, false),
        Field::new("x", DataType::Float64, false),
        Field::new("y", DataType::Float64, false),
        Field::new("z", DataType::Float64, false),
        Field::new("t", DataType::Float64, false),
        Field::new(
            "incoming",
            DataType::List(Arc::new(Field::new("item", DataType::Int32, true))),
            false,
        ),
        Field::new(
            "outgoing",
            DataType::List(Arc::new(Field::new("item", DataType::Int32, true))),
            false,
        ),
    ])
}

/// Flat layout: one row per particle, event scalars replicated, with
/// optional production/end-vertex spacetime columns (§4.6).
pub fn flat_schema() -> Schema {
    Schema::new(vec![
        Field::new("event_number", DataType::Int64, false),
        Field::new("process_id", DataType::Int32, false),
        Field::new("scale", DataType::Float64, false),
        Field::new("alpha_qed", DataType::Float64, false),
        Field::new("alpha_qcd", DataType::Float64, false),
        Field::new(
            "weights",
            DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
            false,
        ),
        Field::new("event_extra_json", DataType::Utf8, true),
        Field::new("pdg_id", DataType::Int32, false),
        Field::new("status", DataType::Int32, false),
        Field::new("mother1", DataType::Int32, false),
        Field::new("mother2", DataType::Int32, false),
        Field::new("color1", DataType::Int32, false),
        Field::new("color2", DataType::Int32, false),
        Field::new("px", DataType::Float64, false),
        Field::new("py", DataType::Float64, false),
        Field::new("pz", DataType::Float64, false),
        Field::new("energy", DataType::Float64, false),
        Field::new("mass", DataType::Float64, false),
        Field::new("spin", DataType::Float64, false),
        Field::new("barcode", DataType::Int32, false),
        Field::new("vertex_barcode", DataType::Int32, false),
        Field::new("end_vertex_barcode", DataType::Int32, false),
        Field::new("attributes_json", DataType::Utf8, true),
        Field::new("prod_vx", DataType::Float64, true),
        Field::new("prod_vy", DataType::Float64, true),
        Field::new("prod_vz", DataType::Float64, true),
        Field::new("prod_vt", DataType::Float64, true),
        Field::new("end_vx", DataType::Float64, true),
        Field::new("end_vy", DataType::Float64, true),
        Field::new("end_vz", DataType::Float64, true),
        Field::new("end_vt", DataType::Float64, true),
    ])
}

/// Columnar layout: one row per event, `particles`/`vertices` as
/// list-of-struct columns (§4.6).
pub fn columnar_schema() -> Schema {
    Schema::new(vec![
        Field::new("event_number", DataType::Int64, false),
        Field::new("process_id", DataType::Int32, false),
        Field::new("scale", DataType::Float64, false),
        Field::new("alpha_qed", DataType::Float64, false),
        Field::new("alpha_qcd", DataType::Float64, false),
        Field::new(
            "weights",
            DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
            false,
        ),
        Field::new("event_extra_json", DataType::Utf8, true),
        Field::new(
            "particles",
            DataType::List(Arc::new(Field::new(
                "item",
                DataType::Struct(particle_struct_fields()),
                true,
            ))),
            false,
        ),
        Field::new(
            "vertices",
            DataType::List(Arc::new(Field::new(
                "item",
                DataType::Struct(vertex_struct_fields()),
                true,
            ))),
            false,
        ),
    ])
}
