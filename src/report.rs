//! Conversion report assembly and emission (§4.11 steps 7/9, §6).
//!
//! Grounded on `original_source/hepconduit/audit.py`'s
//! `conversion_report_to_sarif` for the SARIF mapping, and on
//! `convert.py`'s report-output modes (`auto`/`-`/`none`/path).

use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::extra::canonical_json;
use crate::loss::{LossCounter, LossPlan};
use crate::provenance::Provenance;

pub const REPORT_KIND: &str = "hepconduit.conversion_report.v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionReport {
    pub kind: String,
    pub loss_plan: LossPlan,
    pub observed: ObservedLoss,
    pub loss_hash: String,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservedLoss {
    pub dropped_fields: std::collections::BTreeMap<String, u64>,
    pub dropped_weights_events: u64,
    pub dropped_runinfo_keys: std::collections::BTreeMap<String, u64>,
    pub loss_examples: std::collections::BTreeMap<String, Vec<crate::loss::LossLocation>>,
}

pub fn build_report(plan: LossPlan, counter: LossCounter, loss_hash: String, provenance: Provenance) -> ConversionReport {
    ConversionReport {
        kind: REPORT_KIND.to_string(),
        loss_plan: plan,
        observed: ObservedLoss {
            dropped_fields: counter.dropped_fields,
            dropped_weights_events: counter.dropped_weights,
            dropped_runinfo_keys: counter.dropped_runinfo_keys,
            loss_examples: counter.loss_examples,
        },
        loss_hash,
        provenance,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Json,
    Sarif,
}

/// Render a SARIF 2.1.0 document from a conversion report, rules
/// `HEPLOSS001` (dropped fields) and `HEPLOSS002` (dropped multi-weights).
pub fn to_sarif(report: &ConversionReport) -> Value {
    let input_uri = &report.provenance.input.path;

    let rules = json!([
        {
            "id": "HEPLOSS001",
            "name": "DroppedField",
            "shortDescription": {"text": "Some information cannot be represented in the output format."},
            "fullDescription": {"text": "During conversion, some fields cannot be represented in the chosen output format and will be dropped. The conversion report includes an explicit loss plan and observed occurrences."},
            "defaultConfiguration": {"level": "warning"},
        },
        {
            "id": "HEPLOSS002",
            "name": "DroppedMultiWeights",
            "shortDescription": {"text": "Multiple event weights cannot be represented in the output format."},
            "fullDescription": {"text": "The output format does not support multiple named weights per event. Only the nominal weight may be retained."},
            "defaultConfiguration": {"level": "warning"},
        },
    ]);

    let mut results = Vec::new();
    for (field, count) in &report.observed.dropped_fields {
        results.push(json!({
            "ruleId": "HEPLOSS001",
            "level": "warning",
            "message": {"text": format!(
                "Dropped non-default values for {field} in {count} occurrences when converting {} -> {}.",
                report.loss_plan.input_format, report.loss_plan.output_format
            )},
            "locations": [{"physicalLocation": {"artifactLocation": {"uri": input_uri}}}],
            "properties": {"field": field, "count": count, "output": report.provenance.output.path},
        }));
    }
    if report.observed.dropped_weights_events > 0 {
        results.push(json!({
            "ruleId": "HEPLOSS002",
            "level": "warning",
            "message": {"text": format!(
                "Dropped multi-weights in {} events when converting {} -> {}.",
                report.observed.dropped_weights_events, report.loss_plan.input_format, report.loss_plan.output_format
            )},
            "locations": [{"physicalLocation": {"artifactLocation": {"uri": input_uri}}}],
            "properties": {"count": report.observed.dropped_weights_events, "output": report.provenance.output.path},
        }));
    }

    json!({
        "$schema": "https://schemastore.azurewebsites.net/schemas/json/sarif-2.1.0.json",
        "version": "2.1.0",
        "runs": [{
            "tool": {
                "driver": {
                    "name": report.provenance.tool,
                    "version": report.provenance.tool_version,
                    "informationUri": "https://crates.io/crates/hepconduit",
                    "rules": rules,
                }
            },
            "invocations": [{
                "executionSuccessful": true,
                "properties": {
                    "git_sha": report.provenance.git_sha,
                    "loss_hash": report.loss_hash,
                },
            }],
            "results": results,
        }],
    })
}

/// Where a report or sidecar document is emitted, per §6.
#[derive(Debug, Clone, Default)]
pub enum ReportSink {
    /// Next to the output path, with a `.hepconduit.json`/`.hepconduit.sarif` suffix.
    #[default]
    Auto,
    Stdout,
    None,
    Path(PathBuf),
}

impl ReportSink {
    pub fn parse(value: &str) -> Self {
        match value {
            "auto" => ReportSink::Auto,
            "-" => ReportSink::Stdout,
            "none" | "off" | "false" => ReportSink::None,
            other => ReportSink::Path(PathBuf::from(other)),
        }
    }
}

pub fn emit_report(
    report: &ConversionReport,
    format: ReportFormat,
    sink: &ReportSink,
    output_path: &Path,
) -> std::io::Result<()> {
    let (text, auto_suffix) = match format {
        ReportFormat::Json => {
            let json = canonical_json(report).expect("conversion report is always serializable");
            (format!("{json}\n"), ".hepconduit.json")
        }
        ReportFormat::Sarif => {
            let sarif = to_sarif(report);
            let json = canonical_json(&sarif).expect("sarif document is always serializable");
            (format!("{json}\n"), ".hepconduit.sarif")
        }
    };

    match sink {
        ReportSink::Auto => {
            let mut path = output_path.as_os_str().to_owned();
            path.push(auto_suffix);
            std::fs::write(PathBuf::from(path), text)
        }
        ReportSink::Stdout => {
            print!("{text}");
            std::io::stdout().flush()
        }
        ReportSink::None => Ok(()),
        ReportSink::Path(path) => std::fs::write(path, text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loss::loss_plan;
    use crate::provenance::{InputProvenance, OutputProvenance};

    fn sample_report() -> ConversionReport {
        ConversionReport {
            kind: REPORT_KIND.to_string(),
            loss_plan: loss_plan("lhe", "hepmc3"),
            observed: ObservedLoss {
                dropped_fields: Default::default(),
                dropped_weights_events: 0,
                dropped_runinfo_keys: Default::default(),
                loss_examples: Default::default(),
            },
            loss_hash: "abc123".to_string(),
            provenance: Provenance {
                tool: "hepconduit".to_string(),
                tool_version: "0.1.0".to_string(),
                git_sha: String::new(),
                utc_timestamp: "2024-01-01T00:00:00Z".to_string(),
                input: InputProvenance { path: "in.lhe".to_string(), sha256: "x".to_string(), format: "lhe".to_string() },
                output: OutputProvenance { path: "out.hepmc3".to_string(), format: "hepmc3".to_string() },
                argv: vec![],
                contract_id: String::new(),
                loss_hash: "abc123".to_string(),
                extra: None,
            },
        }
    }

    #[test]
    fn sarif_document_has_both_rules() {
        let sarif = to_sarif(&sample_report());
        let rules = &sarif["runs"][0]["tool"]["driver"]["rules"];
        assert_eq!(rules.as_array().unwrap().len(), 2);
        assert_eq!(sarif["version"], "2.1.0");
    }

    #[test]
    fn report_sink_parses_special_values() {
        assert!(matches!(ReportSink::parse("auto"), ReportSink::Auto));
        assert!(matches!(ReportSink::parse("-"), ReportSink::Stdout));
        assert!(matches!(ReportSink::parse("none"), ReportSink::None));
        assert!(matches!(ReportSink::parse("report.json"), ReportSink::Path(_)));
    }
}
