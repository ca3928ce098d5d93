//! Provenance builder (§4.11 step 6): a deterministic record of one
//! conversion (tool, version, input hash, argv, loss hash, timestamp).
//!
//! Grounded on `original_source/hepconduit/provenance.py`; `git_sha` is
//! sourced from the `vergen`-emitted `GIT_REV` constant (teacher's
//! `build.rs`/`lib.rs` idiom) instead of shelling out to `git` at runtime,
//! since the teacher's build already captures it at compile time.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::extra::canonical_json;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputProvenance {
    pub path: String,
    pub sha256: String,
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputProvenance {
    pub path: String,
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provenance {
    pub tool: String,
    pub tool_version: String,
    pub git_sha: String,
    pub utc_timestamp: String,
    pub input: InputProvenance,
    pub output: OutputProvenance,
    pub argv: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub contract_id: String,
    pub loss_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

/// SHA-256 of a file's contents, hex-encoded; streamed in 1 MiB chunks so
/// memory use stays O(1) regardless of input size (§5).
pub fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[allow(clippy::too_many_arguments)]
pub struct BuildProvenanceArgs<'a> {
    pub tool: &'a str,
    pub tool_version: &'a str,
    pub input_path: &'a Path,
    pub output_path: &'a Path,
    pub input_format: &'a str,
    pub output_format: &'a str,
    pub argv: Vec<String>,
    pub contract_id: String,
    pub loss_hash: String,
    pub extra: Option<Value>,
    /// Current UTC timestamp, ISO-8601 with a trailing `Z`. Threaded in
    /// rather than read from the clock here, so callers can keep
    /// provenance construction itself a pure function.
    pub utc_timestamp: String,
}

/// Assemble a conversion's provenance record. `sha256` of the input is the
/// only part of this that does non-trivial I/O (a full file scan); the git
/// SHA is best-effort (empty string when unavailable, never an error, per
/// §7's "audit path is best-effort for provenance" policy).
pub fn build_provenance(args: BuildProvenanceArgs) -> std::io::Result<Provenance> {
    let sha256 = sha256_file(args.input_path)?;
    Ok(Provenance {
        tool: args.tool.to_string(),
        tool_version: args.tool_version.to_string(),
        git_sha: crate::GIT_REV.unwrap_or("").to_string(),
        utc_timestamp: args.utc_timestamp,
        input: InputProvenance {
            path: args.input_path.display().to_string(),
            sha256,
            format: args.input_format.to_string(),
        },
        output: OutputProvenance {
            path: args.output_path.display().to_string(),
            format: args.output_format.to_string(),
        },
        argv: args.argv,
        contract_id: args.contract_id,
        loss_hash: args.loss_hash,
        extra: args.extra,
    })
}

/// Deterministic JSON: sorted keys, minimal separators — used for
/// provenance embedding, loss hashing and report emission alike.
pub fn stable_json_dumps<T: Serialize>(value: &T) -> serde_json::Result<String> {
    canonical_json(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn sha256_of_known_content_is_stable() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"hello").unwrap();
        let hash = sha256_file(tmp.path()).unwrap();
        assert_eq!(
            hash,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn provenance_round_trips_through_json() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"events").unwrap();
        let prov = build_provenance(BuildProvenanceArgs {
            tool: "hepconduit",
            tool_version: "0.1.0",
            input_path: tmp.path(),
            output_path: Path::new("/tmp/out.hepmc3"),
            input_format: "lhe",
            output_format: "hepmc3",
            argv: vec!["hepconduit".into(), "convert".into()],
            contract_id: String::new(),
            loss_hash: "deadbeef".to_string(),
            extra: None,
            utc_timestamp: "2024-01-01T00:00:00Z".to_string(),
        })
        .unwrap();
        let json = stable_json_dumps(&prov).unwrap();
        assert!(json.contains("\"loss_hash\":\"deadbeef\""));
    }
}
