//! CLI integration tests (§8's six end-to-end scenarios), driving the
//! compiled binary via `assert_cmd` against materialised fixture files.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn hepconduit() -> Command {
    Command::cargo_bin("hepconduit").unwrap()
}

fn write_fixture(dir: &std::path::Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    path
}

/// pp -> W+ e nu, 3 events with 5 particles each (§8 scenario 1).
const PP_W_ENU_LHE: &str = r#"<LesHouchesEvents version="3.0">
<init>
2212 2212 6500.0 6500.0 0 0 0 0 3 1
0.5 0.01 1.0 1
</init>
<event>
5 1 1.0 91.188 0.00729735 0.118
2 -1 0 0 0 0 0.0 0.0 500.0 500.0 0.0 0 9
-1 -1 0 0 0 0 0.0 0.0 -400.0 400.0 0.0 0 9
24 2 1 2 0 0 0.0 0.0 100.0 900.0 80.4 0 9
11 1 3 3 0 0 30.0 0.0 60.0 450.0 0.0 0 9
-12 1 3 3 0 0 -30.0 0.0 40.0 450.0 0.0 0 9
</event>
<event>
5 1 1.0 91.188 0.00729735 0.118
2 -1 0 0 0 0 0.0 0.0 510.0 510.0 0.0 0 9
-1 -1 0 0 0 0 0.0 0.0 -410.0 410.0 0.0 0 9
24 2 1 2 0 0 0.0 0.0 100.0 920.0 80.4 0 9
11 1 3 3 0 0 31.0 0.0 61.0 460.0 0.0 0 9
-12 1 3 3 0 0 -31.0 0.0 39.0 460.0 0.0 0 9
</event>
<event>
5 1 1.0 91.188 0.00729735 0.118
2 -1 0 0 0 0 0.0 0.0 520.0 520.0 0.0 0 9
-1 -1 0 0 0 0 0.0 0.0 -420.0 420.0 0.0 0 9
24 2 1 2 0 0 0.0 0.0 100.0 940.0 80.4 0 9
11 1 3 3 0 0 32.0 0.0 62.0 470.0 0.0 0 9
-12 1 3 3 0 0 -32.0 0.0 38.0 470.0 0.0 0 9
</event>
</LesHouchesEvents>
"#;

/// Edge-case LHE: comment inside `<init>`, shortened event header, Fortran
/// exponents, `<weights>`/`<rwgt>` blocks, trailing generator token (§8
/// scenario 2).
const EDGE_CASE_LHE: &str = r#"<LesHouchesEvents version="3.0">
<init>
# a comment inside the init block
2212 2212 6.500000D+03 6.500000D+03 0 0 0 0 3 1
5.0D-01 1.0D-02 1.0D+00 1
</init>
<event>
2 1 1.0D+00
11 -1 0 0 0 0 0.0 0.0 5.0D+01 5.0D+01 0.0 0 9
-11 -1 0 0 0 0 0.0 0.0 -5.0D+01 5.0D+01 0.0 0 9
<weights>
1.0 0.95 1.05
</weights>
<rwgt>
<wgt id='mur=0.5_muf=0.5'> 1.1 </wgt>
</rwgt>
#generator-trailer-token
</event>
</LesHouchesEvents>
"#;

#[test]
fn info_reports_event_and_particle_counts_for_pp_w_enu() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fixture(dir.path(), "pp_w_enu.lhe", PP_W_ENU_LHE);

    hepconduit()
        .args(["info", "--json"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"n_events\":3"))
        .stdout(predicate::str::contains("\"total_particles\":15"))
        .stdout(predicate::str::contains("\"beam_pdg_id\":[2212,2212]"));
}

#[test]
fn convert_lhe_to_hepmc3_round_trip_preserves_event_count() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fixture(dir.path(), "pp_w_enu.lhe", PP_W_ENU_LHE);
    let mid = dir.path().join("mid.hepmc3");
    let back = dir.path().join("back.lhe");

    hepconduit()
        .args(["convert", "--quiet", "--report", "none"])
        .arg(&input)
        .arg(&mid)
        .assert()
        .success();
    assert!(mid.exists());

    hepconduit()
        .args(["convert", "--quiet", "--report", "none"])
        .arg(&mid)
        .arg(&back)
        .assert()
        .success();

    hepconduit()
        .args(["diff", "--by", "fingerprint", "--json"])
        .arg(&input)
        .arg(&back)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"common\":3"))
        .stdout(predicate::str::contains("\"added\":0"))
        .stdout(predicate::str::contains("\"removed\":0"));
}

#[test]
fn edge_case_lhe_is_parsed_into_a_single_event() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fixture(dir.path(), "edge.lhe", EDGE_CASE_LHE);

    // The event has no final-state particles, so physics validation is
    // expected to flag it (exit 2); what this test checks is that the
    // edge-case grammar (Fortran exponents, weights/rwgt blocks, a
    // trailing comment, a comment line inside <init>) parses at all
    // rather than aborting the reader.
    hepconduit()
        .args(["info", "--json"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"n_events\":1"))
        .stdout(predicate::str::contains("\"total_particles\":2"))
        .stdout(predicate::str::contains("\"beam_pdg_id\":[2212,2212]"));
}

#[test]
fn sarif_report_is_emitted_with_both_rules() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fixture(dir.path(), "pp_w_enu.lhe", PP_W_ENU_LHE);
    let output = dir.path().join("out.hepmc3");

    hepconduit()
        .args(["convert", "--quiet", "--report", "auto", "--report-format", "sarif"])
        .arg(&input)
        .arg(&output)
        .assert()
        .success();

    let sarif_path = dir.path().join("out.hepmc3.hepconduit.sarif");
    assert!(sarif_path.exists());
    let contents = std::fs::read_to_string(&sarif_path).unwrap();
    assert!(contents.contains("\"version\":\"2.1.0\""));
    assert!(contents.contains("HEPLOSS001"));
    assert!(contents.contains("HEPLOSS002"));
}

#[test]
fn certify_generator_level_pack_passes_on_clean_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fixture(dir.path(), "pp_w_enu.lhe", PP_W_ENU_LHE);

    hepconduit()
        .args(["certify", "--pack", "generator_level_v1", "--to", "hepmc3"])
        .arg(&input)
        .assert()
        .success();
}

#[test]
fn doctor_reports_all_builtin_formats_registered() {
    hepconduit()
        .arg("doctor")
        .assert()
        .success()
        .stdout(predicate::str::contains("formats registered"));
}

#[test]
fn schema_show_prints_both_schema_names() {
    hepconduit()
        .args(["schema", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hepconduit.event.v1.flat"))
        .stdout(predicate::str::contains("hepconduit.event.v1.columnar"));
}

#[test]
fn unknown_output_extension_exits_with_invocation_code() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fixture(dir.path(), "pp_w_enu.lhe", PP_W_ENU_LHE);
    let output = dir.path().join("out.xyz");

    hepconduit()
        .args(["convert", "--quiet"])
        .arg(&input)
        .arg(&output)
        .assert()
        .failure()
        .code(1);
}
