//! CLI subcommand option structs and runners (§6), one module per
//! subcommand following the teacher's `opt_cres.rs`/`opt_common.rs` split.
//! Each `run()` function returns the exit code an unclassified success
//! should use (0, or 2 for a validation/certification failure); any
//! `Err` bubbles up through `main` as an invocation-level failure (exit 1).

pub mod certify;
pub mod convert;
pub mod diff;
pub mod doctor;
pub mod info;
pub mod schema;
pub mod validate;

pub const EXIT_OK: i32 = 0;
pub const EXIT_INVOCATION: i32 = 1;
pub const EXIT_FAILURE: i32 = 2;

/// Print a value as pretty JSON with sorted keys to stdout, the shape
/// every subcommand's `--json` flag uses (§6: "stdout reserved for
/// requested structured output").
pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", hepconduit::extra::canonical_json(value)?);
    Ok(())
}
