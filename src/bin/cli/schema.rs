use clap::{Parser, Subcommand};

use hepconduit::parquet::schema::{columnar_schema, flat_schema};
use hepconduit::parquet::{SCHEMA_COLUMNAR, SCHEMA_FLAT};

/// Inspect or upgrade the Parquet schema generation this crate writes.
#[derive(Debug, Parser)]
pub(crate) struct SchemaArgs {
    #[clap(subcommand)]
    pub(crate) command: SchemaCommand,
}

#[derive(Debug, Subcommand)]
pub(crate) enum SchemaCommand {
    /// Print the flat and columnar Parquet schemas' names and field lists.
    Show,
    /// Report whether the schema this crate writes needs upgrading.
    Upgrade,
}

fn print_fields(name: &str, schema: arrow_schema::Schema) {
    println!("{name}:");
    for field in schema.fields() {
        println!("  {}: {:?}{}", field.name(), field.data_type(), if field.is_nullable() { " (nullable)" } else { "" });
    }
}

pub(crate) fn run(args: SchemaArgs) -> anyhow::Result<i32> {
    match args.command {
        SchemaCommand::Show => {
            print_fields(SCHEMA_FLAT, flat_schema());
            print_fields(SCHEMA_COLUMNAR, columnar_schema());
        }
        SchemaCommand::Upgrade => {
            println!("schema is already current: {SCHEMA_FLAT}, {SCHEMA_COLUMNAR} (no prior generation to migrate from)");
        }
    }
    Ok(super::EXIT_OK)
}
