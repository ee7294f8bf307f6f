//! SchemaDB CLI
//!
//! Command-line front end for SchemaDB.
//!
//! # Commands
//!
//! - `schema [name [fields...]]` - List, view or define schemas
//! - `add <schema> <json>` - Add or replace a record
//! - `get|view <schema> <key>` - Fetch a record by full or partial key
//! - `delete <schema> <key>` - Delete a record by exact key
//! - `list <schema>` - List every record of a schema
//! - `use <db>` - Select (and create) a database
//! - `dbs` - List databases
//! - `wipe|drop` - Remove everything from the selected database
//! - `inspect` - Display database statistics
//! - `verify` - Check snapshots and indexes

mod commands;

use clap::{Parser, Subcommand};
use schemadb_core::{Config, StorageEngine};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// SchemaDB: a schema-validated record store.
#[derive(Parser)]
#[command(name = "schemadb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the databases
    #[arg(global = true, short, long, default_value = "./dbs")]
    path: PathBuf,

    /// Database to select before running the command
    #[arg(global = true, long, default_value = "default")]
    db: String,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List schemas, show one schema, or define a schema
    Schema {
        /// Schema name
        name: Option<String>,

        /// Field declarations such as `name:string age:int`
        fields: Vec<String>,
    },

    /// Add a record (replaces a record with the same key)
    Add {
        /// Schema name
        schema: String,

        /// Record as a JSON object
        json: String,
    },

    /// Fetch a record by full or partial key
    #[command(visible_alias = "view")]
    Get {
        /// Schema name
        schema: String,

        /// Full key or unique key prefix
        key: String,
    },

    /// Delete a record by its exact key
    Delete {
        /// Schema name
        schema: String,

        /// Full key
        key: String,
    },

    /// List every record of a schema
    List {
        /// Schema name
        schema: String,
    },

    /// Select a database, creating it if needed
    Use {
        /// Database name
        name: String,
    },

    /// List databases
    Dbs,

    /// Remove every schema and record from the selected database
    #[command(visible_alias = "drop")]
    Wipe,

    /// Display database statistics
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check snapshot files and partial-key indexes
    Verify,

    /// Show version information
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so record output on stdout stays clean.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            println!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Commands::Version = cli.command {
        println!("SchemaDB CLI v{}", env!("CARGO_PKG_VERSION"));
        println!("SchemaDB Core v{}", schemadb_core::VERSION);
        return Ok(());
    }

    let config = Config::new()
        .root(cli.path.clone())
        .default_database(cli.db.clone());
    let engine = StorageEngine::open(config)?;
    debug!(root = %cli.path.display(), database = %engine.current_database(), "engine ready");

    match cli.command {
        Commands::Schema { name, fields } => commands::schema::run(&engine, name.as_deref(), &fields)?,
        Commands::Add { schema, json } => commands::records::add(&engine, &schema, &json)?,
        Commands::Get { schema, key } => commands::records::get(&engine, &schema, &key)?,
        Commands::Delete { schema, key } => commands::records::delete(&engine, &schema, &key)?,
        Commands::List { schema } => commands::records::list(&engine, &schema)?,
        Commands::Use { name } => commands::database::use_database(&engine, &name)?,
        Commands::Dbs => commands::database::list(&engine)?,
        Commands::Wipe => commands::database::wipe(&engine)?,
        Commands::Inspect { format } => commands::inspect::run(&engine, &cli.path, &format)?,
        Commands::Verify => commands::verify::run(&engine, &cli.path)?,
        Commands::Version => {}
    }

    Ok(())
}
