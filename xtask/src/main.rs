// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! # xtask - Project Automation
//!
//! - `cargo xtask ci` verifies migrations, lints, checks dependencies, then
//!   builds and tests the workspace
//! - `cargo xtask verify-migrations` applies the `SQLite` migrations to a
//!   scratch database, checks the constraints the booking engine depends
//!   on, then reverts them

#![deny(
    clippy::pedantic,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all
)]

use std::{io, process::Output};

use cargo_metadata::MetadataCommand;
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use color_eyre::{eyre::Context, Result};
use diesel::sql_types::{Integer, Text};
use diesel::{Connection, QueryableByName, RunQueryDsl, SqliteConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use duct::cmd;
use std::collections::{BTreeMap, BTreeSet};
use tracing::level_filters::LevelFilter;
use tracing_log::AsTrace;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("../crates/persistence/migrations");

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level())
        .without_time()
        .init();

    if let Err(err) = args.command.run() {
        tracing::error!("{err}");
        std::process::exit(1);
    }
    Ok(())
}

#[derive(Debug, Parser)]
#[command(bin_name = "cargo xtask", styles = clap_cargo::style::CLAP_STYLING)]
struct Args {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    verbosity: Verbosity<InfoLevel>,
}

impl Args {
    fn log_level(&self) -> LevelFilter {
        self.verbosity.log_level_filter().as_trace()
    }
}

#[derive(Clone, Debug, Subcommand)]
enum Command {
    /// Verify migrations, lint, check dependencies, build and test
    CI,

    /// Build every target of the workspace
    #[command(visible_alias = "b")]
    Build,

    /// Check licenses and advisories with cargo-deny
    #[command(visible_alias = "cd")]
    Deny,

    /// Check for unused dependencies with cargo-machete
    #[command(visible_alias = "m")]
    Machete,

    /// Run clippy, rustdoc and rustfmt checks
    #[command(visible_alias = "l")]
    Lint,

    /// Run clippy with warnings denied
    #[command(visible_alias = "cl")]
    LintClippy,

    /// Build the docs of every crate with warnings denied
    #[command(visible_alias = "d")]
    LintDocs,

    /// Check formatting
    #[command(visible_alias = "lf")]
    LintFormatting,

    /// Reformat the workspace
    #[command(visible_alias = "fmt")]
    FixFormatting,

    /// Run the workspace tests
    #[command(visible_alias = "t")]
    Test,

    /// Apply and revert the `SQLite` migrations, checking required constraints
    #[command(visible_alias = "vm")]
    VerifyMigrations,
}

impl Command {
    fn run(self) -> Result<()> {
        match self {
            Self::CI => ci(),
            Self::Build => build(),
            Self::Deny => deny(),
            Self::Machete => machete(),
            Self::Lint => lint(),
            Self::LintClippy => lint_clippy(),
            Self::LintDocs => lint_docs(),
            Self::LintFormatting => lint_format(),
            Self::FixFormatting => fix_format(),
            Self::Test => test(),
            Self::VerifyMigrations => verify_migrations(),
        }
    }
}

fn ci() -> Result<()> {
    verify_migrations()?;
    lint()?;
    deny()?;
    machete()?;
    build()?;
    test()
}

fn deny() -> Result<()> {
    cmd!("cargo", "deny", "check").run_with_trace()?;
    Ok(())
}

fn machete() -> Result<()> {
    cmd!("cargo-machete").run_with_trace()?;
    Ok(())
}

fn build() -> Result<()> {
    run_cargo(vec!["build", "--workspace", "--all-targets"])
}

fn lint() -> Result<()> {
    lint_format()?;
    lint_clippy()?;
    lint_docs()
}

fn lint_clippy() -> Result<()> {
    run_cargo(vec![
        "clippy",
        "--workspace",
        "--all-targets",
        "--",
        "-D",
        "warnings",
    ])
}

/// Build docs for each default member, denying rustdoc warnings
fn lint_docs() -> Result<()> {
    let meta = MetadataCommand::new()
        .exec()
        .wrap_err("failed to get cargo metadata")?;

    for package in meta.workspace_default_packages() {
        cmd("cargo", ["doc", "--no-deps", "--package", &package.name])
            .env("RUSTDOCFLAGS", "-D warnings")
            .run_with_trace()?;
    }

    Ok(())
}

fn lint_format() -> Result<()> {
    run_cargo(vec!["fmt", "--all", "--check"])
}

fn fix_format() -> Result<()> {
    run_cargo(vec!["fmt", "--all"])
}

/// Unit and router tests; every suite uses in-memory `SQLite`, so no
/// external services are needed
fn test() -> Result<()> {
    run_cargo(vec!["test", "--workspace", "--all-targets"])
}

fn run_cargo(args: Vec<&str>) -> Result<()> {
    cmd("cargo", args).run_with_trace()?;
    Ok(())
}

/// Tables every migration set must create.
const REQUIRED_TABLES: &[&str] = &[
    "booking_events",
    "booking_technicians",
    "bookings",
    "businesses",
    "postal_centroids",
    "service_areas",
    "services",
    "technician_commitments",
    "technicians",
];

/// Unique constraints the booking engine relies on for idempotent commits
/// and area lookups.
const REQUIRED_UNIQUE: &[(&str, &[&str])] = &[
    ("bookings", &["business_id", "idempotency_key"]),
    ("bookings", &["confirmation_code"]),
    ("service_areas", &["business_id", "country_code", "postal_code"]),
];

/// Foreign keys as `(table, column, referenced table)`.
const REQUIRED_FOREIGN_KEYS: &[(&str, &str, &str)] = &[
    ("booking_events", "booking_id", "bookings"),
    ("booking_technicians", "booking_id", "bookings"),
    ("booking_technicians", "technician_id", "technicians"),
    ("bookings", "business_id", "businesses"),
    ("bookings", "service_id", "services"),
    ("service_areas", "business_id", "businesses"),
    ("services", "business_id", "businesses"),
    ("technician_commitments", "technician_id", "technicians"),
    ("technicians", "business_id", "businesses"),
];

/// Apply the `SQLite` migrations to a scratch database, check the schema
/// and revert everything.
fn verify_migrations() -> Result<()> {
    tracing::info!("Applying SQLite migrations");
    let mut conn = SqliteConnection::establish(":memory:")
        .wrap_err("Failed to create SQLite in-memory database")?;

    diesel::sql_query("PRAGMA foreign_keys = ON")
        .execute(&mut conn)
        .wrap_err("Failed to enable foreign keys on SQLite")?;

    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to apply SQLite migrations: {}", e))?;

    tracing::info!("Introspecting SQLite schema");
    let schema = introspect_sqlite_schema(&mut conn)?;
    check_schema(&schema)?;

    tracing::info!("Reverting SQLite migrations");
    conn.revert_all_migrations(MIGRATIONS)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to revert SQLite migrations: {}", e))?;

    let leftover = introspect_sqlite_schema(&mut conn)?;
    if !leftover.tables.is_empty() {
        return Err(color_eyre::eyre::eyre!(
            "Down migrations left tables behind: {:?}",
            leftover.tables.keys().collect::<Vec<_>>()
        ));
    }

    tracing::info!("✓ Migration verification passed");
    Ok(())
}

/// Normalized schema representation
#[derive(Debug, Clone, PartialEq, Eq)]
struct Schema {
    tables: BTreeMap<String, Table>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Table {
    foreign_keys: BTreeSet<ForeignKey>,
    unique_constraints: BTreeSet<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct ForeignKey {
    from_column: String,
    to_table: String,
}

/// Introspect `SQLite` schema
fn introspect_sqlite_schema(conn: &mut SqliteConnection) -> Result<Schema> {
    #[derive(QueryableByName)]
    struct TableName {
        #[diesel(sql_type = Text)]
        name: String,
    }

    #[derive(QueryableByName)]
    struct ForeignKeyInfo {
        #[diesel(sql_type = Text)]
        table: String,
        #[diesel(sql_type = Text)]
        from: String,
    }

    #[derive(QueryableByName)]
    struct IndexInfo {
        #[diesel(sql_type = Text)]
        name: String,
        #[diesel(sql_type = Integer)]
        unique: i32,
    }

    #[derive(QueryableByName)]
    struct IndexColumnInfo {
        #[diesel(sql_type = Text)]
        name: String,
    }

    let mut schema = Schema {
        tables: BTreeMap::new(),
    };

    let tables: Vec<TableName> = diesel::sql_query(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name != '__diesel_schema_migrations' ORDER BY name"
    )
    .load(conn)
    .wrap_err("Failed to query SQLite tables")?;

    for table in tables {
        let mut table_info = Table::default();

        let fks: Vec<ForeignKeyInfo> =
            diesel::sql_query(format!("PRAGMA foreign_key_list({})", table.name))
                .load(conn)
                .wrap_err(format!(
                    "Failed to get foreign keys for table {}",
                    table.name
                ))?;
        for fk in fks {
            table_info.foreign_keys.insert(ForeignKey {
                from_column: fk.from,
                to_table: fk.table,
            });
        }

        let indexes: Vec<IndexInfo> =
            diesel::sql_query(format!("PRAGMA index_list({})", table.name))
                .load(conn)
                .wrap_err(format!("Failed to get indexes for table {}", table.name))?;
        for idx in indexes.into_iter().filter(|idx| idx.unique != 0) {
            let index_columns: Vec<IndexColumnInfo> =
                diesel::sql_query(format!("PRAGMA index_info({})", idx.name))
                    .load(conn)
                    .wrap_err(format!("Failed to get index columns for {}", idx.name))?;
            table_info
                .unique_constraints
                .insert(index_columns.into_iter().map(|c| c.name).collect());
        }

        schema.tables.insert(table.name, table_info);
    }

    Ok(schema)
}

/// Check the introspected schema against the required tables and constraints.
fn check_schema(schema: &Schema) -> Result<()> {
    for table_name in REQUIRED_TABLES {
        if !schema.tables.contains_key(*table_name) {
            return Err(color_eyre::eyre::eyre!(
                "❌ Schema check FAILED: table '{}' is missing",
                table_name
            ));
        }
    }

    for (table_name, columns) in REQUIRED_UNIQUE {
        let expected: Vec<String> = columns.iter().map(ToString::to_string).collect();
        let found = schema
            .tables
            .get(*table_name)
            .is_some_and(|table| table.unique_constraints.contains(&expected));
        if !found {
            return Err(color_eyre::eyre::eyre!(
                "❌ Schema check FAILED: table '{}' has no unique constraint on {:?}",
                table_name,
                columns
            ));
        }
    }

    for (table_name, column, referenced) in REQUIRED_FOREIGN_KEYS {
        let expected = ForeignKey {
            from_column: (*column).to_string(),
            to_table: (*referenced).to_string(),
        };
        let found = schema
            .tables
            .get(*table_name)
            .is_some_and(|table| table.foreign_keys.contains(&expected));
        if !found {
            return Err(color_eyre::eyre::eyre!(
                "❌ Schema check FAILED: '{}.{}' does not reference '{}'",
                table_name,
                column,
                referenced
            ));
        }
    }

    tracing::debug!(tables = schema.tables.len(), "Schema constraints present");
    Ok(())
}

/// An extension trait for `duct::Expression` that logs the command being run
/// before running it.
trait ExpressionExt {
    /// Run the command and log the command being run
    fn run_with_trace(&self) -> io::Result<Output>;
}

impl ExpressionExt for duct::Expression {
    fn run_with_trace(&self) -> io::Result<Output> {
        tracing::info!("running command: {:?}", self);
        self.run().inspect_err(|_| {
            // The command that was run may have scrolled off the screen, so repeat it here
            tracing::error!("failed to run command: {:?}", self);
        })
    }
}
