//! oxide-tables CLI
//!
//! Command-line tool for validating table definitions and generating their
//! migrations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_tables::prelude::*;

/// Declarative table builder with migration code generation.
#[derive(Parser)]
#[command(name = "oxide-tables")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Namespace prefix every table name must start with.
    #[arg(short, long, env = "OXIDE_TABLES_PREFIX")]
    prefix: Option<String>,

    /// MySQL URL to read the live schema from.
    #[arg(short, long, env = "DATABASE_URL")]
    database: Option<String>,

    /// JSON snapshot of the existing schema. Takes precedence over the
    /// database.
    #[arg(short, long)]
    existing: Option<PathBuf>,

    /// Migrations directory.
    #[arg(
        short,
        long,
        env = "OXIDE_TABLES_MIGRATIONS_DIR",
        default_value = "migrations"
    )]
    migrations_dir: PathBuf,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a table definition without generating anything.
    Validate {
        /// Table name.
        table: String,

        /// JSON file holding the column list.
        #[arg(short, long)]
        columns: PathBuf,
    },

    /// Generate a create or update migration for a table.
    Generate {
        /// Table name.
        table: String,

        /// JSON file holding the column list.
        #[arg(short, long)]
        columns: PathBuf,

        /// Print the migration instead of writing it.
        #[arg(long)]
        dry_run: bool,
    },

    /// Generate a migration dropping a table.
    Drop {
        /// Table name.
        table: String,

        /// Print the migration instead of writing it.
        #[arg(long)]
        dry_run: bool,
    },

    /// List the tables under the prefix.
    Tables,

    /// Print a JSON snapshot of the tables under the prefix.
    Snapshot,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let prefix = cli.prefix.clone().unwrap_or_default();

    match cli.command {
        Commands::Snapshot => {
            let url = cli
                .database
                .as_deref()
                .context("snapshot needs --database or DATABASE_URL")?;
            let snapshot = MySqlInspector::connect(url).await?.snapshot(&prefix).await?;
            println!("{}", snapshot.to_json()?);
        }

        Commands::Validate { table, columns } => {
            let context =
                schema_context(cli.existing.as_deref(), cli.database.as_deref(), &prefix).await?;
            let columns = read_columns(&columns)?;
            let model = open_model(&context, &table)?;
            model.validate(&columns, &prefix)?;
            info!("Table definition for '{}' is valid.", table);
        }

        Commands::Generate {
            table,
            columns,
            dry_run,
        } => {
            let context =
                schema_context(cli.existing.as_deref(), cli.database.as_deref(), &prefix).await?;
            let store = FsMigrationStore::new(&cli.migrations_dir);
            let columns = read_columns(&columns)?;
            let model = open_model(&context, &table)?;
            match model.generate_create_or_update_migration(&columns, &prefix, &store)? {
                MigrationOutcome::NoChanges => info!("No changes detected for '{}'.", table),
                MigrationOutcome::Generated(artifact) => emit(&store, &artifact, dry_run)?,
            }
        }

        Commands::Drop { table, dry_run } => {
            let context =
                schema_context(cli.existing.as_deref(), cli.database.as_deref(), &prefix).await?;
            let store = FsMigrationStore::new(&cli.migrations_dir);
            let model = TableModel::load(&context, &table)?;
            let artifact = model.generate_drop_migration(&store)?;
            emit(&store, &artifact, dry_run)?;
        }

        Commands::Tables => {
            let context =
                schema_context(cli.existing.as_deref(), cli.database.as_deref(), &prefix).await?;
            let tables = TableModel::list_tables(&context, &prefix)?;
            if tables.is_empty() {
                info!("No tables found.");
            }
            for table in tables {
                println!("{table}");
            }
        }
    }

    Ok(())
}

/// Builds the context the commands read the existing schema through.
///
/// A snapshot file is only read when a command first needs it; a live
/// database is captured once up front.
async fn schema_context(
    existing: Option<&Path>,
    database: Option<&str>,
    prefix: &str,
) -> anyhow::Result<SchemaContext> {
    if let Some(path) = existing.map(Path::to_path_buf) {
        return Ok(SchemaContext::new(move || {
            let inspector = MemoryInspector::load(&path)?;
            Ok(Arc::new(inspector) as Arc<dyn SchemaInspector>)
        }));
    }

    if let Some(url) = database {
        let snapshot = MySqlInspector::connect(url).await?.snapshot(prefix).await?;
        return Ok(SchemaContext::with_inspector(Arc::new(snapshot)));
    }

    Ok(SchemaContext::with_inspector(Arc::new(MemoryInspector::new())))
}

/// Loads the table when it exists, otherwise starts a new one.
fn open_model<'ctx>(context: &'ctx SchemaContext, table: &str) -> anyhow::Result<TableModel<'ctx>> {
    match TableModel::load(context, table) {
        Ok(model) => Ok(model),
        Err(TableError::NotFound(_)) => Ok(TableModel::new(context, table)),
        Err(e) => Err(e.into()),
    }
}

fn read_columns(path: &Path) -> anyhow::Result<Vec<ColumnDescriptor>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading column list {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("parsing column list {}", path.display()))
}

fn emit(
    store: &FsMigrationStore,
    artifact: &MigrationArtifact,
    dry_run: bool,
) -> anyhow::Result<()> {
    if dry_run {
        println!(
            "Would create migration {} ({}): {}",
            artifact.migration_name, artifact.version, artifact.description
        );
        println!("\n{}", artifact.code);
    } else {
        store.persist(artifact)?;
        info!(
            "Wrote {} to {}",
            artifact.migration_name,
            store.dir().display()
        );
    }
    Ok(())
}
