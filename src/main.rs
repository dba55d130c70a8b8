//! Meteor Atlas - Meteorite Landing Chart Tables
//!
//! Command line front end: prints the dashboard tables, or writes them and the
//! landing data as CSV for a charting front end.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use meteor_atlas::data::write_csv_file;
use meteor_atlas::{ExportTable, Session, Settings};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "meteor-atlas")]
#[command(about = "Meteorite landing data preparation and chart tables")]
struct Cli {
    /// JSON settings file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Landing data file; repeat to stack several files
    #[arg(short, long, global = true)]
    landings: Vec<PathBuf>,

    /// Reference polygon GeoJSON
    #[arg(short, long, global = true)]
    reference: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every chart table
    Summary,

    /// Write the landing table as CSV, exactly as read
    Export {
        #[arg(short, long, default_value = "landings_export.csv")]
        output: PathBuf,

        /// Export the table with country and continent labels instead
        #[arg(long)]
        enriched: bool,
    },

    /// Write each chart table to its own CSV file
    Report {
        #[arg(short, long, default_value = "report")]
        out_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if !cli.landings.is_empty() {
        settings.landings = cli.landings.clone();
    }
    if let Some(reference) = &cli.reference {
        settings.reference = reference.clone();
    }

    let session = Session::new(settings);

    match cli.command {
        Commands::Summary => {
            let views = session.views().context("Failed to build chart tables")?;
            for (name, df) in views.tables() {
                println!("{name}\n{df}\n");
            }
            println!(
                "About {:.1}% of landed meteorites were found in {}.",
                views.highlighted_share,
                session.settings().views.highlighted_continent
            );
        }
        Commands::Export { output, enriched } => {
            let table = if enriched {
                ExportTable::Enriched
            } else {
                ExportTable::Raw
            };
            session
                .export(table, &output)
                .context("Failed to export landing table")?;
        }
        Commands::Report { out_dir } => {
            let views = session.views().context("Failed to build chart tables")?;
            std::fs::create_dir_all(&out_dir)
                .with_context(|| format!("Failed to create {}", out_dir.display()))?;
            for (name, df) in views.tables() {
                let path = out_dir.join(format!("{name}.csv"));
                write_csv_file(df, &path)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
            info!(dir = %out_dir.display(), "wrote report tables");
        }
    }

    Ok(())
}
