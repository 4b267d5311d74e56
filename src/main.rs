use clap::{Parser, Subcommand};
use hud_ingest::source::{DirSource, Source, ZipSource};
use hud_ingest::{config, ingest, inventory, output, sink};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "hud-ingest")]
#[command(about = "Ingest labeled road-scene image archives into a canonical store")]
#[command(long_about = "\
Ingest labeled road-scene image archives into a canonical store

Contributed imagery arrives as ZIP archives (or raw directory trees) whose
paths encode the taxonomy:

  raw/<visibility>/<dataset>[/<scenario>]/<train|test|unknown>/...

Two run shapes share the same scan/classify core:

  extract   unpack every valid image into the canonical namespace, with
            sequential collision-safe filenames — never overwriting
  index     build one inventory row per image (taxonomy, dimensions,
            sha256, source URI) in an append-only JSON Lines file

Both are idempotent: re-running extract renames instead of overwriting, and
re-running index adds zero net new rows. A single corrupt or misplaced entry
is reported on the run log and never aborts the run.

Run 'hud-ingest gen-config' to generate a documented ingest.toml.")]
#[command(version)]
struct Cli {
    /// Configuration file (optional; stock defaults when absent)
    #[arg(long, default_value = "ingest.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Unpack an archive or directory tree into the canonical image store
    Extract {
        /// ZIP archive or directory to ingest
        source: PathBuf,

        /// Root of the canonical image store
        #[arg(long, default_value = "storage")]
        dest: PathBuf,

        /// Re-ingest even when a run log already exists for this source
        #[arg(long)]
        force: bool,
    },
    /// Index an image tree or archive into the inventory file
    Index {
        /// ZIP archive or directory to index
        source: PathBuf,

        /// Inventory file (JSON Lines, appended to)
        #[arg(long, default_value = "inventory.jsonl")]
        inventory: PathBuf,
    },
    /// Print a stock ingest.toml with all options documented
    GenConfig,
}

/// Open a ZIP or directory source depending on what the path points at.
fn open_source(path: &Path) -> Result<Box<dyn Source>, hud_ingest::source::SourceError> {
    if path.is_dir() {
        Ok(Box::new(DirSource::open(path)?))
    } else {
        Ok(Box::new(ZipSource::open(path)?))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;

    match cli.command {
        Command::Extract {
            source,
            dest,
            force,
        } => {
            let mut source = open_source(&source)?;
            if !force && ingest::already_ingested(&config.logs_dir, &source.name()) {
                println!(
                    "{} already ingested (run log exists); use --force to re-ingest",
                    source.name()
                );
                return Ok(());
            }
            let mut sink = sink::FsSink::new(&dest);
            let summary = ingest::run_extract(source.as_mut(), &mut sink, &config)?;
            output::print_run_summary(&summary);
        }
        Command::Index { source, inventory } => {
            let mut source = open_source(&source)?;
            let mut writer = inventory::InventoryWriter::open(&inventory, config.batch_size)?;
            let summary = ingest::run_index(source.as_mut(), &mut writer, &config)?;
            let stats = writer.finish()?;
            output::print_index_summary(&summary, &stats);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
