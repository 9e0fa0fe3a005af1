#![warn(clippy::all)]

use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, ValueEnum};
use foodgram::{
    config::Config,
    database::{
        connection::establish_pooled_connection,
        models::{ingredient::NewIngredient, tag::NewTag},
    },
    fixtures::load_rows,
    store::{pg_store::PgStore, RelationStore},
};
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter, Registry};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Table {
    Ingredients,
    Tags,
}

/// Bulk-loads ingredient or tag fixtures, skipping rows that already exist.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Table to fill
    #[arg(value_enum)]
    table: Table,

    /// CSV file with a header row, or a JSON array
    file: PathBuf,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    Registry::default()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(Args::parse()) {
        Ok(inserted) => {
            println!("Loaded {inserted} rows");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<usize, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let pool = establish_pooled_connection(&config.database_url, 1)?;
    let store = PgStore::new(pool);

    let inserted = match args.table {
        Table::Ingredients => {
            let rows: Vec<NewIngredient> = load_rows(&args.file)?;
            store.insert_ingredients(&rows)?
        }
        Table::Tags => {
            let rows: Vec<NewTag> = load_rows(&args.file)?;
            store.insert_tags(&rows)?
        }
    };
    info!("Inserted {inserted} rows into {:?}", args.table);

    Ok(inserted)
}
