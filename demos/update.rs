use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use portage_history::{resolve, Atom, Config, Git, SqliteStore, Updater};

/// Import the history of an ebuild repository into a SQLite database.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Repository checkout, overriding the configuration.
    #[arg(short, long)]
    repository: Option<PathBuf>,

    /// Database file, overriding the configuration.
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Re-import every tracked file instead of the new commits.
    #[arg(long)]
    full: bool,

    /// After updating, print the versions matching these specifiers.
    specifiers: Vec<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "update failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> portage_history::Result<()> {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(repository) = args.repository {
        config.repository = repository;
    }
    if let Some(database) = args.database {
        config.database = database;
    }

    let mut store = SqliteStore::open(&config.database)?;
    let git = Git::new(&config.repository);
    let mut updater = Updater::new(&mut store, &git, config);
    let report = if args.full {
        updater.full_update()?
    } else {
        updater.run_incremental_update()?
    };
    println!(
        "imported {} files ({} failed), replayed {} commits, high water {}",
        report.import.imported,
        report.import.failed,
        report.ingest.processed,
        report.ingest.high_water
    );
    if report.removed > 0 || report.failed > 0 {
        println!("removed {} rows ({} failed)", report.removed, report.failed);
    }

    for specifier in &args.specifiers {
        let atom = Atom::from_specifier(specifier)?;
        for version in resolve(&store, specifier, &atom.to_string())? {
            println!("{specifier}\t{}\tslot {}\t{}", version.id, version.slot, version.keywords);
        }
    }
    Ok(())
}
