use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use keytrace::api::KeyTraceService;
use keytrace::config::Config;
use keytrace::store::{KeystrokeStore, MemoryStore, SqliteStore};
use keytrace::KtResult;
use std::path::{Path, PathBuf};
use std::process;
use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about = "Keystroke telemetry analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SQLite database holding sessions and keystrokes.
    #[arg(global = true, long, default_value = "data/keystrokes.db")]
    db: PathBuf,

    /// Use a JSON snapshot instead of the database.
    #[arg(global = true, long)]
    snapshot: Option<PathBuf>,

    /// JSON file with analysis parameters. Explicit flags still win.
    #[arg(global = true, long)]
    config: Option<PathBuf>,

    #[arg(global = true, long, default_value_t = false)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Record(cmd::record::RecordArgs),
    Patterns(cmd::patterns::PatternsArgs),
    Details(cmd::patterns::DetailsArgs),
    Coverage(cmd::coverage::CoverageArgs),
    Deviations(cmd::deviations::DeviationsArgs),
    Features(cmd::features::FeaturesArgs),
    Annotate(cmd::features::AnnotateArgs),
    Crop(cmd::maintenance::CropArgs),
    DeleteKeystroke(cmd::maintenance::DeleteKeystrokeArgs),
    Stats,
}

impl Commands {
    fn cli_config(&self) -> Option<&Config> {
        match self {
            Commands::Patterns(a) => Some(&a.config),
            Commands::Details(a) => Some(&a.config),
            Commands::Coverage(a) => Some(&a.config),
            Commands::Deviations(a) => Some(&a.config),
            _ => None,
        }
    }

    /// Commands that write to the store.
    fn mutates(&self) -> bool {
        matches!(
            self,
            Commands::Record(_)
                | Commands::Features(_)
                | Commands::Annotate(_)
                | Commands::Crop(_)
                | Commands::DeleteKeystroke(_)
        )
    }
}

fn resolve_config(cli: &Cli, matches: &clap::ArgMatches) -> KtResult<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            info!("⚙️  Loading config from {}", path.display());
            Config::load_from_file(path)?
        }
        None => Config::default(),
    };

    if let (Some(cli_config), Some((_, sub_matches))) = (cli.command.cli_config(), matches.subcommand()) {
        if cli.config.is_some() {
            config.merge_from_cli(cli_config, sub_matches);
        } else {
            config = cli_config.clone();
        }
    }
    config.validate()?;
    Ok(config)
}

fn dispatch<S: KeystrokeStore>(service: &mut KeyTraceService<S>, command: Commands) -> KtResult<()> {
    match command {
        Commands::Record(args) => cmd::record::run(args, service),
        Commands::Patterns(args) => cmd::patterns::run(args, service),
        Commands::Details(args) => cmd::patterns::run_details(args, service),
        Commands::Coverage(args) => cmd::coverage::run(args, service),
        Commands::Deviations(args) => cmd::deviations::run(args, service),
        Commands::Features(args) => cmd::features::run(args, service),
        Commands::Annotate(args) => cmd::features::run_annotate(args, service),
        Commands::Crop(args) => cmd::maintenance::run_crop(args, service),
        Commands::DeleteKeystroke(args) => cmd::maintenance::run_delete(args, service),
        Commands::Stats => {
            reports::print_stats(&service.session_stats()?);
            Ok(())
        }
    }
}

fn run(cli: Cli, config: Config) -> KtResult<()> {
    let mutates = cli.command.mutates();

    match &cli.snapshot {
        Some(path) => {
            let store = if Path::new(path).exists() {
                info!("📂 Loading snapshot {}", path.display());
                MemoryStore::load_from_file(path)?
            } else {
                MemoryStore::new()
            };
            let mut service = KeyTraceService::new(store, config);
            dispatch(&mut service, cli.command)?;
            if mutates {
                service.into_store().save_to_file(path)?;
            }
        }
        None => {
            if let Some(parent) = cli.db.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let store = SqliteStore::open(&cli.db)?;
            let mut service = KeyTraceService::new(store, config);
            dispatch(&mut service, cli.command)?;
        }
    }
    Ok(())
}

fn main() {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    let level = if cli.debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = resolve_config(&cli, &matches).unwrap_or_else(|e| {
        error!("❌ {}", e);
        process::exit(2);
    });

    if let Err(e) = run(cli, config) {
        error!("❌ {}", e);
        process::exit(1);
    }
}
