use crate::reports;
use clap::Args;
use keytrace::api::{KeyTraceService, DEFAULT_COVERAGE_MODE};
use keytrace::config::Config;
use keytrace::export;
use keytrace::store::KeystrokeStore;
use keytrace::KtResult;
use std::fs::File;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct CoverageArgs {
    #[command(flatten)]
    pub config: Config,

    /// Session mode to count (defaults to trigraph_test).
    #[arg(short, long, conflicts_with = "all_modes")]
    pub mode: Option<String>,

    /// Count transitions from every session.
    #[arg(long, default_value_t = false)]
    pub all_modes: bool,

    /// Propose trigraphs targeting the largest gaps (count from --suggestion-count).
    #[arg(long, default_value_t = false)]
    pub suggest: bool,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long)]
    pub csv: Option<PathBuf>,
}

pub fn run<S: KeystrokeStore>(args: CoverageArgs, service: &mut KeyTraceService<S>) -> KtResult<()> {
    let mode = if args.all_modes {
        None
    } else {
        Some(super::parse_mode(args.mode.as_deref())?.unwrap_or(DEFAULT_COVERAGE_MODE))
    };

    let report = service.get_coverage(mode)?;
    reports::print_coverage_report(&report);

    if let Some(path) = &args.csv {
        export::write_coverage_csv(File::create(path)?, &report.matrix)?;
        info!("📄 Coverage matrix written to {}", path.display());
    }

    if args.suggest {
        let mut rng = match args.seed {
            Some(s) => fastrand::Rng::with_seed(s),
            None => fastrand::Rng::new(),
        };
        let count = service.config().coverage.suggestion_count;
        let batch = keytrace::coverage::stratified_batch(&report, count, &mut rng);
        reports::print_suggestions(&batch);
    }
    Ok(())
}
