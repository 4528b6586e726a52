use crate::reports;
use clap::Args;
use keytrace::api::KeyTraceService;
use keytrace::config::Config;
use keytrace::export;
use keytrace::store::KeystrokeStore;
use keytrace::KtResult;
use std::fs::File;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct PatternsArgs {
    #[command(flatten)]
    pub config: Config,

    /// Restrict to one session mode (top200, trigraphs, nonsense, calibration, trigraph_test).
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Print every pattern with its histogram.
    #[arg(long, default_value_t = false)]
    pub detailed: bool,

    /// Also write the digraph summary as CSV.
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

pub fn run<S: KeystrokeStore>(args: PatternsArgs, service: &mut KeyTraceService<S>) -> KtResult<()> {
    let mode = super::parse_mode(args.mode.as_deref())?;

    if args.detailed {
        let report = service.detailed_patterns(mode)?;
        reports::print_detailed_patterns("⌨️  Digraphs", &report.digraphs);
        reports::print_detailed_patterns("⌨️  Trigraphs", &report.trigraphs);
        println!(
            "\nTotals: {} digraphs, {} trigraphs",
            report.total_digraphs, report.total_trigraphs
        );
        return Ok(());
    }

    let report = service.analyze_patterns(mode)?;
    reports::print_pattern_report(&report);

    if let Some(path) = args.csv {
        export::write_pattern_csv(File::create(&path)?, &report.digraphs)?;
        info!("📄 Digraph summary written to {}", path.display());
    }
    Ok(())
}

#[derive(Args, Debug, Clone)]
pub struct DetailsArgs {
    #[command(flatten)]
    pub config: Config,

    /// A digraph or trigraph, e.g. "th" or "the".
    pub pattern: String,
}

pub fn run_details<S: KeystrokeStore>(
    args: DetailsArgs,
    service: &mut KeyTraceService<S>,
) -> KtResult<()> {
    let details = if args.pattern.chars().count() == 3 {
        service.trigraph_details(&args.pattern)?
    } else {
        service.digraph_details(&args.pattern)?
    };
    reports::print_pattern_details(&details);
    Ok(())
}
