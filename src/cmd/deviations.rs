use crate::reports;
use clap::Args;
use keytrace::api::KeyTraceService;
use keytrace::config::Config;
use keytrace::store::KeystrokeStore;
use keytrace::KtResult;

#[derive(Args, Debug, Clone)]
pub struct DeviationsArgs {
    #[command(flatten)]
    pub config: Config,

    /// Maximum number of words listed.
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Show (letter, previous key) triggers instead of the per-word view.
    #[arg(long, default_value_t = false)]
    pub patterns: bool,
}

pub fn run<S: KeystrokeStore>(
    args: DeviationsArgs,
    service: &mut KeyTraceService<S>,
) -> KtResult<()> {
    if args.patterns {
        reports::print_deviation_patterns(&service.get_deviation_patterns()?);
    } else {
        reports::print_deviation_report(&service.get_deviations(args.limit)?);
    }
    Ok(())
}
