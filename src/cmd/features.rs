use crate::reports;
use clap::Args;
use keytrace::api::KeyTraceService;
use keytrace::error::KeyTraceError;
use keytrace::features::FeatureOutcome;
use keytrace::store::KeystrokeStore;
use keytrace::types::{FingerAnnotation, SessionId};
use keytrace::KtResult;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Args, Debug, Clone)]
pub struct FeaturesArgs {
    /// Session to compute; omit with --all.
    #[arg(required_unless_present = "all")]
    pub session: Option<SessionId>,

    #[arg(long, default_value_t = false)]
    pub all: bool,

    /// Fill default fingers for unannotated non-overwritable keys first.
    #[arg(long, default_value_t = false)]
    pub defaults: bool,
}

pub fn run<S: KeystrokeStore>(args: FeaturesArgs, service: &mut KeyTraceService<S>) -> KtResult<()> {
    if args.all {
        let outcomes = service.compute_all_features()?;
        let incomplete = outcomes.iter().filter(|(_, o)| !o.is_complete()).count();
        info!(
            "🧮 Processed {} sessions ({} incomplete)",
            outcomes.len(),
            incomplete
        );
        for (id, outcome) in &outcomes {
            if let FeatureOutcome::IncompleteAnnotations { indices } = outcome {
                warn!("⚠️  Session {} missing annotations at {:?}", id, indices);
            }
        }
        return Ok(());
    }

    let session_id = args
        .session
        .ok_or_else(|| KeyTraceError::Validation("a session id is required".to_string()))?;
    if args.defaults {
        let n = service.apply_default_annotations(session_id)?;
        info!("✍️  Applied {} default annotations", n);
    }
    let outcome = service.compute_features(session_id)?;
    reports::print_feature_outcome(session_id, &outcome);
    Ok(())
}

#[derive(Args, Debug, Clone)]
pub struct AnnotateArgs {
    pub session: SessionId,

    /// JSON array of {keystroke_id, finger, hand}.
    pub file: PathBuf,

    /// Recompute features after updating.
    #[arg(long, default_value_t = false)]
    pub compute: bool,
}

pub fn run_annotate<S: KeystrokeStore>(
    args: AnnotateArgs,
    service: &mut KeyTraceService<S>,
) -> KtResult<()> {
    let content = fs::read_to_string(&args.file)?;
    let annotations: Vec<FingerAnnotation> = serde_json::from_str(&content)?;
    let result = service.update_annotations(args.session, &annotations, args.compute)?;
    info!("✍️  Updated {} keystrokes", result.updated);
    if let Some(outcome) = &result.features {
        reports::print_feature_outcome(args.session, outcome);
    }
    Ok(())
}
