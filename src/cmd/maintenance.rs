use clap::Args;
use keytrace::api::KeyTraceService;
use keytrace::store::KeystrokeStore;
use keytrace::types::{KeystrokeId, SessionId};
use keytrace::KtResult;

#[derive(Args, Debug, Clone)]
pub struct CropArgs {
    pub session: SessionId,
    /// First position to keep (0-based).
    pub start: usize,
    /// Last position to keep, inclusive.
    pub end: usize,
}

pub fn run_crop<S: KeystrokeStore>(args: CropArgs, service: &mut KeyTraceService<S>) -> KtResult<()> {
    let removed = service.crop_session(args.session, args.start, args.end)?;
    println!(
        "Session {}: kept {}..={}, removed {} keystrokes",
        args.session, args.start, args.end, removed
    );
    Ok(())
}

#[derive(Args, Debug, Clone)]
pub struct DeleteKeystrokeArgs {
    pub id: KeystrokeId,
}

pub fn run_delete<S: KeystrokeStore>(
    args: DeleteKeystrokeArgs,
    service: &mut KeyTraceService<S>,
) -> KtResult<()> {
    service.delete_keystroke(args.id)?;
    println!("Deleted keystroke {}", args.id);
    Ok(())
}
