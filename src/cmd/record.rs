use clap::Args;
use keytrace::api::KeyTraceService;
use keytrace::store::KeystrokeStore;
use keytrace::types::{NewKeystroke, SessionMode};
use keytrace::KtResult;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// A captured session as uploaded by the collector client.
#[derive(Debug, Deserialize)]
pub struct SessionUpload {
    pub mode: SessionMode,
    pub raw_text: String,
    #[serde(default)]
    pub label: Option<String>,
    pub keystrokes: Vec<NewKeystroke>,
}

#[derive(Args, Debug, Clone)]
pub struct RecordArgs {
    /// JSON file with {mode, raw_text, label?, keystrokes: [...]}.
    pub file: PathBuf,
}

pub fn run<S: KeystrokeStore>(args: RecordArgs, service: &mut KeyTraceService<S>) -> KtResult<()> {
    let content = fs::read_to_string(&args.file)?;
    let upload: SessionUpload = serde_json::from_str(&content)?;
    let id = service.record_session(
        upload.mode,
        &upload.raw_text,
        upload.label.as_deref(),
        upload.keystrokes,
    )?;
    println!("Recorded session {}", id);
    Ok(())
}
