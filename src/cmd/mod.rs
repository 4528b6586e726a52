pub mod coverage;
pub mod deviations;
pub mod features;
pub mod maintenance;
pub mod patterns;
pub mod record;

use keytrace::types::SessionMode;
use keytrace::KtResult;

/// `None` means every session.
pub fn parse_mode(name: Option<&str>) -> KtResult<Option<SessionMode>> {
    name.map(SessionMode::from_name).transpose()
}
