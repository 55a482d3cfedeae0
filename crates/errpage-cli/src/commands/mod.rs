pub mod check;
pub mod list;
pub mod prune;
pub mod reconcile;

use errpage_schema::{parse_desired_file, DesiredState};
use std::path::Path;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_DESIRED_ERROR: u8 = 2;
pub const EXIT_STORE_ERROR: u8 = 3;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn load_desired(path: &Path) -> Result<DesiredState, String> {
    parse_desired_file(path).map_err(|e| format!("desired state error: {}: {e}", path.display()))
}
