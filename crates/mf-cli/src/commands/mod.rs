pub mod config;
pub mod simulate;

use std::fs;
use std::path::Path;

use mf_simulation::SchedulerConfig;

/// Load a scheduler config from a JSON file, or the defaults when no path
/// is given. Missing fields take their default values.
fn load_config(path: Option<&Path>) -> Result<SchedulerConfig, String> {
    let Some(path) = path else {
        return Ok(SchedulerConfig::default());
    };
    let text = fs::read_to_string(path)
        .map_err(|e| format!("cannot read config {}: {e}", path.display()))?;
    serde_json::from_str(&text).map_err(|e| format!("invalid config {}: {e}", path.display()))
}
