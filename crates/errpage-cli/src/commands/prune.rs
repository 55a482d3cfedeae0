use super::{json_pretty, load_desired, EXIT_FAILURE, EXIT_SUCCESS};
use errpage_core::{PassLock, ReconcilerConfig};
use errpage_schema::StatusCode;
use errpage_store::{OrphanPruner, StoreLayout};
use std::collections::BTreeSet;
use std::path::Path;

pub fn run(
    config: &ReconcilerConfig,
    desired_path: &Path,
    dry_run: bool,
    json: bool,
) -> Result<u8, String> {
    let desired = load_desired(desired_path)?;
    let keep: BTreeSet<StatusCode> = desired
        .iter()
        .filter_map(|(raw, _)| StatusCode::parse(raw).ok())
        .collect();

    let layout = StoreLayout::new(&config.store_dir);
    let _lock = PassLock::acquire(&layout).map_err(|e| format!("store lock: {e}"))?;
    let report = OrphanPruner::new(layout)
        .prune(&keep, dry_run)
        .map_err(|e| format!("store error: {e}"))?;

    if json {
        let payload = serde_json::json!({
            "dry_run": dry_run,
            "orphaned": report.orphaned,
            "removed": report.removed,
            "failed": report.failed.iter().map(|(code, reason)| {
                serde_json::json!({ "code": code, "error": reason })
            }).collect::<Vec<_>>(),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        let prefix = if dry_run { "would remove" } else { "removed" };
        let count = if dry_run {
            report.orphaned.len()
        } else {
            report.removed.len()
        };
        println!("prune: {prefix} {count} error pages");
        for (code, reason) in &report.failed {
            println!("  failed {code}: {reason}");
        }
    }

    if report.failed.is_empty() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILURE)
    }
}
