use super::{json_pretty, load_desired, EXIT_SUCCESS};
use errpage_core::{
    BindingApi, CoreError, PassLock, Reconciler, ReconcilerConfig, RecordingBindingApi,
};
use std::path::Path;

pub fn run(config: &ReconcilerConfig, desired_path: &Path, json: bool) -> Result<u8, String> {
    let desired = load_desired(desired_path)?;
    let reconciler = Reconciler::new(config);
    let lock =
        PassLock::acquire(reconciler.store().layout()).map_err(|e| format!("store lock: {e}"))?;

    let api = RecordingBindingApi::new();
    let outcome = reconciler
        .reconcile(&lock, &desired, &api)
        .map_err(|e| match e {
            CoreError::MissingContent { .. } => format!("desired state error: {e}"),
            other => other.to_string(),
        })?;
    let bindings = api.bindings();

    if json {
        let payload = serde_json::json!({
            "modified": outcome.modified,
            "reload_required": outcome.reload_required,
            "binding_api": api.name(),
            "proxy_contacted": false,
            "bindings": bindings,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        let state = match (outcome.modified, outcome.reload_required) {
            (false, _) => "unchanged",
            (true, true) => "modified, reload required",
            (true, false) => "modified, no binding registered",
        };
        println!(
            "reconcile: {state} ({} API, no proxy contacted)",
            api.name()
        );
        for (index, binding) in bindings.iter().enumerate() {
            println!("  [{index}] {} -> {}", binding.code, binding.path.display());
        }
    }
    Ok(EXIT_SUCCESS)
}
