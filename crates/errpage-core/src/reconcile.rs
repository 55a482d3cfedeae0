use crate::binding::{BindingApi, ErrorFileBinding};
use crate::concurrency::PassLock;
use crate::config::ReconcilerConfig;
use crate::CoreError;
use errpage_schema::{DesiredEntry, DesiredState, Directive, StatusCode, SupportedCodeSet};
use errpage_store::{ErrorFileStore, OrphanPruner, StoreLayout};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, error, info, warn};

/// Result of one reconciliation pass.
///
/// `reload_required` implies `modified`: it is only set when a file mutation
/// happened and at least one binding was then registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationOutcome {
    pub modified: bool,
    pub reload_required: bool,
}

/// Accumulated state of a single pass. Never outlives `reconcile`.
#[derive(Debug, Default)]
struct Pass {
    active: Vec<StatusCode>,
    modified: bool,
}

/// Converges the error-file store and the proxy's default error-file
/// bindings onto a desired state.
pub struct Reconciler {
    store: ErrorFileStore,
    supported: SupportedCodeSet,
    prune_orphans: bool,
}

impl Reconciler {
    pub fn new(config: &ReconcilerConfig) -> Self {
        let layout = StoreLayout::new(&config.store_dir);
        Self {
            store: ErrorFileStore::new(layout).with_file_mode(config.file_mode),
            supported: config.supported_set(),
            prune_orphans: config.prune_orphans,
        }
    }

    #[inline]
    pub fn store(&self) -> &ErrorFileStore {
        &self.store
    }

    /// Run a pass only when a desired state exists at all.
    ///
    /// `None` means the error-file configuration source is absent; nothing is
    /// touched, not even orphans.
    pub fn reconcile_if_present(
        &self,
        lock: &PassLock,
        desired: Option<&DesiredState>,
        api: &dyn BindingApi,
    ) -> Result<ReconciliationOutcome, CoreError> {
        match desired {
            Some(desired) => self.reconcile(lock, desired, api),
            None => {
                debug!("no error-file desired state; skipping pass");
                Ok(ReconciliationOutcome::default())
            }
        }
    }

    /// Run one reconciliation pass.
    ///
    /// Per-code validation, storage, and binding failures are logged and do
    /// not abort the pass. Only a violated caller contract (an add or modify
    /// without content) or an unusable store directory is returned as an error,
    /// and both are detected before anything is mutated.
    pub fn reconcile(
        &self,
        _lock: &PassLock,
        desired: &DesiredState,
        api: &dyn BindingApi,
    ) -> Result<ReconciliationOutcome, CoreError> {
        check_content_present(desired)?;
        self.store.layout().initialize()?;

        let entries = parse_codes(desired);
        let mut pass = Pass::default();

        for (&code, entry) in &entries {
            self.apply(code, entry, &mut pass);
        }

        let wanted: BTreeSet<StatusCode> = entries.keys().copied().collect();
        self.handle_orphans(&wanted, &mut pass);

        if !pass.modified {
            debug!("error files unchanged; bindings left as they are");
            return Ok(ReconciliationOutcome::default());
        }

        let reload_required = self.synchronize(&pass.active, api);
        info!(
            "error files reconciled: {} active, reload {}",
            pass.active.len(),
            if reload_required { "required" } else { "not required" }
        );
        Ok(ReconciliationOutcome {
            modified: true,
            reload_required,
        })
    }

    fn apply(&self, code: StatusCode, entry: &DesiredEntry, pass: &mut Pass) {
        match entry.directive {
            Directive::NoChange => {
                if !self.store.exists(code) {
                    warn!("error file for {code} is unchanged but missing from the store");
                }
                pass.active.push(code);
            }
            Directive::Deleted => {
                debug!("deleting error file for {code}");
                match self.store.remove(code) {
                    Ok(_) => pass.modified = true,
                    Err(e) if e.is_not_found() => {
                        debug!("error file for {code} already absent");
                    }
                    Err(e) => {
                        error!(
                            "failed deleting '{}': {e}",
                            self.store.path(code).display()
                        );
                    }
                }
            }
            Directive::Added | Directive::Modified => {
                if !self.supported.contains(code) {
                    error!("HTTP error code '{code}' not supported");
                    return;
                }
                // Presence was checked up front.
                let Some(content) = entry.content.as_deref() else {
                    return;
                };
                debug!("setting error file for {code}");
                match self.store.write(code, content) {
                    Ok(_) => {
                        pass.modified = true;
                        pass.active.push(code);
                    }
                    Err(e) => {
                        error!(
                            "failed writing error file '{}': {e}",
                            self.store.path(code).display()
                        );
                    }
                }
            }
        }
    }

    fn handle_orphans(&self, wanted: &BTreeSet<StatusCode>, pass: &mut Pass) {
        let pruner = OrphanPruner::new(self.store.layout().clone());

        if !self.prune_orphans {
            match pruner.find(wanted) {
                Ok(orphans) if !orphans.is_empty() => {
                    warn!(
                        "retaining {} error files absent from desired state: {}",
                        orphans.len(),
                        join_codes(&orphans)
                    );
                }
                Ok(_) => {}
                Err(e) => error!("failed listing error files: {e}"),
            }
            return;
        }

        match pruner.prune(wanted, false) {
            Ok(report) => {
                if !report.removed.is_empty() {
                    info!("pruned orphaned error files: {}", join_codes(&report.removed));
                    pass.modified = true;
                }
            }
            Err(e) => error!("failed listing error files for pruning: {e}"),
        }
    }

    /// Clear the proxy's bindings and register every active code at its
    /// position. Returns whether any registration succeeded.
    fn synchronize(&self, active: &[StatusCode], api: &dyn BindingApi) -> bool {
        if let Err(e) = api.clear_default_error_bindings() {
            error!("failed clearing default error files via {}: {e}", api.name());
        }

        let mut reload = false;
        for (index, &code) in active.iter().enumerate() {
            let binding = ErrorFileBinding::new(code, self.store.path(code));
            match api.set_default_error_binding(&binding, index) {
                Ok(()) => reload = true,
                Err(e) => error!(
                    "failed binding error file {} at index {index}: {e}",
                    binding.path.display()
                ),
            }
        }
        reload
    }
}

fn check_content_present(desired: &DesiredState) -> Result<(), CoreError> {
    for (code, entry) in desired.iter() {
        if entry.directive.writes_file() && entry.content.is_none() {
            return Err(CoreError::MissingContent {
                code: code.to_owned(),
                directive: entry.directive,
            });
        }
    }
    Ok(())
}

fn join_codes(codes: &[StatusCode]) -> String {
    codes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Keys in numeric order. Keys that are not canonical status codes are
/// reported and dropped whatever their directive, since they could never name
/// a store file safely.
fn parse_codes(desired: &DesiredState) -> BTreeMap<StatusCode, &DesiredEntry> {
    let mut entries = BTreeMap::new();
    for (raw, entry) in desired.iter() {
        match StatusCode::parse(raw) {
            Ok(code) => {
                entries.insert(code, entry);
            }
            Err(e) => error!("skipping {} entry: {e}", entry.directive),
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{BindingCall, RecordingBindingApi};

    fn setup(prune: bool) -> (tempfile::TempDir, Reconciler, PassLock) {
        let dir = tempfile::tempdir().unwrap();
        let config = ReconcilerConfig::new(dir.path()).with_prune_orphans(prune);
        let reconciler = Reconciler::new(&config);
        let lock = PassLock::acquire(reconciler.store().layout()).unwrap();
        (dir, reconciler, lock)
    }

    fn code(s: &str) -> StatusCode {
        StatusCode::parse(s).unwrap()
    }

    #[test]
    fn empty_desired_state_is_a_no_op() {
        let (_dir, r, lock) = setup(true);
        let api = RecordingBindingApi::new();
        let outcome = r.reconcile(&lock, &DesiredState::new(), &api).unwrap();
        assert_eq!(outcome, ReconciliationOutcome::default());
        assert!(api.calls().is_empty());
    }

    #[test]
    fn absent_desired_state_touches_nothing() {
        let (_dir, r, lock) = setup(true);
        r.store().write(code("404"), b"old").unwrap();
        let api = RecordingBindingApi::new();
        let outcome = r.reconcile_if_present(&lock, None, &api).unwrap();
        assert_eq!(outcome, ReconciliationOutcome::default());
        assert!(r.store().exists(code("404")));
        assert!(api.calls().is_empty());
    }

    #[test]
    fn active_list_is_numerically_ordered() {
        let (_dir, r, lock) = setup(true);
        let desired = DesiredState::new()
            .with("503", DesiredEntry::added("c"))
            .with("404", DesiredEntry::added("b"))
            .with("200", DesiredEntry::added("a"));
        let api = RecordingBindingApi::new();
        r.reconcile(&lock, &desired, &api).unwrap();

        let calls = api.calls();
        assert_eq!(calls[0], BindingCall::Clear);
        let indexed: Vec<(usize, u16)> = calls[1..]
            .iter()
            .map(|c| match c {
                BindingCall::Set { index, binding } => (*index, binding.code.as_u16()),
                BindingCall::Clear => panic!("unexpected second clear"),
            })
            .collect();
        assert_eq!(indexed, vec![(0, 200), (1, 404), (2, 503)]);
    }

    #[test]
    fn missing_content_aborts_before_mutation() {
        let (_dir, r, lock) = setup(true);
        r.store().write(code("500"), b"old").unwrap();
        let desired = DesiredState::new()
            .with("500", DesiredEntry::deleted())
            .with(
                "404",
                DesiredEntry {
                    directive: Directive::Added,
                    content: None,
                },
            );
        let api = RecordingBindingApi::new();
        let err = r.reconcile(&lock, &desired, &api).unwrap_err();
        assert!(matches!(err, CoreError::MissingContent { .. }));
        assert!(r.store().exists(code("500")));
        assert!(api.calls().is_empty());
    }

    #[test]
    fn malformed_key_is_skipped_for_every_directive() {
        let (dir, r, lock) = setup(false);
        let desired = DesiredState::new()
            .with("0404", DesiredEntry::added("x"))
            .with(" 500", DesiredEntry::unchanged())
            .with("../503", DesiredEntry::deleted());
        let api = RecordingBindingApi::new();
        let outcome = r.reconcile(&lock, &desired, &api).unwrap();
        assert_eq!(outcome, ReconciliationOutcome::default());
        assert!(!dir.path().join("0404").exists());
        assert!(!dir.path().join("404").exists());
    }

    #[test]
    fn delete_of_absent_file_is_not_a_mutation() {
        let (_dir, r, lock) = setup(true);
        let desired = DesiredState::new().with("500", DesiredEntry::deleted());
        let api = RecordingBindingApi::new();
        let outcome = r.reconcile(&lock, &desired, &api).unwrap();
        assert!(!outcome.modified);
    }

    #[test]
    fn clear_failure_does_not_stop_registration() {
        let (_dir, r, lock) = setup(true);
        let desired = DesiredState::new().with("404", DesiredEntry::added("x"));
        let api = RecordingBindingApi::new().failing_clear();
        let outcome = r.reconcile(&lock, &desired, &api).unwrap();
        assert!(outcome.reload_required);
        assert_eq!(api.bound_codes(), vec![code("404")]);
    }

    #[test]
    fn unchanged_codes_are_rebound_after_a_mutation() {
        let (_dir, r, lock) = setup(true);
        r.store().write(code("503"), b"kept").unwrap();
        let desired = DesiredState::new()
            .with("503", DesiredEntry::unchanged())
            .with("404", DesiredEntry::added("new"));
        let api = RecordingBindingApi::new();
        let outcome = r.reconcile(&lock, &desired, &api).unwrap();
        assert!(outcome.modified && outcome.reload_required);
        assert_eq!(api.bound_codes(), vec![code("404"), code("503")]);
    }

    #[test]
    fn binding_paths_point_into_store() {
        let (dir, r, lock) = setup(true);
        let desired = DesiredState::new().with("404", DesiredEntry::added("x"));
        let api = RecordingBindingApi::new();
        r.reconcile(&lock, &desired, &api).unwrap();
        assert_eq!(api.bindings()[0].path, dir.path().join("404"));
    }
}
