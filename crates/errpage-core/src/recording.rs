use crate::binding::{BindingApi, BindingError, ErrorFileBinding};
use errpage_schema::StatusCode;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

/// One call received by a [`RecordingBindingApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingCall {
    Clear,
    Set {
        index: usize,
        binding: ErrorFileBinding,
    },
}

#[derive(Default)]
struct RecordingState {
    bindings: BTreeMap<usize, ErrorFileBinding>,
    calls: Vec<BindingCall>,
    fail_clear: bool,
    fail_all: bool,
    failing_codes: HashSet<StatusCode>,
}

/// In-memory stand-in for the proxy control API.
///
/// Keeps the binding table the proxy would hold, logs every call in order,
/// and can be told to reject the clear call, specific codes, or everything.
#[derive(Default)]
pub struct RecordingBindingApi {
    state: Mutex<RecordingState>,
}

impl RecordingBindingApi {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failing_clear(self) -> Self {
        self.with_state(|s| s.fail_clear = true);
        self
    }

    #[must_use]
    pub fn failing_code(self, code: StatusCode) -> Self {
        self.with_state(|s| {
            s.failing_codes.insert(code);
        });
        self
    }

    #[must_use]
    pub fn failing_all(self) -> Self {
        self.with_state(|s| s.fail_all = true);
        self
    }

    /// Current binding table in index order.
    pub fn bindings(&self) -> Vec<ErrorFileBinding> {
        self.with_state(|s| s.bindings.values().cloned().collect())
    }

    pub fn bound_codes(&self) -> Vec<StatusCode> {
        self.with_state(|s| s.bindings.values().map(|b| b.code).collect())
    }

    pub fn calls(&self) -> Vec<BindingCall> {
        self.with_state(|s| s.calls.clone())
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut RecordingState) -> T) -> T {
        // Recorded data stays valid even if a holder panicked.
        let mut guard = match self.state.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

impl BindingApi for RecordingBindingApi {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn clear_default_error_bindings(&self) -> Result<(), BindingError> {
        self.with_state(|s| {
            s.calls.push(BindingCall::Clear);
            if s.fail_clear || s.fail_all {
                return Err(BindingError::Transport("clear rejected".to_owned()));
            }
            s.bindings.clear();
            Ok(())
        })
    }

    fn set_default_error_binding(
        &self,
        binding: &ErrorFileBinding,
        index: usize,
    ) -> Result<(), BindingError> {
        self.with_state(|s| {
            s.calls.push(BindingCall::Set {
                index,
                binding: binding.clone(),
            });
            if s.fail_all || s.failing_codes.contains(&binding.code) {
                return Err(BindingError::Rejected(format!(
                    "errorfile {} at index {index}",
                    binding.code
                )));
            }
            s.bindings.insert(index, binding.clone());
            Ok(())
        })
    }
}
