//! Reconciliation engine for custom HTTP error pages.
//!
//! This crate ties the schema and the store together with the proxy's control
//! API: the `Reconciler` classifies each desired entry, applies it to the
//! `ErrorFileStore`, and, when anything changed, rebuilds the proxy's ordered
//! default error-file bindings through a `BindingApi`. It also provides the
//! `PassLock` used to serialize passes and the TOML `ReconcilerConfig`.

pub mod binding;
pub mod concurrency;
pub mod config;
pub mod reconcile;
pub mod recording;

pub use binding::{BindingApi, BindingError, ErrorFileBinding};
pub use concurrency::PassLock;
pub use config::ReconcilerConfig;
pub use reconcile::{ReconciliationOutcome, Reconciler};
pub use recording::{BindingCall, RecordingBindingApi};

use errpage_schema::Directive;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("store error: {0}")]
    Store(#[from] errpage_store::StoreError),
    #[error("config error: {0}")]
    Config(String),
    #[error("pass lock error: {0}")]
    Lock(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("desired state for code '{code}' is {directive} but carries no content")]
    MissingContent { code: String, directive: Directive },
}
