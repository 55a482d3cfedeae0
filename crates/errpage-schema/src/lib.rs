//! Status codes, directives, and desired-state documents for errpage.
//!
//! This crate defines the schema layer: the strictly parsed `StatusCode`
//! newtype, the `SupportedCodeSet` allow-list of customizable statuses, the
//! per-code `Directive` and `DesiredEntry` types, and the `DesiredState` map a
//! reconciliation pass consumes, including its TOML document form.

pub mod code;
pub mod desired;

pub use code::{StatusCode, SupportedCodeSet, DEFAULT_SUPPORTED_CODES};
pub use desired::{
    parse_desired_file, parse_desired_str, DesiredEntry, DesiredState, Directive,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid status code '{0}': expected three digits without padding or sign")]
    InvalidCode(String),
    #[error("failed to read desired state: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse desired state: {0}")]
    ParseToml(#[from] toml::de::Error),
}
