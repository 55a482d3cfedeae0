use crate::CoreError;
use errpage_schema::{StatusCode, SupportedCodeSet};
use errpage_store::DEFAULT_FILE_MODE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Reconciler settings, usually read from a TOML file:
///
/// ```toml
/// store_dir = "/etc/haproxy/errors"
/// supported_codes = ["404", "500", "503"]
/// prune_orphans = true
/// file_mode = 0o644
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconcilerConfig {
    pub store_dir: PathBuf,
    #[serde(default = "default_supported_codes")]
    pub supported_codes: Vec<StatusCode>,
    #[serde(default = "default_prune_orphans")]
    pub prune_orphans: bool,
    #[serde(default = "default_file_mode")]
    pub file_mode: u32,
}

impl ReconcilerConfig {
    pub fn new(store_dir: impl Into<PathBuf>) -> Self {
        Self {
            store_dir: store_dir.into(),
            supported_codes: default_supported_codes(),
            prune_orphans: default_prune_orphans(),
            file_mode: default_file_mode(),
        }
    }

    #[must_use]
    pub fn with_prune_orphans(mut self, prune: bool) -> Self {
        self.prune_orphans = prune;
        self
    }

    #[must_use]
    pub fn with_supported_codes(mut self, codes: impl IntoIterator<Item = StatusCode>) -> Self {
        self.supported_codes = codes.into_iter().collect();
        self
    }

    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let config: Self = toml::from_str(input)
            .map_err(|e| CoreError::Config(format!("invalid reconciler config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.store_dir.as_os_str().is_empty() {
            return Err(CoreError::Config("store_dir must not be empty".to_owned()));
        }
        if self.file_mode > 0o7777 {
            return Err(CoreError::Config(format!(
                "file_mode {:o} is not a permission mask",
                self.file_mode
            )));
        }
        Ok(())
    }

    pub fn supported_set(&self) -> SupportedCodeSet {
        SupportedCodeSet::new(self.supported_codes.iter().copied())
    }
}

fn default_supported_codes() -> Vec<StatusCode> {
    SupportedCodeSet::default().iter().collect()
}

fn default_prune_orphans() -> bool {
    true
}

fn default_file_mode() -> u32 {
    DEFAULT_FILE_MODE
}

#[cfg(test)]
mod tests {
    use super::*;
    use errpage_schema::DEFAULT_SUPPORTED_CODES;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = ReconcilerConfig::parse(r#"store_dir = "/etc/haproxy/errors""#).unwrap();
        assert_eq!(config.store_dir, PathBuf::from("/etc/haproxy/errors"));
        assert_eq!(config.supported_codes.len(), DEFAULT_SUPPORTED_CODES.len());
        assert!(config.prune_orphans);
        assert_eq!(config.file_mode, 0o644);
    }

    #[test]
    fn full_config() {
        let config = ReconcilerConfig::parse(
            r#"
store_dir = "/srv/errors"
supported_codes = ["503", "404"]
prune_orphans = false
file_mode = 0o600
"#,
        )
        .unwrap();
        assert!(!config.prune_orphans);
        assert_eq!(config.file_mode, 0o600);
        let set = config.supported_set();
        assert_eq!(set.len(), 2);
        assert!(set.contains(StatusCode::parse("404").unwrap()));
    }

    #[test]
    fn malformed_supported_code_is_rejected() {
        let result = ReconcilerConfig::parse(
            r#"
store_dir = "/srv/errors"
supported_codes = ["404", " 500"]
"#,
        );
        assert!(matches!(result, Err(CoreError::Config(_))));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let result = ReconcilerConfig::parse(
            r#"
store_dir = "/srv/errors"
reload = true
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn empty_store_dir_is_rejected() {
        assert!(ReconcilerConfig::parse(r#"store_dir = """#).is_err());
    }

    #[test]
    fn oversized_file_mode_is_rejected() {
        let result = ReconcilerConfig::parse(
            r#"
store_dir = "/srv/errors"
file_mode = 65536
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("errpage.toml");
        std::fs::write(&path, "store_dir = \"/srv/errors\"\nprune_orphans = false\n").unwrap();
        let config = ReconcilerConfig::load(&path).unwrap();
        assert!(!config.prune_orphans);
    }

    #[test]
    fn builder_overrides() {
        let config = ReconcilerConfig::new("/srv/errors")
            .with_prune_orphans(false)
            .with_supported_codes([StatusCode::parse("404").unwrap()]);
        assert!(!config.prune_orphans);
        assert_eq!(config.supported_set().len(), 1);
    }
}
