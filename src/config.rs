//! Recognized configuration options (spec §6). The loader and property-UI
//! around this struct are out of scope (spec §1); this is the read-only bag
//! the core consumes, shaped so it can be deserialized from the connector
//! framework's own config format.
use crate::acl::{AclFormat, SecurityLevel};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// SMB credential triple. Shared per-connector, immutable after startup
/// (spec §3 Credentials, §5 "read-only after startup").
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub domain: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Recognized configuration keys from spec §6, one field per row.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSystemConfig {
    pub start_paths: Vec<String>,
    pub push_acls: bool,
    pub mark_all_documents_public: bool,
    pub supports_inherited_acls: bool,
    pub ace_security_level: SecurityLevel,
    pub user_acl_format: AclFormat,
    pub group_acl_format: AclFormat,
    pub last_access_reset_flag_for_smb: bool,
    pub last_access_reset_flag_for_local_windows: bool,
    pub if_modified_since_cushion_minutes: i64,
    pub full_traversal_interval_days: i64,
    pub thread_pool_size: usize,
    pub use_authz_on_acl_error: bool,
    pub credentials: Credentials,
    /// Per-connector include/exclude patterns shared across all start paths
    /// (spec §4.3, §8). Not in the spec's own config key table, but the
    /// matcher needs to be configured from somewhere; modeled the way the
    /// original source's per-connector pattern lists work.
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
}

impl Default for FileSystemConfig {
    fn default() -> Self {
        Self {
            start_paths: Vec::new(),
            push_acls: false,
            mark_all_documents_public: false,
            supports_inherited_acls: false,
            ace_security_level: SecurityLevel::FileOrShare,
            user_acl_format: AclFormat::User,
            group_acl_format: AclFormat::Group,
            last_access_reset_flag_for_smb: true,
            last_access_reset_flag_for_local_windows: true,
            // spec §4.7: "default 1 hour"
            if_modified_since_cushion_minutes: 60,
            // spec §6: "<0 always incremental"
            full_traversal_interval_days: -1,
            // spec §4.8: "default 10"
            thread_pool_size: 10,
            use_authz_on_acl_error: false,
            credentials: Credentials::default(),
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }
}

impl FileSystemConfig {
    /// Validates the mutual-exclusivity and non-emptiness invariants spec §6
    /// implies but doesn't spell out as an error path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start_paths.is_empty() {
            return Err(ConfigError::NoStartPaths);
        }
        if self.push_acls && self.mark_all_documents_public {
            return Err(ConfigError::ConflictingAclMode);
        }
        Ok(())
    }

    #[must_use]
    pub fn if_modified_since_cushion(&self) -> Duration {
        Duration::from_secs((self.if_modified_since_cushion_minutes.max(0) as u64) * 60)
    }

    #[must_use]
    pub fn full_traversal_interval(&self) -> Option<Duration> {
        if self.full_traversal_interval_days < 0 {
            None
        } else {
            Some(Duration::from_secs(
                (self.full_traversal_interval_days as u64) * 24 * 60 * 60,
            ))
        }
    }

    /// Loads a config from YAML, the format the demo binary and tests use.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// Include patterns to build the matcher from. An empty configured list
    /// defaults to "include everything" (an empty literal prefix matches
    /// every path) rather than "include nothing".
    #[must_use]
    pub fn effective_include_patterns(&self) -> Vec<String> {
        if self.include_patterns.is_empty() {
            vec![String::new()]
        } else {
            self.include_patterns.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_start_paths() {
        let cfg = FileSystemConfig::default();
        assert!(matches!(cfg.validate(), Err(ConfigError::NoStartPaths)));
    }

    #[test]
    fn rejects_conflicting_acl_modes() {
        let mut cfg = FileSystemConfig::default();
        cfg.start_paths.push("/tmp".into());
        cfg.push_acls = true;
        cfg.mark_all_documents_public = true;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ConflictingAclMode)
        ));
    }

    #[test]
    fn full_traversal_interval_negative_is_never() {
        let mut cfg = FileSystemConfig::default();
        cfg.full_traversal_interval_days = -1;
        assert_eq!(cfg.full_traversal_interval(), None);
    }

    #[test]
    fn loads_from_yaml() {
        let yaml = "start_paths:\n  - /data\npush_acls: true\nthread_pool_size: 4\n";
        let cfg = FileSystemConfig::from_yaml(yaml).unwrap();
        assert_eq!(cfg.start_paths, vec!["/data".to_string()]);
        assert!(cfg.push_acls);
        assert_eq!(cfg.thread_pool_size, 4);
    }
}
