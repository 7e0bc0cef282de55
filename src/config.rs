//! ACL configuration.

use crate::error::{Error, Result};
use crate::gate::GateScope;
use std::env;
use std::path::{Path, PathBuf};

/// Superuser added to every assembled ACL entry.
pub const DEFAULT_SUPERUSER: &str = "pivotal";

/// Process-level ACL configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclConfig {
    policy_root: PathBuf,
    superuser: String,
    gate_scope: GateScope,
}

impl AclConfig {
    /// Creates a configuration storing policy files under `policy_root`.
    pub fn new(policy_root: impl Into<PathBuf>) -> Self {
        Self {
            policy_root: policy_root.into(),
            superuser: DEFAULT_SUPERUSER.to_string(),
            gate_scope: GateScope::default(),
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// `ACL_POLICY_ROOT` is required; `ACL_SUPERUSER` and `ACL_GATE_SCOPE`
    /// (`process` or `organization`) are optional.
    pub fn from_env() -> Result<Self> {
        let root = env::var("ACL_POLICY_ROOT")
            .map_err(|_| Error::InvalidId("ACL_POLICY_ROOT must be set".to_string()))?;
        let mut config = Self::new(root);
        if let Ok(superuser) = env::var("ACL_SUPERUSER") {
            config = config.superuser(superuser);
        }
        if let Ok(scope) = env::var("ACL_GATE_SCOPE") {
            config = config.gate_scope(parse_gate_scope(&scope)?);
        }
        Ok(config)
    }

    /// Sets the superuser name.
    pub fn superuser(mut self, name: impl Into<String>) -> Self {
        self.superuser = name.into();
        self
    }

    /// Sets the gate sharing.
    pub fn gate_scope(mut self, scope: GateScope) -> Self {
        self.gate_scope = scope;
        self
    }

    pub fn policy_root_path(&self) -> &Path {
        &self.policy_root
    }

    pub fn superuser_name(&self) -> &str {
        &self.superuser
    }

    pub fn gate(&self) -> GateScope {
        self.gate_scope
    }
}

fn parse_gate_scope(value: &str) -> Result<GateScope> {
    match value.trim().to_ascii_lowercase().as_str() {
        "process" => Ok(GateScope::Process),
        "organization" | "org" => Ok(GateScope::Organization),
        other => Err(Error::InvalidId(format!("unknown gate scope '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_should_match_single_process_deployment() {
        let config = AclConfig::new("/tmp/acl");
        assert_eq!(config.superuser_name(), "pivotal");
        assert_eq!(config.gate(), GateScope::Process);
    }

    #[test]
    fn gate_scope_should_parse_case_insensitively() {
        assert_eq!(parse_gate_scope("Organization").unwrap(), GateScope::Organization);
        assert_eq!(parse_gate_scope("process").unwrap(), GateScope::Process);
        assert!(parse_gate_scope("cluster").is_err());
    }
}
