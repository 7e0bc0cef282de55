use crate::error::{Error, Result};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

/// Permission verbs granted to an item's creator and accepted by edits.
pub const DEFAULT_PERMISSIONS: [&str; 5] = ["create", "read", "update", "delete", "grant"];

/// Permission verb wrapper (`read`, `update`, ...).
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Permission(String);

impl Permission {
    /// Parses a permission verb.
    ///
    /// This trims whitespace and normalizes to lowercase. Whether the verb is
    /// actually grantable is decided by a [`PermissionValidator`].
    pub fn new(value: impl AsRef<str>) -> Result<Self> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidEditAction(
                "permission must not be empty".to_string(),
            ));
        }
        let normalized = trimmed.to_ascii_lowercase();
        if !normalized
            .chars()
            .all(|ch| matches!(ch, 'a'..='z' | '0'..='9' | '_' | '-'))
        {
            return Err(Error::InvalidEditAction(format!(
                "invalid perm '{trimmed}'"
            )));
        }
        Ok(Self(normalized))
    }

    /// Creates a permission from a trusted string without validation.
    pub fn from_string(value: String) -> Self {
        Self(value)
    }

    /// Returns the underlying string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Permission {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Permission {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Permission {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<String> for Permission {
    fn from(value: String) -> Self {
        Self::from_string(value)
    }
}

/// Decides which permission verbs may be written into the rule set.
pub trait PermissionValidator: Send + Sync {
    /// Validates a normalized permission.
    fn validate(&self, perm: &Permission) -> Result<()>;
}

/// Whitelist validator over [`DEFAULT_PERMISSIONS`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPermissionValidator;

impl PermissionValidator for DefaultPermissionValidator {
    fn validate(&self, perm: &Permission) -> Result<()> {
        if DEFAULT_PERMISSIONS.contains(&perm.as_str()) {
            Ok(())
        } else {
            Err(Error::InvalidEditAction(format!("invalid perm '{perm}'")))
        }
    }
}

/// Direction of a grant edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    /// Grant the permissions.
    Add,
    /// Revoke the permissions.
    Remove,
}

impl FromStr for EditAction {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "add" => Ok(Self::Add),
            "remove" => Ok(Self::Remove),
            other => Err(Error::InvalidEditAction(format!(
                "invalid edit perm action '{other}'"
            ))),
        }
    }
}
