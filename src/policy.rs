//! Policy tuple model.
//!
//! A rule is the 6-tuple `subject, subkind, kind, name, perm, effect`. The
//! sentinel strings of the on-disk format (`role##`, `denyall##groups`,
//! `$$default$$`) only exist in [`PolicyRule::to_fields`] and
//! [`PolicyRule::from_fields`]; everywhere else they are tagged variants.

use crate::error::{Error, Result};
use crate::model::{CONTAINERS, Item};
use crate::permission::Permission;
use std::borrow::Cow;
use std::fmt;

const ROLE_PREFIX: &str = "role##";
const DENY_ALL_GROUPS: &str = "denyall##groups";
const DEFAULT_TARGET: &str = "$$default$$";

/// Number of fields in a serialized rule.
pub const RULE_FIELDS: usize = 6;

/// Grant subject.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Subject {
    /// A user or client, by name.
    Actor(String),
    /// Membership in a group, by group name.
    Role(String),
    /// Deny-override marker on group items.
    DenyAllGroups,
}

impl Subject {
    /// Parses the serialized form.
    pub fn parse(value: &str) -> Self {
        if value == DENY_ALL_GROUPS {
            Self::DenyAllGroups
        } else if let Some(group) = value.strip_prefix(ROLE_PREFIX) {
            Self::Role(group.to_string())
        } else {
            Self::Actor(value.to_string())
        }
    }

    /// Returns the serialized form.
    pub fn acl_name(&self) -> Cow<'_, str> {
        match self {
            Self::Actor(name) => Cow::Borrowed(name),
            Self::Role(group) => Cow::Owned(format!("{ROLE_PREFIX}{group}")),
            Self::DenyAllGroups => Cow::Borrowed(DENY_ALL_GROUPS),
        }
    }

    /// Returns the bare actor or group name.
    pub fn name(&self) -> &str {
        match self {
            Self::Actor(name) | Self::Role(name) => name,
            Self::DenyAllGroups => DENY_ALL_GROUPS,
        }
    }

    /// Same variant, different name. The sentinel is returned unchanged.
    pub fn renamed(&self, name: &str) -> Self {
        match self {
            Self::Actor(_) => Self::Actor(name.to_string()),
            Self::Role(_) => Self::Role(name.to_string()),
            Self::DenyAllGroups => Self::DenyAllGroups,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.acl_name())
    }
}

/// Rule name field: a concrete item, or the type-wide default.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum RuleTarget {
    /// A named item.
    Named(String),
    /// The general rule for every item of a (kind, subkind).
    Default,
}

impl RuleTarget {
    /// Parses the serialized form.
    pub fn parse(value: &str) -> Self {
        if value == DEFAULT_TARGET {
            Self::Default
        } else {
            Self::Named(value.to_string())
        }
    }

    /// Returns the serialized form.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::Default => DEFAULT_TARGET,
        }
    }
}

/// Rule effect.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    /// Grants the permission.
    Allow,
    /// Vetoes the permission.
    Deny,
}

impl Effect {
    /// Returns the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }

    /// Parses the serialized form.
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "allow" => Ok(Self::Allow),
            "deny" => Ok(Self::Deny),
            other => Err(Error::InvalidId(format!("unknown effect '{other}'"))),
        }
    }
}

/// Field positions used by filtered queries.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PolicyField {
    Subject = 0,
    Subkind = 1,
    Kind = 2,
    Name = 3,
    Perm = 4,
    Effect = 5,
}

/// A single policy rule.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct PolicyRule {
    pub subject: Subject,
    pub subkind: String,
    pub kind: String,
    pub name: RuleTarget,
    pub perm: Permission,
    pub effect: Effect,
}

impl PolicyRule {
    /// Builds the item-specific allow rule for `subject` on `item`.
    pub fn for_item(subject: Subject, item: &dyn Item, perm: Permission) -> Self {
        Self {
            subject,
            subkind: item.container_type().to_string(),
            kind: item.container_kind().to_string(),
            name: RuleTarget::Named(item.item_name().to_string()),
            perm,
            effect: Effect::Allow,
        }
    }

    /// Returns the type-wide default counterpart of this rule.
    ///
    /// Containers are keyed by their own name: the general rule for the
    /// `nodes` container is the general rule for every node.
    pub fn general(&self) -> Self {
        let subkind = general_subkind(&self.kind, &self.subkind, self.name.as_str()).to_string();
        Self {
            subkind,
            name: RuleTarget::Default,
            ..self.clone()
        }
    }

    /// Returns a copy with a different subject.
    pub fn with_subject(&self, subject: Subject) -> Self {
        Self {
            subject,
            ..self.clone()
        }
    }

    /// Returns a copy with a different name.
    pub fn with_name(&self, name: &str) -> Self {
        Self {
            name: RuleTarget::Named(name.to_string()),
            ..self.clone()
        }
    }

    /// Returns the serialized value of one field.
    pub fn field(&self, field: PolicyField) -> Cow<'_, str> {
        match field {
            PolicyField::Subject => self.subject.acl_name(),
            PolicyField::Subkind => Cow::Borrowed(&self.subkind),
            PolicyField::Kind => Cow::Borrowed(&self.kind),
            PolicyField::Name => Cow::Borrowed(self.name.as_str()),
            PolicyField::Perm => Cow::Borrowed(self.perm.as_str()),
            PolicyField::Effect => Cow::Borrowed(self.effect.as_str()),
        }
    }

    /// Returns whether the rule addresses the given item (ignoring subject and perm).
    pub fn targets(&self, kind: &str, subkind: &str, name: &RuleTarget) -> bool {
        self.kind == kind && self.subkind == subkind && &self.name == name
    }

    /// Serializes into on-disk field order.
    pub fn to_fields(&self) -> [String; RULE_FIELDS] {
        [
            self.subject.acl_name().into_owned(),
            self.subkind.clone(),
            self.kind.clone(),
            self.name.as_str().to_string(),
            self.perm.as_str().to_string(),
            self.effect.as_str().to_string(),
        ]
    }

    /// Parses on-disk fields.
    pub fn from_fields(fields: &[&str]) -> Result<Self> {
        let [subject, subkind, kind, name, perm, effect] = fields else {
            return Err(Error::InvalidId(format!(
                "policy rule needs {RULE_FIELDS} fields, got {}",
                fields.len()
            )));
        };
        if [subject, subkind, kind, name, perm]
            .iter()
            .any(|field| field.is_empty())
        {
            return Err(Error::InvalidId(
                "policy rule has an empty field".to_string(),
            ));
        }
        Ok(Self {
            subject: Subject::parse(subject),
            subkind: subkind.to_string(),
            kind: kind.to_string(),
            name: RuleTarget::parse(name),
            perm: Permission::from_string(perm.to_string()),
            effect: Effect::parse(effect)?,
        })
    }
}

impl fmt::Display for PolicyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_fields().join(", "))
    }
}

/// Subkind of the general rules governing an item.
pub fn general_subkind<'a>(kind: &str, subkind: &'a str, name: &'a str) -> &'a str {
    if kind == CONTAINERS && subkind == CONTAINERS {
        name
    } else {
        subkind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_should_parse_sentinels() {
        assert_eq!(Subject::parse("denyall##groups"), Subject::DenyAllGroups);
        assert_eq!(
            Subject::parse("role##admins"),
            Subject::Role("admins".to_string())
        );
        assert_eq!(
            Subject::parse("alice"),
            Subject::Actor("alice".to_string())
        );
        assert_eq!(Subject::Role("ops".to_string()).acl_name(), "role##ops");
    }

    #[test]
    fn general_should_key_containers_by_name() {
        let rule = PolicyRule::from_fields(&[
            "alice",
            "containers",
            "containers",
            "nodes",
            "read",
            "allow",
        ])
        .unwrap();
        let general = rule.general();
        assert_eq!(general.subkind, "nodes");
        assert_eq!(general.name, RuleTarget::Default);

        let node = PolicyRule::from_fields(&["alice", "nodes", "containers", "node1", "read", "allow"])
            .unwrap();
        let general = node.general();
        assert_eq!(general.subkind, "nodes");
        assert_eq!(general.field(PolicyField::Name), "$$default$$");
    }

    #[test]
    fn from_fields_should_reject_short_rows() {
        let err = PolicyRule::from_fields(&["alice", "nodes", "containers"]).unwrap_err();
        assert!(err.to_string().contains("6 fields"));
    }

    #[test]
    fn from_fields_should_reject_unknown_effect() {
        let err = PolicyRule::from_fields(&["alice", "nodes", "containers", "n1", "read", "maybe"])
            .unwrap_err();
        assert!(err.to_string().contains("unknown effect"));
    }
}
