use crate::error::{Error, Result};
use crate::permission::Permission;
use crate::policy::{Effect, PolicyRule, Subject};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// Grant set of one permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AclEntry {
    #[serde(skip)]
    pub perm: Permission,
    #[serde(skip)]
    pub effect: Effect,
    pub actors: Vec<String>,
    pub groups: Vec<String>,
}

impl AclEntry {
    fn new(perm: Permission, effect: Effect) -> Self {
        Self {
            perm,
            effect,
            actors: Vec::new(),
            groups: Vec::new(),
        }
    }
}

/// Per-permission view of an item's ACL.
///
/// Serializes as `{"read": {"actors": [...], "groups": [...]}, ...}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AclSnapshot {
    pub perms: BTreeMap<Permission, AclEntry>,
}

impl AclSnapshot {
    /// Builds a snapshot from allow rules; deny rules are skipped.
    pub(crate) fn assemble<'a>(rules: impl IntoIterator<Item = &'a PolicyRule>) -> Self {
        let mut snapshot = Self::default();
        for rule in rules {
            if rule.effect != Effect::Allow {
                continue;
            }
            let entry = match snapshot.perms.entry(rule.perm.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => entry.insert(AclEntry::new(rule.perm.clone(), rule.effect)),
            };
            match &rule.subject {
                Subject::Actor(name) => entry.actors.push(name.clone()),
                Subject::Role(group) => entry.groups.push(group.clone()),
                Subject::DenyAllGroups => {}
            }
        }
        snapshot
    }

    /// Replaces whole entries with those of `specific`.
    pub(crate) fn override_with(&mut self, specific: Self) {
        self.perms.extend(specific.perms);
    }

    /// Adds the superuser to every entry and deduplicates names.
    pub(crate) fn finalize(&mut self, superuser: &str) {
        for entry in self.perms.values_mut() {
            if !entry.actors.iter().any(|actor| actor == superuser) {
                entry.actors.push(superuser.to_string());
            }
            dedup_in_order(&mut entry.actors);
            dedup_in_order(&mut entry.groups);
        }
    }

    /// Entry for a permission.
    pub fn get(&self, perm: &str) -> Option<&AclEntry> {
        self.perms.get(perm)
    }

    pub fn is_empty(&self) -> bool {
        self.perms.is_empty()
    }
}

fn dedup_in_order(names: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    names.retain(|name| seen.insert(name.clone()));
}

/// Desired grant set for one permission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AclEditRequest {
    pub actors: Vec<String>,
    pub groups: Vec<String>,
}

impl AclEditRequest {
    /// Creates a request.
    pub fn new(actors: Vec<String>, groups: Vec<String>) -> Self {
        Self { actors, groups }
    }

    /// Decodes the `{"<perm>": {"actors": [...], "groups": [...]}}` payload.
    pub fn from_json(value: &serde_json::Value, perm: &str) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| Error::MalformedAclPayload("invalid acl data".to_string()))?;
        let edit = object
            .get(perm)
            .ok_or_else(|| Error::MalformedAclPayload(format!("acl {perm} missing from JSON")))?;
        if !edit.is_object() {
            return Err(Error::MalformedAclPayload(format!("invalid acl {perm} data")));
        }
        serde_json::from_value(edit.clone())
            .map_err(|err| Error::MalformedAclPayload(format!("invalid acl {perm} data: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(fields: [&str; 6]) -> PolicyRule {
        PolicyRule::from_fields(&fields).unwrap()
    }

    #[test]
    fn assemble_should_split_actors_and_groups_and_skip_deny() {
        let rules = vec![
            rule(["alice", "groups", "groups", "admins", "read", "allow"]),
            rule(["role##ops", "groups", "groups", "admins", "read", "allow"]),
            rule(["denyall##groups", "groups", "groups", "admins", "update", "deny"]),
        ];
        let snapshot = AclSnapshot::assemble(&rules);

        let read = snapshot.get("read").unwrap();
        assert_eq!(read.actors, vec!["alice"]);
        assert_eq!(read.groups, vec!["ops"]);
        assert!(snapshot.get("update").is_none());
    }

    #[test]
    fn finalize_should_add_superuser_once_and_dedup() {
        let rules = vec![
            rule(["alice", "nodes", "containers", "n1", "read", "allow"]),
            rule(["pivotal", "nodes", "containers", "n1", "read", "allow"]),
        ];
        let mut snapshot = AclSnapshot::assemble(&rules);
        snapshot.perms.get_mut("read").unwrap().groups = vec!["ops".into(), "ops".into()];
        snapshot.finalize("pivotal");

        let read = snapshot.get("read").unwrap();
        assert_eq!(read.actors, vec!["alice", "pivotal"]);
        assert_eq!(read.groups, vec!["ops"]);
    }

    #[test]
    fn snapshot_should_serialize_as_perm_map() {
        let rules = vec![rule(["alice", "nodes", "containers", "n1", "read", "allow"])];
        let snapshot = AclSnapshot::assemble(&rules);
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value, json!({"read": {"actors": ["alice"], "groups": []}}));
    }

    #[test]
    fn from_json_should_decode_payload() {
        let payload = json!({"update": {"actors": ["alice"], "groups": ["ops"]}});
        let request = AclEditRequest::from_json(&payload, "update").unwrap();
        assert_eq!(request, AclEditRequest::new(vec!["alice".into()], vec!["ops".into()]));
    }

    #[test]
    fn from_json_should_reject_malformed_shapes() {
        let cases = [
            json!(["update"]),
            json!({"read": {"actors": [], "groups": []}}),
            json!({"update": "alice"}),
            json!({"update": {"actors": "alice", "groups": []}}),
            json!({"update": {"actors": [1], "groups": []}}),
            json!({"update": {"actors": []}}),
        ];
        for payload in cases {
            let err = AclEditRequest::from_json(&payload, "update").unwrap_err();
            assert!(matches!(err, Error::MalformedAclPayload(_)), "{payload}");
        }
    }
}
