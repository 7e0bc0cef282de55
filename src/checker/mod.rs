//! Per-organization ACL checker.
//!
//! Every public operation takes the organization's [`OrgLock`], reloads the
//! rule store from its policy file, evaluates or mutates, and persists
//! mutations before releasing the lock. Store failures during evaluation or
//! mutation surface as [`Error::Store`].

mod check;
mod edit;
mod snapshot;
mod structure;


use crate::config::DEFAULT_SUPERUSER;
use crate::error::{Error, Result};
use crate::gate::{GateScope, OrgLock, WriteSection};
use crate::model::Organization;
use crate::permission::{DefaultPermissionValidator, PermissionValidator};
use crate::policy::{PolicyField, PolicyRule, RuleTarget};
use crate::store::{Directory, RuleStore};
use crate::types::OrgName;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// ACL engine for one organization.
pub struct Checker<R, D> {
    org: Organization,
    store: R,
    directory: D,
    lock: OrgLock,
    validator: Box<dyn PermissionValidator>,
    superuser: String,
}

/// Builder for [`Checker`].
pub struct CheckerBuilder<R, D> {
    org: OrgName,
    store: R,
    directory: D,
    gate_scope: GateScope,
    gate: Option<Arc<Semaphore>>,
    validator: Box<dyn PermissionValidator>,
    superuser: String,
}

impl<R, D> CheckerBuilder<R, D> {
    /// Creates a builder with the process-wide gate and default whitelist.
    pub fn new(org: OrgName, store: R, directory: D) -> Self {
        Self {
            org,
            store,
            directory,
            gate_scope: GateScope::Process,
            gate: None,
            validator: Box::new(DefaultPermissionValidator),
            superuser: DEFAULT_SUPERUSER.to_string(),
        }
    }

    /// Selects how the outer gate is shared.
    pub fn gate_scope(mut self, scope: GateScope) -> Self {
        self.gate_scope = scope;
        self
    }

    /// Uses an explicit gate, overriding the scope.
    pub fn gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Sets the permission whitelist used by edits.
    pub fn permission_validator(mut self, validator: impl PermissionValidator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    /// Sets the identity added to every assembled ACL entry.
    pub fn superuser(mut self, name: impl Into<String>) -> Self {
        self.superuser = name.into();
        self
    }

    /// Builds the checker.
    pub fn build(self) -> Checker<R, D> {
        let lock = match self.gate {
            Some(gate) => OrgLock::with_gate(gate),
            None => OrgLock::new(self.gate_scope),
        };
        Checker {
            org: Organization::new(self.org),
            store: self.store,
            directory: self.directory,
            lock,
            validator: self.validator,
            superuser: self.superuser,
        }
    }
}

impl<R, D> fmt::Debug for Checker<R, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Checker")
            .field("org", &self.org.name)
            .field("superuser", &self.superuser)
            .finish_non_exhaustive()
    }
}

impl<R, D> Checker<R, D> {
    /// Organization this checker belongs to.
    pub fn organization(&self) -> &Organization {
        &self.org
    }

    /// Underlying rule store.
    pub fn store(&self) -> &R {
        &self.store
    }

    /// Blocks every other operation on this organization while held.
    pub(crate) async fn exclusive(&self) -> Result<WriteSection<'_>> {
        self.lock.write().await
    }
}

impl<R, D> Checker<R, D>
where
    R: RuleStore,
    D: Directory,
{
    async fn reload(&self) -> Result<()> {
        self.store.load_policy().await.map_err(Error::PolicyLoad)
    }

    async fn persist(&self) -> Result<()> {
        self.store.save_policy().await.map_err(Error::PolicySave)
    }

    /// Rules addressing the named item, any subject and perm. Caller holds the lock.
    async fn item_policies(&self, name: &str, kind: &str, subkind: &str) -> Vec<PolicyRule> {
        let target = RuleTarget::Named(name.to_string());
        self.store
            .filtered_policy(PolicyField::Name, name)
            .await
            .into_iter()
            .filter(|rule| rule.targets(kind, subkind, &target))
            .collect()
    }
}
