use crate::error::StoreError;
use crate::model::{Actor, Item, Role};
use crate::policy::{PolicyField, PolicyRule, Subject};
use crate::types::OrgName;
use async_trait::async_trait;

/// Tuple store backing one organization's checker.
///
/// Implementations keep their own interior locking. Callers serialize whole
/// operations through the checker's gate.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Replaces the in-memory rules with the persisted ones.
    async fn load_policy(&self) -> std::result::Result<(), StoreError>;

    /// Persists the in-memory rules.
    async fn save_policy(&self) -> std::result::Result<(), StoreError>;

    /// Evaluates a request rule, including transitive role membership.
    async fn enforce(&self, request: &PolicyRule) -> std::result::Result<bool, StoreError>;

    /// Returns rules whose serialized `field` equals `value`.
    async fn filtered_policy(&self, field: PolicyField, value: &str) -> Vec<PolicyRule>;

    /// Adds a rule; returns false if it was already present.
    async fn add_policy(&self, rule: &PolicyRule) -> std::result::Result<bool, StoreError>;

    /// Removes a rule; returns false if it was absent or the store failed.
    async fn remove_policy(&self, rule: &PolicyRule) -> bool;

    /// Removes a rule, reporting store failures instead of swallowing them.
    async fn remove_policy_safe(&self, rule: &PolicyRule) -> std::result::Result<bool, StoreError>;

    /// Adds a membership edge.
    async fn add_role_for_user(
        &self,
        member: &Subject,
        role: &Subject,
    ) -> std::result::Result<bool, StoreError>;

    /// Removes a membership edge.
    async fn delete_role_for_user(
        &self,
        member: &Subject,
        role: &Subject,
    ) -> std::result::Result<bool, StoreError>;

    /// Removes every membership edge of a member.
    async fn delete_roles_for_user(&self, member: &Subject)
    -> std::result::Result<bool, StoreError>;

    /// Returns rules whose subject is exactly `subject`.
    async fn permissions_for_user(&self, subject: &Subject) -> Vec<PolicyRule>;

    /// Returns the roles a member directly belongs to.
    async fn roles_for_user(&self, member: &Subject) -> Vec<Subject>;

    /// Returns the direct members of a role.
    async fn users_for_role(&self, role: &Subject) -> Vec<Subject>;
}

/// Record layer the checker resolves names through.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Looks up a user or client by name.
    async fn actor(
        &self,
        org: &OrgName,
        name: &str,
    ) -> std::result::Result<Option<Box<dyn Actor>>, StoreError>;

    /// Looks up a group by name.
    async fn group(
        &self,
        org: &OrgName,
        name: &str,
    ) -> std::result::Result<Option<Box<dyn Role>>, StoreError>;

    /// Looks up a container by name.
    async fn container(
        &self,
        org: &OrgName,
        name: &str,
    ) -> std::result::Result<Option<Box<dyn Item>>, StoreError>;

    /// Returns whether a user has an association record with the organization.
    async fn association_exists(
        &self,
        org: &OrgName,
        user: &str,
    ) -> std::result::Result<bool, StoreError>;
}
