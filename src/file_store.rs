//! Rule store over a casbin enforcer reading and writing the organization's
//! policy file.
//!
//! Rules are casbin `p` lines with an explicit effect column, memberships are
//! `g` lines. A request is allowed when a matching rule allows it and no
//! matching rule denies it; the subject matches through transitive `g` links,
//! bounded by the default role manager's hierarchy depth.

use crate::error::StoreError;
use crate::persistence::PolicyFile;
use crate::policy::{PolicyField, PolicyRule, Subject};
use crate::store::RuleStore;
use async_trait::async_trait;
use casbin::{CoreApi, DefaultModel, Enforcer, FileAdapter, MgmtApi, RbacApi};
use std::fmt;
use tokio::sync::RwLock;
use tracing::warn;

/// Casbin model of the 6-tuple rules.
pub const MODEL_CONF: &str = r#"
[request_definition]
r = sub, subkind, kind, name, perm

[policy_definition]
p = sub, subkind, kind, name, perm, eft

[role_definition]
g = _, _

[policy_effect]
e = some(where (p.eft == allow)) && !some(where (p.eft == deny))

[matchers]
m = g(r.sub, p.sub) && r.subkind == p.subkind && r.kind == p.kind && r.name == p.name && r.perm == p.perm
"#;

const MEMBER_FIELD: usize = 0;
const ROLE_FIELD: usize = 1;

/// Rule store persisted to a [`PolicyFile`].
pub struct FileRuleStore {
    file: PolicyFile,
    enforcer: RwLock<Enforcer>,
}

impl FileRuleStore {
    /// Builds the enforcer over `file` and loads it.
    pub async fn open(file: PolicyFile) -> std::result::Result<Self, StoreError> {
        let model = DefaultModel::from_str(MODEL_CONF).await?;
        let adapter = FileAdapter::new(file.path().to_path_buf());
        let mut enforcer = Enforcer::new(model, adapter).await?;
        // Saves are explicit whole-file rewrites.
        enforcer.enable_auto_save(false);
        Ok(Self {
            file,
            enforcer: RwLock::new(enforcer),
        })
    }

    /// Backing file.
    pub fn file(&self) -> &PolicyFile {
        &self.file
    }
}

impl fmt::Debug for FileRuleStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileRuleStore")
            .field("file", &self.file)
            .finish_non_exhaustive()
    }
}

fn to_rules(rows: Vec<Vec<String>>) -> Vec<PolicyRule> {
    rows.into_iter()
        .filter_map(|row| {
            let fields: Vec<&str> = row.iter().map(String::as_str).collect();
            match PolicyRule::from_fields(&fields) {
                Ok(rule) => Some(rule),
                Err(err) => {
                    warn!(row = %row.join(", "), error = %err, "skipping malformed policy rule");
                    None
                }
            }
        })
        .collect()
}

#[async_trait]
impl RuleStore for FileRuleStore {
    async fn load_policy(&self) -> std::result::Result<(), StoreError> {
        let mut enforcer = self.enforcer.write().await;
        enforcer.load_policy().await?;
        Ok(())
    }

    async fn save_policy(&self) -> std::result::Result<(), StoreError> {
        let mut enforcer = self.enforcer.write().await;
        enforcer.save_policy().await?;
        Ok(())
    }

    async fn enforce(&self, request: &PolicyRule) -> std::result::Result<bool, StoreError> {
        let subject = request.subject.acl_name();
        let enforcer = self.enforcer.read().await;
        let allowed = enforcer.enforce((
            subject.as_ref(),
            request.subkind.as_str(),
            request.kind.as_str(),
            request.name.as_str(),
            request.perm.as_str(),
        ))?;
        Ok(allowed)
    }

    async fn filtered_policy(&self, field: PolicyField, value: &str) -> Vec<PolicyRule> {
        let enforcer = self.enforcer.read().await;
        to_rules(enforcer.get_filtered_policy(field as usize, vec![value.to_string()]))
    }

    async fn add_policy(&self, rule: &PolicyRule) -> std::result::Result<bool, StoreError> {
        let mut enforcer = self.enforcer.write().await;
        Ok(enforcer.add_policy(rule.to_fields().to_vec()).await?)
    }

    async fn remove_policy(&self, rule: &PolicyRule) -> bool {
        match self.remove_policy_safe(rule).await {
            Ok(removed) => removed,
            Err(err) => {
                warn!(rule = %rule, error = %err, "failed to remove policy rule");
                false
            }
        }
    }

    async fn remove_policy_safe(&self, rule: &PolicyRule) -> std::result::Result<bool, StoreError> {
        let mut enforcer = self.enforcer.write().await;
        Ok(enforcer.remove_policy(rule.to_fields().to_vec()).await?)
    }

    async fn add_role_for_user(
        &self,
        member: &Subject,
        role: &Subject,
    ) -> std::result::Result<bool, StoreError> {
        let (member, role) = (member.acl_name(), role.acl_name());
        let mut enforcer = self.enforcer.write().await;
        Ok(enforcer.add_role_for_user(&member, &role, None).await?)
    }

    async fn delete_role_for_user(
        &self,
        member: &Subject,
        role: &Subject,
    ) -> std::result::Result<bool, StoreError> {
        let (member, role) = (member.acl_name(), role.acl_name());
        let mut enforcer = self.enforcer.write().await;
        Ok(enforcer.delete_role_for_user(&member, &role, None).await?)
    }

    async fn delete_roles_for_user(
        &self,
        member: &Subject,
    ) -> std::result::Result<bool, StoreError> {
        let member = member.acl_name();
        let mut enforcer = self.enforcer.write().await;
        Ok(enforcer.delete_roles_for_user(&member, None).await?)
    }

    async fn permissions_for_user(&self, subject: &Subject) -> Vec<PolicyRule> {
        let subject = subject.acl_name();
        let enforcer = self.enforcer.read().await;
        to_rules(enforcer.get_permissions_for_user(&subject, None))
    }

    async fn roles_for_user(&self, member: &Subject) -> Vec<Subject> {
        let member = member.acl_name();
        let enforcer = self.enforcer.read().await;
        enforcer
            .get_filtered_grouping_policy(MEMBER_FIELD, vec![member.into_owned()])
            .iter()
            .filter_map(|edge| edge.get(ROLE_FIELD))
            .map(|role| Subject::parse(role))
            .collect()
    }

    async fn users_for_role(&self, role: &Subject) -> Vec<Subject> {
        let role = role.acl_name();
        let enforcer = self.enforcer.read().await;
        enforcer
            .get_filtered_grouping_policy(ROLE_FIELD, vec![role.into_owned()])
            .iter()
            .filter_map(|edge| edge.get(MEMBER_FIELD))
            .map(|member| Subject::parse(member))
            .collect()
    }
}
