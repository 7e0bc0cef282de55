use super::Checker;
use crate::acl::AclSnapshot;
use crate::error::{Error, Result};
use crate::model::Item;
use crate::policy::{PolicyField, PolicyRule, RuleTarget, general_subkind};
use crate::store::{Directory, RuleStore};

impl<R, D> Checker<R, D>
where
    R: RuleStore,
    D: Directory,
{
    /// Returns the effective ACL of `item`, per permission.
    ///
    /// Type-wide defaults are overridden entry by entry by item-specific
    /// grants, and the superuser is listed in every entry.
    #[tracing::instrument(skip_all, fields(org = %self.org.name, item = item.item_name()))]
    pub async fn get_item_acl(&self, item: &dyn Item) -> Result<AclSnapshot> {
        let _section = self.lock.read().await?;
        self.reload().await?;

        let kind = item.container_kind();
        let specific = self
            .item_policies(item.item_name(), kind, item.container_type())
            .await;
        let subkind = general_subkind(kind, item.container_type(), item.item_name());
        let general: Vec<PolicyRule> = self
            .store
            .filtered_policy(PolicyField::Subkind, subkind)
            .await
            .into_iter()
            .filter(|rule| rule.kind == kind && rule.name == RuleTarget::Default)
            .collect();

        // Deny rules count as ACL data even though assembly drops them.
        if specific.is_empty() && general.is_empty() {
            return Err(Error::NotFound {
                item: item.item_name().to_string(),
                subkind: item.container_type().to_string(),
            });
        }
        let mut snapshot = AclSnapshot::assemble(&general);
        snapshot.override_with(AclSnapshot::assemble(&specific));
        snapshot.finalize(&self.superuser);
        Ok(snapshot)
    }

    /// Every rule addressing the named item.
    pub async fn get_item_policies(
        &self,
        name: &str,
        kind: &str,
        subkind: &str,
    ) -> Result<Vec<PolicyRule>> {
        let _section = self.lock.read().await?;
        self.reload().await?;
        Ok(self.item_policies(name, kind, subkind).await)
    }
}
