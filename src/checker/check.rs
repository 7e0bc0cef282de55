use super::Checker;
use crate::error::{Error, Result};
use crate::model::{Actor, GROUPS, Item};
use crate::permission::Permission;
use crate::policy::{PolicyField, PolicyRule, RuleTarget, Subject};
use crate::store::{Directory, RuleStore};
use tracing::debug;

impl<R, D> Checker<R, D>
where
    R: RuleStore,
    D: Directory,
{
    /// Checks whether `doer` holds `perm` on `item`.
    ///
    /// Resolution order:
    /// 1. an item-specific allow rule for the doer or one of its roles;
    /// 2. if the doer has item-specific rules (or, on a group, the deny-all
    ///    marker is set for `perm`), no general fallback: groups return the
    ///    marker's verdict once `perm` is known to be valid;
    /// 3. otherwise the type-wide `$$default$$` rule.
    ///
    /// An unresolved check fails with [`Error::InvalidPermission`] when no
    /// rule ever mentions `perm` for the item's kind and type, and with
    /// [`Error::NotAssociated`] when the doer does not belong to the
    /// organization. Anything else is a clean `Ok(false)`.
    #[tracing::instrument(
        skip_all,
        fields(org = %self.org.name, item = item.item_name(), doer = doer.name(), perm = perm)
    )]
    pub async fn check_item_perm(
        &self,
        item: &dyn Item,
        doer: &dyn Actor,
        perm: &str,
    ) -> Result<bool> {
        let _section = self.lock.read().await?;
        self.reload().await?;

        let Ok(perm) = Permission::new(perm) else {
            return Err(invalid_permission(item, perm));
        };
        let subject = doer.subject();
        let specific = PolicyRule::for_item(subject.clone(), item, perm.clone());
        debug!(rule = %specific, "enforcing specific rule");
        if self.store.enforce(&specific).await.map_err(Error::Store)? {
            return Ok(true);
        }

        if self.has_item_rules(item, &subject, &perm).await {
            if item.container_kind() == GROUPS {
                let marker = specific.with_subject(Subject::DenyAllGroups);
                debug!(rule = %marker, "item rules present on group, deferring to deny-all marker");
                if self.store.enforce(&marker).await.map_err(Error::Store)? {
                    return Ok(true);
                }
                if !self.is_perm_valid(item, &perm).await {
                    return Err(invalid_permission(item, perm.as_str()));
                }
                return Ok(false);
            }
            debug!("item rules present, skipping general rule");
        } else {
            let general = specific.general();
            debug!(rule = %general, "enforcing general rule");
            if self.store.enforce(&general).await.map_err(Error::Store)? {
                return Ok(true);
            }
        }

        if !self.is_perm_valid(item, &perm).await {
            return Err(invalid_permission(item, perm.as_str()));
        }
        self.test_association(doer).await?;

        Ok(false)
    }

    /// Checks `perm` on the organization itself.
    pub async fn root_check_perm(&self, doer: &dyn Actor, perm: &str) -> Result<bool> {
        self.check_item_perm(&self.org, doer, perm).await
    }

    /// Checks `perm` on the named container.
    pub async fn check_container_perm(
        &self,
        doer: &dyn Actor,
        container_name: &str,
        perm: &str,
    ) -> Result<bool> {
        let container = self
            .directory
            .container(&self.org.name, container_name)
            .await
            .map_err(Error::Store)?
            .ok_or_else(|| Error::UnknownContainer(container_name.to_string()))?;
        self.check_item_perm(container.as_ref(), doer, perm).await
    }

    /// Whether any rule pins this item for `subject`, ignoring perm.
    /// On groups the deny-all marker for `perm` pins the item for everyone.
    async fn has_item_rules(
        &self,
        item: &dyn Item,
        subject: &Subject,
        perm: &Permission,
    ) -> bool {
        let target = RuleTarget::Named(item.item_name().to_string());
        let is_group = item.container_kind() == GROUPS;
        self.store
            .filtered_policy(PolicyField::Name, item.item_name())
            .await
            .iter()
            .any(|rule| {
                rule.targets(item.container_kind(), item.container_type(), &target)
                    && (&rule.subject == subject
                        || (is_group
                            && rule.subject == Subject::DenyAllGroups
                            && &rule.perm == perm))
            })
    }

    async fn is_perm_valid(&self, item: &dyn Item, perm: &Permission) -> bool {
        self.store
            .filtered_policy(PolicyField::Subkind, item.container_type())
            .await
            .iter()
            .any(|rule| rule.kind == item.container_kind() && &rule.perm == perm)
    }

    async fn test_association(&self, doer: &dyn Actor) -> Result<()> {
        let associated = if doer.is_user() {
            self.directory
                .association_exists(&self.org.name, doer.name())
                .await
                .map_err(Error::Store)?
        } else {
            doer.org_name() == Some(self.org.name.as_str())
        };
        if associated {
            Ok(())
        } else {
            Err(Error::NotAssociated {
                actor: doer.name().to_string(),
                org: self.org.name.clone(),
            })
        }
    }
}

fn invalid_permission(item: &dyn Item, perm: &str) -> Error {
    Error::InvalidPermission {
        perm: perm.to_string(),
        kind: item.container_kind().to_string(),
        subkind: item.container_type().to_string(),
    }
}
