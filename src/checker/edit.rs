use super::Checker;
use crate::acl::AclEditRequest;
use crate::error::{Error, Result};
use crate::model::{Actor, GROUPS, Item, Member};
use crate::permission::{DEFAULT_PERMISSIONS, EditAction, Permission};
use crate::policy::{Effect, PolicyRule, Subject};
use crate::store::{Directory, RuleStore};
use tracing::{debug, warn};

impl<R, D> Checker<R, D>
where
    R: RuleStore,
    D: Directory,
{
    /// Adds or removes item-specific grants of `perms` for `member`.
    ///
    /// Every perm is validated before anything is touched.
    #[tracing::instrument(
        skip_all,
        fields(org = %self.org.name, item = item.item_name(), member = member.name(), action = ?action)
    )]
    pub async fn edit_item_perm(
        &self,
        item: &dyn Item,
        member: &dyn Member,
        perms: &[&str],
        action: EditAction,
    ) -> Result<()> {
        self.edit_subject_perms(item, member.subject(), perms, action)
            .await
    }

    /// Grants the default permission set on a new item to its creator.
    pub async fn creator_only(&self, item: &dyn Item, creator: &dyn Actor) -> Result<()> {
        for perm in DEFAULT_PERMISSIONS {
            self.edit_subject_perms(item, creator.subject(), &[perm], EditAction::Add)
                .await?;
        }
        Ok(())
    }

    async fn edit_subject_perms(
        &self,
        item: &dyn Item,
        subject: Subject,
        perms: &[&str],
        action: EditAction,
    ) -> Result<()> {
        if perms.is_empty() {
            return Err(Error::InvalidEditAction(
                "no permissions given to edit".to_string(),
            ));
        }
        let perms = perms
            .iter()
            .map(|perm| self.validated(perm))
            .collect::<Result<Vec<_>>>()?;

        let _section = self.lock.write().await?;
        self.reload().await?;

        for perm in perms {
            let rule = PolicyRule::for_item(subject.clone(), item, perm);
            let changed = match action {
                EditAction::Add => self.store.add_policy(&rule).await,
                EditAction::Remove => self.store.remove_policy_safe(&rule).await,
            }
            .map_err(Error::Store)?;
            debug!(changed, "applied grant edit");
        }

        self.persist().await
    }

    /// Decodes a raw JSON payload and reconciles `perm` against it.
    pub async fn edit_from_json_value(
        &self,
        item: &dyn Item,
        perm: &str,
        payload: &serde_json::Value,
    ) -> Result<()> {
        let desired = AclEditRequest::from_json(payload, perm)?;
        self.edit_from_json(item, perm, &desired).await
    }

    /// Makes the grants of `perm` on `item` exactly `desired`.
    ///
    /// Subjects no longer wanted are removed, new ones added. On groups the
    /// deny-all marker is set when no group is granted and cleared
    /// otherwise. Names are resolved before any mutation, and the result is
    /// persisted once.
    #[tracing::instrument(
        skip_all,
        fields(org = %self.org.name, item = item.item_name(), perm = perm)
    )]
    pub async fn edit_from_json(
        &self,
        item: &dyn Item,
        perm: &str,
        desired: &AclEditRequest,
    ) -> Result<()> {
        let perm = self.validated(perm)?;
        let wanted = self.resolve_subjects(desired).await?;

        let _section = self.lock.write().await?;
        self.reload().await?;

        let current: Vec<PolicyRule> = self
            .item_policies(item.item_name(), item.container_kind(), item.container_type())
            .await
            .into_iter()
            .filter(|rule| rule.perm == perm)
            .collect();

        for rule in &current {
            let keep = match &rule.subject {
                Subject::Actor(name) => desired.actors.contains(name),
                Subject::Role(group) => desired.groups.contains(group),
                Subject::DenyAllGroups => continue,
            };
            if !keep {
                debug!(rule = %rule, "removing grant");
                self.store.remove_policy_safe(rule).await.map_err(Error::Store)?;
            }
        }

        for subject in wanted {
            let rule = PolicyRule::for_item(subject, item, perm.clone());
            if !current.contains(&rule) {
                debug!(rule = %rule, "adding grant");
                self.store.add_policy(&rule).await.map_err(Error::Store)?;
            }
        }

        if item.container_kind() == GROUPS {
            let marker = PolicyRule {
                effect: Effect::Deny,
                ..PolicyRule::for_item(Subject::DenyAllGroups, item, perm)
            };
            if desired.groups.is_empty() {
                self.store.add_policy(&marker).await.map_err(Error::Store)?;
            } else {
                self.store.remove_policy(&marker).await;
            }
        }

        self.persist().await
    }

    async fn resolve_subjects(&self, desired: &AclEditRequest) -> Result<Vec<Subject>> {
        let mut subjects = Vec::with_capacity(desired.actors.len() + desired.groups.len());
        for name in &desired.actors {
            let actor = self
                .directory
                .actor(&self.org.name, name)
                .await
                .map_err(Error::Store)?
                .ok_or_else(|| Error::UnknownActor(name.clone()))?;
            subjects.push(actor.subject());
        }
        for name in &desired.groups {
            let group = self
                .directory
                .group(&self.org.name, name)
                .await
                .map_err(Error::Store)?
                .ok_or_else(|| Error::UnknownGroup(name.clone()))?;
            subjects.push(group.subject());
        }
        Ok(subjects)
    }

    fn validated(&self, perm: &str) -> Result<Permission> {
        let perm = Permission::new(perm)?;
        if let Err(err) = self.validator.validate(&perm) {
            warn!(%perm, "rejected edit of unknown permission");
            return Err(err);
        }
        Ok(perm)
    }
}
