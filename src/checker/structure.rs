use super::Checker;
use crate::error::{Error, Result};
use crate::gate::WriteSection;
use crate::model::{Item, Member, Role};
use crate::policy::Subject;
use crate::store::{Directory, RuleStore};
use tracing::debug;

impl<R, D> Checker<R, D>
where
    R: RuleStore,
    D: Directory,
{
    /// Moves every rule of the item formerly named `old_name` to the item's
    /// current name.
    ///
    /// All renamed copies are added before any old rule is removed, so the
    /// item is never without its grants.
    #[tracing::instrument(skip_all, fields(org = %self.org.name, old_name = old_name, new_name = item.item_name()))]
    pub async fn rename_item_acl(&self, item: &dyn Item, old_name: &str) -> Result<()> {
        if old_name == item.item_name() {
            return Ok(());
        }
        let _section = self.lock.write().await?;
        self.reload().await?;

        let old = self
            .item_policies(old_name, item.container_kind(), item.container_type())
            .await;
        if old.is_empty() {
            return Ok(());
        }
        for rule in &old {
            self.store
                .add_policy(&rule.with_name(item.item_name()))
                .await
                .map_err(Error::Store)?;
        }
        for rule in &old {
            self.store.remove_policy_safe(rule).await.map_err(Error::Store)?;
        }
        debug!(moved = old.len(), "renamed item rules");

        self.persist().await
    }

    /// Moves every rule and membership edge of the member formerly named
    /// `old_name` to its current name, adding before removing.
    #[tracing::instrument(skip_all, fields(org = %self.org.name, old_name = old_name, new_name = member.name()))]
    pub async fn rename_member(&self, member: &dyn Member, old_name: &str) -> Result<()> {
        let current = member.subject();
        let old = current.renamed(old_name);
        if old == current {
            return Ok(());
        }
        let _section = self.lock.write().await?;
        self.reload().await?;

        let rules = self.store.permissions_for_user(&old).await;
        let roles = self.store.roles_for_user(&old).await;
        let members = self.store.users_for_role(&old).await;
        if rules.is_empty() && roles.is_empty() && members.is_empty() {
            return Ok(());
        }

        for rule in &rules {
            self.store
                .add_policy(&rule.with_subject(current.clone()))
                .await
                .map_err(Error::Store)?;
        }
        for role in &roles {
            self.store
                .add_role_for_user(&current, role)
                .await
                .map_err(Error::Store)?;
        }
        for inner in &members {
            self.store
                .add_role_for_user(inner, &current)
                .await
                .map_err(Error::Store)?;
        }

        for rule in &rules {
            self.store.remove_policy_safe(rule).await.map_err(Error::Store)?;
        }
        for role in &roles {
            self.store
                .delete_role_for_user(&old, role)
                .await
                .map_err(Error::Store)?;
        }
        for inner in &members {
            self.store
                .delete_role_for_user(inner, &old)
                .await
                .map_err(Error::Store)?;
        }
        debug!(
            rules = rules.len(),
            edges = roles.len() + members.len(),
            "renamed member"
        );

        self.persist().await
    }

    /// Removes every rule addressing `item`; returns whether any existed.
    #[tracing::instrument(skip_all, fields(org = %self.org.name, item = item.item_name()))]
    pub async fn delete_item_acl(&self, item: &dyn Item) -> Result<bool> {
        let _section = self.lock.write().await?;
        self.reload().await?;

        let rules = self
            .item_policies(item.item_name(), item.container_kind(), item.container_type())
            .await;
        let mut removed = false;
        for rule in &rules {
            removed |= self.store.remove_policy_safe(rule).await.map_err(Error::Store)?;
        }

        self.persist().await?;
        Ok(removed)
    }

    /// Adds membership edges for every current member of `role`.
    #[tracing::instrument(skip_all, fields(org = %self.org.name, role = role.name()))]
    pub async fn add_acl_role(&self, role: &dyn Role) -> Result<()> {
        let section = self.lock.write().await?;
        self.reload().await?;
        self.add_members_locked(&section, &role.subject(), &role.all_members())
            .await?;
        self.persist().await
    }

    /// Removes membership edges for every current member of `role`.
    #[tracing::instrument(skip_all, fields(org = %self.org.name, role = role.name()))]
    pub async fn remove_acl_role(&self, role: &dyn Role) -> Result<()> {
        let section = self.lock.write().await?;
        self.reload().await?;
        self.remove_members_locked(&section, &role.subject(), &role.all_members())
            .await?;
        self.persist().await
    }

    /// Adds `members` to `role`.
    pub async fn add_members(&self, role: &dyn Role, members: &[&dyn Member]) -> Result<()> {
        let subjects: Vec<Subject> = members.iter().map(|member| member.subject()).collect();
        let section = self.lock.write().await?;
        self.reload().await?;
        self.add_members_locked(&section, &role.subject(), &subjects)
            .await?;
        self.persist().await
    }

    /// Removes `members` from `role`.
    pub async fn remove_members(&self, role: &dyn Role, members: &[&dyn Member]) -> Result<()> {
        let subjects: Vec<Subject> = members.iter().map(|member| member.subject()).collect();
        let section = self.lock.write().await?;
        self.reload().await?;
        self.remove_members_locked(&section, &role.subject(), &subjects)
            .await?;
        self.persist().await
    }

    /// Strips every role membership of `member`.
    #[tracing::instrument(skip_all, fields(org = %self.org.name, member = member.name()))]
    pub async fn remove_user(&self, member: &dyn Member) -> Result<()> {
        let _section = self.lock.write().await?;
        self.reload().await?;
        let removed = self
            .store
            .delete_roles_for_user(&member.subject())
            .await
            .map_err(Error::Store)?;
        debug!(removed, "removed role memberships");
        self.persist().await
    }

    async fn add_members_locked(
        &self,
        _section: &WriteSection<'_>,
        role: &Subject,
        members: &[Subject],
    ) -> Result<()> {
        for member in members {
            self.store
                .add_role_for_user(member, role)
                .await
                .map_err(Error::Store)?;
        }
        debug!(count = members.len(), %role, "added role members");
        Ok(())
    }

    async fn remove_members_locked(
        &self,
        _section: &WriteSection<'_>,
        role: &Subject,
        members: &[Subject],
    ) -> Result<()> {
        for member in members {
            self.store
                .delete_role_for_user(member, role)
                .await
                .map_err(Error::Store)?;
        }
        debug!(count = members.len(), %role, "removed role members");
        Ok(())
    }
}
