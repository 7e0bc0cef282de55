use crate::error::StoreError;
use crate::model::{Actor, Client, Container, Group, Item, Role, User};
use crate::store::Directory;
use crate::types::OrgName;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// In-memory directory for tests and demos.
#[derive(Debug, Default, Clone)]
pub struct MemoryDirectory {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    users: RwLock<HashSet<String>>,
    clients: RwLock<HashMap<(OrgName, String), Client>>,
    groups: RwLock<HashMap<(OrgName, String), Group>>,
    containers: RwLock<HashMap<(OrgName, String), Container>>,
    associations: RwLock<HashSet<(OrgName, String)>>,
}

impl MemoryDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user. Users are global; see [`Self::associate`].
    pub fn add_user(&self, user: User) {
        let mut guard = self.inner.users.write().expect("poisoned lock");
        guard.insert(user.name);
    }

    /// Registers a client under its owning organization.
    pub fn add_client(&self, client: Client) {
        let mut guard = self.inner.clients.write().expect("poisoned lock");
        guard.insert((client.org.clone(), client.name.clone()), client);
    }

    /// Registers or replaces a group.
    pub fn add_group(&self, org: &OrgName, group: Group) {
        let mut guard = self.inner.groups.write().expect("poisoned lock");
        guard.insert((org.clone(), group.name.clone()), group);
    }

    /// Registers a container.
    pub fn add_container(&self, org: &OrgName, container: Container) {
        let mut guard = self.inner.containers.write().expect("poisoned lock");
        guard.insert((org.clone(), container.name.clone()), container);
    }

    /// Records that `user` belongs to `org`.
    pub fn associate(&self, org: &OrgName, user: &str) {
        let mut guard = self.inner.associations.write().expect("poisoned lock");
        guard.insert((org.clone(), user.to_string()));
    }

    /// Drops the association of `user` with `org`.
    pub fn dissociate(&self, org: &OrgName, user: &str) {
        let mut guard = self.inner.associations.write().expect("poisoned lock");
        guard.remove(&(org.clone(), user.to_string()));
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn actor(
        &self,
        org: &OrgName,
        name: &str,
    ) -> std::result::Result<Option<Box<dyn Actor>>, StoreError> {
        let is_user = {
            let guard = self.inner.users.read().expect("poisoned lock");
            guard.contains(name)
        };
        if is_user {
            return Ok(Some(Box::new(User::new(name))));
        }
        let guard = self.inner.clients.read().expect("poisoned lock");
        Ok(guard
            .get(&(org.clone(), name.to_string()))
            .cloned()
            .map(|client| Box::new(client) as Box<dyn Actor>))
    }

    async fn group(
        &self,
        org: &OrgName,
        name: &str,
    ) -> std::result::Result<Option<Box<dyn Role>>, StoreError> {
        let guard = self.inner.groups.read().expect("poisoned lock");
        Ok(guard
            .get(&(org.clone(), name.to_string()))
            .cloned()
            .map(|group| Box::new(group) as Box<dyn Role>))
    }

    async fn container(
        &self,
        org: &OrgName,
        name: &str,
    ) -> std::result::Result<Option<Box<dyn Item>>, StoreError> {
        let guard = self.inner.containers.read().expect("poisoned lock");
        Ok(guard
            .get(&(org.clone(), name.to_string()))
            .cloned()
            .map(|container| Box::new(container) as Box<dyn Item>))
    }

    async fn association_exists(
        &self,
        org: &OrgName,
        user: &str,
    ) -> std::result::Result<bool, StoreError> {
        let guard = self.inner.associations.read().expect("poisoned lock");
        Ok(guard.contains(&(org.clone(), user.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn actor_should_resolve_users_before_clients() {
        let org = OrgName::try_from("acme").unwrap();
        let directory = MemoryDirectory::new();
        directory.add_user(User::new("alice"));
        directory.add_client(Client::new("web", org.clone()));

        let alice = block_on(directory.actor(&org, "alice")).unwrap().unwrap();
        assert!(alice.is_user());
        let web = block_on(directory.actor(&org, "web")).unwrap().unwrap();
        assert_eq!(web.org_name(), Some("acme"));
        assert!(block_on(directory.actor(&org, "ghost")).unwrap().is_none());
    }

    #[test]
    fn associations_should_be_per_org() {
        let acme = OrgName::try_from("acme").unwrap();
        let other = OrgName::try_from("other").unwrap();
        let directory = MemoryDirectory::new();
        directory.associate(&acme, "alice");

        assert!(block_on(directory.association_exists(&acme, "alice")).unwrap());
        assert!(!block_on(directory.association_exists(&other, "alice")).unwrap());
        directory.dissociate(&acme, "alice");
        assert!(!block_on(directory.association_exists(&acme, "alice")).unwrap());
    }
}
