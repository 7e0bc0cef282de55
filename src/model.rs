//! Capability traits for the objects the checker reasons about, and plain
//! carriers implementing them.

use crate::policy::Subject;
use crate::types::OrgName;

/// Container kind shared by the organization root, containers and most resources.
pub const CONTAINERS: &str = "containers";
/// Container kind and type of groups.
pub const GROUPS: &str = "groups";
/// Container type and name of the organization root item.
pub const ROOT: &str = "$$root$$";

/// Anything a permission can be checked against.
pub trait Item: Send + Sync {
    /// Broad resource category (`containers`, `groups`).
    fn container_kind(&self) -> &str;
    /// Specific resource type (`nodes`, `containers`, `groups`, ...).
    fn container_type(&self) -> &str;
    /// Item name.
    fn item_name(&self) -> &str;
}

/// Anything usable as a grant subject.
pub trait Member: Send + Sync {
    /// Subject as written into rules.
    fn subject(&self) -> Subject;
    /// Bare name.
    fn name(&self) -> &str;
}

/// A user or client identity.
pub trait Actor: Member {
    /// Whether this actor is a user.
    fn is_user(&self) -> bool;
    /// Whether this actor is a client.
    fn is_client(&self) -> bool {
        !self.is_user()
    }
    /// Owning organization for clients; users are associated through records.
    fn org_name(&self) -> Option<&str>;
}

/// A named collection of members.
pub trait Role: Member {
    /// Every direct member of the role.
    fn all_members(&self) -> Vec<Subject>;
}

impl Member for Subject {
    fn subject(&self) -> Subject {
        self.clone()
    }

    fn name(&self) -> &str {
        Subject::name(self)
    }
}

/// Organization root item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organization {
    pub name: OrgName,
}

impl Organization {
    /// Creates an organization item.
    pub fn new(name: OrgName) -> Self {
        Self { name }
    }
}

impl Item for Organization {
    fn container_kind(&self) -> &str {
        CONTAINERS
    }

    fn container_type(&self) -> &str {
        ROOT
    }

    fn item_name(&self) -> &str {
        ROOT
    }
}

/// Container such as `nodes` or `clients`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub name: String,
}

impl Container {
    /// Creates a container item.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Item for Container {
    fn container_kind(&self) -> &str {
        CONTAINERS
    }

    fn container_type(&self) -> &str {
        CONTAINERS
    }

    fn item_name(&self) -> &str {
        &self.name
    }
}

/// Named resource living in a container, e.g. node `node1` in `nodes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub container: String,
    pub name: String,
}

impl Resource {
    /// Creates a resource item.
    pub fn new(container: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            name: name.into(),
        }
    }
}

impl Item for Resource {
    fn container_kind(&self) -> &str {
        CONTAINERS
    }

    fn container_type(&self) -> &str {
        &self.container
    }

    fn item_name(&self) -> &str {
        &self.name
    }
}

/// Group: both an item and a role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    pub actors: Vec<String>,
    pub groups: Vec<String>,
}

impl Group {
    /// Creates an empty group.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds an actor member.
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actors.push(actor.into());
        self
    }

    /// Adds a nested group member.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }
}

impl Item for Group {
    fn container_kind(&self) -> &str {
        GROUPS
    }

    fn container_type(&self) -> &str {
        GROUPS
    }

    fn item_name(&self) -> &str {
        &self.name
    }
}

impl Member for Group {
    fn subject(&self) -> Subject {
        Subject::Role(self.name.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Role for Group {
    fn all_members(&self) -> Vec<Subject> {
        self.actors
            .iter()
            .map(|actor| Subject::Actor(actor.clone()))
            .chain(self.groups.iter().map(|group| Subject::Role(group.clone())))
            .collect()
    }
}

/// User identity; associated with organizations through records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub name: String,
}

impl User {
    /// Creates a user.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Member for User {
    fn subject(&self) -> Subject {
        Subject::Actor(self.name.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Actor for User {
    fn is_user(&self) -> bool {
        true
    }

    fn org_name(&self) -> Option<&str> {
        None
    }
}

/// Client identity; belongs to exactly one organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub name: String,
    pub org: OrgName,
}

impl Client {
    /// Creates a client of `org`.
    pub fn new(name: impl Into<String>, org: OrgName) -> Self {
        Self {
            name: name.into(),
            org,
        }
    }
}

impl Member for Client {
    fn subject(&self) -> Subject {
        Subject::Actor(self.name.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Actor for Client {
    fn is_user(&self) -> bool {
        false
    }

    fn org_name(&self) -> Option<&str> {
        Some(self.org.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_members_should_include_nested_groups() {
        let group = Group::new("admins").with_actor("alice").with_group("ops");
        assert_eq!(
            group.all_members(),
            vec![
                Subject::Actor("alice".to_string()),
                Subject::Role("ops".to_string())
            ]
        );
        assert_eq!(Member::subject(&group), Subject::Role("admins".to_string()));
    }

    #[test]
    fn client_should_report_owning_org() {
        let client = Client::new("web", OrgName::from_string("acme".to_string()));
        assert!(client.is_client());
        assert_eq!(client.org_name(), Some("acme"));
    }
}
