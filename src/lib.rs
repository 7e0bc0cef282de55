//! Per-organization ACL resolution engine.
//!
//! Each organization owns a file of policy rules: 6-tuples of
//! `subject, subkind, kind, name, perm, effect` plus role membership edges.
//! A [`Checker`] answers "may this actor do this to this item", edits grants,
//! keeps rules consistent across renames and deletions, and assembles
//! per-permission ACL views. Rules are evaluated by a casbin enforcer over the
//! organization's policy file, and every operation reloads that file, so the
//! file is the source of truth.
//!
//! # Examples
//!
//! Checking a grant with the in-memory directory (enable `memory-store`):
//! ```no_run
//! # #[cfg(feature = "memory-store")]
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! use org_acl::{AclConfig, AclRegistry, EditAction, MemoryDirectory, OrgName, Resource, User};
//! let directory = MemoryDirectory::new();
//! let org = OrgName::try_from("acme").unwrap();
//! directory.add_user(User::new("alice"));
//! directory.associate(&org, "alice");
//!
//! let registry = AclRegistry::new(AclConfig::new("/var/lib/acl"), directory);
//! let checker = registry.load_acl(&org).await.unwrap();
//! let node = Resource::new("nodes", "node1");
//! let alice = User::new("alice");
//! checker
//!     .edit_item_perm(&node, &alice, &["read"], EditAction::Add)
//!     .await
//!     .unwrap();
//! assert!(checker.check_item_perm(&node, &alice, "read").await.unwrap());
//! # });
//! ```
#![forbid(unsafe_code)]

mod acl;
mod checker;
mod config;
mod error;
mod file_store;
mod gate;
mod model;
mod permission;
mod persistence;
mod policy;
mod registry;
mod store;
mod types;

#[cfg(feature = "memory-store")]
mod memory_directory;

pub use crate::acl::{AclEditRequest, AclEntry, AclSnapshot};
pub use crate::checker::{Checker, CheckerBuilder};
pub use crate::config::{AclConfig, DEFAULT_SUPERUSER};
pub use crate::error::{Error, ErrorClass, Result, StoreError};
pub use crate::file_store::{FileRuleStore, MODEL_CONF};
pub use crate::gate::{GateScope, OrgLock, ReadSection, WriteSection, process_gate};
pub use crate::model::{
    Actor, CONTAINERS, Client, Container, GROUPS, Group, Item, Member, Organization, ROOT,
    Resource, Role, User,
};
pub use crate::permission::{
    DEFAULT_PERMISSIONS, DefaultPermissionValidator, EditAction, Permission, PermissionValidator,
};
pub use crate::persistence::{
    DEFAULT_CONTAINERS, PolicyFile, PolicyFileError, default_policy_skeleton,
};
pub use crate::policy::{
    Effect, PolicyField, PolicyRule, RULE_FIELDS, RuleTarget, Subject, general_subkind,
};
pub use crate::registry::{AclRegistry, OrgChecker};
pub use crate::store::{Directory, RuleStore};
pub use crate::types::OrgName;

#[cfg(feature = "memory-store")]
pub use crate::memory_directory::MemoryDirectory;
