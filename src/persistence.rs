//! Per-organization policy file.
//!
//! One casbin-compatible CSV file per organization at
//! `<policy_root>/<org>-policy.csv`:
//!
//! ```text
//! p, role##admins, nodes, containers, $$default$$, read, allow
//! g, pivotal, role##admins
//! ```
//!
//! The rules themselves are read and written by the casbin file adapter in
//! [`FileRuleStore`](crate::FileRuleStore); this module owns the file's
//! location, creation and removal. There is no cross-process locking.

use crate::error::{Error, Result, StoreError};
use crate::model::{CONTAINERS, GROUPS, ROOT};
use crate::permission::DEFAULT_PERMISSIONS;
use crate::types::OrgName;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

const POLICY_FILE_SUFFIX: &str = "-policy.csv";

static INIT_SEQ: AtomicUsize = AtomicUsize::new(0);

/// Containers every organization starts with.
pub const DEFAULT_CONTAINERS: [&str; 12] = [
    "clients",
    "containers",
    "cookbooks",
    "data",
    "environments",
    "groups",
    "nodes",
    "roles",
    "sandboxes",
    "policies",
    "policy_groups",
    "cookbook_artifacts",
];

const RESOURCE_CONTAINERS: [&str; 8] = [
    "cookbooks",
    "data",
    "environments",
    "nodes",
    "roles",
    "policies",
    "policy_groups",
    "cookbook_artifacts",
];

/// Policy file I/O failure.
#[derive(Debug, Error)]
pub enum PolicyFileError {
    #[error("policy file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Handle to one organization's policy file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyFile {
    path: PathBuf,
}

impl PolicyFile {
    /// Returns the deterministic path for an organization.
    pub fn path_for(policy_root: &Path, org: &OrgName) -> PathBuf {
        policy_root.join(format!("{org}{POLICY_FILE_SUFFIX}"))
    }

    /// Handle for an organization without touching the filesystem.
    pub fn new(policy_root: &Path, org: &OrgName) -> Self {
        Self {
            path: Self::path_for(policy_root, org),
        }
    }

    /// File path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns whether the file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Creates the file with the default skeleton.
    ///
    /// Fails with [`Error::PolicyExists`] if the file is already there. The
    /// skeleton is written to a private sibling and hard-linked into place,
    /// so racing initializers cannot both succeed and readers never observe
    /// a partial file.
    pub fn initialize(policy_root: &Path, org: &OrgName, superuser: &str) -> Result<Self> {
        let file = Self::new(policy_root, org);
        tracing::debug!(path = %file.path.display(), "initializing policy");
        let staging = file.path.with_extension(format!(
            "csv.init-{}-{}",
            process::id(),
            INIT_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&staging, default_policy_skeleton(superuser))
            .map_err(|err| Error::PolicySave(file.io_error(err)))?;
        let linked = fs::hard_link(&staging, &file.path);
        let _ = fs::remove_file(&staging);
        match linked {
            Ok(()) => Ok(file),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                Err(Error::PolicyExists(org.clone()))
            }
            Err(err) => Err(Error::PolicySave(file.io_error(err))),
        }
    }

    /// Opens an existing file.
    pub fn open(policy_root: &Path, org: &OrgName) -> Result<Self> {
        let file = Self::new(policy_root, org);
        if !file.exists() {
            return Err(Error::PolicyLoad(file.io_error(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no ACL policy for organization {org}"),
            ))));
        }
        Ok(file)
    }

    /// Deletes the file.
    pub fn remove(&self) -> std::result::Result<(), StoreError> {
        fs::remove_file(&self.path).map_err(|err| self.io_error(err))
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        Box::new(PolicyFileError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// Skeleton written when an organization's policy is first initialized.
pub fn default_policy_skeleton(superuser: &str) -> String {
    let mut out = String::new();
    let admins = "role##admins";

    for perm in DEFAULT_PERMISSIONS {
        let _ = writeln!(out, "p, {admins}, {ROOT}, {CONTAINERS}, {ROOT}, {perm}, allow");
    }
    let _ = writeln!(out, "p, role##users, {ROOT}, {CONTAINERS}, {ROOT}, read, allow");

    for container in DEFAULT_CONTAINERS {
        let (object_subkind, object_kind) = object_key(container);
        for perm in DEFAULT_PERMISSIONS {
            let _ = writeln!(
                out,
                "p, {admins}, {CONTAINERS}, {CONTAINERS}, {container}, {perm}, allow"
            );
            let _ = writeln!(
                out,
                "p, {admins}, {object_subkind}, {object_kind}, $$default$$, {perm}, allow"
            );
        }
    }

    for container in RESOURCE_CONTAINERS {
        for perm in ["create", "read"] {
            let _ = writeln!(
                out,
                "p, role##users, {CONTAINERS}, {CONTAINERS}, {container}, {perm}, allow"
            );
        }
        for perm in ["create", "read", "update", "delete"] {
            let _ = writeln!(
                out,
                "p, role##users, {container}, {CONTAINERS}, $$default$$, {perm}, allow"
            );
        }
        let _ = writeln!(
            out,
            "p, role##clients, {container}, {CONTAINERS}, $$default$$, read, allow"
        );
    }
    let _ = writeln!(
        out,
        "p, role##clients, nodes, {CONTAINERS}, $$default$$, update, allow"
    );
    for container in ["clients", "groups"] {
        let (object_subkind, object_kind) = object_key(container);
        let _ = writeln!(
            out,
            "p, role##users, {object_subkind}, {object_kind}, $$default$$, read, allow"
        );
    }

    let _ = writeln!(out, "g, {superuser}, {admins}");
    out
}

/// (subkind, kind) of the objects stored in a container.
fn object_key(container: &str) -> (&str, &str) {
    if container == GROUPS {
        (GROUPS, GROUPS)
    } else {
        (container, CONTAINERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn org() -> OrgName {
        OrgName::try_from("acme").unwrap()
    }

    #[test]
    fn path_should_derive_from_org_name() {
        let path = PolicyFile::path_for(Path::new("/var/lib/acl"), &org());
        assert_eq!(path, PathBuf::from("/var/lib/acl/acme-policy.csv"));
    }

    #[test]
    fn skeleton_should_hold_only_policy_lines() {
        let skeleton = default_policy_skeleton("pivotal");
        assert!(skeleton.lines().all(|line| line.starts_with("p, ") || line.starts_with("g, ")));
        assert!(
            skeleton
                .lines()
                .filter(|line| line.starts_with("p, "))
                .all(|line| line.ends_with(", allow"))
        );
        assert!(skeleton.contains("p, role##admins, nodes, containers, $$default$$, read, allow\n"));
        assert_eq!(
            skeleton.lines().filter(|line| line.starts_with("g, ")).collect::<Vec<_>>(),
            vec!["g, pivotal, role##admins"]
        );
    }

    #[test]
    fn initialize_should_leave_only_the_policy_file() {
        let dir = TempDir::new().unwrap();
        let file = PolicyFile::initialize(dir.path(), &org(), "pivotal").unwrap();
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("acme-policy.csv")]);
        assert_eq!(fs::read_to_string(file.path()).unwrap(), default_policy_skeleton("pivotal"));
    }

    #[test]
    fn initialize_should_refuse_existing_file() {
        let dir = TempDir::new().unwrap();
        PolicyFile::initialize(dir.path(), &org(), "pivotal").unwrap();
        let err = PolicyFile::initialize(dir.path(), &org(), "pivotal").unwrap_err();
        assert!(matches!(err, Error::PolicyExists(_)));
    }

    #[test]
    fn open_should_fail_without_file() {
        let dir = TempDir::new().unwrap();
        let err = PolicyFile::open(dir.path(), &org()).unwrap_err();
        assert!(matches!(err, Error::PolicyLoad(_)));
    }
}
