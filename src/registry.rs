//! Process-wide map of organization checkers.

use crate::checker::{Checker, CheckerBuilder};
use crate::config::AclConfig;
use crate::error::{Error, Result};
use crate::file_store::FileRuleStore;
use crate::persistence::PolicyFile;
use crate::store::Directory;
use crate::types::OrgName;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::info;

/// Checker over the file-backed rule store.
pub type OrgChecker<D> = Checker<FileRuleStore, D>;

/// Owns one [`Checker`] per loaded organization.
pub struct AclRegistry<D> {
    config: AclConfig,
    directory: D,
    checkers: RwLock<HashMap<OrgName, Arc<OrgChecker<D>>>>,
}

impl<D> AclRegistry<D>
where
    D: Directory + Clone,
{
    /// Creates an empty registry.
    pub fn new(config: AclConfig, directory: D) -> Self {
        Self {
            config,
            directory,
            checkers: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &AclConfig {
        &self.config
    }

    /// Returns the organization's checker, creating its policy file with the
    /// default skeleton on first use.
    #[tracing::instrument(skip_all, fields(org = %org))]
    pub async fn load_acl(&self, org: &OrgName) -> Result<Arc<OrgChecker<D>>> {
        if let Some(checker) = self.checker(org) {
            return Ok(checker);
        }

        let root = self.config.policy_root_path();
        let file = match PolicyFile::initialize(root, org, self.config.superuser_name()) {
            Ok(file) => {
                info!(path = %file.path().display(), "initialized ACL policy");
                file
            }
            Err(Error::PolicyExists(_)) => PolicyFile::open(root, org)?,
            Err(err) => return Err(err),
        };

        let store = FileRuleStore::open(file).await.map_err(Error::PolicyLoad)?;
        let checker = CheckerBuilder::new(org.clone(), store, self.directory.clone())
            .gate_scope(self.config.gate())
            .superuser(self.config.superuser_name())
            .build();

        let mut guard = self.checkers.write().expect("poisoned lock");
        Ok(guard
            .entry(org.clone())
            .or_insert_with(|| Arc::new(checker))
            .clone())
    }

    /// Returns a loaded checker.
    pub fn checker(&self, org: &OrgName) -> Option<Arc<OrgChecker<D>>> {
        let guard = self.checkers.read().expect("poisoned lock");
        guard.get(org).cloned()
    }

    /// Unregisters the organization and deletes its policy file.
    ///
    /// Returns whether a policy file existed.
    #[tracing::instrument(skip_all, fields(org = %org))]
    pub async fn remove_acl(&self, org: &OrgName) -> Result<bool> {
        let checker = {
            let mut guard = self.checkers.write().expect("poisoned lock");
            guard.remove(org)
        };
        let _section = match &checker {
            Some(checker) => Some(checker.exclusive().await?),
            None => None,
        };

        let file = PolicyFile::new(self.config.policy_root_path(), org);
        if !file.exists() {
            return Ok(false);
        }
        file.remove().map_err(Error::PolicySave)?;
        info!("removed ACL policy");
        Ok(true)
    }
}
