use crate::types::OrgName;
use thiserror::Error;

/// Collaborator error type (policy files, directory lookups).
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Crate result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Policy rules could not be read or parsed.
    #[error("failed to load ACL policy: {0}")]
    PolicyLoad(#[source] StoreError),
    /// Policy rules could not be written back.
    #[error("failed to save ACL policy: {0}")]
    PolicySave(#[source] StoreError),
    /// A policy file already exists for the organization.
    #[error("ACL policy for organization {0} already exists")]
    PolicyExists(OrgName),
    /// Directory lookup failure.
    #[error("store error: {0}")]
    Store(#[source] StoreError),
    /// Invalid identifier input.
    #[error("invalid id: {0}")]
    InvalidId(String),
    /// Permission not defined for the item's kind and type.
    #[error("invalid perm {perm} for {kind}-{subkind}")]
    InvalidPermission {
        perm: String,
        kind: String,
        subkind: String,
    },
    /// Actor has no association with the organization.
    #[error("'{actor}' not associated with organization '{org}'")]
    NotAssociated { actor: String, org: OrgName },
    /// Unknown edit action or permission name while editing.
    #[error("invalid edit: {0}")]
    InvalidEditAction(String),
    /// Structurally invalid ACL edit payload.
    #[error("malformed acl payload: {0}")]
    MalformedAclPayload(String),
    /// No ACL data for an item.
    #[error("item '{item}' (and overall type '{subkind}') not found in ACL")]
    NotFound { item: String, subkind: String },
    /// Actor named in an edit does not exist.
    #[error("actor '{0}' not found")]
    UnknownActor(String),
    /// Group named in an edit does not exist.
    #[error("group '{0}' not found")]
    UnknownGroup(String),
    /// Container does not exist in the organization.
    #[error("container '{0}' not found")]
    UnknownContainer(String),
    /// The concurrency gate was closed.
    #[error("ACL gate closed")]
    GateClosed,
}

/// Coarse error category used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Client supplied something invalid.
    BadRequest,
    /// Caller is not allowed to act in the organization.
    Forbidden,
    /// Requested data does not exist.
    NotFound,
    /// Conflicting state.
    Conflict,
    /// Server-side failure.
    Internal,
}

impl Error {
    /// Returns the category of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidId(_)
            | Self::InvalidPermission { .. }
            | Self::InvalidEditAction(_)
            | Self::MalformedAclPayload(_)
            | Self::UnknownActor(_)
            | Self::UnknownGroup(_) => ErrorClass::BadRequest,
            Self::NotAssociated { .. } => ErrorClass::Forbidden,
            Self::NotFound { .. } | Self::UnknownContainer(_) => ErrorClass::NotFound,
            Self::PolicyExists(_) => ErrorClass::Conflict,
            Self::PolicyLoad(_) | Self::PolicySave(_) | Self::Store(_) | Self::GateClosed => {
                ErrorClass::Internal
            }
        }
    }
}

impl From<StoreError> for Error {
    fn from(error: StoreError) -> Self {
        Self::Store(error)
    }
}
