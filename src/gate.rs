//! Two-tier concurrency gate.
//!
//! Every checker operation first takes a permit from a single-slot gate, then
//! the organization's read or write lock. With [`GateScope::Process`] the
//! gate is shared by every organization in the process, so the whole
//! reload, evaluate or mutate, persist sequence is globally serialized.
//! [`GateScope::Organization`] gives each organization its own gate.
//!
//! While the gate is exclusive the read/write split does not yield
//! concurrent readers; it is kept so that read paths stay read paths once the
//! gate is sharded.

use crate::error::{Error, Result};
use std::sync::{Arc, OnceLock};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard, Semaphore, SemaphorePermit};

static PROCESS_GATE: OnceLock<Arc<Semaphore>> = OnceLock::new();

/// Sharing of the outer gate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GateScope {
    /// One gate for the whole process.
    #[default]
    Process,
    /// One gate per organization.
    Organization,
}

/// The process-wide gate.
pub fn process_gate() -> Arc<Semaphore> {
    PROCESS_GATE
        .get_or_init(|| Arc::new(Semaphore::new(1)))
        .clone()
}

/// Gate plus per-organization read/write lock.
#[derive(Debug)]
pub struct OrgLock {
    gate: Arc<Semaphore>,
    lock: RwLock<()>,
}

/// Held for the duration of a read-only operation.
#[derive(Debug)]
pub struct ReadSection<'a> {
    _lock: RwLockReadGuard<'a, ()>,
    _permit: SemaphorePermit<'a>,
}

/// Held for the duration of a mutating operation.
#[derive(Debug)]
pub struct WriteSection<'a> {
    _lock: RwLockWriteGuard<'a, ()>,
    _permit: SemaphorePermit<'a>,
}

impl OrgLock {
    /// Creates a lock whose gate follows `scope`.
    pub fn new(scope: GateScope) -> Self {
        let gate = match scope {
            GateScope::Process => process_gate(),
            GateScope::Organization => Arc::new(Semaphore::new(1)),
        };
        Self::with_gate(gate)
    }

    /// Creates a lock around an explicit gate.
    pub fn with_gate(gate: Arc<Semaphore>) -> Self {
        Self {
            gate,
            lock: RwLock::new(()),
        }
    }

    /// Takes the gate, then the read lock.
    pub async fn read(&self) -> Result<ReadSection<'_>> {
        let permit = self.gate.acquire().await.map_err(|_| Error::GateClosed)?;
        let lock = self.lock.read().await;
        Ok(ReadSection {
            _lock: lock,
            _permit: permit,
        })
    }

    /// Takes the gate, then the write lock.
    pub async fn write(&self) -> Result<WriteSection<'_>> {
        let permit = self.gate.acquire().await.map_err(|_| Error::GateClosed)?;
        let lock = self.lock.write().await;
        Ok(WriteSection {
            _lock: lock,
            _permit: permit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn section_should_hold_gate_until_dropped() {
        let lock = OrgLock::new(GateScope::Organization);
        {
            let _section = block_on(lock.write()).unwrap();
            assert_eq!(lock.gate.available_permits(), 0);
            assert!(lock.lock.try_read().is_err());
        }
        assert_eq!(lock.gate.available_permits(), 1);
        assert!(lock.lock.try_write().is_ok());
    }

    #[test]
    fn organizations_should_share_process_gate() {
        let a = OrgLock::new(GateScope::Process);
        let b = OrgLock::new(GateScope::Process);
        assert!(Arc::ptr_eq(&a.gate, &b.gate));

        let c = OrgLock::new(GateScope::Organization);
        assert!(!Arc::ptr_eq(&a.gate, &c.gate));
    }

    #[test]
    fn closed_gate_should_error() {
        let gate = Arc::new(Semaphore::new(1));
        let lock = OrgLock::with_gate(gate.clone());
        gate.close();
        assert!(matches!(block_on(lock.read()), Err(Error::GateClosed)));
    }
}
