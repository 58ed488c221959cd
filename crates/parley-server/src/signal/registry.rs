//! Identifier → connection registry.
//!
//! The registry is the only state shared between connections. Every
//! read-modify-write goes through one `parking_lot::Mutex`, which is never
//! held across an `.await`. [`Registry::claim`] checks and inserts a
//! candidate under a single lock acquisition, so two concurrent `init`s can
//! never register the same identifier.
//!
//! Allocation retries on collision with a short pause between candidates and
//! gives up after [`AllocationPolicy::max_attempts`]. With the default
//! generator the space holds 40 960 000 identifiers, so exhaustion needs a
//! registry that is nearly full.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, gauge};
use parking_lot::Mutex;
use parley_core::{HaikuGenerator, IdGenerator, Identifier, RegistryError};
use tracing::{debug, warn};

use super::connection::Connection;
use crate::metrics::{IDENTIFIERS_ACTIVE, ID_COLLISIONS_TOTAL, ID_EXHAUSTED_TOTAL};

/// Bounds on identifier allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocationPolicy {
    /// Candidates tried before giving up. Zero fails immediately.
    pub max_attempts: u32,
    /// Pause between colliding candidates. Zero yields to the scheduler.
    pub retry_delay: Duration,
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 64,
            retry_delay: Duration::from_millis(5),
        }
    }
}

/// Registry of identified connections.
pub struct Registry {
    entries: Mutex<HashMap<Identifier, Arc<Connection>>>,
    generator: Box<dyn IdGenerator>,
    policy: AllocationPolicy,
}

impl Registry {
    /// Create an empty registry.
    pub fn new(generator: impl IdGenerator + 'static, policy: AllocationPolicy) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            generator: Box::new(generator),
            policy,
        }
    }

    /// Allocation policy in effect.
    pub fn policy(&self) -> AllocationPolicy {
        self.policy
    }

    /// Find an identifier not currently registered.
    ///
    /// The result is not reserved: another caller may register it before
    /// this one does. `init` goes through [`Registry::claim`] instead.
    pub async fn allocate_unique_id(&self) -> Result<Identifier, RegistryError> {
        for attempt in 1..=self.policy.max_attempts {
            let candidate = self.generator.generate();
            if !self.entries.lock().contains_key(&candidate) {
                return Ok(candidate);
            }
            self.collided(attempt, &candidate).await;
        }
        Err(self.exhausted())
    }

    /// Allocate a free identifier and register `conn` under it atomically.
    pub async fn claim(&self, conn: Arc<Connection>) -> Result<Identifier, RegistryError> {
        for attempt in 1..=self.policy.max_attempts {
            let candidate = self.generator.generate();
            {
                let mut entries = self.entries.lock();
                if let Entry::Vacant(slot) = entries.entry(candidate.clone()) {
                    let _ = slot.insert(conn);
                    record_size(entries.len());
                    return Ok(candidate);
                }
            }
            self.collided(attempt, &candidate).await;
        }
        Err(self.exhausted())
    }

    /// Map `id` to `conn`, replacing and returning any previous entry.
    pub fn register(&self, id: Identifier, conn: Arc<Connection>) -> Option<Arc<Connection>> {
        let mut entries = self.entries.lock();
        let previous = entries.insert(id, conn);
        record_size(entries.len());
        if let Some(prev) = &previous {
            warn!(conn_id = %prev.id, "registry entry overwritten");
        }
        previous
    }

    /// Connection currently registered under `id`.
    pub fn lookup(&self, id: &str) -> Option<Arc<Connection>> {
        self.entries.lock().get(id).cloned()
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.lock().contains_key(id)
    }

    /// Remove `id` if present. Releasing an unknown identifier is a no-op.
    pub fn release(&self, id: &str) -> Option<Arc<Connection>> {
        let mut entries = self.entries.lock();
        let removed = entries.remove(id);
        record_size(entries.len());
        removed
    }

    /// Remove `id` only while it still maps to `conn`.
    ///
    /// Returns whether an entry was removed.
    pub fn release_owned(&self, id: &str, conn: &Connection) -> bool {
        let mut entries = self.entries.lock();
        let owned = entries
            .get(id)
            .is_some_and(|current| std::ptr::eq(Arc::as_ptr(current), conn));
        if owned {
            let _ = entries.remove(id);
            record_size(entries.len());
        }
        owned
    }

    /// Number of registered identifiers.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no identifiers are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    async fn collided(&self, attempt: u32, candidate: &Identifier) {
        debug!(attempt, %candidate, "identifier collision, retrying");
        counter!(ID_COLLISIONS_TOTAL).increment(1);
        if attempt == self.policy.max_attempts {
            return;
        }
        if self.policy.retry_delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.policy.retry_delay).await;
        }
    }

    fn exhausted(&self) -> RegistryError {
        let attempts = self.policy.max_attempts;
        warn!(attempts, registered = self.len(), "identifier allocation exhausted");
        counter!(ID_EXHAUSTED_TOTAL).increment(1);
        RegistryError::Exhausted { attempts }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(HaikuGenerator::default(), AllocationPolicy::default())
    }
}

#[allow(clippy::cast_precision_loss)]
fn record_size(len: usize) {
    gauge!(IDENTIFIERS_ACTIVE).set(len as f64);
}
