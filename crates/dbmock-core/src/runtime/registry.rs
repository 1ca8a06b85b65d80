// crates/dbmock-core/src/runtime/registry.rs
// ============================================================================
// Module: dbmock Registry
// Description: Named registry of mock instances and their open connections.
// Purpose: Let code under test open connections to a mock by identifier.
// Dependencies: crate::runtime::{connection, options}, thiserror
// ============================================================================

//! ## Overview
//! A [`MockRegistry`] maps identifiers to mock instances and counts open
//! connections per instance. Closing the last open connection removes the
//! instance. Registries are explicit values: independent registries never
//! see each other's mocks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::Weak;

use thiserror::Error;

use crate::runtime::connection::Connection;
use crate::runtime::connection::MockShared;
use crate::runtime::connection::Sqlmock;
use crate::runtime::options::MockOptions;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Registry failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The identifier is already registered.
    #[error("cannot create driver with duplicate dsn: {0}")]
    Duplicate(String),
    /// The identifier is not registered.
    #[error("expected a connection to be available, but it is not: {0}")]
    NotFound(String),
    /// The registry lock was poisoned.
    #[error("mock registry mutex poisoned")]
    Poisoned,
}

// ============================================================================
// SECTION: Registry State
// ============================================================================

/// Registered mock and its open connection count.
struct RegisteredMock {
    /// Shared mock state.
    shared: Arc<MockShared>,
    /// Number of connections opened and not yet closed.
    open: usize,
}

/// Registry contents.
#[derive(Default)]
pub(crate) struct RegistryState {
    /// Counter used for generated identifiers.
    next_id: u64,
    /// Mocks by identifier.
    mocks: BTreeMap<String, RegisteredMock>,
}

impl RegistryState {
    /// Returns an unused generated identifier.
    fn generate_id(&mut self) -> String {
        loop {
            self.next_id += 1;
            let id = format!("dbmock_db_{}", self.next_id);
            if !self.mocks.contains_key(&id) {
                return id;
            }
        }
    }
}

/// Link from a connection back to the registry entry it counts against.
#[derive(Debug)]
pub(crate) struct Registration {
    /// Registry state; weak so dropped registries do not leak.
    state: Weak<Mutex<RegistryState>>,
    /// Identifier of the entry.
    id: String,
}

impl Registration {
    /// Decrements the open count and removes the entry at zero.
    pub(crate) fn release(&self) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let Ok(mut state) = state.lock() else {
            return;
        };
        let remove = match state.mocks.get_mut(&self.id) {
            Some(entry) => {
                entry.open = entry.open.saturating_sub(1);
                entry.open == 0
            }
            None => false,
        };
        if remove {
            state.mocks.remove(&self.id);
        }
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Registry of named mock instances.
#[derive(Clone, Default)]
pub struct MockRegistry {
    /// Shared registry state.
    state: Arc<Mutex<RegistryState>>,
}

impl MockRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the registry state.
    fn lock(&self) -> Result<MutexGuard<'_, RegistryState>, RegistryError> {
        self.state.lock().map_err(|_| RegistryError::Poisoned)
    }

    /// Creates a mock, registers it, and opens one connection to it.
    ///
    /// The identifier is `options.id` when set, otherwise a generated
    /// `dbmock_db_<n>` name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] when the identifier is taken.
    pub fn create(&self, options: MockOptions) -> Result<(Connection, Sqlmock), RegistryError> {
        let mut state = self.lock()?;
        let id = match options.id.clone() {
            Some(id) => id,
            None => state.generate_id(),
        };
        if state.mocks.contains_key(&id) {
            return Err(RegistryError::Duplicate(id));
        }
        let shared = Arc::new(MockShared::new(id.clone(), options));
        state.mocks.insert(id.clone(), RegisteredMock {
            shared: Arc::clone(&shared),
            open: 1,
        });
        let connection = Connection::new(Arc::clone(&shared), Some(self.registration(id)));
        Ok((connection, Sqlmock::new(shared)))
    }

    /// Registers a mock under `id` without opening a connection.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] when the identifier is taken.
    pub fn register(&self, id: &str, options: MockOptions) -> Result<Sqlmock, RegistryError> {
        let mut state = self.lock()?;
        if state.mocks.contains_key(id) {
            return Err(RegistryError::Duplicate(id.to_string()));
        }
        let shared = Arc::new(MockShared::new(id.to_string(), options));
        state.mocks.insert(id.to_string(), RegisteredMock {
            shared: Arc::clone(&shared),
            open: 0,
        });
        Ok(Sqlmock::new(shared))
    }

    /// Opens a connection to the mock registered under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when nothing is registered under `id`.
    pub fn open(&self, id: &str) -> Result<Connection, RegistryError> {
        let mut state = self.lock()?;
        let entry =
            state.mocks.get_mut(id).ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        entry.open += 1;
        let shared = Arc::clone(&entry.shared);
        drop(state);
        Ok(Connection::new(shared, Some(self.registration(id.to_string()))))
    }

    /// Removes the mock registered under `id`, regardless of open connections.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when nothing is registered under `id`.
    pub fn unregister(&self, id: &str) -> Result<(), RegistryError> {
        self.lock()?
            .mocks
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Returns true when a mock is registered under `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.lock().is_ok_and(|state| state.mocks.contains_key(id))
    }

    /// Returns the number of open connections to the mock under `id`.
    #[must_use]
    pub fn open_connections(&self, id: &str) -> Option<usize> {
        self.lock().ok().and_then(|state| state.mocks.get(id).map(|entry| entry.open))
    }

    /// Returns the number of registered mocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().map_or(0, |state| state.mocks.len())
    }

    /// Returns true when no mock is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Builds the release link for a connection to `id`.
    fn registration(&self, id: String) -> Registration {
        Registration {
            state: Arc::downgrade(&self.state),
            id,
        }
    }
}

impl fmt::Debug for MockRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockRegistry").field("len", &self.len()).finish()
    }
}
