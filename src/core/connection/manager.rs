//! Lazily constructed, explicitly owned store handle

use super::settings::ConnectionSettings;
use crate::adapters::mongo::MongoConnector;
use crate::adapters::store::{Connector, DocumentStore};
use crate::domain::{RepositoryError, Result};
use crate::logging::TIMESTAMP_FORMAT;
use chrono::Utc;
use secrecy::ExposeSecret;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};

/// Lifecycle of a [`ConnectionManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No handle yet, or the last construction attempt failed
    Uninitialized,
    /// A construction attempt is in progress
    Connecting,
    /// A handle is cached and in use
    Connected,
    /// The handle was released; the manager cannot be used again
    Disposed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Uninitialized => "uninitialized",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disposed => "disposed",
        };
        f.write_str(name)
    }
}

enum Slot {
    Empty,
    Connecting,
    Ready(Arc<dyn DocumentStore>),
    Disposed,
}

impl Slot {
    fn state(&self) -> ConnectionState {
        match self {
            Slot::Empty => ConnectionState::Uninitialized,
            Slot::Connecting => ConnectionState::Connecting,
            Slot::Ready(_) => ConnectionState::Connected,
            Slot::Disposed => ConnectionState::Disposed,
        }
    }

    fn ready(&self) -> Result<Option<Arc<dyn DocumentStore>>> {
        match self {
            Slot::Ready(store) => Ok(Some(Arc::clone(store))),
            Slot::Disposed => Err(RepositoryError::Disposed),
            Slot::Empty | Slot::Connecting => Ok(None),
        }
    }
}

/// Returns a slot still marked `Connecting` to `Empty` when the attempt
/// holding it is dropped before finishing
struct ConnectingGuard<'a> {
    slot: &'a RwLock<Slot>,
    armed: bool,
}

impl<'a> ConnectingGuard<'a> {
    fn new(slot: &'a RwLock<Slot>) -> Self {
        Self { slot, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        // Other holders of the slot lock never keep it across an await
        if let Ok(mut slot) = self.slot.try_write() {
            if matches!(*slot, Slot::Connecting) {
                *slot = Slot::Empty;
            }
        }
    }
}

/// Owns the store handle shared by every repository built on it
///
/// The handle is constructed on first use and cached. Construction is
/// serialized: concurrent first callers wait for one attempt and then share
/// its handle. A failed attempt leaves the manager uninitialized so the next
/// call tries again.
///
/// The handle is released by [`ConnectionManager::dispose`] or, failing
/// that, when the manager is dropped.
pub struct ConnectionManager {
    settings: ConnectionSettings,
    connector: Arc<dyn Connector>,
    slot: RwLock<Slot>,
    construction: Mutex<()>,
}

impl ConnectionManager {
    /// Creates a manager that builds its handle through `connector`
    pub fn new(settings: ConnectionSettings, connector: Arc<dyn Connector>) -> Self {
        Self {
            settings,
            connector,
            slot: RwLock::new(Slot::Empty),
            construction: Mutex::new(()),
        }
    }

    /// Creates a manager backed by the MongoDB driver
    pub fn mongo(settings: ConnectionSettings) -> Self {
        Self::new(settings, Arc::new(MongoConnector))
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// Current lifecycle state
    pub async fn state(&self) -> ConnectionState {
        self.slot.read().await.state()
    }

    /// Cached handle, without constructing one
    pub async fn current(&self) -> Option<Arc<dyn DocumentStore>> {
        self.slot.read().await.ready().ok().flatten()
    }

    /// Returns the cached handle, constructing it first if needed
    ///
    /// # Errors
    ///
    /// - [`RepositoryError::Disposed`] once [`ConnectionManager::dispose`] ran
    /// - [`RepositoryError::Connection`] when the handle cannot be built; the
    ///   manager stays uninitialized and the next call retries
    pub async fn ensure_connected(&self) -> Result<Arc<dyn DocumentStore>> {
        if let Some(store) = self.slot.read().await.ready()? {
            return Ok(store);
        }

        let _construction = self.construction.lock().await;

        // Another caller may have finished while we waited for the lock
        if let Some(store) = self.slot.read().await.ready()? {
            return Ok(store);
        }

        *self.slot.write().await = Slot::Connecting;
        let mut abandoned = ConnectingGuard::new(&self.slot);

        let started = Instant::now();
        let outcome = self.connector.connect(&self.settings).await;
        let elapsed_ms = started.elapsed().as_millis();

        let mut slot = self.slot.write().await;
        abandoned.disarm();
        if matches!(*slot, Slot::Disposed) {
            drop(slot);
            if let Ok(store) = outcome {
                store.shutdown().await;
            }
            return Err(RepositoryError::Disposed);
        }

        match outcome {
            Ok(store) => {
                *slot = Slot::Ready(Arc::clone(&store));
                tracing::info!(
                    database = %self.settings.database_name,
                    elapsed_ms = elapsed_ms,
                    "Store connection established"
                );
                Ok(store)
            }
            Err(e) => {
                *slot = Slot::Empty;
                tracing::error!(
                    failed_at = %Utc::now().format(TIMESTAMP_FORMAT),
                    elapsed_ms = elapsed_ms,
                    database = %self.settings.database_name,
                    uri = %crate::config::redact_connection_string(
                        self.settings.connection_string.expose_secret().as_ref()
                    ),
                    error = %e,
                    "Failed to construct store connection"
                );
                Err(RepositoryError::Connection(e))
            }
        }
    }

    /// Round-trip health check, connecting first if needed
    pub async fn ping(&self) -> Result<()> {
        let store = self.ensure_connected().await?;
        store.ping().await?;
        Ok(())
    }

    /// Releases the handle
    ///
    /// Returns `true` only for the call that actually released a handle.
    /// Afterwards every operation fails with [`RepositoryError::Disposed`].
    pub async fn dispose(&self) -> bool {
        let previous = std::mem::replace(&mut *self.slot.write().await, Slot::Disposed);

        match previous {
            Slot::Ready(store) => {
                store.shutdown().await;
                tracing::info!(database = %self.settings.database_name, "Store connection released");
                true
            }
            _ => false,
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        let previous = std::mem::replace(self.slot.get_mut(), Slot::Disposed);
        let Slot::Ready(store) = previous else {
            return;
        };

        tracing::debug!(
            database = %self.settings.database_name,
            "Releasing store connection on drop"
        );
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move { store.shutdown().await });
        }
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
