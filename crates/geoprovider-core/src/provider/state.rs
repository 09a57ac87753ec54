use std::fmt;
use std::sync::Arc;

use crate::error::{ProviderError, Result};
use crate::factory::{global_factory_service, GeometryFactory, GeometryFactoryService};

/// Handle returned when registering a CRS-change listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type SridListener = Box<dyn FnMut() + Send>;

/// State shared by every provider
///
/// The geometry factory is rebuilt whenever the SRID changes, so it always
/// matches [`ProviderCore::srid`]. After [`ProviderCore::dispose`] the
/// factory is released and every operation fails with `InvalidState`.
///
/// The core does no locking of its own. Mutating operations take
/// `&mut self`; callers sharing a provider across threads wrap it in their
/// own lock.
pub struct ProviderCore {
    connection_id: String,
    srid: i32,
    is_open: bool,
    factory: Option<Arc<GeometryFactory>>,
    factory_service: Arc<dyn GeometryFactoryService>,
    listeners: Vec<(ListenerId, SridListener)>,
    next_listener: u64,
}

impl ProviderCore {
    /// Create a core bound to `srid`, using the process-wide factory service
    ///
    /// An empty `connection_id` means connection pooling does not apply.
    pub fn new(connection_id: impl Into<String>, srid: i32) -> Self {
        Self::with_factory_service(connection_id, srid, global_factory_service())
    }

    /// Create a core that obtains factories from `factory_service`
    pub fn with_factory_service(
        connection_id: impl Into<String>,
        srid: i32,
        factory_service: Arc<dyn GeometryFactoryService>,
    ) -> Self {
        let factory = factory_service.create_geometry_factory(srid);
        Self {
            connection_id: connection_id.into(),
            srid,
            is_open: false,
            factory: Some(factory),
            factory_service,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    /// Identifier used for connection pooling; empty when not applicable
    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    pub fn srid(&self) -> i32 {
        self.srid
    }

    /// Change the SRID, rebuild the geometry factory and notify listeners
    ///
    /// Setting the current value again does nothing.
    pub fn set_srid(&mut self, srid: i32) -> Result<()> {
        self.ensure_usable()?;

        if srid == self.srid {
            return Ok(());
        }

        tracing::debug!(
            connection_id = %self.connection_id,
            from = self.srid,
            to = srid,
            "rebuilding geometry factory for new SRID"
        );
        self.srid = srid;
        self.factory = Some(self.factory_service.create_geometry_factory(srid));

        for (_, listener) in self.listeners.iter_mut() {
            listener();
        }
        Ok(())
    }

    /// Factory bound to the current SRID
    pub fn geometry_factory(&self) -> Result<Arc<GeometryFactory>> {
        self.factory.clone().ok_or_else(disposed)
    }

    /// Register a callback run synchronously after every effective SRID change
    pub fn on_srid_changed(&mut self, listener: Box<dyn FnMut() + Send>) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Unregister a callback; returns `false` if it was not registered
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn is_disposed(&self) -> bool {
        self.factory.is_none()
    }

    /// Mark the provider open; opening an open provider is a no-op
    pub fn open(&mut self) -> Result<()> {
        self.ensure_usable()?;
        if !self.is_open {
            tracing::debug!(connection_id = %self.connection_id, "provider opened");
            self.is_open = true;
        }
        Ok(())
    }

    /// Mark the provider closed; closing a closed provider is a no-op
    pub fn close(&mut self) -> Result<()> {
        self.ensure_usable()?;
        if self.is_open {
            tracing::debug!(connection_id = %self.connection_id, "provider closed");
            self.is_open = false;
        }
        Ok(())
    }

    /// Release the geometry factory and listeners
    ///
    /// Idempotent. Nothing but [`ProviderCore::is_disposed`] and the plain
    /// accessors is valid afterwards.
    pub fn dispose(&mut self) {
        if self.factory.take().is_some() {
            tracing::debug!(connection_id = %self.connection_id, "provider disposed");
        }
        self.is_open = false;
        self.listeners.clear();
    }

    /// Fail with `InvalidState` if the provider has been disposed
    pub fn ensure_usable(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(disposed());
        }
        Ok(())
    }

    /// Fail with `InvalidState` unless the provider is open and not disposed
    pub fn ensure_open(&self) -> Result<()> {
        self.ensure_usable()?;
        if !self.is_open {
            return Err(ProviderError::invalid_state(format!(
                "provider '{}' is closed",
                self.connection_id
            )));
        }
        Ok(())
    }
}

impl Default for ProviderCore {
    fn default() -> Self {
        Self::new("", 0)
    }
}

impl fmt::Debug for ProviderCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCore")
            .field("connection_id", &self.connection_id)
            .field("srid", &self.srid)
            .field("is_open", &self.is_open)
            .field("disposed", &self.is_disposed())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

fn disposed() -> ProviderError {
    ProviderError::invalid_state("provider has been disposed")
}
