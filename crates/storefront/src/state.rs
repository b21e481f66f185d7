//! Application state shared across handlers.

use std::sync::Arc;

use secrecy::ExposeSecret;
use tokio::task::JoinHandle;

use crate::config::StorefrontConfig;
use crate::services::{CatalogFeed, CatalogSource, RestCatalog, SessionMirror};
use crate::supabase::{ProductListener, SupabaseClient};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// backend clients, the session mirror and the live catalog.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    supabase: SupabaseClient,
    mirror: SessionMirror,
    catalog: CatalogFeed,
    tasks: Vec<JoinHandle<()>>,
}

impl Drop for AppStateInner {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl AppState {
    /// Build the state and start its background tasks: the catalog feed,
    /// the Realtime product listener and the auth event listener.
    ///
    /// Must be called inside a Tokio runtime.
    #[must_use]
    pub fn start(config: StorefrontConfig) -> Self {
        let supabase = SupabaseClient::new(&config.supabase);
        let catalog = RestCatalog::new(supabase.rest().clone());
        let mut state = Self::with_catalog(config, supabase, catalog);

        let realtime_task = {
            let config = &state.inner.config.supabase;
            ProductListener::new(config.realtime_url(), config.anon_key.expose_secret())
                .spawn(state.inner.catalog.signals())
        };
        if let Some(inner) = Arc::get_mut(&mut state.inner) {
            inner.tasks.push(realtime_task);
        }

        state
    }

    /// Build the state around any catalog source, without a Realtime
    /// listener. Changes reach the catalog only through explicit refreshes.
    #[must_use]
    pub fn with_catalog<S: CatalogSource>(
        config: StorefrontConfig,
        supabase: SupabaseClient,
        source: S,
    ) -> Self {
        let mirror = SessionMirror::new(supabase.rest().clone(), config.owner_email.clone());
        let mirror_task = mirror.spawn_listener(supabase.auth().subscribe());
        let (catalog, catalog_task) = CatalogFeed::start(source);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                supabase,
                mirror,
                catalog,
                tasks: vec![mirror_task, catalog_task],
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the backend clients.
    #[must_use]
    pub fn supabase(&self) -> &SupabaseClient {
        &self.inner.supabase
    }

    /// Get a reference to the session mirror.
    #[must_use]
    pub fn mirror(&self) -> &SessionMirror {
        &self.inner.mirror
    }

    /// Get a reference to the live catalog.
    #[must_use]
    pub fn catalog(&self) -> &CatalogFeed {
        &self.inner.catalog
    }
}
