//! Live product catalog.
//!
//! One background task owns the catalog: it loads every product once, then
//! re-reads the whole table whenever a [`CatalogSignal`] arrives (a Realtime
//! change or a resubscription) or a local write asks for a refresh. Each
//! read is published as a complete snapshot on a `watch` channel, so readers
//! never see a partially merged list. Re-reading everything on any change is
//! O(n) in the catalog size; the catalog is small and this keeps ordering
//! and deletes trivial.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use quickmart_core::{Product, ProductId};

use crate::db::ProductRepository;
use crate::supabase::{CatalogSignal, RestClient};

/// Queue depth for pending change signals.
const SIGNAL_CAPACITY: usize = 32;

/// Where the catalog is read from.
pub trait CatalogSource: Send + Sync + 'static {
    /// Every product, ordered by id. Failures yield an empty list.
    fn fetch_all(&self) -> impl Future<Output = Vec<Product>> + Send;
}

/// Reads the catalog from the `products` table.
pub struct RestCatalog {
    rest: RestClient,
}

impl RestCatalog {
    #[must_use]
    pub const fn new(rest: RestClient) -> Self {
        Self { rest }
    }
}

impl CatalogSource for RestCatalog {
    async fn fetch_all(&self) -> Vec<Product> {
        ProductRepository::new(&self.rest).get_products().await
    }
}

/// Shared handle to the latest catalog snapshot.
#[derive(Clone)]
pub struct CatalogFeed {
    snapshots: watch::Receiver<Arc<Vec<Product>>>,
    signals: mpsc::Sender<CatalogSignal>,
    refreshes: mpsc::Sender<oneshot::Sender<()>>,
}

impl CatalogFeed {
    /// Start the feed task for `source`.
    ///
    /// The first snapshot is an empty list until the initial read finishes.
    /// The task stops once every handle is dropped.
    pub fn start<S: CatalogSource>(source: S) -> (Self, JoinHandle<()>) {
        let (snapshot_tx, snapshots) = watch::channel(Arc::new(Vec::new()));
        let (signals, signal_rx) = mpsc::channel(SIGNAL_CAPACITY);
        let (refreshes, refresh_rx) = mpsc::channel(SIGNAL_CAPACITY);

        let task = tokio::spawn(run_feed(source, snapshot_tx, signal_rx, refresh_rx));

        (
            Self {
                snapshots,
                signals,
                refreshes,
            },
            task,
        )
    }

    /// The latest snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Vec<Product>> {
        Arc::clone(&self.snapshots.borrow())
    }

    /// Find a product in the latest snapshot.
    #[must_use]
    pub fn product(&self, id: ProductId) -> Option<Product> {
        self.snapshots.borrow().iter().find(|p| p.id == id).cloned()
    }

    /// Sender for change signals (used by the Realtime listener).
    #[must_use]
    pub fn signals(&self) -> mpsc::Sender<CatalogSignal> {
        self.signals.clone()
    }

    /// Ask for a re-read after a local write and wait until a snapshot
    /// read after this call is published. A read already in flight when
    /// the request arrives does not count, since it may predate the write.
    pub async fn refresh(&self) {
        let (ack, done) = oneshot::channel();

        if self.refreshes.send(ack).await.is_err() {
            tracing::warn!("Catalog task has stopped, refresh ignored");
            return;
        }
        if done.await.is_err() {
            tracing::warn!("Catalog task stopped during refresh");
        }
    }

    /// Wait until a snapshot newer than the last one seen by this handle
    /// is published. Returns `false` if the feed task has stopped.
    pub async fn changed(&mut self) -> bool {
        self.snapshots.changed().await.is_ok()
    }

    /// Call `callback` with the current snapshot and again after every
    /// change. Dropping the returned handle unsubscribes.
    pub fn on_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Arc<Vec<Product>>) + Send + 'static,
    {
        let mut snapshots = self.snapshots.clone();
        let task = tokio::spawn(async move {
            loop {
                let current = Arc::clone(&snapshots.borrow_and_update());
                callback(current);
                if snapshots.changed().await.is_err() {
                    break;
                }
            }
        });
        Subscription { task }
    }
}

/// Feed task: initial read, then one full re-read per batch of signals and
/// refresh requests. Refresh requests are acknowledged only after a read
/// that started once they were received.
async fn run_feed<S: CatalogSource>(
    source: S,
    snapshot_tx: watch::Sender<Arc<Vec<Product>>>,
    mut signal_rx: mpsc::Receiver<CatalogSignal>,
    mut refresh_rx: mpsc::Receiver<oneshot::Sender<()>>,
) {
    let products = source.fetch_all().await;
    tracing::info!(count = products.len(), "Catalog loaded");
    snapshot_tx.send_replace(Arc::new(products));

    loop {
        let mut waiters = Vec::new();
        tokio::select! {
            signal = signal_rx.recv() => {
                let Some(signal) = signal else { break };
                tracing::debug!(?signal, "Re-reading catalog");
            }
            request = refresh_rx.recv() => {
                let Some(ack) = request else { break };
                tracing::debug!("Re-reading catalog after local write");
                waiters.push(ack);
            }
        }

        // Everything queued so far is covered by the read below
        while let Ok(ack) = refresh_rx.try_recv() {
            waiters.push(ack);
        }
        while signal_rx.try_recv().is_ok() {}

        let products = source.fetch_all().await;
        snapshot_tx.send_replace(Arc::new(products));

        for ack in waiters {
            // The caller may have given up waiting
            let _ = ack.send(());
        }
    }
}

/// Active `on_change` subscription. Unsubscribes on drop.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    /// Stop receiving snapshots.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
