// One lock per store file, plus a deadline on every trip to the disk
use crate::store::SubscriptionStore;
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::warn;

/// Serialized, deadline-guarded access to a [`SubscriptionStore`]
///
/// The store itself has no locking. Anything that may write concurrently
/// (say, a background auto-backup racing a foreground edit) goes through
/// one of these so operations on the same file run strictly one at a time.
#[derive(Clone)]
pub struct SharedStore {
    inner: Arc<Mutex<SubscriptionStore>>,
    timeout: Duration,
}

impl SharedStore {
    pub fn new(store: SubscriptionStore, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `op` against the store on the blocking pool
    ///
    /// Waiting for the lock counts against the deadline too. On expiry the
    /// caller gets `Error::TimeoutError`; the operation itself may still finish
    /// in the background and keeps the lock until it does.
    pub async fn run<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&SubscriptionStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let task = tokio::task::spawn_blocking(move || {
            let store = inner.blocking_lock();
            op(&store)
        });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(Error::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Store task failed: {}", join_error),
            ))),
            Err(_) => {
                warn!("Store operation exceeded {:?}", self.timeout);
                Err(Error::TimeoutError(self.timeout))
            }
        }
    }
}
