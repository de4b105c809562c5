use std::future::Future;

use tokio::sync::Mutex;

/// A single cached value loaded on first use and dropped by [`invalidate`].
///
/// The lock is held while loading, so concurrent readers share one load.
///
/// [`invalidate`]: ReadThroughCache::invalidate
#[derive(Debug)]
pub struct ReadThroughCache<T> {
    value: Mutex<Option<T>>,
}

impl<T: Clone> ReadThroughCache<T> {
    pub fn new() -> Self {
        Self {
            value: Mutex::new(None),
        }
    }

    /// Returns the cached value, running `load` only when nothing is cached.
    /// A failed load leaves the cache empty.
    pub async fn get_or_load<F, Fut, E>(&self, load: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut value = self.value.lock().await;
        if let Some(cached) = value.as_ref() {
            return Ok(cached.clone());
        }
        let loaded = load().await?;
        *value = Some(loaded.clone());
        Ok(loaded)
    }

    pub async fn peek(&self) -> Option<T> {
        self.value.lock().await.clone()
    }

    pub async fn invalidate(&self) {
        *self.value.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn loads_once_until_invalidated() {
        let cache = ReadThroughCache::new();
        let counter = AtomicUsize::new(0);
        let loads = &counter;
        let load = move || async move {
            loads.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ()>(vec![1, 2, 3])
        };

        assert_eq!(cache.get_or_load(load).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(cache.get_or_load(load).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        cache.invalidate().await;
        assert_eq!(cache.peek().await, None);
        cache.get_or_load(load).await.unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_load_is_not_cached() {
        let cache: ReadThroughCache<u32> = ReadThroughCache::new();
        assert!(cache.get_or_load(|| async { Err("offline") }).await.is_err());
        assert_eq!(cache.get_or_load(|| async { Ok::<_, &str>(7) }).await, Ok(7));
    }
}
