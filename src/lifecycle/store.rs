//! Observable value store.
//!
//! A thin wrapper over `tokio::sync::watch`: readers hold a receiver for as
//! long as they care and unsubscribe by dropping it. Writes that don't
//! change the value don't wake anyone.

use tokio::sync::watch;

#[derive(Debug)]
pub struct Store<T> {
    tx: watch::Sender<T>,
}

impl<T> Store<T>
where
    T: Clone + PartialEq,
{
    pub fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Stores `value`, notifying subscribers only if it changed.
    ///
    /// Returns whether the value changed.
    pub fn set(&self, value: T) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        })
    }

    pub fn update(&self, f: impl FnOnce(&T) -> T) -> bool {
        let next = f(&self.tx.borrow());
        self.set(next)
    }

    /// New subscription; the current value counts as already seen.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<T> Default for Store<T>
where
    T: Clone + PartialEq + Default,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set() {
        let store = Store::new(1u32);
        assert_eq!(store.get(), 1);
        assert!(store.set(2));
        assert!(!store.set(2));
        assert_eq!(store.get(), 2);
        assert!(store.update(|v| v * 10));
        assert_eq!(store.get(), 20);
    }

    #[test]
    fn test_subscriber_sees_changes_only() {
        let store = Store::new(false);
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());

        store.set(false);
        assert!(!rx.has_changed().unwrap());

        store.set(true);
        assert!(rx.has_changed().unwrap());
        assert!(*rx.borrow_and_update());
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_unsubscribe_by_drop() {
        let store: Store<bool> = Store::default();
        let rx = store.subscribe();
        assert_eq!(store.subscriber_count(), 1);
        drop(rx);
        assert_eq!(store.subscriber_count(), 0);
        // Writes still land with nobody listening
        assert!(store.set(true));
        assert!(store.get());
    }

    #[tokio::test]
    async fn test_changed_wakes_subscriber() {
        let store = std::sync::Arc::new(Store::new(0u8));
        let mut rx = store.subscribe();
        let writer = std::sync::Arc::clone(&store);
        tokio::spawn(async move {
            writer.set(7);
        });
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 7);
    }
}
