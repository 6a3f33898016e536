use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Single-value mailbox with most-recent-wins semantics.
///
/// Publishing swaps in a new shared pointer; readers clone the pointer and
/// never observe a half-written value. Unread values are simply replaced.
#[derive(Debug)]
pub struct LatestSlot<T> {
    value: Mutex<Option<Arc<T>>>,
    generation: AtomicU64,
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self {
            value: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }
}

impl<T> LatestSlot<T> {
    pub fn publish(&self, value: T) {
        let value = Arc::new(value);
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = Some(value);
        self.generation.fetch_add(1, Ordering::Release);
    }

    pub fn clear(&self) {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.generation.fetch_add(1, Ordering::Release);
    }

    pub fn latest(&self) -> Option<Arc<T>> {
        self.value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Bumped on every publish or clear.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod latest_slot_tests {
    use super::*;

    #[test]
    fn newer_value_replaces_unread_value() {
        let slot = LatestSlot::default();
        assert!(slot.latest().is_none());
        slot.publish(1u32);
        slot.publish(2u32);
        assert_eq!(slot.latest().as_deref(), Some(&2));
        assert_eq!(slot.generation(), 2);
    }

    #[test]
    fn clear_removes_value_and_bumps_generation() {
        let slot = LatestSlot::default();
        slot.publish("frame");
        slot.clear();
        assert!(slot.latest().is_none());
        assert_eq!(slot.generation(), 2);
    }
}
