//! Minimal observer used for track and controller notifications.

use std::fmt;

/// Handle returned by [`Signal::subscribe`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Slot<T> = Box<dyn FnMut(&T) + Send>;

/// Subscriber list firing in subscription order.
pub struct Signal<T> {
    next_id: u64,
    slots: Vec<(SubscriptionId, Slot<T>)>,
}

impl<T> Signal<T> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            slots: Vec::new(),
        }
    }

    pub fn subscribe<F>(&mut self, f: F) -> SubscriptionId
    where
        F: FnMut(&T) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.slots.push((id, Box::new(f)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.slots.len();
        self.slots.retain(|(sid, _)| *sid != id);
        self.slots.len() != before
    }

    pub fn fire(&mut self, args: &T) {
        for (_, slot) in self.slots.iter_mut() {
            slot(args);
        }
    }

    #[inline]
    pub fn has_subscribers(&self) -> bool {
        !self.slots.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("subscribers", &self.slots.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn fires_in_order_and_unsubscribes() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut sig: Signal<u32> = Signal::new();

        let a = {
            let seen = seen.clone();
            sig.subscribe(move |v| seen.lock().unwrap().push(("a", *v)))
        };
        {
            let seen = seen.clone();
            sig.subscribe(move |v| seen.lock().unwrap().push(("b", *v)));
        }

        sig.fire(&1);
        assert!(sig.unsubscribe(a));
        assert!(!sig.unsubscribe(a));
        sig.fire(&2);

        assert_eq!(*seen.lock().unwrap(), vec![("a", 1), ("b", 1), ("b", 2)]);
        assert_eq!(sig.len(), 1);
        sig.clear();
        assert!(!sig.has_subscribers());
    }
}
