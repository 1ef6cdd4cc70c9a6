//! Light/dark appearance changes
//!
//! Subscribers are held weakly: subscribing never extends a card's
//! lifetime, and dead subscribers are pruned on the next publish.

use std::sync::{Arc, Mutex, PoisonError, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Appearance {
    #[default]
    Light,
    Dark,
}

impl Appearance {
    /// Separator colour for this appearance, as a hex string
    pub fn separator_color(&self) -> &'static str {
        match self {
            Appearance::Light => "#c6c6c8",
            Appearance::Dark => "#38383a",
        }
    }
}

/// Receives appearance changes
pub trait AppearanceObserver: Send + Sync {
    fn appearance_changed(&self, appearance: Appearance);
}

/// Publish/subscribe channel for appearance changes
#[derive(Default)]
pub struct AppearanceChannel {
    current: Mutex<Appearance>,
    subscribers: Mutex<Vec<Weak<dyn AppearanceObserver>>>,
}

impl AppearanceChannel {
    pub fn new(initial: Appearance) -> Self {
        Self {
            current: Mutex::new(initial),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn current(&self) -> Appearance {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe without taking ownership of the observer
    pub fn subscribe<O>(&self, observer: &Arc<O>)
    where
        O: AppearanceObserver + 'static,
    {
        let weak: Weak<dyn AppearanceObserver> = Arc::downgrade(observer) as Weak<dyn AppearanceObserver>;
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(weak);
    }

    /// Record the new appearance and notify live subscribers
    ///
    /// Returns how many subscribers were notified.
    pub fn publish(&self, appearance: Appearance) -> usize {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = appearance;

        // Collect under the lock, notify outside it
        let live: Vec<Arc<dyn AppearanceObserver>> = {
            let mut subscribers = self
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            subscribers.retain(|s| s.strong_count() > 0);
            subscribers.iter().filter_map(Weak::upgrade).collect()
        };

        for observer in &live {
            observer.appearance_changed(appearance);
        }
        live.len()
    }

    /// Number of subscribers still alive
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| s.strong_count() > 0)
            .count()
    }
}
