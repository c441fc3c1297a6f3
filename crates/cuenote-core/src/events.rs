//! Engine events and the observer list.
//!
//! Observers are plain callbacks invoked synchronously after a mutation
//! commits, in registration order. There is no event bus and no queue; a
//! slow observer slows the caller, which keeps delivery ordering trivial to
//! reason about.

use std::sync::Arc;

use uuid::Uuid;

use crate::interchange::ImportOutcome;
use crate::model::{Annotation, AnnotationLayer, AnnotationStatus, Interaction};
use crate::sync::Topic;

/// What just happened inside the engine.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Created(Annotation),
    Updated(Annotation),
    Deleted(Uuid),
    Interacted {
        id: Uuid,
        interaction: Interaction,
    },
    Replied {
        parent_id: Uuid,
        reply: Annotation,
    },
    StatusChanged {
        id: Uuid,
        status: AnnotationStatus,
    },
    LayerCreated(AnnotationLayer),
    LayerToggled {
        id: Uuid,
        visible: bool,
    },
    Imported(ImportOutcome),
    /// Expired records removed by the cleanup sweep.
    Expired(Vec<Uuid>),
    /// An inbound sync envelope was applied to the local store.
    RemoteApplied {
        topic: Topic,
    },
}

type Observer = Arc<dyn Fn(&EngineEvent) + Send + Sync>;

/// Registered callbacks, invoked in registration order.
#[derive(Default)]
pub struct ObserverSet {
    observers: Vec<Observer>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, observer: impl Fn(&EngineEvent) + Send + Sync + 'static) {
        self.observers.push(Arc::new(observer));
    }

    /// Cheap clone of the callback list, so callers can invoke observers
    /// without holding any lock.
    pub fn snapshot(&self) -> Vec<Observer> {
        self.observers.clone()
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_observers_run_in_registration_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut set = ObserverSet::new();

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            set.register(move |_| order.lock().unwrap().push(tag));
        }

        let event = EngineEvent::Deleted(Uuid::new_v4());
        for observer in set.snapshot() {
            observer(&event);
        }

        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_every_observer_sees_every_event() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut set = ObserverSet::new();
        for _ in 0..3 {
            let calls = Arc::clone(&calls);
            set.register(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            });
        }

        for observer in set.snapshot() {
            observer(&EngineEvent::Expired(vec![]));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
