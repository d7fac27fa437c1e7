//! Per-kind observer lists plus optional channel sinks.
//!
//! Handlers may call back into the editor, including edits that raise more
//! events, so nothing in here is borrowed while a handler runs. Each emit works
//! from a snapshot of the registry, and a handler that is still running when
//! its event recurs is skipped.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub type Handler = dyn FnMut(&mut crate::notification::BridgeEvent);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    /// `None` receives every event.
    kind: Option<crate::notification::EventKind>,
    handler: Rc<RefCell<Box<Handler>>>,
}

#[derive(Default)]
pub struct Observers {
    next_id: Cell<u64>,
    subscriptions: RefCell<Vec<Subscription>>,
    sinks: RefCell<Vec<crossbeam_channel::Sender<crate::notification::BridgeEvent>>>,
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("subscriptions", &self.subscriptions.borrow().len())
            .field("sinks", &self.sinks.borrow().len())
            .finish()
    }
}

impl Observers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &self,
        kind: crate::notification::EventKind,
        handler: impl FnMut(&mut crate::notification::BridgeEvent) + 'static,
    ) -> SubscriptionId {
        self.insert(Some(kind), Box::new(handler))
    }

    pub fn subscribe_all(
        &self,
        handler: impl FnMut(&mut crate::notification::BridgeEvent) + 'static,
    ) -> SubscriptionId {
        self.insert(None, Box::new(handler))
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.borrow_mut();
        let before = subscriptions.len();

        subscriptions.retain(|subscription| subscription.id != id);

        subscriptions.len() != before
    }

    /// A receiver that gets a copy of every event after the handlers have seen it.
    /// Dropping the receiver detaches it.
    pub fn channel(&self) -> crossbeam_channel::Receiver<crate::notification::BridgeEvent> {
        let (sender, receiver) = crossbeam_channel::unbounded();

        self.sinks.borrow_mut().push(sender);

        receiver
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn emit(&self, event: &mut crate::notification::BridgeEvent) {
        let kind = event.kind();
        let snapshot: Vec<(SubscriptionId, Rc<RefCell<Box<Handler>>>)> = self
            .subscriptions
            .borrow()
            .iter()
            .filter(|subscription| subscription.kind.is_none_or(|wanted| wanted == kind))
            .map(|subscription| (subscription.id, Rc::clone(&subscription.handler)))
            .collect();

        for (id, handler) in snapshot {
            match handler.try_borrow_mut() {
                Ok(mut handler) => (*handler)(event),
                Err(_) => tracing::warn!(?id, ?kind, "handler is already running; skipped"),
            }
        }

        // Sending never calls back out, so the borrow is safe here.
        self.sinks
            .borrow_mut()
            .retain(|sink| sink.send(event.clone()).is_ok());
    }

    fn insert(
        &self,
        kind: Option<crate::notification::EventKind>,
        handler: Box<Handler>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());

        self.next_id.set(self.next_id.get() + 1);
        self.subscriptions.borrow_mut().push(Subscription {
            id,
            kind,
            handler: Rc::new(RefCell::new(handler)),
        });

        id
    }
}
