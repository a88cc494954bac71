//! In-process notifier chains
//!
//! A chain holds the callbacks registered for one event source and calls
//! them in registration order. Deliveries run under a read lock and
//! unregistration takes the write lock, so once `unregister` returns the
//! removed callback is never entered again.

use crate::types::{DeviceRecord, EventCode, Inet4AddrRecord, Inet6AddrRecord};
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// What a callback tells the chain after handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyResult {
    /// Not interested, keep going
    Done,
    /// Handled, keep going
    Ok,
    /// Stop calling further callbacks for this event
    Stop,
}

/// Callback registered on a chain
pub trait Notifier<P: ?Sized>: Send + Sync {
    fn notify(&self, code: EventCode, payload: &P) -> NotifyResult;
}

/// Handle returned by [`NotifierChain::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotifierId(u64);

/// Ordered list of callbacks for one payload type
pub struct NotifierChain<P: ?Sized> {
    name: &'static str,
    blocks: RwLock<Vec<(NotifierId, Arc<dyn Notifier<P>>)>>,
    next_id: AtomicU64,
}

impl<P: ?Sized> NotifierChain<P> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            blocks: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn register(&self, notifier: Arc<dyn Notifier<P>>) -> NotifierId {
        let id = NotifierId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.blocks.write().push((id, notifier));
        id
    }

    /// Remove a callback, waiting for deliveries already in progress
    ///
    /// Returns false if `id` was not registered.
    pub fn unregister(&self, id: NotifierId) -> bool {
        let mut blocks = self.blocks.write();
        let before = blocks.len();
        blocks.retain(|(block_id, _)| *block_id != id);
        blocks.len() != before
    }

    /// Deliver an event to every callback until one returns `Stop`
    pub fn call_chain(&self, code: EventCode, payload: &P) -> NotifyResult {
        let blocks = self.blocks.read();
        let mut result = NotifyResult::Done;
        for (_, block) in blocks.iter() {
            result = block.notify(code, payload);
            if result == NotifyResult::Stop {
                break;
            }
        }
        result
    }

    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }
}

/// One event as delivered by the kernel bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    Netdev(EventCode, DeviceRecord),
    Inetaddr(EventCode, Inet4AddrRecord),
    Inet6addr(EventCode, Inet6AddrRecord),
}

impl BusEvent {
    pub fn code(&self) -> EventCode {
        match self {
            BusEvent::Netdev(code, _)
            | BusEvent::Inetaddr(code, _)
            | BusEvent::Inet6addr(code, _) => *code,
        }
    }
}

/// The three chains the debugger listens on
pub struct EventBus {
    pub netdev: NotifierChain<DeviceRecord>,
    pub inetaddr: NotifierChain<Inet4AddrRecord>,
    pub inet6addr: NotifierChain<Inet6AddrRecord>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            netdev: NotifierChain::new("netdev"),
            inetaddr: NotifierChain::new("inetaddr"),
            inet6addr: NotifierChain::new("inet6addr"),
        }
    }

    /// Route an event to the chain for its source
    pub fn dispatch(&self, event: &BusEvent) -> NotifyResult {
        match event {
            BusEvent::Netdev(code, dev) => self.netdev.call_chain(*code, dev),
            BusEvent::Inetaddr(code, ifa) => self.inetaddr.call_chain(*code, ifa),
            BusEvent::Inet6addr(code, ifa) => self.inet6addr.call_chain(*code, ifa),
        }
    }
}
