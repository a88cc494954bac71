//! Registers the formatters on the event bus
//!
//! One notifier per source renders the event and hands the line to the
//! sink. Notifiers always return [`NotifyResult::Done`] and never block the
//! chain beyond formatting one line.

use crate::format::{EventFormatter, Source};
use crate::notifier::{EventBus, Notifier, NotifierId, NotifyResult};
use crate::sink::LineSink;
use crate::types::{DeviceRecord, EventCode, Inet4AddrRecord, Inet6AddrRecord};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::info;

/// Lines emitted per source since the debugger was created
#[derive(Debug, Default)]
pub struct ChainStats {
    netdev: AtomicU64,
    inetaddr: AtomicU64,
    inet6addr: AtomicU64,
    dropped: AtomicU64,
}

impl ChainStats {
    pub fn emitted(&self, source: Source) -> u64 {
        self.counter(source).load(Ordering::Relaxed)
    }

    /// Events that produced no line
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn counter(&self, source: Source) -> &AtomicU64 {
        match source {
            Source::Netdev => &self.netdev,
            Source::Inetaddr => &self.inetaddr,
            Source::Inet6addr => &self.inet6addr,
        }
    }

    fn record(&self, source: Source, line: Option<String>, sink: &dyn LineSink) {
        match line {
            Some(line) => {
                sink.emit(&line);
                self.counter(source).fetch_add(1, Ordering::Relaxed);
            }
            None => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

struct Handler {
    formatter: Arc<EventFormatter>,
    sink: Arc<dyn LineSink>,
    stats: Arc<ChainStats>,
    // cleared as soon as unload starts, before any chain is released
    active: AtomicBool,
}

impl Handler {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl Notifier<DeviceRecord> for Handler {
    fn notify(&self, code: EventCode, dev: &DeviceRecord) -> NotifyResult {
        if !self.is_active() {
            return NotifyResult::Done;
        }
        let line = self.formatter.format_netdev(code, dev);
        self.stats.record(Source::Netdev, line, self.sink.as_ref());
        NotifyResult::Done
    }
}

impl Notifier<Inet4AddrRecord> for Handler {
    fn notify(&self, code: EventCode, ifa: &Inet4AddrRecord) -> NotifyResult {
        if !self.is_active() {
            return NotifyResult::Done;
        }
        let line = self.formatter.format_inetaddr(code, ifa);
        self.stats.record(Source::Inetaddr, line, self.sink.as_ref());
        NotifyResult::Done
    }
}

impl Notifier<Inet6AddrRecord> for Handler {
    fn notify(&self, code: EventCode, ifa: &Inet6AddrRecord) -> NotifyResult {
        if !self.is_active() {
            return NotifyResult::Done;
        }
        let line = self.formatter.format_inet6addr(code, ifa);
        self.stats.record(Source::Inet6addr, line, self.sink.as_ref());
        NotifyResult::Done
    }
}

#[derive(Debug, Clone, Copy)]
struct Registrations {
    netdev: NotifierId,
    inetaddr: NotifierId,
    inet6addr: NotifierId,
}

/// Subscription manager for the three notifier chains
pub struct ChainDebugger {
    bus: Arc<EventBus>,
    handler: Arc<Handler>,
    registrations: Option<Registrations>,
}

impl ChainDebugger {
    pub fn new(bus: Arc<EventBus>, formatter: EventFormatter, sink: Arc<dyn LineSink>) -> Self {
        Self {
            bus,
            handler: Arc::new(Handler {
                formatter: Arc::new(formatter),
                sink,
                stats: Arc::new(ChainStats::default()),
                active: AtomicBool::new(false),
            }),
            registrations: None,
        }
    }

    /// Register on all three chains; no-op if already loaded
    pub fn load(&mut self) {
        if self.registrations.is_some() {
            return;
        }
        info!("CHAINDBG loading");
        self.handler.active.store(true, Ordering::Release);
        let netdev: Arc<dyn Notifier<DeviceRecord>> = self.handler.clone();
        let inetaddr: Arc<dyn Notifier<Inet4AddrRecord>> = self.handler.clone();
        let inet6addr: Arc<dyn Notifier<Inet6AddrRecord>> = self.handler.clone();
        self.registrations = Some(Registrations {
            netdev: self.bus.netdev.register(netdev),
            inetaddr: self.bus.inetaddr.register(inetaddr),
            inet6addr: self.bus.inet6addr.register(inet6addr),
        });
    }

    /// Deregister from all three chains; no-op if not loaded
    ///
    /// No event is formatted once this is entered, on any chain. Returns
    /// once no notifier of this debugger is running.
    pub fn unload(&mut self) {
        let Some(regs) = self.registrations.take() else {
            return;
        };
        self.handler.active.store(false, Ordering::Release);
        info!("CHAINDBG unloading");
        self.bus.netdev.unregister(regs.netdev);
        self.bus.inetaddr.unregister(regs.inetaddr);
        self.bus.inet6addr.unregister(regs.inet6addr);
    }

    pub fn is_loaded(&self) -> bool {
        self.registrations.is_some()
    }

    pub fn stats(&self) -> &ChainStats {
        &self.handler.stats
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }
}

impl Drop for ChainDebugger {
    fn drop(&mut self) {
        self.unload();
    }
}
