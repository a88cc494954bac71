//! Event formatters
//!
//! Each formatter turns one event record into one finished diagnostic line:
//!
//! ```text
//! C: NETDEV DEV: eth0 EVENT: NETDEV_CHANGEMTU (0x7) MTU: 9000
//! C: NETDEV DEV: eth0 EVENT: 0x2a
//! C: INETADDR DEV: eth0 EVENT: NETDEV_UP (0x1) ADDR: 192.0.2.1
//! ```
//!
//! Formatters hold no mutable state. The line buffer belongs to the call
//! that renders it, so any number of threads can format concurrently.

use crate::bitvec::decode;
use crate::line::{LineBuilder, line_capacity_for};
use crate::symbols::SymbolTables;
use crate::types::{EventCode, IfAddress, NetDevice};
use std::fmt;
use tracing::debug;

/// Notifier chain an event arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Netdev,
    Inetaddr,
    Inet6addr,
}

impl Source {
    /// Label printed after `C:`
    pub fn label(&self) -> &'static str {
        match self {
            Source::Netdev => "NETDEV",
            Source::Inetaddr => "INETADDR",
            Source::Inet6addr => "INET6ADDR",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Renders events against a set of symbol tables
#[derive(Debug, Clone)]
pub struct EventFormatter {
    tables: SymbolTables,
    capacity: usize,
}

impl Default for EventFormatter {
    fn default() -> Self {
        Self::with_tables(SymbolTables::default())
    }
}

impl EventFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Formatter over `tables`, with line capacity sized to fit them
    pub fn with_tables(tables: SymbolTables) -> Self {
        Self {
            capacity: line_capacity_for(&tables),
            tables,
        }
    }

    /// Override the line capacity
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn tables(&self) -> &SymbolTables {
        &self.tables
    }

    /// Format a device lifecycle event
    ///
    /// Known events carry extra fields depending on what changed; unknown
    /// codes stop after the hex code.
    pub fn format_netdev<D>(&self, code: EventCode, dev: &D) -> Option<String>
    where
        D: NetDevice + ?Sized,
    {
        let (mut line, known) = self.begin(Source::Netdev, dev.name(), code)?;
        if known {
            self.append_device_fields(&mut line, code, dev);
        }
        Some(self.finish(Source::Netdev, line))
    }

    /// Format an IPv4 address event; `None` if the owning device is gone
    pub fn format_inetaddr<A>(&self, code: EventCode, ifa: &A) -> Option<String>
    where
        A: IfAddress + ?Sized,
    {
        self.format_addr(Source::Inetaddr, code, ifa)
    }

    /// Format an IPv6 address event; `None` if the owning device is gone
    pub fn format_inet6addr<A>(&self, code: EventCode, ifa: &A) -> Option<String>
    where
        A: IfAddress + ?Sized,
    {
        self.format_addr(Source::Inet6addr, code, ifa)
    }

    fn format_addr<A>(&self, source: Source, code: EventCode, ifa: &A) -> Option<String>
    where
        A: IfAddress + ?Sized,
    {
        let Some(dev) = ifa.device() else {
            debug!(source = %source, code = code.raw(), "address event without device, dropped");
            return None;
        };
        let (mut line, _) = self.begin(source, dev.name(), code)?;
        line.append_fmt(format_args!(" ADDR: {}", ifa.address()));
        Some(self.finish(source, line))
    }

    /// Allocate the line and write the common prefix and event name
    ///
    /// The flag tells whether the code resolved to a name.
    fn begin(
        &self,
        source: Source,
        dev_name: &str,
        code: EventCode,
    ) -> Option<(LineBuilder, bool)> {
        let Some(mut line) = LineBuilder::new(self.capacity) else {
            debug!(source = %source, code = code.raw(), "line allocation failed, event dropped");
            return None;
        };
        line.append_fmt(format_args!("C: {} DEV: {} EVENT: ", source, dev_name));

        let name = if code.is_known() {
            self.tables.events.resolve(code.raw())
        } else {
            None
        };
        match name {
            Some(name) => {
                line.append_fmt(format_args!(
                    "{}_{} (0x{:x})",
                    self.tables.events.category(),
                    name,
                    code
                ));
                Some((line, true))
            }
            None => {
                line.append_fmt(format_args!("0x{:x}", code));
                Some((line, false))
            }
        }
    }

    fn append_device_fields<D>(&self, line: &mut LineBuilder, code: EventCode, dev: &D)
    where
        D: NetDevice + ?Sized,
    {
        match code {
            EventCode::CHANGEADDR => line.append_fmt(format_args!(" MAC: {}", dev.hw_addr())),
            EventCode::CHANGEMTU => line.append_fmt(format_args!(" MTU: {}", dev.mtu())),
            EventCode::PRE_TYPE_CHANGE | EventCode::POST_TYPE_CHANGE => {
                line.append_fmt(format_args!(" TYPE: 0x{:x}", dev.link_type()))
            }
            EventCode::CHANGE => {
                let flags = dev.flags();
                line.append_fmt(format_args!(
                    " FLAGS: 0x{:x} <{}>",
                    flags,
                    decode(u64::from(flags), u32::BITS, &self.tables.iff)
                ))
            }
            EventCode::FEAT_CHANGE => {
                let features = dev.features();
                line.append_fmt(format_args!(
                    " FEATURES: 0x{:x} <{}>",
                    features,
                    decode(features, u64::BITS, &self.tables.features)
                ))
            }
            _ => {}
        }
    }

    fn finish(&self, source: Source, line: LineBuilder) -> String {
        if line.is_truncated() {
            debug!(source = %source, capacity = self.capacity, "diagnostic line truncated");
        }
        line.finish()
    }
}
