//! Network stack notifier chain debugger
//!
//! Watches device lifecycle and interface address events and renders each
//! one as a single diagnostic line, decoding interface and feature flags
//! where the event carries them. Strictly passive: nothing is stored and
//! nothing is sent back to the kernel.
//!
//! # Architecture
//!
//! ```text
//! rtnetlink ──▶ NetlinkMonitor ──▶ DeviceCache ──▶ EventBus (netdev / inetaddr / inet6addr)
//!                                                      │
//!                                                      ▼
//!                                  ChainDebugger ──▶ EventFormatter ──▶ LineSink
//!                                                      │
//!                                         SymbolTable + decode + LineBuilder
//! ```

pub mod bitvec;
pub mod config;
pub mod device_cache;
pub mod error;
pub mod format;
pub mod line;
pub mod netlink;
pub mod notifier;
pub mod sink;
pub mod subscription;
pub mod symbols;
pub mod types;

pub use bitvec::{FlagNames, decode};
pub use config::{ChaindbgConfig, LogFormat, SinkKind};
pub use device_cache::{DeviceCache, LinkHint};
pub use error::{ChaindbgError, Result};
pub use format::{EventFormatter, Source};
pub use line::{LINE_CAPACITY, LineBuilder, line_capacity_for};
pub use netlink::{AsyncNetlinkMonitor, NetlinkMonitor};
pub use notifier::{BusEvent, EventBus, Notifier, NotifierChain, NotifierId, NotifyResult};
pub use sink::{LineSink, MemorySink, TracingSink, WriterSink};
pub use subscription::{ChainDebugger, ChainStats};
pub use symbols::{IFF_FLAGS, NETDEV_EVENTS, NETIF_FEATURES, SymbolTable, SymbolTables};
pub use types::{
    AddrRecord, DeviceRecord, EventCode, IfAddress, Inet4AddrRecord, Inet6AddrRecord,
    MacAddress, NetDevice,
};
