//! Event codes and the records delivered on the notifier chains
//!
//! Formatters only read records through the [`NetDevice`] and [`IfAddress`]
//! traits, so any payload that can answer those accessors can be rendered.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Maximum interface name length, including the trailing NUL (IFNAMSIZ)
pub const IFNAMSIZ: usize = 16;

/// Lifecycle event code delivered with every notification
///
/// Codes `1..=EventCode::MAX_KNOWN` have names in the event symbol table.
/// Anything else is still a valid code and renders as bare hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventCode(pub u64);

impl EventCode {
    pub const UP: Self = Self(0x01);
    pub const DOWN: Self = Self(0x02);
    pub const REBOOT: Self = Self(0x03);
    pub const CHANGE: Self = Self(0x04);
    pub const REGISTER: Self = Self(0x05);
    pub const UNREGISTER: Self = Self(0x06);
    pub const CHANGEMTU: Self = Self(0x07);
    pub const CHANGEADDR: Self = Self(0x08);
    pub const GOING_DOWN: Self = Self(0x09);
    pub const CHANGENAME: Self = Self(0x0a);
    pub const FEAT_CHANGE: Self = Self(0x0b);
    pub const BONDING_FAILOVER: Self = Self(0x0c);
    pub const PRE_UP: Self = Self(0x0d);
    pub const PRE_TYPE_CHANGE: Self = Self(0x0e);
    pub const POST_TYPE_CHANGE: Self = Self(0x0f);
    pub const POST_INIT: Self = Self(0x10);
    pub const UNREGISTER_FINAL: Self = Self(0x11);
    pub const RELEASE: Self = Self(0x12);
    pub const NOTIFY_PEERS: Self = Self(0x13);
    pub const JOIN: Self = Self(0x14);

    /// Highest code with a symbolic name
    pub const MAX_KNOWN: u64 = Self::JOIN.0;

    /// Raw numeric value
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Whether the code falls inside `[1, MAX_KNOWN]`
    pub const fn is_known(self) -> bool {
        self.0 >= 1 && self.0 <= Self::MAX_KNOWN
    }
}

impl From<u64> for EventCode {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::LowerHex for EventCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// A 48-bit Ethernet hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// The zero/null MAC address (00:00:00:00:00:00).
    pub const ZERO: MacAddress = MacAddress([0; 6]);

    /// Creates a new MAC address from raw bytes.
    pub const fn new(bytes: [u8; 6]) -> Self {
        MacAddress(bytes)
    }

    /// Builds an address from a link-layer address of any length.
    ///
    /// Shorter addresses are zero padded, longer ones keep their first six
    /// octets.
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut out = [0u8; 6];
        let n = bytes.len().min(out.len());
        out[..n].copy_from_slice(&bytes[..n]);
        MacAddress(out)
    }

    /// Returns the raw bytes of the MAC address.
    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(bytes: [u8; 6]) -> Self {
        MacAddress(bytes)
    }
}

/// Read-only view of a network device
pub trait NetDevice {
    fn name(&self) -> &str;
    fn ifindex(&self) -> u32;
    /// Interface flags (`IFF_*` bits)
    fn flags(&self) -> u32;
    /// Offload feature bits (`NETIF_F_*`)
    fn features(&self) -> u64;
    fn mtu(&self) -> u32;
    fn hw_addr(&self) -> MacAddress;
    /// ARPHRD link type
    fn link_type(&self) -> u16;
}

/// Read-only view of an interface address record
pub trait IfAddress {
    type Addr: fmt::Display;

    fn address(&self) -> Self::Addr;

    /// The device owning the address, if it can still be resolved
    fn device(&self) -> Option<&dyn NetDevice>;
}

/// Snapshot of a device as seen by the notifier chains
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceRecord {
    pub ifindex: u32,
    pub name: String,
    pub flags: u32,
    pub features: u64,
    pub mtu: u32,
    pub hw_addr: MacAddress,
    pub link_type: u16,
}

impl DeviceRecord {
    /// Create a record with only index and name known
    pub fn new(ifindex: u32, name: impl Into<String>) -> Self {
        Self {
            ifindex,
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_features(mut self, features: u64) -> Self {
        self.features = features;
        self
    }

    pub fn with_mtu(mut self, mtu: u32) -> Self {
        self.mtu = mtu;
        self
    }

    pub fn with_hw_addr(mut self, hw_addr: MacAddress) -> Self {
        self.hw_addr = hw_addr;
        self
    }

    pub fn with_link_type(mut self, link_type: u16) -> Self {
        self.link_type = link_type;
        self
    }
}

impl NetDevice for DeviceRecord {
    fn name(&self) -> &str {
        &self.name
    }

    fn ifindex(&self) -> u32 {
        self.ifindex
    }

    fn flags(&self) -> u32 {
        self.flags
    }

    fn features(&self) -> u64 {
        self.features
    }

    fn mtu(&self) -> u32 {
        self.mtu
    }

    fn hw_addr(&self) -> MacAddress {
        self.hw_addr
    }

    fn link_type(&self) -> u16 {
        self.link_type
    }
}

/// Address record generic over the address family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddrRecord<A> {
    pub address: A,
    pub prefix_len: u8,
    pub device: Option<DeviceRecord>,
}

/// IPv4 interface address (inetaddr chain payload)
pub type Inet4AddrRecord = AddrRecord<Ipv4Addr>;

/// IPv6 interface address (inet6addr chain payload)
pub type Inet6AddrRecord = AddrRecord<Ipv6Addr>;

impl<A> AddrRecord<A> {
    pub fn new(address: A, prefix_len: u8, device: Option<DeviceRecord>) -> Self {
        Self {
            address,
            prefix_len,
            device,
        }
    }
}

impl<A: fmt::Display + Copy> IfAddress for AddrRecord<A> {
    type Addr = A;

    fn address(&self) -> A {
        self.address
    }

    fn device(&self) -> Option<&dyn NetDevice> {
        self.device.as_ref().map(|d| d as &dyn NetDevice)
    }
}
