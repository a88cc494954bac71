//! Device cache turning rtnetlink snapshots into notifier events
//!
//! rtnetlink reports the new state of a link, not the notifier event that
//! caused it. The cache keeps the last state per ifindex and derives the
//! lifecycle codes from what changed. Address messages map to `UP` (added)
//! and `DOWN` (removed), as the kernel's address chains do.

use crate::notifier::BusEvent;
use crate::types::{AddrRecord, DeviceRecord, EventCode};
use std::collections::HashMap;
use std::net::IpAddr;
use tracing::debug;

/// IFF_UP bit of the interface flags
pub const IFF_UP: u32 = 0x1;

/// Event hint carried in `IFLA_EVENT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkHint {
    Reboot,
    Features,
    BondingFailover,
    NotifyPeers,
}

impl LinkHint {
    pub fn code(self) -> EventCode {
        match self {
            LinkHint::Reboot => EventCode::REBOOT,
            LinkHint::Features => EventCode::FEAT_CHANGE,
            LinkHint::BondingFailover => EventCode::BONDING_FAILOVER,
            LinkHint::NotifyPeers => EventCode::NOTIFY_PEERS,
        }
    }
}

/// Last known state of every device, keyed by ifindex
#[derive(Debug, Default)]
pub struct DeviceCache {
    devices: HashMap<u32, DeviceRecord>,
}

impl DeviceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, ifindex: u32) -> Option<&DeviceRecord> {
        self.devices.get(&ifindex)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Record a new link snapshot and return the events it implies
    pub fn observe_link(&mut self, mut dev: DeviceRecord, hint: Option<LinkHint>) -> Vec<BusEvent> {
        if !self.devices.contains_key(&dev.ifindex) {
            debug!(ifindex = dev.ifindex, name = %dev.name, "new device");
            self.devices.insert(dev.ifindex, dev.clone());
            return vec![BusEvent::Netdev(EventCode::REGISTER, dev)];
        }
        let prev = &self.devices[&dev.ifindex];

        // rtnetlink does not carry the feature set
        if dev.features == 0 {
            dev.features = prev.features;
        }

        let mut codes = Vec::new();
        if let Some(hint) = hint {
            codes.push(hint.code());
        }
        if prev.name != dev.name {
            codes.push(EventCode::CHANGENAME);
        }
        if prev.mtu != dev.mtu {
            codes.push(EventCode::CHANGEMTU);
        }
        if prev.hw_addr != dev.hw_addr {
            codes.push(EventCode::CHANGEADDR);
        }
        if prev.link_type != dev.link_type {
            codes.push(EventCode::POST_TYPE_CHANGE);
        }
        let changed = prev.flags ^ dev.flags;
        if changed & IFF_UP != 0 {
            codes.push(if dev.flags & IFF_UP != 0 {
                EventCode::UP
            } else {
                EventCode::DOWN
            });
        }
        if changed & !IFF_UP != 0 {
            codes.push(EventCode::CHANGE);
        }

        self.devices.insert(dev.ifindex, dev.clone());
        codes
            .into_iter()
            .map(|code| BusEvent::Netdev(code, dev.clone()))
            .collect()
    }

    /// Forget a removed link
    ///
    /// The event carries the cached state when the message lacks fields.
    pub fn remove_link(&mut self, dev: DeviceRecord) -> BusEvent {
        let dev = match self.devices.remove(&dev.ifindex) {
            Some(prev) if dev.name.is_empty() => prev,
            _ => dev,
        };
        BusEvent::Netdev(EventCode::UNREGISTER, dev)
    }

    /// Device owning `ifindex`, from the cache or the system
    pub fn resolve(&self, ifindex: u32) -> Option<DeviceRecord> {
        if let Some(dev) = self.devices.get(&ifindex) {
            return Some(dev.clone());
        }
        named_device(ifindex, lookup_ifname(ifindex))
    }

    /// Build the event for an address being added or removed
    pub fn address_event(
        &self,
        added: bool,
        addr: IpAddr,
        prefix_len: u8,
        ifindex: u32,
    ) -> BusEvent {
        let code = if added { EventCode::UP } else { EventCode::DOWN };
        let device = self.resolve(ifindex);
        match addr {
            IpAddr::V4(v4) => BusEvent::Inetaddr(code, AddrRecord::new(v4, prefix_len, device)),
            IpAddr::V6(v6) => BusEvent::Inet6addr(code, AddrRecord::new(v6, prefix_len, device)),
        }
    }
}

// if_indextoname yields an empty name for a vanished ifindex
fn named_device(ifindex: u32, name: Option<String>) -> Option<DeviceRecord> {
    name.filter(|name| !name.is_empty())
        .map(|name| DeviceRecord::new(ifindex, name))
}

#[cfg(target_os = "linux")]
fn lookup_ifname(ifindex: u32) -> Option<String> {
    nix::net::if_::if_indextoname(ifindex)
        .ok()
        .map(|name| name.to_string_lossy().into_owned())
}

#[cfg(not(target_os = "linux"))]
fn lookup_ifname(_ifindex: u32) -> Option<String> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MacAddress;
    use pretty_assertions::assert_eq;
    use std::net::{Ipv4Addr, Ipv6Addr};

    // ifindex no real host will have
    const GHOST: u32 = 0x7fff_fff0;

    fn eth(flags: u32) -> DeviceRecord {
        DeviceRecord::new(GHOST, "eth0")
            .with_flags(flags)
            .with_mtu(1500)
            .with_hw_addr(MacAddress::new([2, 0, 0, 0, 0, 1]))
            .with_link_type(1)
    }

    fn codes(events: &[BusEvent]) -> Vec<EventCode> {
        events.iter().map(BusEvent::code).collect()
    }

    #[test]
    fn test_first_sighting_registers() {
        let mut cache = DeviceCache::new();
        let events = cache.observe_link(eth(0x1002), None);
        assert_eq!(codes(&events), vec![EventCode::REGISTER]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_unchanged_snapshot_is_silent() {
        let mut cache = DeviceCache::new();
        cache.observe_link(eth(0x1002), None);
        assert!(cache.observe_link(eth(0x1002), None).is_empty());
    }

    #[test]
    fn test_up_and_down() {
        let mut cache = DeviceCache::new();
        cache.observe_link(eth(0x1002), None);
        assert_eq!(
            codes(&cache.observe_link(eth(0x1003), None)),
            vec![EventCode::UP]
        );
        assert_eq!(
            codes(&cache.observe_link(eth(0x1002), None)),
            vec![EventCode::DOWN]
        );
    }

    #[test]
    fn test_other_flags_are_change() {
        let mut cache = DeviceCache::new();
        cache.observe_link(eth(0x1003), None);
        let events = cache.observe_link(eth(0x11043), None);
        assert_eq!(codes(&events), vec![EventCode::CHANGE]);
        match &events[0] {
            BusEvent::Netdev(_, dev) => assert_eq!(dev.flags, 0x11043),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_mtu_name_addr_type() {
        let mut cache = DeviceCache::new();
        cache.observe_link(eth(0x1003), None);

        let mut dev = eth(0x1003).with_mtu(9000);
        dev.name = "wan0".to_string();
        dev.hw_addr = MacAddress::new([2, 0, 0, 0, 0, 2]);
        dev.link_type = 772;
        assert_eq!(
            codes(&cache.observe_link(dev, None)),
            vec![
                EventCode::CHANGENAME,
                EventCode::CHANGEMTU,
                EventCode::CHANGEADDR,
                EventCode::POST_TYPE_CHANGE,
            ]
        );
    }

    #[test]
    fn test_hint_comes_first() {
        let mut cache = DeviceCache::new();
        cache.observe_link(eth(0x1003), None);
        let events = cache.observe_link(eth(0x1003), Some(LinkHint::Features));
        assert_eq!(codes(&events), vec![EventCode::FEAT_CHANGE]);
        assert_eq!(LinkHint::Reboot.code(), EventCode::REBOOT);
        assert_eq!(LinkHint::BondingFailover.code(), EventCode::BONDING_FAILOVER);
        assert_eq!(LinkHint::NotifyPeers.code(), EventCode::NOTIFY_PEERS);
    }

    #[test]
    fn test_features_carried_over() {
        let mut cache = DeviceCache::new();
        cache.observe_link(eth(0x1003).with_features(0x3), None);
        let events = cache.observe_link(eth(0x1003), Some(LinkHint::Features));
        match &events[0] {
            BusEvent::Netdev(_, dev) => assert_eq!(dev.features, 0x3),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_remove_uses_cached_state() {
        let mut cache = DeviceCache::new();
        cache.observe_link(eth(0x1003), None);
        let event = cache.remove_link(DeviceRecord::new(GHOST, ""));
        assert_eq!(event, BusEvent::Netdev(EventCode::UNREGISTER, eth(0x1003)));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_address_event_with_cached_device() {
        let mut cache = DeviceCache::new();
        cache.observe_link(eth(0x1003), None);
        let event = cache.address_event(true, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 24, GHOST);
        match event {
            BusEvent::Inetaddr(code, ifa) => {
                assert_eq!(code, EventCode::UP);
                assert_eq!(ifa.device.map(|d| d.name), Some("eth0".to_string()));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_address_event_unknown_device() {
        let cache = DeviceCache::new();
        let event = cache.address_event(false, IpAddr::V6(Ipv6Addr::LOCALHOST), 128, GHOST);
        match event {
            BusEvent::Inet6addr(code, ifa) => {
                assert_eq!(code, EventCode::DOWN);
                assert!(ifa.device.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_empty_system_name_is_unresolved() {
        assert_eq!(named_device(7, Some(String::new())), None);
        assert_eq!(named_device(7, None), None);
        assert_eq!(
            named_device(7, Some("eth7".to_string())),
            Some(DeviceRecord::new(7, "eth7"))
        );
    }

    #[test]
    fn test_resolve_ghost_ifindex() {
        assert_eq!(DeviceCache::new().resolve(GHOST), None);
    }
}
