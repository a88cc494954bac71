//! Netlink socket feeding the event bus
//!
//! Subscribes to the rtnetlink link and address multicast groups and turns
//! every RTM_NEWLINK, RTM_DELLINK, RTM_NEWADDR and RTM_DELADDR message into
//! [`BusEvent`]s through the [`DeviceCache`].
//! On non-Linux platforms a mock that never produces events is used.

#[cfg(target_os = "linux")]
mod linux {
    use crate::config::NetlinkConfig;
    use crate::device_cache::{DeviceCache, LinkHint};
    use crate::error::{ChaindbgError, Result};
    use crate::notifier::BusEvent;
    use crate::types::{DeviceRecord, MacAddress};
    use netlink_packet_core::{NLM_F_DUMP, NLM_F_REQUEST, NetlinkHeader, NetlinkMessage, NetlinkPayload};
    use netlink_packet_route::RouteNetlinkMessage;
    use netlink_packet_route::address::{AddressAttribute, AddressMessage};
    use netlink_packet_route::link::{LinkAttribute, LinkEvent, LinkMessage};
    use netlink_sys::{Socket, SocketAddr, protocols::NETLINK_ROUTE};
    use std::net::IpAddr;
    use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
    use tokio::io::unix::AsyncFd;
    use tracing::{debug, instrument, trace, warn};

    /// rtnetlink multicast groups (linux/rtnetlink.h)
    const RTNLGRP_LINK: u32 = 1;
    const RTNLGRP_IPV4_IFADDR: u32 = 5;
    const RTNLGRP_IPV6_IFADDR: u32 = 9;

    const fn group_mask(group: u32) -> u32 {
        1 << (group - 1)
    }

    /// Largest single datagram the kernel sends for these groups
    const RECV_BUFFER_LEN: usize = 65536;

    /// Blocking-capable rtnetlink socket with its device cache
    pub struct NetlinkMonitor {
        socket: Socket,
        buffer: Vec<u8>,
        cache: DeviceCache,
    }

    impl NetlinkMonitor {
        /// Create and bind a socket subscribed to link and address events
        #[instrument(skip(config))]
        pub fn new(config: &NetlinkConfig) -> Result<Self> {
            let mut socket = Socket::new(NETLINK_ROUTE)
                .map_err(|e| ChaindbgError::Netlink(format!("Failed to create socket: {}", e)))?;

            let groups = group_mask(RTNLGRP_LINK)
                | group_mask(RTNLGRP_IPV4_IFADDR)
                | group_mask(RTNLGRP_IPV6_IFADDR);
            let addr = SocketAddr::new(0, groups);
            socket
                .bind(&addr)
                .map_err(|e| ChaindbgError::Netlink(format!("Failed to bind socket: {}", e)))?;
            debug!(groups, "Netlink socket bound to link and address groups");

            let monitor = Self {
                socket,
                buffer: Vec::with_capacity(RECV_BUFFER_LEN),
                cache: DeviceCache::new(),
            };
            monitor.tune_socket(config.recv_buffer_size);
            Ok(monitor)
        }

        fn tune_socket(&self, recv_buffer_size: usize) {
            let fd = self.socket.as_raw_fd();
            let size = libc::c_int::try_from(recv_buffer_size).unwrap_or(libc::c_int::MAX);
            // SAFETY: fd is a live socket owned by self, optval points to a c_int
            let ret = unsafe {
                libc::setsockopt(
                    fd,
                    libc::SOL_SOCKET,
                    libc::SO_RCVBUF,
                    &size as *const _ as *const libc::c_void,
                    std::mem::size_of::<libc::c_int>() as libc::socklen_t,
                )
            };
            if ret < 0 {
                warn!("Failed to set SO_RCVBUF, using default buffer size");
            } else {
                debug!(size = recv_buffer_size, "Set socket receive buffer");
            }
        }

        fn set_nonblocking(&mut self) -> Result<()> {
            self.socket
                .set_non_blocking(true)
                .map_err(|e| ChaindbgError::Netlink(format!("Failed to set non-blocking: {}", e)))
        }

        pub fn as_raw_fd(&self) -> i32 {
            self.socket.as_raw_fd()
        }

        pub fn cache(&self) -> &DeviceCache {
            &self.cache
        }

        /// Ask the kernel for every existing link
        ///
        /// The replies arrive as RTM_NEWLINK messages and register each
        /// device in the cache.
        #[instrument(skip(self))]
        pub fn request_dump(&mut self) -> Result<()> {
            let mut header = NetlinkHeader::default();
            header.flags = NLM_F_REQUEST | NLM_F_DUMP;

            let payload = RouteNetlinkMessage::GetLink(LinkMessage::default());
            let mut packet = NetlinkMessage::new(header, NetlinkPayload::InnerMessage(payload));
            packet.finalize();

            let mut buf = vec![0u8; packet.buffer_len()];
            packet.serialize(&mut buf);

            self.socket.send(&buf, 0).map_err(|e| {
                ChaindbgError::Netlink(format!("Failed to send dump request: {}", e))
            })?;
            debug!("Requested link dump");
            Ok(())
        }

        /// Receive one datagram; `Ok(None)` when nothing is pending
        pub fn try_receive(&mut self) -> Result<Option<Vec<BusEvent>>> {
            self.buffer.clear();
            match self.socket.recv(&mut self.buffer, libc::MSG_DONTWAIT) {
                Ok(len) => Ok(Some(self.parse_buffer(len))),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
                Err(e) if e.raw_os_error() == Some(libc::ENOBUFS) => {
                    warn!("Netlink receive queue overrun, events were lost");
                    Ok(None)
                }
                Err(e) => Err(ChaindbgError::Netlink(format!("Failed to receive: {}", e))),
            }
        }

        fn parse_buffer(&mut self, len: usize) -> Vec<BusEvent> {
            let mut events = Vec::new();
            let mut offset = 0;

            while offset < len {
                let msg = match NetlinkMessage::<RouteNetlinkMessage>::deserialize(
                    &self.buffer[offset..len],
                ) {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!(error = %e, "Failed to parse netlink message, dropping datagram");
                        break;
                    }
                };

                let msg_len = msg.header.length as usize;
                if msg_len == 0 {
                    break;
                }
                // Align to 4 bytes (netlink alignment requirement)
                offset = (offset + msg_len + 3) & !3;

                if let NetlinkPayload::InnerMessage(inner) = msg.payload {
                    self.handle_message(inner, &mut events);
                }
            }

            trace!(count = events.len(), "Received netlink events");
            events
        }

        fn handle_message(&mut self, msg: RouteNetlinkMessage, events: &mut Vec<BusEvent>) {
            match msg {
                RouteNetlinkMessage::NewLink(link) => {
                    let (dev, hint) = link_record(&link);
                    events.extend(self.cache.observe_link(dev, hint));
                }
                RouteNetlinkMessage::DelLink(link) => {
                    let (dev, _) = link_record(&link);
                    events.push(self.cache.remove_link(dev));
                }
                RouteNetlinkMessage::NewAddress(addr) => {
                    if let Some((ip, prefix_len, ifindex)) = address_fields(&addr) {
                        events.push(self.cache.address_event(true, ip, prefix_len, ifindex));
                    }
                }
                RouteNetlinkMessage::DelAddress(addr) => {
                    if let Some((ip, prefix_len, ifindex)) = address_fields(&addr) {
                        events.push(self.cache.address_event(false, ip, prefix_len, ifindex));
                    }
                }
                _ => {}
            }
        }
    }

    /// Extract the device snapshot and event hint from a link message
    fn link_record(link: &LinkMessage) -> (DeviceRecord, Option<LinkHint>) {
        let mut dev = DeviceRecord::new(link.header.index, String::new())
            .with_flags(link.header.flags.bits())
            .with_link_type(u16::from(link.header.link_layer_type));
        let mut hint = None;

        for attr in &link.attributes {
            match attr {
                LinkAttribute::IfName(name) => dev.name = name.clone(),
                LinkAttribute::Mtu(mtu) => dev.mtu = *mtu,
                LinkAttribute::Address(bytes) => dev.hw_addr = MacAddress::from_slice(bytes),
                LinkAttribute::Event(event) => hint = link_hint(event),
                _ => {}
            }
        }

        (dev, hint)
    }

    fn link_hint(event: &LinkEvent) -> Option<LinkHint> {
        match event {
            LinkEvent::Reboot => Some(LinkHint::Reboot),
            LinkEvent::Features => Some(LinkHint::Features),
            LinkEvent::BondingFailover => Some(LinkHint::BondingFailover),
            LinkEvent::NotifyPeers => Some(LinkHint::NotifyPeers),
            _ => None,
        }
    }

    /// Address, prefix length and owning ifindex of an address message
    fn address_fields(msg: &AddressMessage) -> Option<(IpAddr, u8, u32)> {
        let mut address = None;
        let mut local = None;
        for attr in &msg.attributes {
            match attr {
                AddressAttribute::Address(ip) => address = Some(*ip),
                AddressAttribute::Local(ip) => local = Some(*ip),
                _ => {}
            }
        }
        let ip = address.or(local)?;
        Some((ip, msg.header.prefix_len, msg.header.index))
    }

    /// Netlink monitor driven by tokio's reactor
    pub struct AsyncNetlinkMonitor {
        inner: AsyncFd<OwnedFd>,
        monitor: NetlinkMonitor,
    }

    impl AsyncNetlinkMonitor {
        #[instrument(skip(config))]
        pub fn new(config: &NetlinkConfig) -> Result<Self> {
            let mut monitor = NetlinkMonitor::new(config)?;
            monitor.set_nonblocking()?;

            // dup the fd so the netlink Socket keeps ownership of its own
            let fd = monitor.as_raw_fd();
            // SAFETY: fd is valid for the lifetime of monitor; the dup is owned below
            let owned_fd = unsafe {
                let new_fd = libc::dup(fd);
                if new_fd < 0 {
                    return Err(ChaindbgError::Netlink("Failed to dup fd".into()));
                }
                OwnedFd::from_raw_fd(new_fd)
            };

            let inner = AsyncFd::new(owned_fd)
                .map_err(|e| ChaindbgError::Netlink(format!("Failed to create AsyncFd: {}", e)))?;

            debug!("Created async netlink monitor");
            Ok(Self { inner, monitor })
        }

        /// Wait for the next datagram and return its events
        pub async fn recv_events(&mut self) -> Result<Vec<BusEvent>> {
            loop {
                let mut guard = self.inner.readable().await.map_err(|e| {
                    ChaindbgError::Netlink(format!("AsyncFd readable error: {}", e))
                })?;

                match self.monitor.try_receive()? {
                    Some(events) => return Ok(events),
                    None => guard.clear_ready(),
                }
            }
        }

        pub fn request_dump(&mut self) -> Result<()> {
            self.monitor.request_dump()
        }

        pub fn cache(&self) -> &DeviceCache {
            self.monitor.cache()
        }
    }
}

#[cfg(target_os = "linux")]
pub use linux::*;

/// Mock implementation for non-Linux platforms (development only)
#[cfg(not(target_os = "linux"))]
mod mock {
    use crate::config::NetlinkConfig;
    use crate::device_cache::DeviceCache;
    use crate::error::Result;
    use crate::notifier::BusEvent;

    #[derive(Default)]
    pub struct NetlinkMonitor {
        cache: DeviceCache,
    }

    impl NetlinkMonitor {
        pub fn new(_config: &NetlinkConfig) -> Result<Self> {
            Ok(Self::default())
        }

        pub fn as_raw_fd(&self) -> i32 {
            -1
        }

        pub fn cache(&self) -> &DeviceCache {
            &self.cache
        }

        pub fn request_dump(&mut self) -> Result<()> {
            Ok(())
        }

        pub fn try_receive(&mut self) -> Result<Option<Vec<BusEvent>>> {
            Ok(None)
        }
    }

    #[derive(Default)]
    pub struct AsyncNetlinkMonitor {
        monitor: NetlinkMonitor,
    }

    impl AsyncNetlinkMonitor {
        pub fn new(config: &NetlinkConfig) -> Result<Self> {
            Ok(Self {
                monitor: NetlinkMonitor::new(config)?,
            })
        }

        pub async fn recv_events(&mut self) -> Result<Vec<BusEvent>> {
            // In mock, just sleep to prevent busy-loop
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            Ok(Vec::new())
        }

        pub fn request_dump(&mut self) -> Result<()> {
            self.monitor.request_dump()
        }

        pub fn cache(&self) -> &DeviceCache {
            self.monitor.cache()
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub use mock::*;
