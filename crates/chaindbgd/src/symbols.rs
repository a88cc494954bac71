//! Static symbol tables for event codes and flag bits
//!
//! Every table is a process-wide constant. Slots are `Option` so an
//! unnamed position is an explicit `None` rather than a sentinel pointer.

/// Sparse, prefix-complete table of names indexed by code or bit position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolTable {
    category: &'static str,
    entries: &'static [Option<&'static str>],
}

impl SymbolTable {
    pub const fn new(category: &'static str, entries: &'static [Option<&'static str>]) -> Self {
        Self { category, entries }
    }

    /// Name at `index`, or `None` past the end or at an unnamed slot
    pub fn resolve(&self, index: u64) -> Option<&'static str> {
        let index = usize::try_from(index).ok()?;
        self.entries.get(index).copied().flatten()
    }

    /// Prefix used when rendering names from this table (e.g. `NETDEV`)
    pub const fn category(&self) -> &'static str {
        self.category
    }

    /// Number of slots, named or not
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes needed to print every named entry, each followed by one space
    pub const fn rendered_len(&self) -> usize {
        let mut total = 0;
        let mut i = 0;
        while i < self.entries.len() {
            if let Some(name) = self.entries[i] {
                total += name.len() + 1;
            }
            i += 1;
        }
        total
    }

    /// Length of the longest named entry
    pub const fn max_name_len(&self) -> usize {
        let mut max = 0;
        let mut i = 0;
        while i < self.entries.len() {
            if let Some(name) = self.entries[i] {
                if name.len() > max {
                    max = name.len();
                }
            }
            i += 1;
        }
        max
    }
}

/// The three tables a formatter renders against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolTables {
    pub events: SymbolTable,
    pub iff: SymbolTable,
    pub features: SymbolTable,
}

impl SymbolTables {
    pub const fn new(events: SymbolTable, iff: SymbolTable, features: SymbolTable) -> Self {
        Self {
            events,
            iff,
            features,
        }
    }
}

impl Default for SymbolTables {
    fn default() -> Self {
        Self::new(NETDEV_EVENTS, IFF_FLAGS, NETIF_FEATURES)
    }
}

/// Netdevice notifier event names; slot 0 has no event
pub const NETDEV_EVENTS: SymbolTable = SymbolTable::new(
    "NETDEV",
    &[
        None,
        Some("UP"),
        Some("DOWN"),
        Some("REBOOT"),
        Some("CHANGE"),
        Some("REGISTER"),
        Some("UNREGISTER"),
        Some("CHANGEMTU"),
        Some("CHANGEADDR"),
        Some("GOING_DOWN"),
        Some("CHANGENAME"),
        Some("FEAT_CHANGE"),
        Some("BONDING_FAILOVER"),
        Some("PRE_UP"),
        Some("PRE_TYPE_CHANGE"),
        Some("POST_TYPE_CHANGE"),
        Some("POST_INIT"),
        Some("UNREGISTER_FINAL"),
        Some("RELEASE"),
        Some("NOTIFY_PEERS"),
        Some("JOIN"),
    ],
);

/// Interface flags, `IFF_*` from linux/if.h
pub const IFF_FLAGS: SymbolTable = SymbolTable::new(
    "IFF",
    &[
        Some("UP"),
        Some("BROADCAST"),
        Some("DEBUG"),
        Some("LOOPBACK"),
        Some("POINTOPOINT"),
        Some("NOTRAILERS"),
        Some("RUNNING"),
        Some("NOARP"),
        Some("PROMISC"),
        Some("ALLMULTI"),
        Some("MASTER"),
        Some("SLAVE"),
        Some("MULTICAST"),
        Some("PORTSEL"),
        Some("AUTOMEDIA"),
        Some("DYNAMIC"),
        Some("LOWER_UP"),
        Some("DORMANT"),
        Some("ECHO"),
    ],
);

/// Device features, `NETIF_F_*` bit order from linux/netdev_features.h
pub const NETIF_FEATURES: SymbolTable = SymbolTable::new(
    "NETIF_F",
    &[
        Some("SG"),
        Some("IP_CSUM"),
        Some("NO_CSUM"),
        Some("HW_CSUM"),
        Some("IPV6_CSUM"),
        Some("HIGHDMA"),
        Some("FRAGLIST"),
        Some("HW_VLAN_CTAG_TX"),
        Some("HW_VLAN_CTAG_RX"),
        Some("HW_VLAN_CTAG_FILTER"),
        Some("VLAN_CHALLENGED"),
        Some("GSO"),
        Some("LLTX"),
        Some("NETNS_LOCAL"),
        Some("GRO"),
        Some("LRO"),
        Some("TSO"),
        Some("GSO_ROBUST"),
        Some("TSO_ECN"),
        Some("TSO_MANGLEID"),
        Some("TSO6"),
        Some("FSO"),
        Some("GSO_GRE"),
        Some("GSO_GRE_CSUM"),
        Some("GSO_IPXIP4"),
        Some("GSO_IPXIP6"),
        Some("GSO_UDP_TUNNEL"),
        Some("GSO_UDP_TUNNEL_CSUM"),
        Some("GSO_PARTIAL"),
        Some("GSO_TUNNEL_REMCSUM"),
        Some("GSO_SCTP"),
        Some("GSO_ESP"),
        Some("GSO_UDP"),
        Some("GSO_UDP_L4"),
        Some("GSO_FRAGLIST"),
        Some("FCOE_CRC"),
        Some("SCTP_CRC"),
        Some("FCOE_MTU"),
        Some("NTUPLE"),
        Some("RXHASH"),
        Some("RXCSUM"),
        Some("NOCACHE_COPY"),
        Some("LOOPBACK"),
        Some("RXFCS"),
        Some("RXALL"),
        Some("HW_VLAN_STAG_TX"),
        Some("HW_VLAN_STAG_RX"),
        Some("HW_VLAN_STAG_FILTER"),
        Some("HW_L2FW_DOFFLOAD"),
        Some("HW_TC"),
        Some("HW_ESP"),
        Some("HW_ESP_TX_CSUM"),
        Some("RX_UDP_TUNNEL_PORT"),
        Some("HW_TLS_TX"),
        Some("HW_TLS_RX"),
        Some("GRO_HW"),
        Some("HW_TLS_RECORD"),
        Some("GRO_FRAGLIST"),
        Some("HW_MACSEC"),
        Some("GRO_UDP_FWD"),
        Some("HW_HSR_TAG_INS"),
        Some("HW_HSR_TAG_RM"),
        Some("HW_HSR_FWD"),
        Some("HW_HSR_DUP"),
    ],
);
