//! Property tests for the event formatters
//!
//! Covers:
//! - Name resolution over the whole known code range and hex fallback outside it
//! - Line termination regardless of input length
//! - Truncation against oversized symbol tables
//! - Concurrent formatting from independent threads

use netdev_chaindbgd::{
    DeviceRecord, EventCode, EventFormatter, IFF_FLAGS, Inet4AddrRecord, Inet6AddrRecord,
    NETDEV_EVENTS, NETIF_FEATURES, SymbolTable, SymbolTables, line_capacity_for,
};
use pretty_assertions::assert_eq;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use std::thread;

fn assert_one_line(line: &str) {
    assert!(line.ends_with('\n'), "missing terminator: {line:?}");
    assert_eq!(line.matches('\n').count(), 1, "embedded terminator: {line:?}");
    assert!(!line.contains('\0'), "embedded NUL: {line:?}");
}

#[test]
fn test_known_codes_render_their_names() {
    let fmt = EventFormatter::new();
    let dev = DeviceRecord::new(1, "lo");
    for raw in 1..=EventCode::MAX_KNOWN {
        let name = NETDEV_EVENTS.resolve(raw).expect("known code has a name");
        let line = fmt.format_netdev(EventCode(raw), &dev).unwrap();
        let expected = format!("C: NETDEV DEV: lo EVENT: NETDEV_{} (0x{:x})", name, raw);
        assert!(line.starts_with(&expected), "{line}");
        assert_one_line(&line);
    }
}

#[test]
fn test_unknown_codes_render_hex_only() {
    let fmt = EventFormatter::new();
    let dev = DeviceRecord::new(1, "lo").with_mtu(65536).with_flags(0x9);
    let unknown = [
        0,
        EventCode::MAX_KNOWN + 1,
        0x1000,
        u64::from(u32::MAX),
        u64::MAX,
    ];
    for raw in unknown {
        let line = fmt.format_netdev(EventCode(raw), &dev).unwrap();
        assert_eq!(line, format!("C: NETDEV DEV: lo EVENT: 0x{:x}\n", raw));
    }
}

#[test]
fn test_long_device_name_still_one_line() {
    let fmt = EventFormatter::new();
    let name = "x".repeat(10 * fmt.capacity());
    let dev = DeviceRecord::new(1, name).with_features(u64::MAX);
    for code in [EventCode::UP, EventCode::FEAT_CHANGE, EventCode(0x77)] {
        let line = fmt.format_netdev(code, &dev).unwrap();
        assert!(line.len() <= fmt.capacity());
        assert_one_line(&line);
    }
}

#[test]
fn test_inflated_table_truncates_within_capacity() {
    static HUGE: SymbolTable = SymbolTable::new(
        "IFF",
        &[Some("AN_ABSURDLY_LONG_INTERFACE_FLAG_NAME_USED_TO_OVERFLOW_THE_LINE"); 32],
    );
    let tables = SymbolTables::new(NETDEV_EVENTS, HUGE, NETIF_FEATURES);
    let capacity = line_capacity_for(&SymbolTables::default());
    let fmt = EventFormatter::with_tables(tables).with_capacity(capacity);

    let dev = DeviceRecord::new(4, "eth3").with_flags(u32::MAX);
    let line = fmt.format_netdev(EventCode::CHANGE, &dev).unwrap();
    assert!(line.len() <= capacity, "{} > {}", line.len(), capacity);
    assert_one_line(&line);
    assert!(line.starts_with("C: NETDEV DEV: eth3 EVENT: NETDEV_CHANGE (0x4) FLAGS: 0xffffffff <"));
}

#[test]
fn test_inflated_table_fits_when_sized_from_table() {
    static HUGE: SymbolTable = SymbolTable::new(
        "IFF",
        &[Some("AN_ABSURDLY_LONG_INTERFACE_FLAG_NAME_USED_TO_OVERFLOW_THE_LINE"); 32],
    );
    let fmt = EventFormatter::with_tables(SymbolTables::new(NETDEV_EVENTS, HUGE, NETIF_FEATURES));
    let dev = DeviceRecord::new(4, "eth3").with_flags(u32::MAX);
    let line = fmt.format_netdev(EventCode::CHANGE, &dev).unwrap();
    assert!(line.ends_with("_LINE>\n"), "{line}");
    assert_eq!(line.matches("AN_ABSURDLY").count(), 32);
}

#[test]
fn test_every_interface_flag_fits() {
    let dev = DeviceRecord::new(1, "abcdefghijklmno").with_flags(u32::MAX);
    let line = EventFormatter::new()
        .format_netdev(EventCode::CHANGE, &dev)
        .unwrap();
    let decoded = line
        .rsplit_once('<')
        .and_then(|(_, rest)| rest.strip_suffix(">\n"))
        .unwrap();
    assert_eq!(decoded.split(' ').count(), IFF_FLAGS.len());
}

#[test]
fn test_concurrent_formatting_is_independent() {
    const THREADS: usize = 16;
    const PER_THREAD: u32 = 200;

    let fmt = Arc::new(EventFormatter::new());
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let fmt = fmt.clone();
            thread::spawn(move || {
                let mut out = Vec::new();
                for i in 0..PER_THREAD {
                    let name = format!("t{}n{}", t, i);
                    let dev = DeviceRecord::new(i, name.clone()).with_mtu(1000 + i);
                    let line = match t % 3 {
                        0 => fmt.format_netdev(EventCode::CHANGEMTU, &dev),
                        1 => fmt.format_inetaddr(
                            EventCode::UP,
                            &Inet4AddrRecord::new(Ipv4Addr::from(i), 32, Some(dev)),
                        ),
                        _ => fmt.format_inet6addr(
                            EventCode::DOWN,
                            &Inet6AddrRecord::new(Ipv6Addr::from(u128::from(i)), 128, Some(dev)),
                        ),
                    };
                    out.push((name, i, line.unwrap()));
                }
                (t, out)
            })
        })
        .collect();

    for handle in handles {
        let (t, lines) = handle.join().unwrap();
        assert_eq!(lines.len(), PER_THREAD as usize);
        for (name, i, line) in lines {
            let expected = match t % 3 {
                0 => format!(
                    "C: NETDEV DEV: {} EVENT: NETDEV_CHANGEMTU (0x7) MTU: {}\n",
                    name,
                    1000 + i
                ),
                1 => format!(
                    "C: INETADDR DEV: {} EVENT: NETDEV_UP (0x1) ADDR: {}\n",
                    name,
                    Ipv4Addr::from(i)
                ),
                _ => format!(
                    "C: INET6ADDR DEV: {} EVENT: NETDEV_DOWN (0x2) ADDR: {}\n",
                    name,
                    Ipv6Addr::from(u128::from(i))
                ),
            };
            assert_eq!(line, expected);
        }
    }
}
