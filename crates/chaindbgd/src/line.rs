//! Bounded, append-only builder for one diagnostic line
//!
//! A builder is created per event and owned by the formatting call. Text is
//! only ever appended, the buffer is never used as a format argument for
//! itself, and one byte of capacity is always held back for the line
//! terminator.

use crate::symbols::{IFF_FLAGS, NETDEV_EVENTS, NETIF_FEATURES, SymbolTables};
use crate::types::IFNAMSIZ;
use std::fmt;

/// Longest source label (`INET6ADDR`)
const MAX_SOURCE_LEN: usize = 9;
/// Hex digits of a 64-bit value
const HEX64: usize = 16;
/// Longest textual IPv6 address (IPv4-mapped form)
const MAX_ADDR_LEN: usize = 45;

const fn max(a: usize, b: usize) -> usize {
    if a > b { a } else { b }
}

/// Capacity that fits the longest line renderable against `tables`
///
/// Sized from the table contents so a growing table grows the buffer with
/// it: prefix, device name, event name with its hex code, and the widest
/// of the optional fields, plus the terminator.
pub const fn line_capacity_for(tables: &SymbolTables) -> usize {
    let prefix = "C: ".len() + MAX_SOURCE_LEN + " DEV: ".len() + IFNAMSIZ;
    let event = " EVENT: ".len()
        + tables.events.category().len()
        + 1
        + tables.events.max_name_len()
        + " (0x".len()
        + HEX64
        + ")".len();
    let flags = " FLAGS: 0x".len() + HEX64 + " <".len() + tables.iff.rendered_len() + ">".len();
    let features =
        " FEATURES: 0x".len() + HEX64 + " <".len() + tables.features.rendered_len() + ">".len();
    let addr = " ADDR: ".len() + MAX_ADDR_LEN;
    let mac = " MAC: ".len() + 17;
    let extra = max(max(flags, features), max(addr, mac));
    prefix + event + extra + 1
}

/// Capacity for lines rendered against the built-in tables
pub const LINE_CAPACITY: usize =
    line_capacity_for(&SymbolTables::new(NETDEV_EVENTS, IFF_FLAGS, NETIF_FEATURES));

/// Append-only text accumulator with a hard byte capacity
#[derive(Debug)]
pub struct LineBuilder {
    buf: String,
    capacity: usize,
    truncated: bool,
}

impl LineBuilder {
    /// Allocate an empty builder holding at most `capacity` bytes
    ///
    /// Returns `None` when the buffer cannot be allocated or the capacity
    /// cannot even hold the terminator.
    pub fn new(capacity: usize) -> Option<Self> {
        if capacity == 0 {
            return None;
        }
        let mut buf = String::new();
        buf.try_reserve_exact(capacity).ok()?;
        Some(Self {
            buf,
            capacity,
            truncated: false,
        })
    }

    /// Append `text`, dropping whatever does not fit
    ///
    /// Control characters are replaced with `?` so the finished line holds
    /// exactly one terminator. Once anything is dropped, later appends are
    /// dropped too.
    pub fn append(&mut self, text: &str) {
        if self.truncated {
            return;
        }
        let limit = self.capacity - 1;
        for ch in text.chars() {
            let ch = if ch.is_control() { '?' } else { ch };
            if self.buf.len() + ch.len_utf8() > limit {
                self.truncated = true;
                return;
            }
            self.buf.push(ch);
        }
    }

    /// Append formatted text, as built by `format_args!`
    ///
    /// A value whose `Display` fails ends the line like a truncation.
    pub fn append_fmt(&mut self, args: fmt::Arguments<'_>) {
        if fmt::Write::write_fmt(self, args).is_err() {
            self.truncated = true;
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether any appended content was dropped
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Terminate the line and hand it over
    pub fn finish(mut self) -> String {
        self.buf.push('\n');
        self.buf
    }
}

impl fmt::Write for LineBuilder {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append(s);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::SymbolTable;
    use pretty_assertions::assert_eq;
    use std::fmt::Write;

    #[test]
    fn test_append_and_finish() {
        let mut line = LineBuilder::new(64).unwrap();
        line.append("C: NETDEV");
        write!(line, " DEV: {}", "eth0").unwrap();
        assert!(!line.is_truncated());
        assert_eq!(line.finish(), "C: NETDEV DEV: eth0\n");
    }

    #[test]
    fn test_truncation_keeps_room_for_terminator() {
        let mut line = LineBuilder::new(8).unwrap();
        line.append("0123456789");
        assert!(line.is_truncated());
        assert_eq!(line.len(), 7);
        let out = line.finish();
        assert_eq!(out, "0123456\n");
        assert_eq!(out.len(), 8);
    }

    #[test]
    fn test_append_after_truncation_is_dropped() {
        let mut line = LineBuilder::new(6).unwrap();
        line.append("abcdef");
        line.append("x");
        assert_eq!(line.finish(), "abcde\n");
    }

    #[test]
    fn test_truncation_on_char_boundary() {
        let mut line = LineBuilder::new(5).unwrap();
        line.append("ab\u{e9}\u{e9}");
        // 'a' 'b' then a two-byte char fits in 4 bytes, the next does not
        assert_eq!(line.finish(), "ab\u{e9}\n");
    }

    #[test]
    fn test_control_chars_replaced() {
        let mut line = LineBuilder::new(32).unwrap();
        line.append("et\0h\n0\r");
        let out = line.finish();
        assert_eq!(out, "et?h?0?\n");
        assert_eq!(out.matches('\n').count(), 1);
    }

    #[test]
    fn test_capacity_one_holds_only_terminator() {
        let mut line = LineBuilder::new(1).unwrap();
        line.append("x");
        assert_eq!(line.finish(), "\n");
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(LineBuilder::new(0).is_none());
    }

    #[test]
    fn test_capacity_grows_with_tables() {
        static BIG: SymbolTable = SymbolTable::new(
            "IFF",
            &[Some("A_VERY_LONG_FLAG_NAME_THAT_DOES_NOT_EXIST"); 64],
        );
        let mut tables = SymbolTables::default();
        let base = line_capacity_for(&tables);
        tables.iff = BIG;
        assert!(line_capacity_for(&tables) > base);
        assert_eq!(base, LINE_CAPACITY);
    }

    #[test]
    fn test_default_capacity_fits_all_features() {
        let tables = SymbolTables::default();
        assert!(LINE_CAPACITY > tables.features.rendered_len() + IFNAMSIZ);
    }

    #[test]
    fn test_append_fmt() {
        let mut line = LineBuilder::new(64).unwrap();
        line.append_fmt(format_args!("C: {} MTU: {}", "NETDEV", 1500));
        assert!(!line.is_truncated());
        assert_eq!(line.finish(), "C: NETDEV MTU: 1500\n");
    }

    #[test]
    fn test_append_fmt_failing_display_ends_line() {
        struct Broken;
        impl fmt::Display for Broken {
            fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
                Err(fmt::Error)
            }
        }

        let mut line = LineBuilder::new(64).unwrap();
        line.append_fmt(format_args!("A {}", Broken));
        line.append(" B");
        assert!(line.is_truncated());
        assert_eq!(line.finish(), "A \n");
    }
}
