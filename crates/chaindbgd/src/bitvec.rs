//! Bit-vector decoding against a symbol table

use crate::symbols::SymbolTable;
use std::fmt;

/// Widest bit-vector the decoder understands
pub const MAX_WIDTH: u32 = u64::BITS;

/// Names of the set bits in a bit-vector, lowest bit first
///
/// The iterator ends at the first set bit whose table slot is absent; bits
/// above that position are never looked at. Cloning restarts decoding from
/// the same state.
#[derive(Debug, Clone)]
pub struct FlagNames<'t> {
    bits: u64,
    width: u32,
    pos: u32,
    table: &'t SymbolTable,
}

impl Iterator for FlagNames<'_> {
    type Item = &'static str;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.width {
            let bit = self.pos;
            self.pos += 1;
            if self.bits & (1u64 << bit) == 0 {
                continue;
            }
            match self.table.resolve(u64::from(bit)) {
                Some(name) => return Some(name),
                None => {
                    self.pos = self.width;
                    return None;
                }
            }
        }
        None
    }
}

impl fmt::Display for FlagNames<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, name) in self.clone().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(name)?;
        }
        Ok(())
    }
}

/// Decode the set bits of `bits` in `0..width` into their table names
///
/// `width` above 64 is clamped to 64.
pub fn decode(bits: u64, width: u32, table: &SymbolTable) -> FlagNames<'_> {
    FlagNames {
        bits,
        width: width.min(MAX_WIDTH),
        pos: 0,
        table,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::{IFF_FLAGS, NETIF_FEATURES};
    use pretty_assertions::assert_eq;

    static ABC: SymbolTable = SymbolTable::new("T", &[Some("A"), Some("B"), Some("C")]);

    #[test]
    fn test_decode_stops_past_table() {
        let names: Vec<_> = decode(0b1111, 8, &ABC).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_decode_high_garbage_bits_ignored() {
        let names: Vec<_> = decode(0xff00_0000_0000_0005, 64, &ABC).collect();
        assert_eq!(names, vec!["A", "C"]);
    }

    #[test]
    fn test_decode_zero_is_empty() {
        assert_eq!(decode(0, 64, &ABC).count(), 0);
        assert_eq!(decode(0, 32, &IFF_FLAGS).count(), 0);
        assert_eq!(decode(0, 64, &NETIF_FEATURES).count(), 0);
    }

    #[test]
    fn test_decode_respects_width() {
        let names: Vec<_> = decode(0b111, 2, &ABC).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(decode(0b111, 0, &ABC).count(), 0);
    }

    #[test]
    fn test_decode_width_clamped() {
        let all: Vec<_> = decode(u64::MAX, 1000, &NETIF_FEATURES).collect();
        assert_eq!(all.len(), 64);
        assert_eq!(all.last().copied(), Some("HW_HSR_DUP"));
    }

    #[test]
    fn test_decode_stops_at_interior_gap() {
        static GAPPED: SymbolTable = SymbolTable::new("T", &[Some("A"), None, Some("C")]);
        let names: Vec<_> = decode(0b111, 8, &GAPPED).collect();
        assert_eq!(names, vec!["A"]);
        // an unset bit over the gap is never resolved
        let names: Vec<_> = decode(0b101, 8, &GAPPED).collect();
        assert_eq!(names, vec!["A", "C"]);
    }

    #[test]
    fn test_decode_ascending_order() {
        let names: Vec<_> = decode(0x1043, 32, &IFF_FLAGS).collect();
        assert_eq!(names, vec!["UP", "BROADCAST", "RUNNING", "MULTICAST"]);
    }

    #[test]
    fn test_decode_is_restartable() {
        let iter = decode(0b101, 8, &ABC);
        let first: Vec<_> = iter.clone().collect();
        let second: Vec<_> = iter.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_display_joins_with_spaces() {
        assert_eq!(decode(0b11, 8, &ABC).to_string(), "A B");
        assert_eq!(decode(0, 8, &ABC).to_string(), "");
    }
}
