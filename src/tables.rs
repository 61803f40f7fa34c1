//! Reference tables for the supported symbol versions: total codeword
//! counts, the error-correction block structure per level, and the
//! alignment pattern center coordinates.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::config::{ECLevel, Version};

///////////////////////////////////////////////////////////////////////////////////////////////////

/// Error-correction block structure for one (version, level) pair.
/// Every block carries `check_per_block` check bytes; data bytes are
/// spread as evenly as possible, with the trailing `data_bytes % blocks`
/// blocks taking one extra byte.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Debug)]
pub struct BlockLayout {
    pub blocks: usize,          // number of RS blocks
    pub check_per_block: usize, // check bytes in every block
}

/// Per-version constants.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Debug)]
pub struct VersionInfo {
    pub total_bytes: usize, // all codewords in the symbol, data + check
    levels: [BlockLayout; 4],
}

impl VersionInfo {
    pub const fn new(total_bytes: usize, levels: [BlockLayout; 4]) -> VersionInfo {
        VersionInfo { total_bytes, levels }
    }

    pub fn layout(&self, level: ECLevel) -> BlockLayout {
        self.levels[level.index()]
    }

    /// Data codewords at the given level.
    pub fn data_bytes(&self, level: ECLevel) -> usize {
        self.total_bytes - self.check_bytes(level)
    }

    /// Check codewords at the given level.
    pub fn check_bytes(&self, level: ECLevel) -> usize {
        let l = self.layout(level);
        l.blocks * l.check_per_block
    }
}

///////////////////////////////////////////////////////////////////////////////////////////////////

macro_rules! define_version_table {
    {$(
        $ver:expr, $bytes:expr;
        L($bl:expr, $cl:expr), M($bm:expr, $cm:expr), Q($bq:expr, $cq:expr), H($bh:expr, $ch:expr);
    )*} => {
        lazy_static! {
            pub static ref VERSION_TABLE: HashMap<u8, VersionInfo> = [
                $(
                    ($ver, VersionInfo::new($bytes, [
                        BlockLayout { blocks: $bl, check_per_block: $cl },
                        BlockLayout { blocks: $bm, check_per_block: $cm },
                        BlockLayout { blocks: $bq, check_per_block: $cq },
                        BlockLayout { blocks: $bh, check_per_block: $ch },
                    ])),
                )*
            ].iter().copied().collect();
        }
    }
}

// Transcribed from tables 7 and 9 in ISO/IEC 18004:2015 for the
// versions this crate supports.
define_version_table!(
    1,  26; L(1,  7), M(1, 10), Q(1, 13), H(1, 17);
    2,  44; L(1, 10), M(1, 16), Q(1, 22), H(1, 28);
    3,  70; L(1, 15), M(1, 26), Q(2, 18), H(2, 22);
    4, 100; L(1, 20), M(2, 18), Q(2, 26), H(4, 16);
    5, 134; L(1, 26), M(2, 24), Q(4, 18), H(4, 22);
    6, 172; L(2, 18), M(4, 16), Q(4, 24), H(4, 28);
    7, 196; L(2, 20), M(4, 18), Q(6, 18), H(5, 26);
    8, 242; L(2, 24), M(4, 22), Q(6, 22), H(6, 26);
);

/// Convenience function that just indexes into the static table.
pub fn lookup_version(v: Version) -> &'static VersionInfo {
    &VERSION_TABLE[&v.number()]
}

///////////////////////////////////////////////////////////////////////////////////////////////////

/// Alignment pattern center coordinates for a version, i.e. the row of
/// table E.1 in Annex E. Version 1 has no alignment patterns.
pub fn alignment_centers(v: Version) -> Vec<i32> {
    let n = v.number() as i32;
    let mut row = Vec::new();
    if n < 2 {
        return row;
    }
    row.push(6);
    if n < 7 {
        row.push((n - 2) * 4 + 18);
    } else {
        row.push((n - 7) * 2 + 22);
        row.push((n - 7) * 4 + 38);
    }
    row
}

///////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ECLevel;

    fn v(n: u8) -> Version {
        Version::new(n).unwrap()
    }

    #[test]
    fn test_table1() {
        assert_eq!(lookup_version(v(1)).data_bytes(ECLevel::L), 19);
        assert_eq!(lookup_version(v(1)).check_bytes(ECLevel::H), 17);
        assert_eq!(lookup_version(v(4)).data_bytes(ECLevel::H), 36);
        assert_eq!(lookup_version(v(8)).data_bytes(ECLevel::Q), 110);
    }

    #[test]
    fn test_table2() {
        // Every level of a version must leave at least one data byte
        // per block and fit the symbol. If this fails, there is a
        // transcription error in the table.
        for n in 1..=8 {
            for l in [ECLevel::L, ECLevel::M, ECLevel::Q, ECLevel::H] {
                let info = lookup_version(v(n));
                let layout = info.layout(l);
                let data = info.data_bytes(l);
                assert!(data >= layout.blocks, "version {} level {:?}", n, l);
                assert!(
                    info.check_bytes(l) < info.total_bytes,
                    "version {} level {:?}",
                    n,
                    l
                );
            }
        }
    }

    #[test]
    fn test_table3() {
        // Known block splits: v5-Q is 15,15,16,16 data bytes; v7-H is
        // 13,13,13,13,14.
        let info = lookup_version(v(5));
        assert_eq!(info.layout(ECLevel::Q).blocks, 4);
        assert_eq!(info.data_bytes(ECLevel::Q), 62);
        let info = lookup_version(v(7));
        assert_eq!(info.layout(ECLevel::H).blocks, 5);
        assert_eq!(info.data_bytes(ECLevel::H), 66);
    }

    #[test]
    fn test_table_bytes_fit_grid() {
        // Total codeword bits can never exceed the number of modules.
        for n in 1..=8u8 {
            let side = v(n).size();
            let info = lookup_version(v(n));
            assert!(info.total_bytes * 8 < side * side);
        }
    }

    #[test]
    fn test_table_e1() {
        assert_eq!(alignment_centers(v(1)), Vec::<i32>::new());
        assert_eq!(alignment_centers(v(2)), [6, 18]);
        assert_eq!(alignment_centers(v(3)), [6, 22]);
        assert_eq!(alignment_centers(v(6)), [6, 34]);
        assert_eq!(alignment_centers(v(7)), [6, 22, 38]);
        assert_eq!(alignment_centers(v(8)), [6, 24, 42]);
    }
}
