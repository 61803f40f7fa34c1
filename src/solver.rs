//! Per-block bit solver. Treats one Reed-Solomon block as a linear
//! system over GF(2): the tableau rows are single-data-bit perturbation
//! codewords, and pinning a bit is a one-column elimination instead of
//! a full re-solve.

use crate::gf256::RsEncoder;

#[inline]
fn get_bit(buf: &[u8], bi: usize) -> u8 {
    (buf[bi / 8] >> (7 - bi % 8)) & 1
}

#[inline]
fn has_bit(buf: &[u8], bi: usize) -> bool {
    buf[bi / 8] & (1 << (7 - bi % 8)) != 0
}

fn xor_into(dst: &mut [u8], src: &[u8]) {
    for (d, &s) in dst.iter_mut().zip(src.iter()) {
        *d ^= s;
    }
}

/// Solving state for one RS block of `nd` data and `nc` check bytes.
///
/// `b` is always a valid codeword. `rows` holds nd*8 perturbation
/// codewords; the prefix `[0..active)` spans the remaining freedom,
/// while rows in `[active..]` are retained pivots for bits that have
/// already been pinned, kept so `reset` can re-resolve them.
pub struct BitBlock {
    nd: usize,
    nc: usize,
    rs: RsEncoder,
    b: Vec<u8>,
    rows: Vec<Vec<u8>>,
    active: usize,
    /// byte offsets of this block's data and check regions within the
    /// concatenated codeword, used by `copy_out`
    data_off: usize,
    check_off: usize,
    tmp: Vec<u8>,
}

impl BitBlock {
    /// Build the solver over the block's current bytes. The check
    /// bytes must already satisfy the code equation.
    pub fn new(
        nd: usize,
        nc: usize,
        rs: &RsEncoder,
        data: &[u8],
        check: &[u8],
        data_off: usize,
        check_off: usize,
    ) -> BitBlock {
        assert_eq!(data.len(), nd);
        assert_eq!(check.len(), nc);

        let mut b = vec![0u8; nd + nc];
        b[..nd].copy_from_slice(data);
        rs.ecc(data, &mut b[nd..]);
        assert_eq!(&b[nd..], check, "block check bytes are not the ECC of its data");

        // One row per data bit: the unit perturbation and its ECC, so
        // every row is itself a codeword.
        let mut rows = Vec::with_capacity(nd * 8);
        for i in 0..nd * 8 {
            let mut row = vec![0u8; nd + nc];
            row[i / 8] = 1 << (7 - i % 8);
            let (d, c) = row.split_at_mut(nd);
            rs.ecc(d, c);
            rows.push(row);
        }

        BitBlock {
            nd,
            nc,
            rs: rs.clone(),
            b,
            active: rows.len(),
            rows,
            data_off,
            check_off,
            tmp: vec![0u8; nc],
        }
    }

    /// Rows still spanning unpinned freedom.
    pub fn active_rows(&self) -> usize {
        self.active
    }

    pub fn bit(&self, bi: usize) -> u8 {
        get_bit(&self.b, bi)
    }

    fn check(&mut self) {
        self.rs.ecc(&self.b[..self.nd], &mut self.tmp);
        assert_eq!(
            &self.b[self.nd..],
            &self.tmp[..],
            "block bytes stopped being a codeword"
        );
    }

    /// Try to pin bit `bi` (data bits first, then check bits) to
    /// `bval`, keeping the buffer a valid codeword and every previously
    /// pinned bit untouched. Returns false when the bit is no longer
    /// free.
    pub fn can_set(&mut self, bi: usize, bval: u8) -> bool {
        // find a pivot among the active rows
        let mut pivot = None;
        for j in 0..self.active {
            if has_bit(&self.rows[j], bi) {
                pivot = Some(j);
                break;
            }
        }
        let Some(j) = pivot else {
            return false;
        };
        self.rows.swap(0, j);

        // cut the bit from every other row, retained ones included
        let (head, tail) = self.rows.split_at_mut(1);
        for row in tail.iter_mut() {
            if has_bit(row, bi) {
                xor_into(row, &head[0]);
            }
        }

        if get_bit(&self.b, bi) != bval {
            xor_into(&mut self.b, &head[0]);
        }
        self.check();

        // move the pivot to the retained region
        self.rows.swap(0, self.active - 1);
        self.active -= 1;

        debug_assert!(!self.rows[..self.active].iter().any(|r| has_bit(r, bi)));
        true
    }

    /// Flip an already pinned bit to `bval` using its retained pivot.
    /// Only bits that were pinned by `can_set` may be reset.
    pub fn reset(&mut self, bi: usize, bval: u8) {
        if get_bit(&self.b, bi) == bval {
            return;
        }
        for j in self.active..self.rows.len() {
            if has_bit(&self.rows[j], bi) {
                let row = std::mem::take(&mut self.rows[j]);
                xor_into(&mut self.b, &row);
                self.rows[j] = row;
                return;
            }
        }
        panic!("reset of unset bit");
    }

    /// Write the block bytes back into the concatenated codeword.
    pub fn copy_out(&mut self, codeword: &mut [u8]) {
        self.check();
        codeword[self.data_off..self.data_off + self.nd].copy_from_slice(&self.b[..self.nd]);
        codeword[self.check_off..self.check_off + self.nc].copy_from_slice(&self.b[self.nd..]);
    }
}
