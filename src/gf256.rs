//! GF(256) arithmetic and the systematic Reed-Solomon encoder used for
//! QR error correction. The field is built over the QR polynomial
//! x^8 + x^4 + x^3 + x^2 + 1 (0x11d) with 2 as the generator element.

use lazy_static::lazy_static;

/// The QR reduction polynomial.
const QR_POLY: u32 = 0x11d;

/// A GF(2^8) field represented by log/exp tables.
pub struct Field {
    // exp is doubled so products of two logs index without a modulo.
    exp: [u8; 510],
    log: [u8; 256],
}

impl Field {
    pub fn new(poly: u32) -> Field {
        assert!(poly & 0x100 != 0, "reduction polynomial must have degree 8");
        let mut exp = [0u8; 510];
        let mut log = [0u8; 256];
        let mut x: u32 = 1;
        for i in 0..255 {
            exp[i] = x as u8;
            exp[i + 255] = x as u8;
            log[x as usize] = i as u8;
            x <<= 1;
            if x & 0x100 != 0 {
                x ^= poly;
            }
        }
        log[0] = 255; // sentinel; zero has no logarithm
        Field { exp, log }
    }

    #[inline]
    pub fn exp(&self, e: usize) -> u8 {
        self.exp[e % 255]
    }

    #[inline]
    pub fn log(&self, v: u8) -> u8 {
        assert!(v != 0, "log of zero");
        self.log[v as usize]
    }

    #[inline]
    pub fn mul(&self, a: u8, b: u8) -> u8 {
        if a == 0 || b == 0 {
            return 0;
        }
        self.exp[self.log[a as usize] as usize + self.log[b as usize] as usize]
    }
}

lazy_static! {
    /// The field shared by every encoder in this crate.
    pub static ref QR_FIELD: Field = Field::new(QR_POLY);
}

/// Systematic Reed-Solomon encoder producing `nc` check bytes.
///
/// The generator polynomial is the product of (x - 2^i) for i in 0..nc;
/// `ecc` computes the remainder of data(x) * x^nc modulo that generator,
/// which makes data || check a codeword. Because multiplication by a
/// field constant is linear over GF(2), the whole map from data bits to
/// check bits is GF(2)-linear, which the block solver relies on.
#[derive(Clone)]
pub struct RsEncoder {
    nc: usize,
    // gen[k] is the coefficient of x^(nc-1-k); the leading 1 is implicit.
    gen: Vec<u8>,
}

impl RsEncoder {
    pub fn new(nc: usize) -> RsEncoder {
        assert!(nc > 0 && nc < 255);
        let f: &Field = &QR_FIELD;
        // Multiply out (x - 2^0)(x - 2^1)...(x - 2^(nc-1)).
        let mut gen = vec![0u8; 1];
        gen[0] = 1;
        for i in 0..nc {
            let root = f.exp(i);
            let mut next = vec![0u8; gen.len() + 1];
            for (j, &g) in gen.iter().enumerate() {
                next[j] ^= g;
                next[j + 1] ^= f.mul(g, root);
            }
            gen = next;
        }
        assert_eq!(gen[0], 1);
        gen.remove(0);
        RsEncoder { nc, gen }
    }

    pub fn check_bytes(&self) -> usize {
        self.nc
    }

    /// Fill `check` with the `nc` check bytes for `data`.
    pub fn ecc(&self, data: &[u8], check: &mut [u8]) {
        assert_eq!(check.len(), self.nc);
        let f: &Field = &QR_FIELD;
        for c in check.iter_mut() {
            *c = 0;
        }
        for &d in data {
            let factor = d ^ check[0];
            check.copy_within(1.., 0);
            check[self.nc - 1] = 0;
            if factor != 0 {
                for (c, &g) in check.iter_mut().zip(self.gen.iter()) {
                    *c ^= f.mul(g, factor);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Evaluate a polynomial (coefficients high power first) at 2^e.
    fn eval_at_root(poly: &[u8], e: usize) -> u8 {
        let f: &Field = &QR_FIELD;
        let x = f.exp(e);
        let mut acc = 0u8;
        for &c in poly {
            acc = f.mul(acc, x) ^ c;
        }
        acc
    }

    #[test]
    fn field_tables_consistent() {
        let f: &Field = &QR_FIELD;
        assert_eq!(f.exp(0), 1);
        assert_eq!(f.exp(1), 2);
        // 2^8 = 0x11d mod x^8... = 0x1d
        assert_eq!(f.exp(8), 0x1d);
        for v in 1..=255u8 {
            assert_eq!(f.exp(f.log(v) as usize), v);
        }
    }

    #[test]
    fn mul_matches_repeated_addition_in_log_space() {
        let f: &Field = &QR_FIELD;
        assert_eq!(f.mul(0, 7), 0);
        assert_eq!(f.mul(1, 133), 133);
        for &(a, b) in &[(2u8, 4u8), (0x53, 0xca), (255, 255), (3, 7)] {
            let expect = f.exp(f.log(a) as usize + f.log(b) as usize);
            assert_eq!(f.mul(a, b), expect);
        }
    }

    #[test]
    fn codeword_divisible_by_generator() {
        // A systematic codeword must vanish at every generator root;
        // this characterizes the check bytes completely.
        for &(nd, nc) in &[(19usize, 7usize), (16, 10), (13, 13), (9, 17), (34, 10)] {
            let rs = RsEncoder::new(nc);
            let data: Vec<u8> = (0..nd).map(|i| (i as u8).wrapping_mul(37).wrapping_add(11)).collect();
            let mut check = vec![0u8; nc];
            rs.ecc(&data, &mut check);

            let mut codeword = data.clone();
            codeword.extend_from_slice(&check);
            for e in 0..nc {
                assert_eq!(eval_at_root(&codeword, e), 0, "root 2^{} does not vanish", e);
            }
        }
    }

    #[test]
    fn ecc_is_linear_over_gf2() {
        let rs = RsEncoder::new(10);
        let a: Vec<u8> = (0..16).map(|i| (i as u8).wrapping_mul(91)).collect();
        let b: Vec<u8> = (0..16).map(|i| (i as u8).wrapping_mul(53).wrapping_add(7)).collect();
        let xor: Vec<u8> = a.iter().zip(b.iter()).map(|(&x, &y)| x ^ y).collect();

        let mut ca = vec![0u8; 10];
        let mut cb = vec![0u8; 10];
        let mut cx = vec![0u8; 10];
        rs.ecc(&a, &mut ca);
        rs.ecc(&b, &mut cb);
        rs.ecc(&xor, &mut cx);
        for i in 0..10 {
            assert_eq!(cx[i], ca[i] ^ cb[i]);
        }
    }

    #[test]
    fn ecc_of_zero_is_zero() {
        let rs = RsEncoder::new(7);
        let mut check = vec![0xffu8; 7];
        rs.ecc(&[0u8; 19], &mut check);
        assert_eq!(check, vec![0u8; 7]);
    }

    #[test]
    fn single_bit_perturbations_are_codewords() {
        // The solver builds its tableau from exactly these rows.
        let rs = RsEncoder::new(7);
        for bit in [0usize, 1, 8, 150, 151] {
            let mut data = vec![0u8; 19];
            data[bit / 8] = 1 << (7 - bit % 8);
            let mut check = vec![0u8; 7];
            rs.ecc(&data, &mut check);
            let mut codeword = data;
            codeword.extend_from_slice(&check);
            for e in 0..7 {
                assert_eq!(eval_at_root(&codeword, e), 0);
            }
        }
    }
}
