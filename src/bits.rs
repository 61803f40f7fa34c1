//! Bit-level payload construction: mode segments, terminator/padding,
//! and per-block check bytes, accumulated through a bitstream recorder.

use bitstream_io::{BigEndian, BitRecorder, BitWrite, BitWriter};

use crate::config::{ECLevel, Encoding, Version};
use crate::error::{QrArtError, Result};
use crate::gf256::RsEncoder;
use crate::tables::lookup_version;

pub type QrBitRecorder = BitRecorder<u32, BigEndian>;
pub type QrBitWriter<'a> = BitWriter<&'a mut Vec<u8>, BigEndian>;

/// Padding codewords alternated after the terminator (7.4.10).
const PAD_CODEWORDS: [u32; 2] = [0b1110_1100, 0b0001_0001];

/// An append-only bit accumulator for building the symbol codeword.
///
/// The steering engine measures segment lengths, resets, re-encodes and
/// finally reads the whole codeword back as bytes, so unlike a plain
/// stream the accumulator supports `reset` and repeated `bytes()`.
pub struct Bits {
    rec: QrBitRecorder,
}

impl Default for Bits {
    fn default() -> Bits {
        Bits::new()
    }
}

impl Bits {
    pub fn new() -> Bits {
        Bits { rec: QrBitRecorder::new() }
    }

    /// Number of bits written so far.
    pub fn bits(&self) -> usize {
        self.rec.written() as usize
    }

    pub fn write(&mut self, value: u32, nbit: u32) {
        // writing into memory cannot fail
        self.rec.write(nbit, value).unwrap();
    }

    pub fn reset(&mut self) {
        self.rec = QrBitRecorder::new();
    }

    pub fn append(&mut self, bytes: &[u8]) {
        assert_eq!(self.bits() % 8, 0, "fractional byte");
        for &b in bytes {
            self.write(b as u32, 8);
        }
    }

    /// Play the recorded bits back into a byte vector. The stream must
    /// be byte aligned.
    pub fn bytes(&self) -> Vec<u8> {
        assert_eq!(self.bits() % 8, 0, "fractional byte");
        let mut data: Vec<u8> = Vec::with_capacity(self.bits() / 8);
        {
            let mut writer = QrBitWriter::new(&mut data);
            self.rec.playback(&mut writer).unwrap();
        }
        data
    }

    /// Fill `n` free bits with the terminator, zero alignment bits and
    /// the alternating padding codewords (7.4.9, 7.4.10).
    pub fn pad(&mut self, n: usize) {
        if n <= 4 {
            self.write(0, n as u32);
            return;
        }
        self.write(0, 4);
        let align = (8 - self.bits() % 8) % 8;
        self.write(0, align as u32);
        let pad_bytes = (n - 4 - align) / 8;
        for i in 0..pad_bytes {
            self.write(PAD_CODEWORDS[i % 2], 8);
        }
    }

    /// Pad out the data region and append the per-block Reed-Solomon
    /// check bytes. The result is the concatenated codeword: all data
    /// bytes block by block, then all check bytes block by block. (The
    /// interleaved transmission order is the plan's concern; module
    /// offsets point into this concatenated arrangement.)
    pub fn add_check_bytes(&mut self, version: Version, level: ECLevel) {
        let info = lookup_version(version);
        let nd = info.data_bytes(level);
        if self.bits() < nd * 8 {
            self.pad(nd * 8 - self.bits());
        }
        assert_eq!(self.bits(), nd * 8, "too many data bits for symbol");

        let layout = info.layout(level);
        let nc = layout.check_per_block;
        let mut ndb = nd / layout.blocks;
        let extra = nd % layout.blocks;
        let dat = self.bytes();
        let rs = RsEncoder::new(nc);
        let mut check = vec![0u8; nc];
        let mut off = 0;
        for blocknum in 0..layout.blocks {
            if blocknum == layout.blocks - extra {
                ndb += 1;
            }
            rs.ecc(&dat[off..off + ndb], &mut check);
            self.append(&check);
            off += ndb;
        }
    }
}

/// One payload segment in a concrete encoding mode.
#[derive(Clone, Copy, Debug)]
pub enum Segment<'a> {
    /// ISO 8859-1 text, byte mode.
    Str(&'a str),
    /// ASCII decimal digits, numeric mode.
    Num(&'a str),
}

impl<'a> Segment<'a> {
    pub fn encoding(&self) -> Encoding {
        match self {
            Segment::Str(_) => Encoding::Bytes,
            Segment::Num(_) => Encoding::Numeric,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Segment::Str(s) => {
                if s.chars().any(|c| c as u32 > 0xff) {
                    return Err(QrArtError::InvalidPayload);
                }
            }
            Segment::Num(s) => {
                if !s.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(QrArtError::InvalidPayload);
                }
            }
        }
        Ok(())
    }

    /// Total bits this segment occupies at the given version.
    pub fn bit_len(&self, version: Version) -> usize {
        let header = 4 + self.encoding().char_count_bits(version) as usize;
        match self {
            Segment::Str(s) => header + 8 * s.len(),
            Segment::Num(s) => {
                header
                    + 10 * (s.len() / 3)
                    + match s.len() % 3 {
                        0 => 0,
                        1 => 4,
                        _ => 7,
                    }
            }
        }
    }

    /// Write mode indicator, character count and payload bits. The
    /// caller checks capacity first; a payload beyond the count field
    /// cannot fit any supported symbol.
    pub fn encode(&self, stream: &mut Bits, version: Version) {
        let enc = self.encoding();
        stream.write(enc.mode_indicator(), 4);
        match self {
            Segment::Str(s) => {
                stream.write(s.len() as u32, enc.char_count_bits(version));
                for b in s.bytes() {
                    stream.write(b as u32, 8);
                }
            }
            Segment::Num(s) => {
                stream.write(s.len() as u32, enc.char_count_bits(version));
                // group into three digits and treat them as a decimal
                // number between 0 and 999, encoded in 10 bits
                let mut i = 0;
                let mut cur_code: u32 = 0;
                for b in s.bytes() {
                    debug_assert!(b.is_ascii_digit());
                    cur_code = cur_code * 10 + (b - b'0') as u32;
                    i += 1;
                    if i == 3 {
                        stream.write(cur_code, 10);
                        i = 0;
                        cur_code = 0;
                    }
                }
                // potentially encode last incomplete group
                if i == 1 {
                    stream.write(cur_code, 4);
                } else if i == 2 {
                    stream.write(cur_code, 7);
                }
            }
        }
    }
}

//-------------------------------------------------------------------
// TESTS
//-------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;

    fn v(n: u8) -> Version {
        Version::new(n).unwrap()
    }

    #[test]
    fn test_numeric_example() {
        let mut b = Bits::new();
        Segment::Num("01234567").encode(&mut b, v(1));
        assert_eq!(b.bits(), 41);
        // byte-align for inspection
        b.write(1, 7);
        assert_eq!(
            b.bytes(),
            [0b0001_0000, 0b0010_0000, 0b0000_1100, 0b0101_0110, 0b0110_0001, 0b1000_0001]
        );
    }

    #[test]
    fn test_byte_example() {
        let mut b = Bits::new();
        Segment::Str("ab").encode(&mut b, v(1));
        // mode 0100, count 00000010, 'a', 'b', plus 4 filler bits
        b.write(0, 4);
        assert_eq!(b.bytes(), [0b0100_0000, 0b0010_0110, 0b0001_0110, 0b0010_0000]);
    }

    #[test]
    fn test_pad_writes_terminator_and_codewords() {
        let mut b = Bits::new();
        Segment::Num("01234567").encode(&mut b, v(1));
        // v1-M has 16 data bytes = 128 bits; 87 free
        b.pad(128 - b.bits());
        assert_eq!(b.bits(), 128);
        assert_eq!(
            b.bytes(),
            [0x10, 0x20, 0x0C, 0x56, 0x61, 0x80, 0xEC, 0x11, 0xEC, 0x11, 0xEC, 0x11, 0xEC, 0x11,
             0xEC, 0x11]
        );
    }

    #[test]
    fn test_pad_short() {
        let mut b = Bits::new();
        b.write(0b101, 3);
        b.pad(2);
        assert_eq!(b.bits(), 5);
    }

    #[test]
    fn test_check_bytes_single_block() {
        let mut b = Bits::new();
        Segment::Num("01234567").encode(&mut b, v(1));
        b.add_check_bytes(v(1), ECLevel::M);
        let bytes = b.bytes();
        // 16 data + 10 check codewords
        assert_eq!(bytes.len(), 26);
        assert_eq!(&bytes[..6], &[0x10, 0x20, 0x0C, 0x56, 0x61, 0x80]);

        let rs = RsEncoder::new(10);
        let mut check = vec![0u8; 10];
        rs.ecc(&bytes[..16], &mut check);
        assert_eq!(&bytes[16..], &check[..]);
    }

    #[test]
    fn test_check_bytes_multi_block_layout() {
        // v3-Q: 34 data bytes in 2 blocks of 17, 18 check bytes each.
        let mut b = Bits::new();
        Segment::Str("block structure").encode(&mut b, v(3));
        b.add_check_bytes(v(3), ECLevel::Q);
        let bytes = b.bytes();
        assert_eq!(bytes.len(), 70);

        let rs = RsEncoder::new(18);
        let mut check = vec![0u8; 18];
        rs.ecc(&bytes[0..17], &mut check);
        assert_eq!(&bytes[34..52], &check[..]);
        rs.ecc(&bytes[17..34], &mut check);
        assert_eq!(&bytes[52..70], &check[..]);
    }

    #[test]
    fn test_reset_clears_stream() {
        let mut b = Bits::new();
        Segment::Str("hello").encode(&mut b, v(2));
        assert!(b.bits() > 0);
        b.reset();
        assert_eq!(b.bits(), 0);
        assert!(b.bytes().is_empty());
    }

    #[test]
    fn test_segment_validation() {
        assert!(Segment::Num("0123").validate().is_ok());
        assert!(Segment::Num("12a").validate().is_err());
        assert!(Segment::Str("plain ascii").validate().is_ok());
        assert!(Segment::Str("snowman \u{2603}").validate().is_err());
    }
}
