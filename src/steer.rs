//! The steering engine: chooses data and check bit values so the
//! rendered module pattern approximates a target image while the
//! codeword stays valid and the fixed payload prefix survives.

use image::RgbaImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bits::{Bits, Segment};
use crate::code::{make_module_image, Code};
use crate::config::{ECLevel, Mask, Rotation, Version};
use crate::error::{QrArtError, Result};
use crate::gf256::RsEncoder;
use crate::plan::{Plan, Role};
use crate::solver::BitBlock;
use crate::target::Target;

/// Priority given to a module that must come out zero after a numeric
/// group overflowed; large enough to sort before any contrast score.
const HARD_ZERO_PRIORITY: i32 = 1_000_000_000 >> 8;

/// All the knobs for one artistic encode.
#[derive(Clone, Copy, Debug)]
pub struct ArtRequest<'a> {
    pub url: &'a str,
    pub version: Version,
    pub level: ECLevel,
    pub mask: Mask,
    pub rotation: Rotation,
    /// Pixels per module in the rendered output; 0 means the default.
    pub scale: u32,
    /// Rank modules by a pseudo-random checkerboard mix instead of
    /// image contrast.
    pub rand_priority: bool,
    /// Run the error-diffusion second pass.
    pub dither: bool,
    /// Also diffuse error to the three lower-row neighbors.
    pub dither_down: bool,
    /// Leave the check bits alone and steer data bits only.
    pub only_data_bits: bool,
    /// Produce the control image showing which modules were steered.
    pub save_control: bool,
    /// PRNG seed; None draws one from the OS.
    pub seed: Option<u64>,
}

impl<'a> ArtRequest<'a> {
    pub fn new(url: &'a str, version: Version, level: ECLevel, mask: Mask) -> ArtRequest<'a> {
        ArtRequest {
            url,
            version,
            level,
            mask,
            rotation: Rotation::default(),
            scale: 8,
            rand_priority: false,
            dither: false,
            dither_down: false,
            only_data_bits: false,
            save_control: false,
            seed: None,
        }
    }
}

/// The finished artistic code.
pub struct ArtCode {
    pub code: Code,
    /// The numeric suffix the symbol decodes to after the `#`.
    pub digits: String,
    /// Modules the engine successfully pinned.
    pub steered: usize,
    /// Rounds restarted by the numeric reconciler.
    pub restarts: u32,
    pub control: Option<RgbaImage>,
}

/// Per-module steering state, indexed by codeword bit offset.
#[derive(Clone, Copy, Default)]
pub(crate) struct PixInfo {
    x: usize,
    y: usize,
    targ: u8,
    dtarg: i32,
    contrast: i32,
    hard_zero: bool,
    block: Option<usize>,
    bit: usize,
}

#[derive(Clone, Copy)]
struct Candidate {
    off: usize,
    priority: i64,
}

#[inline]
fn data_bit(data: &[u8], bi: usize) -> u8 {
    (data[bi / 8] >> (7 - bi % 8)) & 1
}

/// Read the 10-bit numeric groups back out of the steered codeword.
/// Valid groups become three digits of `num`; a group that came out at
/// 1000 or above marks its 64-weight bit hard-zero with top priority so
/// the next round forces it off. Returns the number of bad groups.
pub(crate) fn read_numeric_groups(
    data: &[u8],
    bbit: usize,
    groups: usize,
    num: &mut [u8],
    pix_by_off: &mut [PixInfo],
) -> usize {
    let mut noops = 0;
    for i in 0..groups {
        let mut v: u32 = 0;
        for j in 0..10 {
            v = v << 1 | data_bit(data, bbit + 10 * i + j) as u32;
        }
        if v >= 1000 {
            // Too many high bits set; 512+256+128+64+32 alone is 992,
            // so clearing the 64-weight bit brings the group back into
            // range once the solver re-steers around it.
            let pinfo = &mut pix_by_off[bbit + 10 * i + 3];
            pinfo.contrast = HARD_ZERO_PRIORITY;
            pinfo.hard_zero = true;
            noops += 1;
            continue;
        }
        num[i * 3] = b'0' + (v / 100) as u8;
        num[i * 3 + 1] = b'0' + (v / 10 % 10) as u8;
        num[i * 3 + 2] = b'0' + (v % 10) as u8;
    }
    noops
}

fn add_dither(pix_by_off: &mut [PixInfo], role: Role, offset: u32, err: i32) {
    if role != Role::Data && role != Role::Check {
        return;
    }
    pix_by_off[offset as usize].dtarg += err;
}

/// Encode `req.url` plus a steered numeric suffix so the module grid
/// approximates `target`.
pub fn encode_art(req: &ArtRequest, target: &Target) -> Result<ArtCode> {
    let scale = if req.scale == 0 { 8 } else { req.scale };
    let mut plan = Plan::new(req.version, req.level, req.mask)?;
    plan.rotate(req.rotation);
    let p = &plan;

    let mut rng: StdRng = match req.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let nd_base = p.data_bytes / p.blocks;
    let nc = p.check_bytes / p.blocks;
    let extra = p.data_bytes - nd_base * p.blocks;
    let rs = RsEncoder::new(nc);

    // Per-module steering state, indexed by codeword bit offset, and
    // the expected color grid the pinning pass commits to.
    let total_bits = (p.data_bytes + p.check_bytes) * 8;
    let mut pix_by_off: Vec<PixInfo> = vec![PixInfo::default(); total_bits];
    let mut expect = vec![vec![false; p.size]; p.size];
    for (y, row) in p.modules.iter().enumerate() {
        for (x, m) in row.iter().enumerate() {
            let (targ, mut contrast) = target.sample(x as i32, y as i32);
            if req.rand_priority && contrast >= 0 {
                contrast = rng.gen_range(0..128)
                    + 64 * ((x + y) % 2) as i32
                    + 64 * ((x + y) % 3 % 2) as i32;
            }
            expect[y][x] = m.black;
            if m.role.is_codeword() {
                pix_by_off[m.offset as usize] = PixInfo {
                    x,
                    y,
                    targ,
                    dtarg: 0,
                    contrast,
                    hard_zero: false,
                    block: None,
                    bit: 0,
                };
            }
        }
    }

    let url = format!("{}#", req.url);
    Segment::Str(&url).validate()?;

    let mut restarts = 0u32;
    loop {
        // hard-zero flags and priorities survive a restart; block
        // back-references do not
        for pinfo in pix_by_off.iter_mut() {
            pinfo.block = None;
        }

        // Measure the fixed prefix, then build the template codeword:
        // url + '#', all-zero digits, padding, check bytes.
        let bbit =
            Segment::Str(&url).bit_len(p.version) + Segment::Num("").bit_len(p.version);
        if bbit > p.data_bytes * 8 {
            return Err(QrArtError::PayloadTooLarge);
        }
        let mut b = Bits::new();
        Segment::Str(&url).encode(&mut b, p.version);
        Segment::Num("").encode(&mut b, p.version);
        debug_assert_eq!(bbit, b.bits());
        let dbit = p.data_bytes * 8 - bbit;
        let mut num: Vec<u8> = vec![b'0'; dbit / 10 * 3];
        b.reset();
        Segment::Str(&url).encode(&mut b, p.version);
        Segment::Num(std::str::from_utf8(&num).unwrap()).encode(&mut b, p.version);
        b.add_check_bytes(p.version, p.level);
        let mut data = b.bytes();

        let mbit = bbit + dbit / 10 * 10;

        // Pin modules block by block, most visually important first.
        let mut blocks: Vec<BitBlock> = Vec::with_capacity(p.blocks);
        let mut doff = 0usize; // data bit offset
        let mut coff = 0usize; // check bit offset
        let mut nd = nd_base;
        for blocknum in 0..p.blocks {
            if blocknum == p.blocks - extra {
                nd += 1;
            }
            let data_off = doff / 8;
            let check_off = p.data_bytes + coff / 8;
            let mut bb = BitBlock::new(
                nd,
                nc,
                &rs,
                &data[data_off..data_off + nd],
                &data[check_off..check_off + nc],
                data_off,
                check_off,
            );

            // The editable data bits are this block's slice of
            // [bbit, mbit); everything outside is pinned to the
            // template.
            let mut lo = 0isize;
            let mut hi = (nd * 8) as isize;
            let bb_rel = bbit as isize - doff as isize;
            if lo < bb_rel {
                lo = bb_rel.min(hi);
            }
            let mb_rel = mbit as isize - doff as isize;
            if hi > mb_rel {
                hi = mb_rel.max(lo);
            }
            let (lo, hi) = (lo as usize, hi as usize);

            for i in (0..lo).chain(hi..nd * 8) {
                if !bb.can_set(i, data_bit(&data[data_off..], i)) {
                    return Err(QrArtError::CannotPreserve);
                }
            }

            let mut order: Vec<Candidate> = Vec::with_capacity((hi - lo) + nc * 8);
            for i in lo..hi {
                order.push(Candidate { off: doff + i, priority: 0 });
            }
            if !req.only_data_bits {
                for i in 0..nc * 8 {
                    order.push(Candidate {
                        off: p.data_bytes * 8 + coff + i,
                        priority: 0,
                    });
                }
            }
            for c in order.iter_mut() {
                c.priority = ((pix_by_off[c.off].contrast as i64) << 8) | rng.gen_range(0..256i64);
            }
            order.sort_by(|a, b| b.priority.cmp(&a.priority));

            for c in &order {
                let pinfo = &mut pix_by_off[c.off];
                let m = p.modules[pinfo.y][pinfo.x];
                let mut bval: u8 = if pinfo.targ < 128 { 1 } else { 0 };
                if m.invert {
                    bval ^= 1;
                }
                if pinfo.hard_zero {
                    bval = 0;
                }
                let bi = if m.role == Role::Data {
                    c.off - doff
                } else {
                    c.off - p.data_bytes * 8 - coff + nd * 8
                };
                if bb.can_set(bi, bval) {
                    pinfo.block = Some(blocknum);
                    pinfo.bit = bi;
                } else if pinfo.hard_zero {
                    panic!("hard zero bit could not be pinned");
                }
                // otherwise the module keeps its template color
            }
            bb.copy_out(&mut data);

            for i in 0..nd * 8 {
                let pinfo = &pix_by_off[doff + i];
                let m = p.modules[pinfo.y][pinfo.x];
                expect[pinfo.y][pinfo.x] = m.black ^ (data_bit(&data[data_off..], i) != 0);
            }
            for i in 0..nc * 8 {
                let pinfo = &pix_by_off[p.data_bytes * 8 + coff + i];
                let m = p.modules[pinfo.y][pinfo.x];
                expect[pinfo.y][pinfo.x] = m.black ^ (data_bit(&data[check_off..], i) != 0);
            }

            blocks.push(bb);
            doff += nd * 8;
            coff += nc * 8;
        }

        // Error-diffusion pass: re-steer every pinned module against
        // the accumulated target, pushing the quantization error to the
        // right neighbor (and optionally the row below).
        if req.dither {
            for pinfo in pix_by_off.iter_mut() {
                pinfo.dtarg = pinfo.targ as i32;
            }
            for y in 0..p.size {
                for x in 0..p.size {
                    let m = p.modules[y][x];
                    if !m.role.is_codeword() {
                        continue;
                    }
                    let pinfo = pix_by_off[m.offset as usize];
                    let Some(blockidx) = pinfo.block else {
                        // did not choose this module
                        continue;
                    };

                    let targ = pinfo.dtarg;
                    let mut v: i32 = if targ >= 128 { 255 } else { 0 };
                    let mut bval: u8 = if targ >= 128 { 0 } else { 1 };
                    if m.invert {
                        bval ^= 1;
                    }
                    if pinfo.hard_zero && bval != 0 {
                        bval = 0;
                        v ^= 255;
                    }

                    blocks[blockidx].reset(pinfo.bit, bval);

                    let err = targ - v;
                    if x + 1 < p.size {
                        let n = p.modules[y][x + 1];
                        add_dither(&mut pix_by_off, n.role, n.offset, err * 7 / 16);
                    }
                    if req.dither_down && y + 1 < p.size {
                        if x > 0 {
                            let n = p.modules[y + 1][x - 1];
                            add_dither(&mut pix_by_off, n.role, n.offset, err * 3 / 16);
                        }
                        let n = p.modules[y + 1][x];
                        add_dither(&mut pix_by_off, n.role, n.offset, err * 5 / 16);
                        if x + 1 < p.size {
                            let n = p.modules[y + 1][x + 1];
                            add_dither(&mut pix_by_off, n.role, n.offset, err * 1 / 16);
                        }
                    }
                }
            }
            for bb in blocks.iter_mut() {
                bb.copy_out(&mut data);
            }
        }

        // Recover the digits; any overflowing group forces a restart
        // with its 64-weight module pinned to zero. Bounded: each round
        // marks at least one previously unmarked group.
        let noops = read_numeric_groups(&data, bbit, dbit / 10, &mut num, &mut pix_by_off);
        if noops > 0 {
            restarts += 1;
            continue;
        }

        // The recovered digits re-encoded must reproduce the steered
        // codeword bit for bit.
        let digits = String::from_utf8(num).unwrap();
        let mut b1 = Bits::new();
        Segment::Str(&url).encode(&mut b1, p.version);
        Segment::Num(&digits).encode(&mut b1, p.version);
        b1.add_check_bytes(p.version, p.level);
        if b1.bytes() != data {
            return Err(QrArtError::CodewordMismatch);
        }

        let mut code = p.encode(&[Segment::Str(&url), Segment::Num(&digits)])?;
        code.scale = scale;

        if !req.dither {
            for (y, row) in expect.iter().enumerate() {
                for (x, &want) in row.iter().enumerate() {
                    assert_eq!(
                        code.black(x, y),
                        want,
                        "module ({}, {}) does not match the pinned grid",
                        x,
                        y
                    );
                }
            }
        }

        let steered = pix_by_off.iter().filter(|pinfo| pinfo.block.is_some()).count();

        let control = if req.save_control {
            Some(make_module_image(p.size, scale, |x, y| {
                let m = p.modules[y][x];
                if m.role.is_codeword() && pix_by_off[m.offset as usize].block.is_some() {
                    if code.black(x, y) {
                        0x000000ff
                    } else {
                        0xffffffff
                    }
                } else if code.black(x, y) {
                    0x3f3f3fff
                } else {
                    0xbfbfbfff
                }
            }))
        } else {
            None
        };

        return Ok(ArtCode {
            code,
            digits,
            steered,
            restarts,
            control,
        });
    }
}
