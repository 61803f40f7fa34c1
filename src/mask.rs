//! Mask evaluation for the plain encoding path: the standard four
//! penalty features scored over a rendered symbol, and selection of the
//! lowest-penalty mask when the caller does not fix one.

use crate::bits::Segment;
use crate::code::Code;
use crate::config::{ECLevel, Mask, Version};
use crate::error::Result;
use crate::plan::Plan;

const PENALTY_N1: u32 = 3;
const PENALTY_N2: u32 = 3;
const PENALTY_N3: u32 = 40;
const PENALTY_N4: u32 = 10;

/// Compute the penalty score for a finished symbol (7.8.3.1).
pub fn penalty(code: &Code) -> u32 {
    let n = code.size;
    let mut score: u32 = 0;

    // FIRST feature: runs of five or more same-colored modules.
    for y in 0..n {
        let mut last_color = code.black(0, y);
        let mut current_run = 1;
        for x in 1..n {
            if code.black(x, y) == last_color {
                current_run += 1;
            } else {
                if current_run >= 5 {
                    score += (current_run - 5) + PENALTY_N1;
                }
                current_run = 1;
                last_color = code.black(x, y);
            }
        }
        if current_run >= 5 {
            score += (current_run - 5) + PENALTY_N1;
        }
    }
    // now the same for columns
    for x in 0..n {
        let mut last_color = code.black(x, 0);
        let mut current_run = 1;
        for y in 1..n {
            if code.black(x, y) == last_color {
                current_run += 1;
            } else {
                if current_run >= 5 {
                    score += (current_run - 5) + PENALTY_N1;
                }
                current_run = 1;
                last_color = code.black(x, y);
            }
        }
        if current_run >= 5 {
            score += (current_run - 5) + PENALTY_N1;
        }
    }

    // SECOND feature: 2x2 blocks of one color.
    for y in 0..n - 1 {
        for x in 0..n - 1 {
            let c = code.black(x, y);
            if c == code.black(x + 1, y) && c == code.black(x, y + 1) && c == code.black(x + 1, y + 1) {
                score += PENALTY_N2;
            }
        }
    }

    // THIRD feature: 1011101 with four light modules before or after.
    // Positions past the symbol edge count as light.
    const PATTERN: [bool; 7] = [true, false, true, true, true, false, true];
    let light_run = |black: &dyn Fn(i32) -> bool, from: i32| (from..from + 4).all(|i| !black(i));
    for y in 0..n {
        let black = |x: i32| x >= 0 && (x as usize) < n && code.black(x as usize, y);
        for x in 0..=n - 7 {
            if (0..7).any(|i| code.black(x + i, y) != PATTERN[i]) {
                continue;
            }
            if light_run(&black, x as i32 - 4) || light_run(&black, x as i32 + 7) {
                score += PENALTY_N3;
            }
        }
    }
    for x in 0..n {
        let black = |y: i32| y >= 0 && (y as usize) < n && code.black(x, y as usize);
        for y in 0..=n - 7 {
            if (0..7).any(|i| code.black(x, y + i) != PATTERN[i]) {
                continue;
            }
            if light_run(&black, y as i32 - 4) || light_run(&black, y as i32 + 7) {
                score += PENALTY_N3;
            }
        }
    }

    // FOURTH feature: dark/light balance in steps of five percent.
    let dark = (0..n)
        .flat_map(|y| (0..n).map(move |x| (x, y)))
        .filter(|&(x, y)| code.black(x, y))
        .count();
    let ratio = dark as f64 / (n * n) as f64;
    let step = ((0.5 - ratio).abs() * 20.0).floor() as u32;
    score += PENALTY_N4 * step;

    score
}

/// Evaluate all eight masks for the payload and return the one with
/// the lowest penalty together with its rendered code.
pub fn best_mask(version: Version, level: ECLevel, segments: &[Segment]) -> Result<(Mask, Code)> {
    let mut best: Option<(u32, Mask, Code)> = None;
    for index in 0..8u8 {
        let mask = Mask::new(index).unwrap();
        let code = Plan::new(version, level, mask)?.encode(segments)?;
        let score = penalty(&code);
        if best.as_ref().map_or(true, |(s, _, _)| score < *s) {
            best = Some((score, mask, code));
        }
    }
    let (_, mask, code) = best.unwrap();
    Ok((mask, code))
}
