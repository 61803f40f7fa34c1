//! Artistic QR code generation. The engine steers the free payload and
//! check bits of a QR symbol so its module pattern approximates a
//! grayscale target image, while the symbol still decodes to
//! `url + "#" + digits` on any conforming reader.

pub mod bits;
pub mod code;
pub mod config;
pub mod error;
pub mod gf256;
pub mod mask;
pub mod plan;
pub mod solver;
pub mod steer;
pub mod tables;
pub mod target;

pub use code::Code;
pub use config::{ECLevel, Encoding, Mask, Rotation, Version};
pub use error::{QrArtError, Result};
pub use steer::{encode_art, ArtCode, ArtRequest};
pub use target::Target;

use bits::Segment;

/// Encode a plain (non-artistic) QR code for `text`. Digit-only text
/// uses the numeric mode; anything else is encoded as bytes. When no
/// mask is forced, the lowest-penalty mask is chosen.
pub fn encode_text(text: &str, version: Version, level: ECLevel, mask: Option<Mask>) -> Result<Code> {
    let seg = if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        Segment::Num(text)
    } else {
        Segment::Str(text)
    };
    match mask {
        Some(m) => plan::Plan::new(version, level, m)?.encode(&[seg]),
        None => mask::best_mask(version, level, &[seg]).map(|(_, code)| code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_text_plain() {
        let code = encode_text(
            "hello, world",
            Version::new(1).unwrap(),
            ECLevel::L,
            None,
        )
        .unwrap();
        assert_eq!(code.size, 21);
    }

    #[test]
    fn encode_text_numeric_payload() {
        let code = encode_text(
            "0123456789",
            Version::new(1).unwrap(),
            ECLevel::M,
            Some(Mask::new(0).unwrap()),
        )
        .unwrap();
        assert_eq!(code.size, 21);
    }

    #[test]
    fn encode_text_too_long() {
        let text = "x".repeat(300);
        let err = encode_text(&text, Version::new(2).unwrap(), ECLevel::L, None);
        assert!(matches!(err, Err(QrArtError::PayloadTooLarge)));
    }

    #[test]
    fn fixed_and_auto_mask_agree_on_payload_size() {
        let v = Version::new(3).unwrap();
        let auto = encode_text("same text", v, ECLevel::Q, None).unwrap();
        let fixed = encode_text("same text", v, ECLevel::Q, Some(Mask::new(5).unwrap())).unwrap();
        assert_eq!(auto.size, fixed.size);
    }
}
