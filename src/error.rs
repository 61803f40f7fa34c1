use thiserror::Error;

#[derive(Debug, Error)]
pub enum QrArtError {
    #[error("cannot encode payload into available data bits")]
    PayloadTooLarge,

    #[error("cannot preserve required bits")]
    CannotPreserve,

    #[error("unsupported version {0} (supported: 1..=8)")]
    InvalidVersion(u8),

    #[error("invalid mask pattern {0} (valid: 0..=7)")]
    InvalidMask(u8),

    #[error("invalid rotation {0} (valid: 0..=3)")]
    InvalidRotation(u8),

    #[error("payload contains characters outside the chosen encoding mode")]
    InvalidPayload,

    #[error("failed to load image: {0}")]
    ImageLoad(String),

    #[error("re-encoded payload does not reproduce the steered codeword")]
    CodewordMismatch,
}

pub type Result<T> = std::result::Result<T, QrArtError>;
