//! Unpadded base64, the wire encoding for all key, signature and hash
//! material. Standard alphabet — not URL-safe — per the key-exchange
//! format.

use base64::alphabet;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;

/// Decoder for the wire encoding: standard alphabet, no padding. Trailing
/// bits are not required to be canonical, matching the stored key material
/// and golden test vectors.
const DECODE_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone)
        .with_decode_allow_trailing_bits(true),
);

/// Encode bytes as unpadded standard base64.
pub fn encode_unpadded_base64(bytes: &[u8]) -> String {
    STANDARD_NO_PAD.encode(bytes)
}

/// Decode an unpadded standard-base64 string.
pub fn decode_unpadded_base64(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    DECODE_ENGINE.decode(s)
}
