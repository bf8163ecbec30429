//! Byte ↔ text transcoding (standard base64, padded).
//!
//! Work is split into fixed-size chunks so multi-megabyte payloads never go
//! through a single encode/decode call. Chunk sizes are multiples of the
//! base64 quantum (3 bytes in, 4 chars out), so chunked output is identical
//! to a one-shot encoding.

use base64::{engine::general_purpose::STANDARD as B64, Engine};
use hush_core::{HushError, HushResult};

/// Raw bytes per encode chunk (multiple of 3)
const ENCODE_CHUNK: usize = 3 * 8192;

/// Characters per decode chunk (multiple of 4)
const DECODE_CHUNK: usize = 4 * 8192;

/// Encode bytes as padded standard base64. Total over all inputs.
pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);
    for chunk in bytes.chunks(ENCODE_CHUNK) {
        B64.encode_string(chunk, &mut out);
    }
    out
}

/// Decode padded standard base64. Rejects anything `encode` cannot produce.
pub fn decode(text: &str) -> HushResult<Vec<u8>> {
    if !is_codec_text(text) {
        return Err(HushError::MalformedEncoding(format!(
            "not canonical base64 ({} chars)",
            text.len()
        )));
    }

    let mut out = Vec::with_capacity(text.len() / 4 * 3);
    for chunk in text.as_bytes().chunks(DECODE_CHUNK) {
        B64.decode_vec(chunk, &mut out)
            .map_err(|e| HushError::MalformedEncoding(e.to_string()))?;
    }
    Ok(out)
}

/// True if `text` is shaped like our encoding: alphabet `[A-Za-z0-9+/]`,
/// length a multiple of 4, and at most two `=` only at the very end.
///
/// Does not check trailing-bit canonicality; `decode` does.
pub fn is_codec_text(text: &str) -> bool {
    let bytes = text.as_bytes();
    if bytes.len() % 4 != 0 {
        return false;
    }
    let body_len = bytes.len() - bytes.iter().rev().take(2).take_while(|&&b| b == b'=').count();
    bytes[..body_len]
        .iter()
        .all(|&b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
}


#[cfg(test)]
mod proptest_suite {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn roundtrip_identity(data in proptest::collection::vec(any::<u8>(), 0..=4096)) {
            let text = encode(&data);
            prop_assert!(is_codec_text(&text));
            prop_assert_eq!(decode(&text).unwrap(), data);
        }

        #[test]
        fn decode_never_panics(text in ".{0,256}") {
            let _ = decode(&text);
        }
    }
}
