//! Small shared helpers. Kept separate from `jose`/`crypto` because both of those
//! modules need unpadded base64url and neither one "owns" it.

use base64::{encode_config, URL_SAFE_NO_PAD};

/// Unpadded base64url encoding, used for every base64 value this protocol emits
/// (JWS segments, the thumbprint, the DER-encoded CSR, key authorizations).
pub fn b64(bytes: &[u8]) -> String {
    encode_config(bytes, URL_SAFE_NO_PAD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn b64_is_unpadded() {
        // "f" -> "Zg==" padded, "Zg" unpadded.
        assert_eq!(b64(b"f"), "Zg");
        assert!(!b64(b"hello world").contains('='));
    }

    #[test]
    fn b64_is_url_safe() {
        // Byte sequence chosen to force both '+' and '/' in standard base64.
        let bytes = [0xfb, 0xff, 0xbf];
        let encoded = b64(&bytes);
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('/'));
    }
}
