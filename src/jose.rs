//! Canonical JWK, RFC 7638 thumbprint, and the flattened-JSON JWS envelope this
//! protocol signs every authenticated request with.

use openssl::pkey::Private;
use openssl::rsa::Rsa;
use serde::Serialize;
use serde_json::Value;

use crate::crypto::{rs256_sign, sha256};
use crate::error::Result;
use crate::util::b64;

/// The canonical JSON Web Key form of an RSA public key.
///
/// Field declaration order is `e`, `kty`, `n` on purpose: `serde_json` serializes
/// struct fields in declaration order, so this struct *is* the lexicographic
/// ordering RFC 7638 requires — no explicit sort step needed.
#[derive(Serialize)]
struct Jwk {
    e: String,
    kty: &'static str,
    n: String,
}

impl Jwk {
    fn from_rsa(key: &Rsa<Private>) -> Self {
        Jwk {
            e: b64(&key.e().to_vec()),
            kty: "RSA",
            n: b64(&key.n().to_vec()),
        }
    }

    /// Serializes to the exact bytes the thumbprint and the `jwk` protected-header
    /// field are computed over: compact JSON, no whitespace.
    fn canonical_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// `base64url(sha256(canonical_jwk))`, unpadded, per RFC 7638.
pub fn thumbprint(key: &Rsa<Private>) -> Result<String> {
    let jwk = Jwk::from_rsa(key);
    Ok(b64(&sha256(&jwk.canonical_bytes()?)))
}

#[derive(Serialize)]
struct Protected {
    alg: &'static str,
    jwk: Value,
    nonce: String,
}

#[derive(Serialize)]
struct FlattenedJws {
    protected: String,
    payload: String,
    signature: String,
}

/// Builds the flattened JSON JWS body this protocol sends on every authenticated
/// POST: `{"protected":P,"payload":Q,"signature":S}` with `P` carrying `alg`, the
/// embedded `jwk`, and the current `nonce` (this protocol has no account `kid` —
/// the public key is always embedded).
pub fn encode(payload: &Value, nonce: &str, account_key: &Rsa<Private>) -> Result<Value> {
    let jwk = Jwk::from_rsa(account_key).to_value()?;
    let protected = Protected {
        alg: "RS256",
        jwk,
        nonce: nonce.to_owned(),
    };

    let protected64 = b64(&serde_json::to_vec(&protected)?);
    let payload64 = b64(&serde_json::to_vec(payload)?);

    let signing_input = format!("{}.{}", protected64, payload64);
    let signature64 = b64(&rs256_sign(account_key, signing_input.as_bytes())?);

    Ok(serde_json::to_value(FlattenedJws {
        protected: protected64,
        payload: payload64,
        signature: signature64,
    })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use openssl::rsa::Rsa;

    fn test_key() -> Rsa<Private> {
        Rsa::generate(2048).unwrap()
    }

    #[test]
    fn jwk_field_order_is_canonical() {
        let key = test_key();
        let jwk = Jwk::from_rsa(&key);
        let json = String::from_utf8(jwk.canonical_bytes().unwrap()).unwrap();
        let e_pos = json.find("\"e\"").unwrap();
        let kty_pos = json.find("\"kty\"").unwrap();
        let n_pos = json.find("\"n\"").unwrap();
        assert!(e_pos < kty_pos && kty_pos < n_pos);
        assert!(!json.contains(' '));
        assert!(!json.contains('\n'));
    }

    #[test]
    fn jwk_is_deterministic_for_the_same_key() {
        let key = test_key();
        let a = Jwk::from_rsa(&key).canonical_bytes().unwrap();
        let b = Jwk::from_rsa(&key).canonical_bytes().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn thumbprint_is_deterministic() {
        let key = test_key();
        assert_eq!(thumbprint(&key).unwrap(), thumbprint(&key).unwrap());
    }

    #[test]
    fn thumbprint_matches_rfc7638_vector() {
        // The exact canonical JWK JSON from RFC 7638 appendix A.1, fed straight
        // through our sha256+base64url pipeline: this checks that pipeline
        // against the RFC's own worked example, independent of our RSA parsing.
        const CANONICAL_JWK: &str = concat!(
            "{\"e\":\"AQAB\",\"kty\":\"RSA\",\"n\":\"0vx7agoebGcQSuuPiLJXZptN9nndrQmbXEps2aiAFbWhM78LhWx4cbbfAAtVT86zwu1RK7aPFFxuhDR1L6tSoc_BJECPebWKRXjBZCiFV4n3oknjhMstn64tZ_2W-5JsGY4Hc5n9yBXArwl93lqt7_RN5w6Cf0h4QyQ5v-65YGjQR0_FDW2QvzqY368QQMicAtaSqzs8KJZgnYb9c7d0zgdAZHzu6qMQvRL5hajrn1n91CbOpbISD08qNLyrdkt-bFTWhAI4vMQFh6WeZu0fM4lFd2NcRwr3XPksINHaQ-G_xBniIqbw0Ls1jF44-csFCur-kEgU8awapJzKnqDKgw\"}",
        );

        let digest = b64(&sha256(CANONICAL_JWK.as_bytes()));
        assert_eq!(digest, "NzbLsXh8uDCcd-6MNwXF4W_7noWXFZAfHkxZsRGC9Xs");
    }
}
