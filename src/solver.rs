//! The challenge-solver abstraction: select a challenge from an authorization
//! object's `challenges` array, compute its key authorization, and hand the
//! side effect of publishing it off to whatever deployment mechanism the
//! caller has. This crate never serves the file or answers the DNS query
//! itself — the built-in solvers stop at logging the artifact and blocking
//! for operator confirmation.

use serde_json::Value;

use crate::crypto::sha256;
use crate::util::b64;

/// A pluggable challenge strategy: picks a challenge out of the authorization
/// response and performs (or delegates) the publication side effect.
///
/// `solve` takes no reference to the session — only what it needs to publish
/// the challenge — so solvers can't outlive a single per-domain call.
pub trait Solver {
    /// The ACME challenge type this solver handles, e.g. `"http-01"`.
    fn name(&self) -> &str;

    /// Picks the first element of `challenges` this solver can handle.
    fn select<'a>(&self, challenges: &'a [Value]) -> Option<&'a Value>;

    /// Publishes the key authorization for `domain`, blocking until it's live.
    /// Returns the failure reason (not an `Error`) so the caller can wrap it
    /// into `Error::SolverFailed` with the domain/challenge context attached.
    fn solve(&self, domain: &str, token: &str, key_authorization: &str) -> Result<(), String>;
}

/// `KA = token "." thumbprint`. Shared by both built-in solvers and available
/// to user-supplied ones.
pub fn key_authorization(token: &str, thumbprint: &str) -> String {
    format!("{token}.{thumbprint}")
}

/// The DNS-01 TXT record value: `base64url(sha256(KA))`, unpadded.
pub fn dns01_txt_value(key_authorization: &str) -> String {
    b64(&sha256(key_authorization.as_bytes()))
}

fn challenge_type_is(challenge: &Value, type_name: &str) -> bool {
    challenge.get("type").and_then(Value::as_str) == Some(type_name)
}

fn block_for_confirmation() -> Result<(), String> {
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .map_err(|e| e.to_string())?;
    Ok(())
}

/// Built-in HTTP-01 solver. Logs the file path and required body, then blocks
/// on stdin for the operator to confirm it's published.
#[derive(Debug, Default, Clone, Copy)]
pub struct Http01Solver;

impl Solver for Http01Solver {
    fn name(&self) -> &str {
        "http-01"
    }

    fn select<'a>(&self, challenges: &'a [Value]) -> Option<&'a Value> {
        challenges.iter().find(|c| challenge_type_is(c, "http-01"))
    }

    fn solve(&self, domain: &str, token: &str, key_authorization: &str) -> Result<(), String> {
        log::info!(
            "http-01 challenge for {domain}: publish a file at \
             http://{domain}/.well-known/acme-challenge/{token} whose body is exactly:\n{key_authorization}"
        );
        println!("Press enter once the file above is published.");
        block_for_confirmation()
    }
}

/// Built-in DNS-01 solver. Logs the TXT record name and value, then blocks on
/// stdin for the operator to confirm it's published.
#[derive(Debug, Default, Clone, Copy)]
pub struct Dns01Solver;

impl Solver for Dns01Solver {
    fn name(&self) -> &str {
        "dns-01"
    }

    fn select<'a>(&self, challenges: &'a [Value]) -> Option<&'a Value> {
        challenges.iter().find(|c| challenge_type_is(c, "dns-01"))
    }

    fn solve(&self, domain: &str, _token: &str, key_authorization: &str) -> Result<(), String> {
        let value = dns01_txt_value(key_authorization);
        log::info!(
            "dns-01 challenge for {domain}: publish a TXT record at \
             _acme-challenge.{domain} with value:\n{value}"
        );
        println!("Press enter once the TXT record above is published.");
        block_for_confirmation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_authorization_format() {
        assert_eq!(key_authorization("tok", "thumb"), "tok.thumb");
    }

    #[test]
    fn dns01_txt_value_is_unpadded_b64_of_sha256() {
        let ka = "tok.thumb";
        let expected = b64(&sha256(ka.as_bytes()));
        assert_eq!(dns01_txt_value(ka), expected);
        assert!(!dns01_txt_value(ka).contains('='));
    }

    #[test]
    fn http01_selects_matching_challenge_only() {
        let challenges = vec![
            json!({"type": "dns-01", "token": "a", "uri": "u1"}),
            json!({"type": "http-01", "token": "b", "uri": "u2"}),
        ];
        let selected = Http01Solver.select(&challenges).unwrap();
        assert_eq!(selected["token"], "b");
    }

    #[test]
    fn dns01_selects_matching_challenge_only() {
        let challenges = vec![
            json!({"type": "http-01", "token": "a", "uri": "u1"}),
            json!({"type": "dns-01", "token": "b", "uri": "u2"}),
        ];
        let selected = Dns01Solver.select(&challenges).unwrap();
        assert_eq!(selected["token"], "b");
    }

    #[test]
    fn select_returns_none_when_no_challenge_matches() {
        let challenges = vec![json!({"type": "tls-sni-01", "token": "a", "uri": "u1"})];
        assert!(Http01Solver.select(&challenges).is_none());
        assert!(Dns01Solver.select(&challenges).is_none());
    }
}
