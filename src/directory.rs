//! Directory discovery: the first request of every run. Fetches the CA's
//! endpoint URIs and the first nonce off the same response.

use serde::Deserialize;

use crate::error::Error;
use crate::http::HttpClient;

/// The CA's endpoint URIs, as returned by a GET of the directory URL.
#[derive(Debug, Clone, Deserialize)]
pub struct Directory {
    #[serde(rename = "new-authz")]
    pub new_authz: String,
    #[serde(rename = "new-reg")]
    pub new_reg: String,
    #[serde(rename = "new-cert")]
    pub new_cert: String,
    #[serde(rename = "revoke-cert")]
    pub revoke_cert: String,
}

/// Fetches the directory and the first nonce. Fails with [`Error::NoNonce`] if the
/// response carries no `Replay-Nonce` header — the source does not attempt a
/// separate nonce round-trip, the directory GET is expected to carry one.
pub fn fetch(http: &dyn HttpClient, directory_url: &str) -> crate::error::Result<(Directory, String)> {
    let response = http.get(directory_url)?;

    if response.status != 200 {
        return Err(Error::UnexpectedStatus {
            endpoint: "directory".to_string(),
            status: response.status,
            body: response.body_str().into_owned(),
        });
    }

    let nonce = response
        .header("replay-nonce")
        .ok_or(Error::NoNonce)?
        .to_string();

    let directory: Directory = serde_json::from_slice(&response.body)
        .map_err(|e| Error::MalformedJson("directory".to_string(), e.to_string()))?;

    Ok((directory, nonce))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;

    struct FixedResponse(HttpResponse);

    impl HttpClient for FixedResponse {
        fn get(&self, _url: &str) -> crate::error::Result<HttpResponse> {
            Ok(self.0.clone())
        }
        fn post(&self, _url: &str, _headers: &[(&str, &str)], _body: &[u8]) -> crate::error::Result<HttpResponse> {
            unreachable!("directory discovery never POSTs")
        }
    }

    #[test]
    fn fetch_extracts_endpoints_and_nonce() {
        let body = serde_json::json!({
            "new-authz": "https://ca.example/new-authz",
            "new-reg": "https://ca.example/new-reg",
            "new-cert": "https://ca.example/new-cert",
            "revoke-cert": "https://ca.example/revoke-cert",
        });
        let http = FixedResponse(HttpResponse::new(
            200,
            vec![("Replay-Nonce".to_string(), "N0".to_string())],
            serde_json::to_vec(&body).unwrap(),
        ));

        let (directory, nonce) = fetch(&http, "https://ca.example/directory").unwrap();
        assert_eq!(nonce, "N0");
        assert_eq!(directory.new_authz, "https://ca.example/new-authz");
        assert_eq!(directory.new_cert, "https://ca.example/new-cert");
    }

    #[test]
    fn fetch_without_nonce_fails() {
        let body = serde_json::json!({
            "new-authz": "a", "new-reg": "b", "new-cert": "c", "revoke-cert": "d",
        });
        let http = FixedResponse(HttpResponse::new(200, Vec::new(), serde_json::to_vec(&body).unwrap()));

        assert!(matches!(
            fetch(&http, "https://ca.example/directory"),
            Err(Error::NoNonce)
        ));
    }
}
