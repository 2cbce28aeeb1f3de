//! The HTTP and wall-clock collaborators the state machine consumes. Both are
//! traits so `session::issue_certificate` can be driven by a mock in tests
//! instead of a live CA (see `tests/issuance.rs`); `ReqwestHttpClient` and
//! `ThreadSleeper` are the production defaults `get_crt` wires up.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::Result;

/// A response from `HttpClient::get`/`post`: status, headers, and a raw body.
///
/// Header lookup is case-insensitive, so `Replay-Nonce`/`Location`/`Link` are
/// found regardless of how the CA happened to case them on the wire.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, headers: impl IntoIterator<Item = (String, String)>, body: Vec<u8>) -> Self {
        let headers = headers
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();
        HttpResponse {
            status,
            headers,
            body,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(|v| v.as_str())
    }

    pub fn body_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn body_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Finds a `Link:` header entry whose `rel` parameter equals `relation`,
    /// returning its URI. Handles both a single comma-joined `Link` header value
    /// and the (equivalent) case of several individually-quoted links.
    ///
    /// This is specifically for the ACME v1 terms-of-service link: a 201 to
    /// `new-reg` carries `Link: <https://example/terms>; rel="terms-of-service"`.
    pub fn link_relation(&self, relation: &str) -> Option<String> {
        let header = self.header("link")?;
        for entry in split_link_header(header) {
            let (uri, params) = entry.split_once(';')?;
            let uri = uri.trim().trim_start_matches('<').trim_end_matches('>');
            for param in params.split(';') {
                let param = param.trim();
                if let Some(value) = param.strip_prefix("rel=") {
                    let value = value.trim_matches('"');
                    if value == relation {
                        return Some(uri.to_string());
                    }
                }
            }
        }
        None
    }
}

/// Splits a `Link` header value on commas that separate entries, not commas that
/// might appear inside a URI itself — there are none of those for ACME links, so
/// a plain split is sufficient here.
fn split_link_header(header: &str) -> impl Iterator<Item = &str> {
    header.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// The transport the state machine drives. Implemented over `reqwest::blocking`
/// in production (`ReqwestHttpClient`); mocked in `tests/issuance.rs`.
pub trait HttpClient {
    fn get(&self, url: &str) -> Result<HttpResponse>;

    /// `Content-Length` is always set from `body.len()` — callers don't need
    /// to (and shouldn't) pass it in `headers`.
    fn post(&self, url: &str, headers: &[(&str, &str)], body: &[u8]) -> Result<HttpResponse>;
}

/// Default production `HttpClient`, backed by a single reused `reqwest::blocking::Client`.
pub struct ReqwestHttpClient {
    client: reqwest::blocking::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<Self> {
        Ok(ReqwestHttpClient {
            client: reqwest::blocking::Client::builder().build()?,
        })
    }
}

impl HttpClient for ReqwestHttpClient {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        let response = self.client.get(url).send()?;
        to_http_response(response)
    }

    fn post(&self, url: &str, headers: &[(&str, &str)], body: &[u8]) -> Result<HttpResponse> {
        let mut request = self
            .client
            .post(url)
            .header("Content-Length", body.len().to_string());
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let response = request.body(body.to_vec()).send()?;
        to_http_response(response)
    }
}

fn to_http_response(response: reqwest::blocking::Response) -> Result<HttpResponse> {
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| Ok((name.to_string(), value.to_str()?.to_string())))
        .collect::<Result<Vec<_>>>()?;
    let body = response.bytes()?.to_vec();
    Ok(HttpResponse::new(status, headers, body))
}

/// The polling-delay collaborator. Implemented over `std::thread::sleep` in
/// production; mocked (as a call counter) in `tests/issuance.rs`.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
