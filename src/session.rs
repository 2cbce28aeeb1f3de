//! The issuance state machine: discovery, registration, optional terms
//! acceptance, per-domain authorization/challenge/polling, and final CSR
//! submission. The stages are represented below purely for structured
//! logging — the public surface is `get_crt`/`issue_certificate`.

use std::cell::Cell;
use std::time::Duration;

use openssl::pkey::Private;
use openssl::rsa::Rsa;
use serde_json::Value;

use crate::crypto;
use crate::directory::{self, Directory};
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpResponse, ReqwestHttpClient, Sleeper, ThreadSleeper};
use crate::jose;
use crate::solver::{self, Dns01Solver, Solver};
use crate::util::b64;
use crate::{DEFAULT_DIRECTORY_URL, DEFAULT_POLL_INTERVAL_SECS};

/// Which CA to talk to, how long to wait between challenge polls, and
/// (optionally) how many polls to allow before giving up. `Default` matches
/// the production defaults.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub directory_url: String,
    pub poll_interval: Duration,
    pub max_poll_attempts: Option<u32>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            directory_url: DEFAULT_DIRECTORY_URL.to_string(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_poll_attempts: None,
        }
    }
}

/// Owns the account key, the fetched directory, and the single mutable nonce
/// slot the whole run serializes on. Never `Clone`, never `Sync` — a second
/// concurrent run must fetch its own directory and nonce.
struct Session {
    account_key: Rsa<Private>,
    thumbprint: String,
    directory: Directory,
    nonce: Cell<String>,
}

impl Session {
    fn new(account_key: Rsa<Private>, http: &dyn HttpClient, directory_url: &str) -> Result<Self> {
        let (directory, nonce) = directory::fetch(http, directory_url)?;
        let thumbprint = jose::thumbprint(&account_key)?;
        Ok(Session {
            account_key,
            thumbprint,
            directory,
            nonce: Cell::new(nonce),
        })
    }

    /// Consumes the current nonce, sends a signed POST, and installs the
    /// response's `Replay-Nonce` as the next nonce — the one operation every
    /// authenticated request in this protocol goes through.
    fn post_jws(
        &self,
        http: &dyn HttpClient,
        url: &str,
        payload: &Value,
        endpoint: &str,
        is_allowed: impl Fn(u16) -> bool,
    ) -> Result<HttpResponse> {
        let nonce = self.nonce.take();
        let body = jose::encode(payload, &nonce, &self.account_key)?;
        let body_bytes = serde_json::to_vec(&body)?;
        let response = http.post(url, &[], &body_bytes)?;

        let new_nonce = response
            .header("replay-nonce")
            .ok_or(Error::NoNonce)?
            .to_string();
        self.nonce.set(new_nonce);

        if !is_allowed(response.status) {
            return Err(Error::UnexpectedStatus {
                endpoint: endpoint.to_string(),
                status: response.status,
                body: response.body_str().into_owned(),
            });
        }
        Ok(response)
    }

    #[cfg(test)]
    fn current_nonce_for_test(&self) -> String {
        let nonce = self.nonce.take();
        self.nonce.set(nonce.clone());
        nonce
    }
}

/// The full entry point, with production defaults wired in: Let's Encrypt's
/// directory, a `reqwest::blocking` transport, a real thread sleeper, and
/// (absent an explicit solver) the built-in DNS-01 solver.
pub fn get_crt(
    account_key_pem: &str,
    csr_pem: &str,
    directory_url: Option<&str>,
    solver: Option<&dyn Solver>,
) -> Result<String> {
    let config = ClientConfig {
        directory_url: directory_url
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_DIRECTORY_URL.to_string()),
        ..ClientConfig::default()
    };

    let default_solver = Dns01Solver;
    let solver = solver.unwrap_or(&default_solver);

    let http = ReqwestHttpClient::new()?;
    let sleeper = ThreadSleeper;

    issue_certificate(account_key_pem, csr_pem, &config, solver, &http, &sleeper)
}

/// The fully-injectable entry point: every collaborator the state machine
/// consumes is a parameter, which is what makes the issuance flow testable
/// end to end without a live CA.
pub fn issue_certificate(
    account_key_pem: &str,
    csr_pem: &str,
    config: &ClientConfig,
    solver: &dyn Solver,
    http: &dyn HttpClient,
    sleeper: &dyn Sleeper,
) -> Result<String> {
    let account_key = crypto::parse_account_key(account_key_pem)?;
    let csr = crypto::parse_csr(csr_pem)?;
    let domains = crypto::domains_from_csr(&csr)?;

    log::debug!("state -> Start");
    let session = Session::new(account_key, http, &config.directory_url)?;
    log::debug!("state -> Discovered");

    register(&session, http)?;
    log::debug!("state -> Registered");

    for domain in &domains {
        authorize_domain(&session, http, sleeper, config, solver, domain)?;
        log::debug!("state -> DomainAuthorized ({domain})");
    }
    log::debug!("state -> AllAuthorized");

    let der = crypto::csr_to_der(&csr)?;
    let payload = serde_json::json!({ "resource": "new-cert", "csr": b64(&der) });
    let new_cert_url = session.directory.new_cert.clone();
    let response = session.post_jws(http, &new_cert_url, &payload, "new-cert", |s| s == 201)?;
    log::debug!("state -> Issued");

    crypto::der_to_pem_certificate(&response.body)
}

/// `Discovered -> Registered` (or `TermsPending -> Registered`). A 409 means
/// the CA already knows this account key — no `Location`, no terms to accept.
/// A 201 with no terms link also proceeds without acceptance.
fn register(session: &Session, http: &dyn HttpClient) -> Result<()> {
    let payload = serde_json::json!({ "resource": "new-reg" });
    let new_reg_url = session.directory.new_reg.clone();
    let response = session.post_jws(http, &new_reg_url, &payload, "new-reg", |s| {
        s == 201 || s == 409
    })?;

    if response.status == 409 {
        log::info!("account already registered with the CA");
        return Ok(());
    }

    let account_url = response.header("location").map(str::to_string);
    let terms_uri = response.link_relation("terms-of-service");

    match (account_url, terms_uri) {
        (Some(account_url), Some(terms_uri)) => {
            log::debug!("state -> TermsPending");
            let payload = serde_json::json!({ "resource": "reg", "agreement": terms_uri });
            session.post_jws(http, &account_url, &payload, "reg", |s| s == 202 || s == 409)?;
            Ok(())
        }
        _ => {
            log::info!("new account created with no terms-of-service link to accept");
            Ok(())
        }
    }
}

/// Drives one domain through `Registered -> Authorizing -> ChallengeReady ->
/// Polling -> DomainAuthorized`. Stops (propagates the error) on the first
/// failure, so the caller never requests `new-authz` for the next domain or
/// `new-cert` for any of them.
fn authorize_domain(
    session: &Session,
    http: &dyn HttpClient,
    sleeper: &dyn Sleeper,
    config: &ClientConfig,
    solver: &dyn Solver,
    domain: &str,
) -> Result<()> {
    log::info!("authorizing domain {domain}");
    let payload = serde_json::json!({
        "resource": "new-authz",
        "identifier": { "type": "dns", "value": domain },
    });
    let new_authz_url = session.directory.new_authz.clone();
    let response = session.post_jws(http, &new_authz_url, &payload, "new-authz", |s| s == 201)?;
    log::debug!("state -> Authorizing ({domain})");

    let body: Value = response
        .body_json()
        .map_err(|_| Error::MalformedJson("new-authz".to_string(), "response body was not JSON".to_string()))?;
    let challenges = body
        .get("challenges")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            Error::MalformedJson("new-authz".to_string(), "missing \"challenges\" array".to_string())
        })?;

    let challenge = solver
        .select(challenges)
        .ok_or_else(|| Error::NoSupportedChallenge(solver.name().to_string()))?;
    let token = challenge
        .get("token")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::MalformedJson("new-authz".to_string(), "challenge missing \"token\"".to_string()))?;
    let uri = challenge
        .get("uri")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::MalformedJson("new-authz".to_string(), "challenge missing \"uri\"".to_string()))?
        .to_string();

    let key_authorization = solver::key_authorization(token, &session.thumbprint);

    solver
        .solve(domain, token, &key_authorization)
        .map_err(Error::SolverFailed)?;
    log::debug!("state -> ChallengeReady ({domain})");

    let ack_payload = serde_json::json!({
        "resource": "challenge",
        "type": solver.name(),
        "keyAuthorization": key_authorization,
    });
    // The challenge-ack POST only requires "any 2xx" here, unlike every other
    // authenticated step which whitelists exact codes.
    session.post_jws(http, &uri, &ack_payload, "challenge", |s| s / 100 == 2)?;
    log::debug!("state -> Polling ({domain})");

    poll_until_valid(http, sleeper, config, domain, &uri)
}

/// `Polling -> Polling | DomainAuthorized`. GETs never consume a nonce — only
/// authenticated POSTs do.
fn poll_until_valid(
    http: &dyn HttpClient,
    sleeper: &dyn Sleeper,
    config: &ClientConfig,
    domain: &str,
    challenge_uri: &str,
) -> Result<()> {
    let mut attempts: u32 = 0;
    loop {
        if let Some(max) = config.max_poll_attempts {
            if attempts >= max {
                return Err(Error::ChallengeRejected(format!(
                    "exceeded max poll attempts ({max}) for domain {domain}"
                )));
            }
        }

        let response = http.get(challenge_uri)?;
        attempts += 1;
        let body: Value = response.body_json().unwrap_or(Value::Null);

        match body.get("status").and_then(Value::as_str) {
            Some("valid") => return Ok(()),
            Some("pending") | None => {
                log::debug!("domain {domain} still pending, sleeping for {:?}", config.poll_interval);
                sleeper.sleep(config.poll_interval);
            }
            Some(other) => {
                return Err(Error::ChallengeRejected(format!(
                    "challenge for {domain} reported status \"{other}\""
                )));
            }
        }
    }
}
