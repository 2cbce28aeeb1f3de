//! An ACME v1-style (pre-RFC-8555, Let's-Encrypt-circa-2016) certificate
//! issuance client: directory discovery, account registration, per-domain
//! authorization and challenge solving, validation polling, and final CSR
//! submission. See `get_crt` for the entry point.

// Common error module
pub mod error;
// RSA key / CSR / certificate handling, the one part of the protocol this
// crate hands off to `openssl` (and, for CSR SAN extraction, `x509-parser`).
pub mod crypto;
// Directory discovery: the first request of every run.
pub mod directory;
// The HTTP transport and polling-sleep collaborators the state machine
// consumes, modeled as traits so tests never touch the network or a clock.
pub mod http;
// Canonical JWK, RFC 7638 thumbprint, and the flattened JWS envelope.
pub mod jose;
// The pluggable challenge-solver abstraction plus the built-in HTTP-01/DNS-01
// solvers.
pub mod solver;
// The issuance state machine itself.
mod session;
// Small shared helpers (base64url).
pub mod util;

pub use error::{Error, Result};
pub use http::{HttpClient, HttpResponse, ReqwestHttpClient, Sleeper, ThreadSleeper};
pub use session::{get_crt, issue_certificate, ClientConfig};
pub use solver::{Dns01Solver, Http01Solver, Solver};

/// ACME v1 production directory, used when `get_crt` is called without an
/// explicit `directory_url`.
pub const DEFAULT_DIRECTORY_URL: &str = "https://acme-v01.api.letsencrypt.org/directory";

/// Default delay between challenge-validation polls.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
