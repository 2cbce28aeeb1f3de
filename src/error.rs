use openssl::error::ErrorStack;
use reqwest::header::ToStrError;
use thiserror::Error;

/// The error taxonomy raised by the issuance state machine and its collaborators.
///
/// No variant here is recovered internally — a run aborts on the first `Error` it
/// produces, and `Display` (via `thiserror`) gives the human-readable description
/// the entry point returns to the caller.
#[derive(Error, Debug)]
pub enum Error {
    #[error("account key PEM does not contain exactly one RSA private key")]
    BadKey,

    #[error("CSR PEM does not contain exactly one certificate request")]
    BadCsr,

    #[error("response is missing the Replay-Nonce header")]
    NoNonce,

    #[error("response body at {0} was not valid JSON or was missing a required field: {1}")]
    MalformedJson(String, String),

    #[error("unexpected status from {endpoint}: {status} (body: {body})")]
    UnexpectedStatus {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("authorization offered no challenge supported by solver \"{0}\"")]
    NoSupportedChallenge(String),

    #[error("challenge validation was rejected: {0}")]
    ChallengeRejected(String),

    #[error("certificate returned by the CA was not decodable DER: {0}")]
    BadCert(String),

    #[error("solver failed to publish the challenge: {0}")]
    SolverFailed(String),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("crypto error: {0}")]
    Crypto(#[from] ErrorStack),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("header value was not valid UTF-8: {0}")]
    HeaderEncoding(#[from] ToStrError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
