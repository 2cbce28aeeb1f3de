//! Façade over RSA key handling, RS256 signing, SHA-256, and X.509 CSR/certificate
//! parsing. Everything here is a thin, fallible wrapper — the interesting protocol
//! logic lives in `jose` and `session`.

use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::rsa::{Padding, Rsa};
use openssl::sign::Signer;
use openssl::x509::X509Req;
use openssl::x509::X509;
use x509_parser::certification_request::X509CertificationRequest;
use x509_parser::extensions::{GeneralName, ParsedExtension};

use crate::error::{Error, Result};

/// Parses the account private key, failing with [`Error::BadKey`] if the PEM does
/// not contain exactly one RSA private key.
pub fn parse_account_key(pem: &str) -> Result<Rsa<Private>> {
    if pem.matches("-----BEGIN").count() != 1 {
        return Err(Error::BadKey);
    }
    Rsa::private_key_from_pem(pem.as_bytes()).map_err(|_| Error::BadKey)
}

/// Parses the CSR, failing with [`Error::BadCsr`] if the PEM holds zero or more
/// than one certificate request.
pub fn parse_csr(pem: &str) -> Result<X509Req> {
    if pem.matches("-----BEGIN CERTIFICATE REQUEST-----").count() != 1 {
        return Err(Error::BadCsr);
    }
    X509Req::from_pem(pem.as_bytes()).map_err(|_| Error::BadCsr)
}

/// DER encoding of the CSR, as embedded (base64url) in the `new-cert` payload.
pub fn csr_to_der(csr: &X509Req) -> Result<Vec<u8>> {
    Ok(csr.to_der()?)
}

/// The ordered, de-duplicated list of domains this CSR asserts control over: the
/// subject Common Name first, then any `dNSName` entries from the `subjectAltName`
/// requested extension not already present.
///
/// `openssl::x509::X509Req` exposes the subject name but no structured access to
/// requested extensions, so the SAN half of this is done via `x509-parser` over
/// the same DER bytes.
pub fn domains_from_csr(csr: &X509Req) -> Result<Vec<String>> {
    let mut domains = Vec::new();

    if let Some(cn) = csr
        .subject_name()
        .entries_by_nid(Nid::COMMONNAME)
        .next()
        .and_then(|entry| entry.data().as_utf8().ok())
    {
        domains.push(cn.to_string());
    }

    let der = csr_to_der(csr)?;
    if let Ok((_, parsed)) = X509CertificationRequest::from_der(&der) {
        for ext in parsed.requested_extensions() {
            if let ParsedExtension::SubjectAlternativeName(san) = ext {
                for name in &san.general_names {
                    if let GeneralName::DNSName(dns) = name {
                        let dns = dns.to_string();
                        if !domains.contains(&dns) {
                            domains.push(dns);
                        }
                    }
                }
            }
        }
    }

    Ok(domains)
}

/// SHA-256 digest of arbitrary bytes.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    openssl::sha::sha256(data)
}

/// RS256: PKCS#1 v1.5 padding over a SHA-256 digest, wrapped in the PKCS#1
/// DigestInfo for SHA-256 — exactly what `openssl`'s `Signer` does when given
/// `MessageDigest::sha256()` and `Padding::PKCS1`.
pub fn rs256_sign(key: &Rsa<Private>, data: &[u8]) -> Result<Vec<u8>> {
    let pkey = PKey::from_rsa(key.clone())?;
    let mut signer = Signer::new(MessageDigest::sha256(), &pkey)?;
    signer.set_rsa_padding(Padding::PKCS1)?;
    signer.update(data)?;
    Ok(signer.sign_to_vec()?)
}

/// Parses the DER certificate returned by `new-cert` and re-emits it as a single
/// `CERTIFICATE` PEM block, failing with [`Error::BadCert`] if it's undecodable.
pub fn der_to_pem_certificate(der: &[u8]) -> Result<String> {
    let cert = X509::from_der(der).map_err(|e| Error::BadCert(e.to_string()))?;
    let pem = cert.to_pem().map_err(|e| Error::BadCert(e.to_string()))?;
    String::from_utf8(pem).map_err(|e| Error::BadCert(e.to_string()))
}
