#![forbid(unsafe_code)]

//! BitSeal-WEB: deterministic canonicalization of an HTTP request plus a
//! recipient-bound ECDSA signature carried in four `X-BKSA-*` headers. The
//! same scheme signs requests (client key, server recipient) and responses
//! (server key, client recipient).

mod canonical;


pub use self::canonical::{body_hash_hex, build_canonical_string, canonical_query_string};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use secp256k1::{PublicKey, SecretKey};

use std::collections::HashMap;
use std::{error, fmt};

// PROTOCOL is the fixed value of the X-BKSA-Protocol header.
pub const PROTOCOL: &str = "BitSeal";

pub const HEADER_PROTOCOL: &str = "X-BKSA-Protocol";
pub const HEADER_SIG: &str = "X-BKSA-Sig";
pub const HEADER_TIMESTAMP: &str = "X-BKSA-Timestamp";
pub const HEADER_NONCE: &str = "X-BKSA-Nonce";

/// Header names are matched exactly as produced; HTTP layers that
/// canonicalize casing must restore these spellings before verification.
pub type Headers = HashMap<String, String>;

#[derive(Debug)]
pub enum WebError {
    Crypto(secp256k1::Error),
    Base64(base64::DecodeError),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WebError::Crypto(e) => write!(f, "crypto error: {}", e),
            WebError::Base64(e) => write!(f, "signature encoding: {}", e),
        }
    }
}

impl error::Error for WebError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            WebError::Crypto(e) => Some(e),
            WebError::Base64(e) => Some(e),
        }
    }
}

// random_nonce returns a 128-bit random nonce as 32 hex characters.
pub fn random_nonce() -> String {
    let mut buf = [0u8; 16];
    message::fill_random(&mut buf);
    hex::encode(buf)
}

// sign_request constructs the four BitSeal headers for a request, stamping it
// with the current time and a fresh nonce.
pub fn sign_request(
    method: &str,
    uri_path: &str,
    query: &str,
    body: &[u8],
    self_priv: &SecretKey,
    peer_pub: &PublicKey,
) -> Result<Headers, WebError> {
    sign_request_with(
        method,
        uri_path,
        query,
        body,
        self_priv,
        peer_pub,
        message::unix_ms(),
        &random_nonce(),
    )
}

// sign_request_with is sign_request with the timestamp (unix milliseconds)
// and nonce chosen by the caller. Identical inputs produce identical headers.
#[allow(clippy::too_many_arguments)]
pub fn sign_request_with(
    method: &str,
    uri_path: &str,
    query: &str,
    body: &[u8],
    self_priv: &SecretKey,
    peer_pub: &PublicKey,
    timestamp_ms: i64,
    nonce: &str,
) -> Result<Headers, WebError> {
    let timestamp = timestamp_ms.to_string();
    let canonical = build_canonical_string(method, uri_path, query, body, &timestamp, nonce);
    let digest = message::sha256(canonical.as_bytes());
    let sig = message::sign(&digest, self_priv, peer_pub).map_err(WebError::Crypto)?;

    let mut headers = Headers::new();
    headers.insert(HEADER_PROTOCOL.to_string(), PROTOCOL.to_string());
    headers.insert(HEADER_SIG.to_string(), STANDARD.encode(&sig));
    headers.insert(HEADER_TIMESTAMP.to_string(), timestamp);
    headers.insert(HEADER_NONCE.to_string(), nonce.to_string());
    Ok(headers)
}

// verify_request recomputes the canonical string from the presented request
// and checks the signature header against it. A missing or mismatched header
// is "not ok" rather than an error; only a malformed base64 signature
// surfaces as one.
pub fn verify_request(
    method: &str,
    uri_path: &str,
    query: &str,
    body: &[u8],
    headers: &Headers,
    self_priv: &SecretKey,
) -> Result<bool, WebError> {
    if headers.get(HEADER_PROTOCOL).map(String::as_str) != Some(PROTOCOL) {
        return Ok(false);
    }
    let timestamp = header(headers, HEADER_TIMESTAMP);
    let nonce = header(headers, HEADER_NONCE);
    let sig_base64 = header(headers, HEADER_SIG);
    if timestamp.is_empty() || nonce.is_empty() || sig_base64.is_empty() {
        return Ok(false);
    }

    let canonical = build_canonical_string(method, uri_path, query, body, timestamp, nonce);
    let digest = message::sha256(canonical.as_bytes());
    let sig = STANDARD.decode(sig_base64).map_err(WebError::Base64)?;
    Ok(message::verify(&digest, &sig, self_priv))
}

fn header<'a>(headers: &'a Headers, name: &str) -> &'a str {
    headers.get(name).map(String::as_str).unwrap_or("")
}
