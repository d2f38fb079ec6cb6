//! The Simple Token: `base64url(payload_json) "." base64url(der_sig)` with a
//! plain low-s ECDSA signature over `SHA256(payload_json)`. Claims `iat` and
//! `exp` are unix **seconds**, unlike the millisecond timestamps used
//! elsewhere in BitSeal.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use secp256k1::ecdsa::Signature;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use serde_json::{Map, Value};

use std::{error, fmt};

#[derive(Debug)]
pub enum TokenError {
    // Format means the token does not split into exactly payload and
    // signature.
    Format,
    Base64(base64::DecodeError),
    Json(serde_json::Error),
    Crypto(secp256k1::Error),
    SigInvalid,
    Expired,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::TokenError::*;

        match self {
            Format => write!(f, "token parts"),
            Base64(e) => write!(f, "token encoding: {}", e),
            Json(e) => write!(f, "token payload: {}", e),
            Crypto(e) => write!(f, "crypto error: {}", e),
            SigInvalid => write!(f, "sig invalid"),
            Expired => write!(f, "token expired"),
        }
    }
}

impl error::Error for TokenError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        use self::TokenError::*;

        match self {
            Base64(e) => Some(e),
            Json(e) => Some(e),
            Crypto(e) => Some(e),
            _ => None,
        }
    }
}

// create_token injects iat (and exp when exp_sec > 0) into the payload,
// serializes it, and signs the digest of the exact bytes that will travel.
// Serialization through serde_json::Map is key-ordered, so the same claims
// always produce the same token for a given key and clock.
pub fn create_token(
    payload: Map<String, Value>,
    self_priv: &SecretKey,
    exp_sec: i64,
) -> Result<String, TokenError> {
    create_token_at(payload, self_priv, exp_sec, message::unix_s())
}

// create_token_at is create_token with the issue time chosen by the caller.
pub fn create_token_at(
    mut payload: Map<String, Value>,
    self_priv: &SecretKey,
    exp_sec: i64,
    iat: i64,
) -> Result<String, TokenError> {
    payload.insert("iat".to_string(), Value::from(iat));
    if exp_sec > 0 {
        payload.insert("exp".to_string(), Value::from(iat + exp_sec));
    }
    let payload_json = serde_json::to_vec(&payload).map_err(TokenError::Json)?;

    let digest = message::sha256(&payload_json);
    let msg = Message::from_digest_slice(&digest).map_err(TokenError::Crypto)?;
    let sig = Secp256k1::new().sign_ecdsa(&msg, self_priv);

    Ok(format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(&payload_json),
        URL_SAFE_NO_PAD.encode(sig.serialize_der()),
    ))
}

// verify_token checks the signature and the exp claim, returning the decoded
// claims on success.
pub fn verify_token(token: &str, signer_pub: &PublicKey) -> Result<Map<String, Value>, TokenError> {
    verify_token_at(token, signer_pub, message::unix_s())
}

// verify_token_at is verify_token against a caller-supplied clock.
pub fn verify_token_at(
    token: &str,
    signer_pub: &PublicKey,
    now: i64,
) -> Result<Map<String, Value>, TokenError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 2 {
        return Err(TokenError::Format);
    }
    let payload_json = URL_SAFE_NO_PAD.decode(parts[0]).map_err(TokenError::Base64)?;
    let sig_der = URL_SAFE_NO_PAD.decode(parts[1]).map_err(TokenError::Base64)?;

    let mut sig = Signature::from_der(&sig_der).map_err(TokenError::Crypto)?;
    sig.normalize_s();

    let digest = message::sha256(&payload_json);
    let msg = Message::from_digest_slice(&digest).map_err(TokenError::Crypto)?;
    Secp256k1::new()
        .verify_ecdsa(&msg, &sig, signer_pub)
        .map_err(|_| TokenError::SigInvalid)?;

    let claims: Map<String, Value> =
        serde_json::from_slice(&payload_json).map_err(TokenError::Json)?;
    if let Some(exp) = claims.get("exp").and_then(Value::as_i64) {
        if exp < now {
            return Err(TokenError::Expired);
        }
    }
    Ok(claims)
}
