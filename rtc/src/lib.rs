#![forbid(unsafe_code)]

//! BitSeal-RTC: a symmetric one-shot handshake for peer-to-peer datagram
//! transports such as WebRTC data channels. Each side independently signs a
//! canonical JSON hello carrying its identity, salt and a millisecond
//! timestamp; once both hellos verify, each side derives the same BST2
//! session from ECDH plus the salt pair.


use log::debug;
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use serde::Deserialize;

use std::{error, fmt};

pub use record::Session;

// PROTO is the protocol marker inside every handshake hello.
pub const PROTO: &str = "BitSeal-RTC/1.0";

#[derive(Debug)]
pub enum RtcError {
    // ProtoMismatch means the hello named a different protocol.
    ProtoMismatch,
    // SigInvalid means the peer's signature did not verify for us.
    SigInvalid,
    SaltMalformed,
    Json(serde_json::Error),
    Hex(hex::FromHexError),
    Crypto(secp256k1::Error),
}

impl fmt::Display for RtcError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::RtcError::*;

        match self {
            ProtoMismatch => write!(f, "protocol mismatch"),
            SigInvalid => write!(f, "signature invalid"),
            SaltMalformed => write!(f, "salt must be 4 bytes"),
            Json(e) => write!(f, "handshake json: {}", e),
            Hex(e) => write!(f, "hex: {}", e),
            Crypto(e) => write!(f, "crypto error: {}", e),
        }
    }
}

impl error::Error for RtcError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        use self::RtcError::*;

        match self {
            Json(e) => Some(e),
            Hex(e) => Some(e),
            Crypto(e) => Some(e),
            _ => None,
        }
    }
}

/// One side's signed hello: the canonical JSON bytes, the recipient-bound
/// signature over them, and the salt this side committed to.
pub struct Handshake {
    pub raw: Vec<u8>,
    pub sig: Vec<u8>,
    pub salt: [u8; 4],
}

// build_handshake creates and signs a hello with a fresh salt and the current
// time.
pub fn build_handshake(
    self_priv: &SecretKey,
    peer_pub: &PublicKey,
) -> Result<Handshake, RtcError> {
    build_handshake_with(self_priv, peer_pub, message::random_salt(), message::unix_ms())
}

// build_handshake_with is build_handshake with salt and timestamp chosen by
// the caller. The hello is a literal JSON template with fixed field order, so
// the signed bytes are reproducible across implementations.
pub fn build_handshake_with(
    self_priv: &SecretKey,
    peer_pub: &PublicKey,
    salt: [u8; 4],
    ts_ms: i64,
) -> Result<Handshake, RtcError> {
    let self_pub = PublicKey::from_secret_key(&Secp256k1::new(), self_priv);
    let raw = format!(
        "{{\"proto\":\"{}\",\"pk\":\"{}\",\"salt\":\"{}\",\"ts\":{}}}",
        PROTO,
        hex::encode(self_pub.serialize()),
        hex::encode(salt),
        ts_ms,
    )
    .into_bytes();

    let sig = message::sign(&raw, self_priv, peer_pub).map_err(RtcError::Crypto)?;
    Ok(Handshake { raw, sig, salt })
}

#[derive(Deserialize)]
struct HandshakeMsg {
    proto: String,
    pk: String,
    salt: String,
    // The timestamp rides along for the peer's records; freshness policy is
    // the application's call.
    #[allow(dead_code)]
    ts: i64,
}

// verify_handshake checks a peer hello and returns the peer identity and
// salt on success.
pub fn verify_handshake(
    raw: &[u8],
    sig: &[u8],
    self_priv: &SecretKey,
) -> Result<(PublicKey, [u8; 4]), RtcError> {
    let msg: HandshakeMsg = serde_json::from_slice(raw).map_err(RtcError::Json)?;
    if msg.proto != PROTO {
        return Err(RtcError::ProtoMismatch);
    }
    let peer_pub = PublicKey::from_slice(&hex::decode(&msg.pk).map_err(RtcError::Hex)?)
        .map_err(RtcError::Crypto)?;

    if !message::verify(raw, sig, self_priv) {
        return Err(RtcError::SigInvalid);
    }

    let salt_bytes = hex::decode(&msg.salt).map_err(RtcError::Hex)?;
    if salt_bytes.len() != 4 {
        return Err(RtcError::SaltMalformed);
    }
    let mut salt = [0u8; 4];
    salt.copy_from_slice(&salt_bytes);

    debug!("handshake verified, peer={}", hex::encode(peer_pub.serialize()));
    Ok((peer_pub, salt))
}

// new_session derives the BST2 session once both hellos have been exchanged:
// our own salt becomes the send salt, the peer's the receive salt.
pub fn new_session(
    self_priv: &SecretKey,
    peer_pub: &PublicKey,
    self_salt: [u8; 4],
    peer_salt: [u8; 4],
) -> Session {
    Session::new(self_priv, peer_pub, self_salt, peer_salt)
}
