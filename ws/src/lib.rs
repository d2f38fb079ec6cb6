#![forbid(unsafe_code)]

//! BitSeal-WS: a two-step client/server handshake. Step one is a signed
//! `POST /ws/handshake` carrying the client identity and salt; the server
//! answers with its own salt and a short-lived bearer token, signed in the
//! response direction. Step two presents the token as a WebSocket subprotocol
//! on `/ws/socket`; once the upgrade is accepted both sides hold a BST2
//! session.

mod client;
mod handshake;
mod server;
pub mod token;

#[cfg(test)]
mod test_connect;

pub use self::client::{Client, ClientState};
pub use self::handshake::{
    build_handshake_request, build_handshake_request_with, build_handshake_response,
    subprotocols, verify_handshake_request, verify_handshake_response, ClientHello,
    HandshakeRequest, HandshakeResponse, ServerHello, HANDSHAKE_METHOD, HANDSHAKE_PATH, PROTO,
    SOCKET_PATH,
};
pub use self::server::Server;
pub use self::token::TokenError;

use std::{error, fmt};

#[derive(Debug)]
pub enum WsError {
    // Web wraps a canonical-signer failure on either direction.
    Web(web::WebError),
    // Token wraps a bearer token failure during response or upgrade checks.
    Token(TokenError),
    // SigInvalid means a BitSeal-WEB verification returned "not ok".
    SigInvalid,
    // ProtoMismatch means a body or subprotocol list without BitSeal-WS.1.
    ProtoMismatch,
    // MissingToken means the upgrade offered no token subprotocol.
    MissingToken,
    // TokenReplayed means the single-use token was presented twice.
    TokenReplayed,
    SaltMalformed,
    MissingField(&'static str),
    BadState(&'static str),
    Json(serde_json::Error),
    Hex(hex::FromHexError),
    Crypto(secp256k1::Error),
}

impl fmt::Display for WsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::WsError::*;

        match self {
            Web(e) => write!(f, "request signing: {}", e),
            Token(e) => write!(f, "token: {}", e),
            SigInvalid => write!(f, "signature invalid"),
            ProtoMismatch => write!(f, "protocol mismatch"),
            MissingToken => write!(f, "token subprotocol missing"),
            TokenReplayed => write!(f, "token already consumed"),
            SaltMalformed => write!(f, "salt must be 4 bytes"),
            MissingField(name) => write!(f, "{} missing", name),
            BadState(what) => write!(f, "{}", what),
            Json(e) => write!(f, "json: {}", e),
            Hex(e) => write!(f, "hex: {}", e),
            Crypto(e) => write!(f, "crypto error: {}", e),
        }
    }
}

impl error::Error for WsError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        use self::WsError::*;

        match self {
            Web(e) => Some(e),
            Token(e) => Some(e),
            Json(e) => Some(e),
            Hex(e) => Some(e),
            Crypto(e) => Some(e),
            _ => None,
        }
    }
}
