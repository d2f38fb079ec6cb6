use log::{debug, info};
use record::Session;
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use serde_json::{Map, Value};

use crate::handshake::{
    build_handshake_response, parse_salt, verify_handshake_request, HandshakeResponse, PROTO,
};
use crate::token::verify_token;
use crate::WsError;

use std::collections::HashSet;

// DEFAULT_TOKEN_TTL_SEC bounds how long an issued token stays usable for the
// upgrade step.
const DEFAULT_TOKEN_TTL_SEC: i64 = 60;

/// `Server` answers step-one handshakes and accepts upgrades. It keeps no
/// per-connection state between the two steps: everything the upgrade needs
/// travels inside the token, and a consumed-token set enforces single use.
pub struct Server {
    server_priv: SecretKey,
    server_pub: PublicKey,
    token_ttl_sec: i64,
    extra: Map<String, Value>,
    consumed: HashSet<String>,
}

impl Server {
    pub fn new(server_priv: SecretKey) -> Self {
        let server_pub = PublicKey::from_secret_key(&Secp256k1::new(), &server_priv);
        Server {
            server_priv,
            server_pub,
            token_ttl_sec: DEFAULT_TOKEN_TTL_SEC,
            extra: Map::new(),
            consumed: HashSet::new(),
        }
    }

    // with_token_ttl overrides the token lifetime, in seconds.
    pub fn with_token_ttl(mut self, token_ttl_sec: i64) -> Self {
        self.token_ttl_sec = token_ttl_sec;
        self
    }

    // with_extra attaches additional JSON fields to every handshake response.
    pub fn with_extra(mut self, extra: Map<String, Value>) -> Self {
        self.extra = extra;
        self
    }

    // handshake serves POST /ws/handshake: verify the signed request, issue
    // the server salt and token, and sign the response towards the client.
    pub fn handshake(
        &self,
        method: &str,
        uri_path: &str,
        body: &[u8],
        headers: &web::Headers,
    ) -> Result<HandshakeResponse, WsError> {
        let hello = verify_handshake_request(method, uri_path, body, headers, &self.server_priv)?;
        debug!(
            "handshake verified, client={}",
            hex::encode(hello.client_pub.serialize()),
        );
        build_handshake_response(&self.server_priv, &hello, &self.extra, self.token_ttl_sec)
    }

    // upgrade serves the /ws/socket subprotocol negotiation. It validates the
    // presented token, burns it, and rebuilds the session from the claims.
    // The returned protocol name is what the server must select on the
    // upgrade response.
    pub fn upgrade(&mut self, protocols: &[String]) -> Result<(Session, &'static str), WsError> {
        if !protocols.iter().any(|p| p == PROTO) {
            return Err(WsError::ProtoMismatch);
        }
        let token = protocols
            .iter()
            .find(|p| p.as_str() != PROTO)
            .ok_or(WsError::MissingToken)?;

        if self.consumed.contains(token.as_str()) {
            return Err(WsError::TokenReplayed);
        }
        let claims = verify_token(token, &self.server_pub).map_err(WsError::Token)?;
        self.consumed.insert(token.clone());

        let client_pub = match claims.get("sub").and_then(Value::as_str) {
            Some(sub) => PublicKey::from_slice(&hex::decode(sub).map_err(WsError::Hex)?)
                .map_err(WsError::Crypto)?,
            None => return Err(WsError::MissingField("sub")),
        };
        let salt_c = claim_salt(&claims, "salt_c")?;
        let salt_s = claim_salt(&claims, "salt_s")?;

        info!(
            "upgrade accepted, client={}",
            hex::encode(client_pub.serialize()),
        );
        let session = Session::new(&self.server_priv, &client_pub, salt_s, salt_c);
        Ok((session, PROTO))
    }
}

fn claim_salt(claims: &Map<String, Value>, name: &'static str) -> Result<[u8; 4], WsError> {
    match claims.get(name).and_then(Value::as_str) {
        Some(salt_hex) => parse_salt(salt_hex),
        None => Err(WsError::MissingField(name)),
    }
}
