use record::Session;
use secp256k1::{PublicKey, SecretKey};
use serde_json::{Map, Value};

use crate::handshake::{
    build_handshake_request, subprotocols, verify_handshake_response, HandshakeRequest, PROTO,
};
use crate::WsError;

/// The client half of the two-step handshake.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClientState {
    Idle,
    AwaitingHandshakeResponse,
    AwaitingUpgrade,
    Connected,
    Closed,
}

/// `Client` walks the handshake state machine: build the signed POST, digest
/// the server's answer into an upgrade request, and finally mint the session
/// once the server selected the protocol. The transport in between is the
/// caller's business.
pub struct Client {
    client_priv: SecretKey,
    server_pub: PublicKey,
    state: ClientState,
    salt: [u8; 4],
    server_salt: Option<[u8; 4]>,
    token: Option<String>,
    extra: Map<String, Value>,
}

impl Client {
    pub fn new(client_priv: SecretKey, server_pub: PublicKey) -> Self {
        Client {
            client_priv,
            server_pub,
            state: ClientState::Idle,
            salt: [0u8; 4],
            server_salt: None,
            token: None,
            extra: Map::new(),
        }
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    // handshake_request produces the signed step-one POST and remembers the
    // salt it committed to.
    pub fn handshake_request(&mut self) -> Result<HandshakeRequest, WsError> {
        if self.state != ClientState::Idle {
            return Err(WsError::BadState("handshake already started"));
        }
        let request = build_handshake_request(&self.client_priv, &self.server_pub)?;
        self.salt = request.salt;
        self.state = ClientState::AwaitingHandshakeResponse;
        Ok(request)
    }

    // handshake_response verifies the server's signed answer and returns the
    // subprotocol list to present on the WebSocket upgrade.
    pub fn handshake_response(
        &mut self,
        body: &[u8],
        headers: &web::Headers,
    ) -> Result<[String; 2], WsError> {
        if self.state != ClientState::AwaitingHandshakeResponse {
            return Err(WsError::BadState("no handshake in flight"));
        }
        let hello = verify_handshake_response(body, headers, &self.client_priv, &self.server_pub)?;

        let protocols = subprotocols(&hello.token);
        self.server_salt = Some(hello.salt);
        self.token = Some(hello.token);
        self.extra = hello.extra;
        self.state = ClientState::AwaitingUpgrade;
        Ok(protocols)
    }

    // upgrade_accepted consumes the server's selected subprotocol and yields
    // the established session.
    pub fn upgrade_accepted(&mut self, selected_protocol: &str) -> Result<Session, WsError> {
        if self.state != ClientState::AwaitingUpgrade {
            return Err(WsError::BadState("no upgrade in flight"));
        }
        if selected_protocol != PROTO {
            return Err(WsError::ProtoMismatch);
        }
        let server_salt = self
            .server_salt
            .ok_or(WsError::BadState("server salt lost"))?;

        self.state = ClientState::Connected;
        Ok(Session::new(
            &self.client_priv,
            &self.server_pub,
            self.salt,
            server_salt,
        ))
    }

    // extra exposes any additional fields the server attached to its
    // handshake response, as an opaque map.
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    // token returns the bearer token once the response has been verified.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn close(&mut self) {
        self.state = ClientState::Closed;
    }
}
