use secp256k1::{PublicKey, Secp256k1, SecretKey};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::token::create_token;
use crate::WsError;

// PROTO doubles as the body protocol marker and the WebSocket subprotocol the
// server must select.
pub const PROTO: &str = "BitSeal-WS.1";

pub const HANDSHAKE_METHOD: &str = "POST";
pub const HANDSHAKE_PATH: &str = "/ws/handshake";
pub const SOCKET_PATH: &str = "/ws/socket";

/// A signed step-one request, ready to POST: the literal JSON body plus the
/// four BitSeal-WEB headers, and the salt/nonce the client must remember for
/// the rest of the handshake.
pub struct HandshakeRequest {
    pub body: String,
    pub headers: web::Headers,
    pub salt: [u8; 4],
    pub nonce: String,
}

// build_handshake_request draws a fresh salt and nonce and signs the step-one
// body.
pub fn build_handshake_request(
    client_priv: &SecretKey,
    server_pub: &PublicKey,
) -> Result<HandshakeRequest, WsError> {
    build_handshake_request_with(
        client_priv,
        server_pub,
        message::random_salt(),
        &web::random_nonce(),
    )
}

// build_handshake_request_with is build_handshake_request with salt and nonce
// chosen by the caller.
pub fn build_handshake_request_with(
    client_priv: &SecretKey,
    server_pub: &PublicKey,
    salt: [u8; 4],
    nonce: &str,
) -> Result<HandshakeRequest, WsError> {
    let client_pub = PublicKey::from_secret_key(&Secp256k1::new(), client_priv);

    // Literal template: the signed bytes must be reproducible, so the body is
    // never emitted through a serializer.
    let body = format!(
        "{{\"proto\":\"{}\",\"pk\":\"{}\",\"salt\":\"{}\",\"nonce\":\"{}\"}}",
        PROTO,
        hex::encode(client_pub.serialize()),
        hex::encode(salt),
        nonce,
    );
    let headers = web::sign_request(
        HANDSHAKE_METHOD,
        HANDSHAKE_PATH,
        "",
        body.as_bytes(),
        client_priv,
        server_pub,
    )
    .map_err(WsError::Web)?;

    Ok(HandshakeRequest {
        body,
        headers,
        salt,
        nonce: nonce.to_string(),
    })
}

#[derive(Deserialize)]
struct RequestBody {
    proto: String,
    pk: String,
    salt: String,
    nonce: String,
}

/// The authenticated content of a step-one request.
pub struct ClientHello {
    pub client_pub: PublicKey,
    pub salt: [u8; 4],
    pub nonce: String,
}

// verify_handshake_request checks the BitSeal-WEB headers over the body as
// received, then parses out the client identity and salt.
pub fn verify_handshake_request(
    method: &str,
    uri_path: &str,
    body: &[u8],
    headers: &web::Headers,
    server_priv: &SecretKey,
) -> Result<ClientHello, WsError> {
    let ok = web::verify_request(method, uri_path, "", body, headers, server_priv)
        .map_err(WsError::Web)?;
    if !ok {
        return Err(WsError::SigInvalid);
    }

    let parsed: RequestBody = serde_json::from_slice(body).map_err(WsError::Json)?;
    if parsed.proto != PROTO {
        return Err(WsError::ProtoMismatch);
    }
    let client_pub = PublicKey::from_slice(&hex::decode(&parsed.pk).map_err(WsError::Hex)?)
        .map_err(WsError::Crypto)?;

    Ok(ClientHello {
        client_pub,
        salt: parse_salt(&parsed.salt)?,
        nonce: parsed.nonce,
    })
}

/// A signed step-one response: the body and headers to return to the client,
/// plus the server salt and token the acceptor will meet again at upgrade
/// time.
pub struct HandshakeResponse {
    pub body: String,
    pub headers: web::Headers,
    pub salt: [u8; 4],
    pub token: String,
}

// build_handshake_response issues the server salt and a short-lived token,
// then signs the response body towards the client key. The token claims carry
// the client identity and both salts, so the upgrade step needs no other
// server-side state. Extra fields are appended after the fixed ones in
// key-sorted order.
pub fn build_handshake_response(
    server_priv: &SecretKey,
    hello: &ClientHello,
    extra: &Map<String, Value>,
    token_ttl_sec: i64,
) -> Result<HandshakeResponse, WsError> {
    let salt_s = message::random_salt();

    let mut claims = Map::new();
    claims.insert(
        "sub".to_string(),
        Value::from(hex::encode(hello.client_pub.serialize())),
    );
    claims.insert("salt_c".to_string(), Value::from(hex::encode(hello.salt)));
    claims.insert("salt_s".to_string(), Value::from(hex::encode(salt_s)));
    let token = create_token(claims, server_priv, token_ttl_sec).map_err(WsError::Token)?;

    let mut body = format!(
        "{{\"token\":\"{}\",\"salt_s\":\"{}\",\"ts\":{},\"nonce\":\"{}\"",
        token,
        hex::encode(salt_s),
        message::unix_ms(),
        hello.nonce,
    );
    for (key, value) in extra {
        body.push(',');
        body.push_str(&Value::from(key.as_str()).to_string());
        body.push(':');
        body.push_str(&value.to_string());
    }
    body.push('}');

    let headers = web::sign_request(
        HANDSHAKE_METHOD,
        HANDSHAKE_PATH,
        "",
        body.as_bytes(),
        server_priv,
        &hello.client_pub,
    )
    .map_err(WsError::Web)?;

    Ok(HandshakeResponse {
        body,
        headers,
        salt: salt_s,
        token,
    })
}

/// The verified content of a step-one response. Fields beyond the protocol's
/// own end up in `extra`, untouched.
pub struct ServerHello {
    pub token: String,
    pub salt: [u8; 4],
    pub ts: i64,
    pub nonce: String,
    pub extra: Map<String, Value>,
}

// verify_handshake_response checks the response headers over the body as
// received, validates the embedded token against the server identity, and
// extracts the server salt.
pub fn verify_handshake_response(
    body: &[u8],
    headers: &web::Headers,
    client_priv: &SecretKey,
    server_pub: &PublicKey,
) -> Result<ServerHello, WsError> {
    let ok = web::verify_request(
        HANDSHAKE_METHOD,
        HANDSHAKE_PATH,
        "",
        body,
        headers,
        client_priv,
    )
    .map_err(WsError::Web)?;
    if !ok {
        return Err(WsError::SigInvalid);
    }

    let mut fields: Map<String, Value> = serde_json::from_slice(body).map_err(WsError::Json)?;
    let token = take_string(&mut fields, "token")?;
    let salt_hex = take_string(&mut fields, "salt_s")?;
    let ts = fields
        .remove("ts")
        .and_then(|v| v.as_i64())
        .ok_or(WsError::MissingField("ts"))?;
    let nonce = take_string(&mut fields, "nonce")?;

    crate::token::verify_token(&token, server_pub).map_err(WsError::Token)?;

    Ok(ServerHello {
        salt: parse_salt(&salt_hex)?,
        token,
        ts,
        nonce,
        extra: fields,
    })
}

// subprotocols returns the subprotocol list the client advertises on the
// upgrade request: the protocol marker and the bearer token.
pub fn subprotocols(token: &str) -> [String; 2] {
    [PROTO.to_string(), token.to_string()]
}

pub(crate) fn parse_salt(salt_hex: &str) -> Result<[u8; 4], WsError> {
    let bytes = hex::decode(salt_hex).map_err(WsError::Hex)?;
    if bytes.len() != 4 {
        return Err(WsError::SaltMalformed);
    }
    let mut salt = [0u8; 4];
    salt.copy_from_slice(&bytes);
    Ok(salt)
}

fn take_string(fields: &mut Map<String, Value>, name: &'static str) -> Result<String, WsError> {
    match fields.remove(name) {
        Some(Value::String(s)) => Ok(s),
        _ => Err(WsError::MissingField(name)),
    }
}
