use secp256k1::{PublicKey, Secp256k1, SecretKey};
use serde_json::{Map, Value};

use crate::{Client, ClientState, Server, WsError, HANDSHAKE_METHOD, HANDSHAKE_PATH, PROTO};

fn fixed_priv(seed: u8) -> SecretKey {
    let mut buf = [0u8; 32];
    buf[31] = seed;
    SecretKey::from_slice(&buf).unwrap()
}

fn pub_of(priv_key: &SecretKey) -> PublicKey {
    PublicKey::from_secret_key(&Secp256k1::new(), priv_key)
}

// Walks the whole two-step handshake without a transport and checks the
// resulting sessions against each other.
#[test]
fn connect_roundtrip() {
    let server_priv = fixed_priv(0x55);
    let client_priv = fixed_priv(0x33);

    let mut server = Server::new(server_priv);
    let mut client = Client::new(client_priv, pub_of(&server_priv));

    let request = client.handshake_request().unwrap();
    assert_eq!(client.state(), ClientState::AwaitingHandshakeResponse);

    let response = server
        .handshake(
            HANDSHAKE_METHOD,
            HANDSHAKE_PATH,
            request.body.as_bytes(),
            &request.headers,
        )
        .unwrap();

    let protocols = client
        .handshake_response(response.body.as_bytes(), &response.headers)
        .unwrap();
    assert_eq!(protocols[0], PROTO);
    assert_eq!(client.token(), Some(protocols[1].as_str()));
    assert_eq!(client.state(), ClientState::AwaitingUpgrade);

    let (mut server_sess, selected) = server.upgrade(&protocols).unwrap();
    let mut client_sess = client.upgrade_accepted(selected).unwrap();
    assert_eq!(client.state(), ClientState::Connected);

    // Send and receive in both directions over the derived key.
    let frame = client_sess.encode_record(b"ping", 0).unwrap();
    assert_eq!(server_sess.decode_record(&frame).unwrap(), b"ping");
    let frame = server_sess.encode_record(b"pong", 0).unwrap();
    assert_eq!(client_sess.decode_record(&frame).unwrap(), b"pong");

    assert_eq!(server_sess.peer_pub(), &pub_of(&fixed_priv(0x33)));

    client.close();
    assert_eq!(client.state(), ClientState::Closed);
}

#[test]
fn token_is_single_use() {
    let server_priv = fixed_priv(0x55);
    let mut server = Server::new(server_priv);
    let mut client = Client::new(fixed_priv(0x33), pub_of(&server_priv));

    let request = client.handshake_request().unwrap();
    let response = server
        .handshake(
            HANDSHAKE_METHOD,
            HANDSHAKE_PATH,
            request.body.as_bytes(),
            &request.headers,
        )
        .unwrap();
    let protocols = client
        .handshake_response(response.body.as_bytes(), &response.headers)
        .unwrap();

    assert!(server.upgrade(&protocols).is_ok());
    assert!(matches!(
        server.upgrade(&protocols),
        Err(WsError::TokenReplayed),
    ));
}

#[test]
fn tampered_response_rejected() {
    let server_priv = fixed_priv(0x55);
    let server = Server::new(server_priv);
    let mut client = Client::new(fixed_priv(0x33), pub_of(&server_priv));

    let request = client.handshake_request().unwrap();
    let response = server
        .handshake(
            HANDSHAKE_METHOD,
            HANDSHAKE_PATH,
            request.body.as_bytes(),
            &request.headers,
        )
        .unwrap();

    let tampered = response.body.replace("salt_s", "salt_x");
    assert!(matches!(
        client.handshake_response(tampered.as_bytes(), &response.headers),
        Err(WsError::SigInvalid),
    ));
}

#[test]
fn handshake_from_unknown_signer_rejected() {
    let server_priv = fixed_priv(0x55);
    let server = Server::new(server_priv);

    // Client signs towards a key that is not this server's.
    let mut client = Client::new(fixed_priv(0x33), pub_of(&fixed_priv(0x44)));
    let request = client.handshake_request().unwrap();

    assert!(matches!(
        server.handshake(
            HANDSHAKE_METHOD,
            HANDSHAKE_PATH,
            request.body.as_bytes(),
            &request.headers,
        ),
        Err(WsError::SigInvalid),
    ));
}

#[test]
fn upgrade_requires_token_subprotocol() {
    let mut server = Server::new(fixed_priv(0x55));

    assert!(matches!(
        server.upgrade(&[PROTO.to_string()]),
        Err(WsError::MissingToken),
    ));
    assert!(matches!(
        server.upgrade(&["not-bitseal".to_string()]),
        Err(WsError::ProtoMismatch),
    ));
    assert!(matches!(
        server.upgrade(&[PROTO.to_string(), "garbage-token".to_string()]),
        Err(WsError::Token(_)),
    ));
}

#[test]
fn extra_fields_reach_the_client() {
    let server_priv = fixed_priv(0x55);
    let mut extra = Map::new();
    extra.insert("motd".to_string(), Value::from("welcome"));
    extra.insert("region".to_string(), Value::from(7));

    let server = Server::new(server_priv).with_extra(extra);
    let mut client = Client::new(fixed_priv(0x33), pub_of(&server_priv));

    let request = client.handshake_request().unwrap();
    let response = server
        .handshake(
            HANDSHAKE_METHOD,
            HANDSHAKE_PATH,
            request.body.as_bytes(),
            &request.headers,
        )
        .unwrap();
    client
        .handshake_response(response.body.as_bytes(), &response.headers)
        .unwrap();

    assert_eq!(client.extra().get("motd").and_then(Value::as_str), Some("welcome"));
    assert_eq!(client.extra().get("region").and_then(Value::as_i64), Some(7));
}

#[test]
fn request_body_is_canonical() {
    let client_priv = fixed_priv(0x33);
    let server_pub = pub_of(&fixed_priv(0x55));

    let request = crate::build_handshake_request_with(
        &client_priv,
        &server_pub,
        [0xca, 0xfe, 0xba, 0xbe],
        "00112233445566778899aabbccddeeff",
    )
    .unwrap();

    let pk_hex = hex::encode(pub_of(&client_priv).serialize());
    assert_eq!(
        request.body,
        format!(
            "{{\"proto\":\"BitSeal-WS.1\",\"pk\":\"{}\",\"salt\":\"cafebabe\",\"nonce\":\"00112233445566778899aabbccddeeff\"}}",
            pk_hex,
        ),
    );
}

#[test]
fn state_machine_rejects_out_of_order_calls() {
    let server_priv = fixed_priv(0x55);
    let mut client = Client::new(fixed_priv(0x33), pub_of(&server_priv));

    // Response before request.
    assert!(matches!(
        client.handshake_response(b"{}", &web::Headers::new()),
        Err(WsError::BadState(_)),
    ));

    client.handshake_request().unwrap();
    assert!(matches!(
        client.handshake_request(),
        Err(WsError::BadState(_)),
    ));

    // Upgrade before the response arrived.
    assert!(matches!(
        client.upgrade_accepted(PROTO),
        Err(WsError::BadState(_)),
    ));
}
