use secp256k1::ecdsa::Signature;
use secp256k1::{Error, Message, PublicKey, Secp256k1, SecretKey};

use crate::hash::sha256_concat;

// COMPRESSED_PUBKEY_SIZE is the length of a SEC1 compressed public key, which
// prefixes every signature envelope so the verifier learns the sender identity
// from the envelope itself.
const COMPRESSED_PUBKEY_SIZE: usize = 33;

// sign produces a recipient-bound signature envelope over msg. The signed
// digest commits to the recipient's public key, so an envelope produced for
// one peer never verifies for another. The returned bytes are the sender's
// compressed public key followed by a low-s DER signature; signing is
// deterministic (RFC 6979), so identical inputs yield identical envelopes.
pub fn sign(msg: &[u8], self_priv: &SecretKey, peer_pub: &PublicKey) -> Result<Vec<u8>, Error> {
    let secp = Secp256k1::new();

    let digest = sha256_concat(&[&peer_pub.serialize(), msg]);
    let sig = secp.sign_ecdsa(&Message::from_digest_slice(&digest)?, self_priv);

    let sender_pub = PublicKey::from_secret_key(&secp, self_priv);
    let mut envelope = Vec::with_capacity(COMPRESSED_PUBKEY_SIZE + 72);
    envelope.extend_from_slice(&sender_pub.serialize());
    envelope.extend_from_slice(&sig.serialize_der());
    Ok(envelope)
}

// verify checks a signature envelope against msg using the verifier's own
// private key to reconstruct the recipient binding. A malformed envelope is
// reported as a failed verification rather than an error: the caller only
// learns "not ok".
pub fn verify(msg: &[u8], envelope: &[u8], self_priv: &SecretKey) -> bool {
    if envelope.len() <= COMPRESSED_PUBKEY_SIZE {
        return false;
    }
    let sender_pub = match PublicKey::from_slice(&envelope[..COMPRESSED_PUBKEY_SIZE]) {
        Ok(pk) => pk,
        Err(_) => return false,
    };
    let mut sig = match Signature::from_der(&envelope[COMPRESSED_PUBKEY_SIZE..]) {
        Ok(sig) => sig,
        Err(_) => return false,
    };
    // Tolerate high-s encodings from foreign signers.
    sig.normalize_s();

    let secp = Secp256k1::new();
    let self_pub = PublicKey::from_secret_key(&secp, self_priv);
    let digest = sha256_concat(&[&self_pub.serialize(), msg]);
    let message = match Message::from_digest_slice(&digest) {
        Ok(m) => m,
        Err(_) => return false,
    };
    secp.verify_ecdsa(&message, &sig, &sender_pub).is_ok()
}
