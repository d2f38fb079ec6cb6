use secp256k1::ecdh::shared_secret_point;
use secp256k1::{PublicKey, SecretKey};

// shared_point_compressed performs an ECDH operation between the local private
// key and the peer's public key, returning the shared point in SEC1 compressed
// form. Both peers obtain the same 33 bytes from their respective halves.
pub fn shared_point_compressed(self_priv: &SecretKey, peer_pub: &PublicKey) -> [u8; 33] {
    // x coordinate followed by y, both 32-byte big-endian.
    let xy = shared_secret_point(peer_pub, self_priv);

    let mut compressed = [0u8; 33];
    compressed[0] = if xy[63] & 1 == 1 { 0x03 } else { 0x02 };
    compressed[1..].copy_from_slice(&xy[..32]);
    compressed
}
