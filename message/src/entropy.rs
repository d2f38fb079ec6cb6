use rand::rngs::OsRng;
use rand::RngCore;
use secp256k1::{PublicKey, Secp256k1, SecretKey};

// fill_random fills buf with cryptographically secure random bytes.
pub fn fill_random(buf: &mut [u8]) {
    OsRng.fill_bytes(buf);
}

// random_salt draws the 4 fresh bytes each side contributes to a handshake.
pub fn random_salt() -> [u8; 4] {
    let mut salt = [0u8; 4];
    fill_random(&mut salt);
    salt
}

// random_seq draws a random 64-bit initial value for a session send counter.
pub fn random_seq() -> u64 {
    OsRng.next_u64()
}

// generate_keypair creates a fresh secp256k1 identity.
pub fn generate_keypair() -> (SecretKey, PublicKey) {
    let secp = Secp256k1::new();
    let secret = SecretKey::new(&mut OsRng);
    let public = PublicKey::from_secret_key(&secp, &secret);
    (secret, public)
}
