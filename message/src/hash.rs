use sha2::{Digest, Sha256};

// sha256 returns the SHA-256 digest of data.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    sha256_concat(&[data])
}

// sha256_concat hashes the concatenation of parts without materializing the
// joined buffer.
pub fn sha256_concat(parts: &[&[u8]]) -> [u8; 32] {
    let hash = parts
        .iter()
        .fold(Sha256::new(), |mut hasher, part| {
            hasher.update(part);
            hasher
        })
        .finalize();

    let mut array = [0u8; 32];
    array.copy_from_slice(&hash);
    array
}
