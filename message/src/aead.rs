use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Error, Key, Nonce};

// TAG_SIZE is the length in bytes of the tags generated by AES-256-GCM.
pub const TAG_SIZE: usize = 16;

/// `encrypt` seals `plaintext` under `key`/`nonce`, authenticating `aad`
/// alongside it. The ciphertext and the 16-byte tag are returned separately so
/// that frame layouts can place the tag independently of the payload.
pub fn encrypt(
    plaintext: &[u8],
    key: &[u8; 32],
    nonce: &[u8; 12],
    aad: &[u8],
) -> Result<(Vec<u8>, [u8; TAG_SIZE]), Error> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let mut sealed = cipher.encrypt(
        Nonce::from_slice(nonce),
        Payload {
            msg: plaintext,
            aad,
        },
    )?;

    // The aead crate appends the tag to the ciphertext; split it back off.
    let boundary = sealed.len() - TAG_SIZE;
    let mut tag = [0u8; TAG_SIZE];
    tag.copy_from_slice(&sealed[boundary..]);
    sealed.truncate(boundary);
    Ok((sealed, tag))
}

/// `decrypt` opens a ciphertext produced by [`encrypt`]. A wrong key, nonce,
/// tag or `aad` all surface as the same opaque error.
pub fn decrypt(
    ciphertext: &[u8],
    key: &[u8; 32],
    nonce: &[u8; 12],
    aad: &[u8],
    tag: &[u8; TAG_SIZE],
) -> Result<Vec<u8>, Error> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let mut sealed = Vec::with_capacity(ciphertext.len() + TAG_SIZE);
    sealed.extend_from_slice(ciphertext);
    sealed.extend_from_slice(tag);
    cipher.decrypt(
        Nonce::from_slice(nonce),
        Payload {
            msg: &sealed,
            aad,
        },
    )
}
