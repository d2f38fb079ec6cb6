use byteorder::{BigEndian, ByteOrder};
use log::debug;
use secp256k1::{PublicKey, SecretKey};
use zeroize::Zeroize;

use crate::window::Window;
use crate::{RecordError, MIN_FRAME_SIZE, NONCE_SIZE, TAG_SIZE};

use std::fmt;

// derive_key derives the 32-byte session key from the compressed ECDH shared
// point and the two handshake salts. The salts are concatenated in
// lexicographic order so that both peers, feeding the same pair in opposite
// roles, arrive at the same key.
pub fn derive_key(shared: &[u8; 33], salt_a: &[u8; 4], salt_b: &[u8; 4]) -> [u8; 32] {
    let (low, high) = if salt_a <= salt_b {
        (salt_a, salt_b)
    } else {
        (salt_b, salt_a)
    };
    message::sha256_concat(&[shared, low, high])
}

/// `Session` is an established BST2 session: one AES-256-GCM key shared by
/// both peers, a random-origin send counter, and a sliding replay window on
/// the receive side.
///
/// A session is not internally synchronized. Callers invoking
/// [`Session::encode_record`] from multiple tasks must serialize access; the
/// encode and decode paths touch disjoint mutable state and may otherwise
/// proceed in parallel.
pub struct Session {
    // key is the symmetric session key, identical on both sides.
    key: [u8; 32],

    // salt_send is this side's own handshake salt, the nonce prefix for
    // outgoing records.
    salt_send: [u8; 4],

    // salt_recv is the peer's salt, the nonce prefix expected on incoming
    // records.
    salt_recv: [u8; 4],

    // seq is the send counter. It starts at a random 64-bit value and is
    // incremented before every encode, so the first record carries
    // seq_init + 1.
    seq: u64,

    // peer_pub is the authenticated identity of the remote side.
    peer_pub: PublicKey,

    recv_window: Window,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // The key is deliberately absent here.
        write!(
            f,
            "Session [ salt_send: {}, salt_recv: {}, seq: {}, peer: {} ]",
            hex::encode(self.salt_send),
            hex::encode(self.salt_recv),
            self.seq,
            hex::encode(self.peer_pub.serialize()),
        )
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl Session {
    // new creates a session after both handshake halves have been exchanged:
    // ECDH against the peer identity, key derivation over the salt pair, and
    // a fresh random send counter.
    pub fn new(
        self_priv: &SecretKey,
        peer_pub: &PublicKey,
        salt_self: [u8; 4],
        salt_peer: [u8; 4],
    ) -> Self {
        let shared = message::shared_point_compressed(self_priv, peer_pub);
        let key = derive_key(&shared, &salt_self, &salt_peer);

        debug!(
            "session established, salt_send={} salt_recv={} peer={}",
            hex::encode(salt_self),
            hex::encode(salt_peer),
            hex::encode(peer_pub.serialize()),
        );

        Session {
            key,
            salt_send: salt_self,
            salt_recv: salt_peer,
            seq: message::random_seq(),
            peer_pub: *peer_pub,
            recv_window: Window::new(),
        }
    }

    // encode_record encrypts plaintext into a BST2 frame. The flags byte is
    // opaque to the record layer; it travels in clear but is bound into the
    // AAD, so flipping it on the wire breaks the tag.
    pub fn encode_record(&mut self, plaintext: &[u8], flags: u8) -> Result<Vec<u8>, RecordError> {
        self.seq = self.seq.checked_add(1).ok_or(RecordError::SeqExhausted)?;

        let mut seq_bytes = [0u8; 8];
        BigEndian::write_u64(&mut seq_bytes, self.seq);

        let mut nonce = [0u8; NONCE_SIZE];
        nonce[..4].copy_from_slice(&self.salt_send);
        nonce[4..].copy_from_slice(&seq_bytes);

        let mut aad = [0u8; 9];
        aad[0] = flags;
        aad[1..].copy_from_slice(&seq_bytes);

        // GCM refuses plaintexts past its internal 64 GiB bound; that is the
        // only way this encryption can fail.
        let (ciphertext, tag) = message::encrypt(plaintext, &self.key, &nonce, &aad)
            .map_err(|_| RecordError::MessageTooLarge)?;

        let length = (1 + 8 + ciphertext.len() + TAG_SIZE) as u32;
        let mut frame = Vec::with_capacity(4 + length as usize);
        let mut length_bytes = [0u8; 4];
        BigEndian::write_u32(&mut length_bytes, length);
        frame.extend_from_slice(&length_bytes);
        frame.push(flags);
        frame.extend_from_slice(&seq_bytes);
        frame.extend_from_slice(&ciphertext);
        frame.extend_from_slice(&tag);
        Ok(frame)
    }

    // decode_record authenticates and decrypts a frame, returning the
    // plaintext. Replayed and out-of-window sequences are rejected before any
    // GCM work; the replay window itself only advances once the tag has
    // verified, so a forged frame cannot block the sequence it spoofed.
    pub fn decode_record(&mut self, frame: &[u8]) -> Result<Vec<u8>, RecordError> {
        if frame.len() < MIN_FRAME_SIZE {
            return Err(RecordError::ShortFrame);
        }
        let length = BigEndian::read_u32(&frame[..4]);
        if length as usize != frame.len() - 4 {
            return Err(RecordError::LengthMismatch {
                expected: length,
                actual: frame.len() - 4,
            });
        }

        let flags = frame[4];
        let seq = BigEndian::read_u64(&frame[5..13]);
        self.recv_window.check(seq)?;

        let ciphertext = &frame[13..frame.len() - TAG_SIZE];
        let mut tag = [0u8; TAG_SIZE];
        tag.copy_from_slice(&frame[frame.len() - TAG_SIZE..]);

        let mut seq_bytes = [0u8; 8];
        BigEndian::write_u64(&mut seq_bytes, seq);

        let mut nonce = [0u8; NONCE_SIZE];
        nonce[..4].copy_from_slice(&self.salt_recv);
        nonce[4..].copy_from_slice(&seq_bytes);

        let mut aad = [0u8; 9];
        aad[0] = flags;
        aad[1..].copy_from_slice(&seq_bytes);

        let plaintext = message::decrypt(ciphertext, &self.key, &nonce, &aad, &tag)
            .map_err(|_| RecordError::TagFailure)?;

        self.recv_window.commit(seq);
        Ok(plaintext)
    }

    // peer_pub returns the authenticated identity of the remote side.
    pub fn peer_pub(&self) -> &PublicKey {
        &self.peer_pub
    }

    // with_initial_seq pins the send counter, so tests can predict the exact
    // sequence values a session will emit.
    #[cfg(any(test, feature = "testing"))]
    pub fn with_initial_seq(mut self, seq: u64) -> Self {
        self.seq = seq;
        self
    }

    #[cfg(any(test, feature = "testing"))]
    pub fn send_seq(&self) -> u64 {
        self.seq
    }
}
