#![forbid(unsafe_code)]

//! The BST2 record layer: a session-keyed AES-256-GCM frame format with a
//! 64-bit monotonic sequence, salt-derived nonces, AAD binding of flags and
//! sequence, and a 64-slot sliding replay window. The L-profile fragmentation
//! layer rides on top of it to carry messages of up to 64 MiB over transports
//! with ~16 KiB frame ceilings.

mod frag;
mod session;
mod window;

#[cfg(test)]
mod test_frag;

pub use self::frag::{Fragmenter, Reassembler, MAX_PENDING};
pub use self::session::{derive_key, Session};

use std::{error, fmt};

// FRAG_SIZE is the payload capacity of a single L-profile fragment.
pub const FRAG_SIZE: usize = 16 * 1024;

// MAX_FRAGS bounds the fragment count of one message, capping messages at
// 64 MiB.
pub const MAX_FRAGS: usize = 4096;

// TAG_SIZE is the length in bytes of the GCM authentication tag trailing
// every record.
pub const TAG_SIZE: usize = message::TAG_SIZE;

// SALT_SIZE is the number of cleartext bytes each side contributes during the
// handshake.
pub const SALT_SIZE: usize = 4;

// NONCE_SIZE is the AES-GCM nonce length: 4 salt bytes followed by the
// big-endian sequence number.
pub const NONCE_SIZE: usize = 12;

// WINDOW_SIZE is the span of the sliding replay window, in records.
pub const WINDOW_SIZE: u64 = 64;

// MIN_FRAME_SIZE is the smallest well-formed record: length prefix, flags,
// sequence and tag around an empty ciphertext.
pub const MIN_FRAME_SIZE: usize = 4 + 1 + 8 + TAG_SIZE;

#[derive(Debug, Eq, PartialEq)]
pub enum RecordError {
    // ShortFrame means a record smaller than the fixed framing overhead.
    ShortFrame,
    // LengthMismatch means the length prefix disagrees with the bytes
    // actually presented.
    LengthMismatch { expected: u32, actual: usize },
    // Replay means the sequence was already accepted inside the window.
    Replay,
    // TooOld means the sequence fell behind the trailing window entirely.
    TooOld,
    // TagFailure means GCM authentication failed: tampering or key desync.
    TagFailure,
    // MessageTooLarge means the input exceeds what the L profile can carry.
    MessageTooLarge,
    // FragmentTooSmall means a decrypted fragment lacked its 8-byte header.
    FragmentTooSmall,
    // FragmentOverflow means a fragment index at or past the announced total.
    FragmentOverflow,
    // PendingOverflow means too many in-flight messages at the reassembler.
    PendingOverflow,
    // SeqExhausted means the 64-bit send counter ran out; the session must be
    // torn down.
    SeqExhausted,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::RecordError::*;

        match self {
            ShortFrame => write!(f, "frame too short"),
            LengthMismatch { expected, actual } => {
                write!(f, "length mismatch: {} vs {}", expected, actual)
            }
            Replay => write!(f, "replayed packet"),
            TooOld => write!(f, "packet older than replay window"),
            TagFailure => write!(f, "authentication tag mismatch"),
            MessageTooLarge => write!(f, "message too large for L profile"),
            FragmentTooSmall => write!(f, "fragment too small"),
            FragmentOverflow => write!(f, "fragID overflow"),
            PendingOverflow => write!(f, "too many in-flight messages"),
            SeqExhausted => write!(f, "send sequence exhausted"),
        }
    }
}

impl error::Error for RecordError {}
