use byteorder::{BigEndian, ByteOrder};

use crate::session::Session;
use crate::{RecordError, FRAG_SIZE, MAX_FRAGS};

use std::collections::HashMap;

// Application-layer fragmentation (L profile) on top of a BST2 session.
// Each fragment plaintext is an 8-byte header followed by a slice of the
// message:
//
//   offset 0:    flags (bit0 = 1 -> last fragment)
//   offset 1..3: msgID (24-bit rolling counter per sender)
//   offset 4..5: fragID (u16, starting 0)
//   offset 6..7: totalFrags (u16)
//
// The header is encrypted together with the payload by
// Session::encode_record; the BST2-level flags byte always stays 0.

const HEADER_SIZE: usize = 8;
const LAST_FRAGMENT: u8 = 0x01;
const MSG_ID_MASK: u32 = 0x00ff_ffff;

// MAX_PENDING bounds the number of concurrently reassembling messages, so a
// peer that never completes its messages cannot grow the buffer map without
// limit.
pub const MAX_PENDING: usize = 64;

/// `Fragmenter` splits outgoing messages into BST2 frames. It holds only the
/// rolling 24-bit message counter and borrows the session per call, leaving
/// the session free for the receive path in between.
pub struct Fragmenter {
    next_msg_id: u32,
}

impl Default for Fragmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Fragmenter {
    pub fn new() -> Self {
        Fragmenter { next_msg_id: 0 }
    }

    // encode splits a message into fragments and returns the ordered list of
    // BST2 frames ready to send. An empty message produces no frames; the
    // first message of a session carries msgID 1.
    pub fn encode(
        &mut self,
        sess: &mut Session,
        message: &[u8],
    ) -> Result<Vec<Vec<u8>>, RecordError> {
        let total = (message.len() + FRAG_SIZE - 1) / FRAG_SIZE;
        if total == 0 {
            return Ok(Vec::new());
        }
        if total > MAX_FRAGS {
            return Err(RecordError::MessageTooLarge);
        }

        self.next_msg_id = (self.next_msg_id + 1) & MSG_ID_MASK;
        let msg_id = self.next_msg_id;

        let mut frames = Vec::with_capacity(total);
        for (index, chunk) in message.chunks(FRAG_SIZE).enumerate() {
            let flags = if index == total - 1 { LAST_FRAGMENT } else { 0 };

            let mut plain = Vec::with_capacity(HEADER_SIZE + chunk.len());
            plain.push(flags);
            plain.extend_from_slice(&put24(msg_id));
            let mut ids = [0u8; 4];
            BigEndian::write_u16(&mut ids[..2], index as u16);
            BigEndian::write_u16(&mut ids[2..], total as u16);
            plain.extend_from_slice(&ids);
            plain.extend_from_slice(chunk);

            frames.push(sess.encode_record(&plain, 0)?);
        }
        Ok(frames)
    }
}

struct MsgBuf {
    total: u16,
    frags: Vec<Option<Vec<u8>>>,
    received: u16,
}

/// `Reassembler` collects incoming fragments across any number of
/// concurrently in-flight messages, distinguished solely by msgID. Push every
/// incoming BST2 frame into it; a completed message is returned as soon as
/// its last missing fragment arrives.
pub struct Reassembler {
    msgs: HashMap<u32, MsgBuf>,
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reassembler {
    pub fn new() -> Self {
        Reassembler {
            msgs: HashMap::new(),
        }
    }

    // push decrypts one frame and files its fragment. Returns Some(message)
    // when that completes a message, None otherwise. Record-layer rejections
    // (replay, tag failure, length mismatch) propagate as-is; duplicates that
    // survive the replay window are ignored here as defense in depth.
    pub fn push(
        &mut self,
        sess: &mut Session,
        frame: &[u8],
    ) -> Result<Option<Vec<u8>>, RecordError> {
        let plain = sess.decode_record(frame)?;
        if plain.len() < HEADER_SIZE {
            return Err(RecordError::FragmentTooSmall);
        }

        let msg_id = get24(&plain[1..4]);
        let frag_id = BigEndian::read_u16(&plain[4..6]) as usize;
        let total = BigEndian::read_u16(&plain[6..8]);
        let data = &plain[HEADER_SIZE..];

        let pending = self.msgs.len();
        let buf = match self.msgs.entry(msg_id) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => {
                if pending >= MAX_PENDING {
                    return Err(RecordError::PendingOverflow);
                }
                entry.insert(MsgBuf {
                    total,
                    frags: vec![None; total as usize],
                    received: 0,
                })
            }
        };

        // The total announced by the first observed fragment wins.
        if frag_id >= buf.frags.len() {
            return Err(RecordError::FragmentOverflow);
        }
        if buf.frags[frag_id].is_none() {
            buf.frags[frag_id] = Some(data.to_vec());
            buf.received += 1;
        }

        if buf.received == buf.total {
            let frags = std::mem::take(&mut buf.frags);
            self.msgs.remove(&msg_id);

            let mut assembled = Vec::with_capacity(frags.len() * FRAG_SIZE);
            for part in frags.into_iter().flatten() {
                assembled.extend_from_slice(&part);
            }
            return Ok(Some(assembled));
        }
        Ok(None)
    }

    // pending reports how many messages are mid-reassembly.
    pub fn pending(&self) -> usize {
        self.msgs.len()
    }
}

// helpers: 24-bit big-endian msgID
fn put24(v: u32) -> [u8; 3] {
    [(v >> 16) as u8, (v >> 8) as u8, v as u8]
}

fn get24(b: &[u8]) -> u32 {
    (b[0] as u32) << 16 | (b[1] as u32) << 8 | b[2] as u32
}
