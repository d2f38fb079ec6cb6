use byteorder::{BigEndian, ByteOrder};
use rand::seq::SliceRandom;
use rand::{thread_rng, RngCore};
use secp256k1::{PublicKey, Secp256k1, SecretKey};

use crate::{Fragmenter, Reassembler, RecordError, Session, FRAG_SIZE, MAX_FRAGS, MAX_PENDING};

fn must_priv(seed: u8) -> SecretKey {
    SecretKey::from_slice(&[seed; 32]).unwrap()
}

fn pub_of(priv_key: &SecretKey) -> PublicKey {
    PublicKey::from_secret_key(&Secp256k1::new(), priv_key)
}

fn session_pair() -> (Session, Session) {
    let priv_a = must_priv(0x01);
    let priv_b = must_priv(0x02);
    let salt_a = [1, 2, 3, 4];
    let salt_b = [5, 6, 7, 8];

    let sess_a = Session::new(&priv_a, &pub_of(&priv_b), salt_a, salt_b).with_initial_seq(0);
    let sess_b = Session::new(&priv_b, &pub_of(&priv_a), salt_b, salt_a).with_initial_seq(0);
    (sess_a, sess_b)
}

fn random_message(len: usize) -> Vec<u8> {
    let mut msg = vec![0u8; len];
    thread_rng().fill_bytes(&mut msg);
    msg
}

#[test]
fn fragment_roundtrip() {
    let (mut sess_a, mut sess_b) = session_pair();
    let mut frag = Fragmenter::new();
    let mut recv = Reassembler::new();

    let msg = random_message(1 << 20);
    let frames = frag.encode(&mut sess_a, &msg).unwrap();
    assert_eq!(frames.len(), (1 << 20) / FRAG_SIZE);

    for (i, frame) in frames.iter().enumerate() {
        match recv.push(&mut sess_b, frame).unwrap() {
            Some(assembled) => {
                assert_eq!(i, frames.len() - 1);
                assert_eq!(assembled, msg);
            }
            None => assert!(i < frames.len() - 1),
        }
    }
    assert_eq!(recv.pending(), 0);
}

#[test]
fn fragment_headers() {
    let (mut sess_a, mut sess_b) = session_pair();
    let mut frag = Fragmenter::new();

    // 40 KiB splits into three fragments.
    let msg = random_message(40 * 1024);
    let frames = frag.encode(&mut sess_a, &msg).unwrap();
    assert_eq!(frames.len(), 3);

    for (i, frame) in frames.iter().enumerate() {
        let plain = sess_b.decode_record(frame).unwrap();
        let last = i == frames.len() - 1;
        assert_eq!(plain[0], if last { 0x01 } else { 0x00 });
        // first message of the session carries msgID 1
        assert_eq!(&plain[1..4], &[0, 0, 1]);
        assert_eq!(BigEndian::read_u16(&plain[4..6]), i as u16);
        assert_eq!(BigEndian::read_u16(&plain[6..8]), 3);
    }
}

#[test]
fn msg_id_rolls_per_message() {
    let (mut sess_a, mut sess_b) = session_pair();
    let mut frag = Fragmenter::new();

    for expected_id in 1u32..=3 {
        let frames = frag.encode(&mut sess_a, b"tiny").unwrap();
        assert_eq!(frames.len(), 1);
        let plain = sess_b.decode_record(&frames[0]).unwrap();
        let msg_id = (plain[1] as u32) << 16 | (plain[2] as u32) << 8 | plain[3] as u32;
        assert_eq!(msg_id, expected_id);
    }
}

// Mirrors real datagram transports: frames arrive shuffled (within the replay
// window's reach) and with duplicates appended.
#[test]
fn out_of_order_duplicate() {
    let (mut sess_a, mut sess_b) = session_pair();
    let mut frag = Fragmenter::new();
    let mut recv = Reassembler::new();
    let mut rng = thread_rng();

    let msg = random_message(4 << 20);
    let mut frames = frag.encode(&mut sess_a, &msg).unwrap();

    // Shuffle inside blocks of 64 so no frame is displaced beyond the window.
    for block in frames.chunks_mut(64) {
        block.shuffle(&mut rng);
    }
    // Ten duplicates at the tail.
    for _ in 0..10 {
        let idx = (rng.next_u32() as usize) % frames.len();
        let dup = frames[idx].clone();
        frames.push(dup);
    }

    let mut assembled = None;
    for frame in &frames {
        match recv.push(&mut sess_b, frame) {
            Ok(Some(out)) => assembled = Some(out),
            Ok(None) => {}
            // Duplicates surface as replay or too-old; the transport drops
            // them and carries on.
            Err(RecordError::Replay) | Err(RecordError::TooOld) => {}
            Err(e) => panic!("unexpected decode failure: {}", e),
        }
    }
    assert_eq!(assembled.expect("message never completed"), msg);
}

#[test]
fn empty_message_produces_no_frames() {
    let (mut sess_a, _) = session_pair();
    let mut frag = Fragmenter::new();
    assert!(frag.encode(&mut sess_a, b"").unwrap().is_empty());
}

#[test]
fn oversize_message_rejected() {
    let (mut sess_a, _) = session_pair();
    let mut frag = Fragmenter::new();

    let msg = vec![0u8; MAX_FRAGS * FRAG_SIZE + 1];
    assert_eq!(
        frag.encode(&mut sess_a, &msg).unwrap_err(),
        RecordError::MessageTooLarge,
    );
}

#[test]
fn undersized_fragment_rejected() {
    let (mut sess_a, mut sess_b) = session_pair();
    let mut recv = Reassembler::new();

    // A record whose plaintext cannot hold the fragment header.
    let frame = sess_a.encode_record(b"abc", 0).unwrap();
    assert_eq!(
        recv.push(&mut sess_b, &frame).unwrap_err(),
        RecordError::FragmentTooSmall,
    );
}

#[test]
fn frag_id_overflow_rejected() {
    let (mut sess_a, mut sess_b) = session_pair();
    let mut recv = Reassembler::new();

    // Hand-crafted header claiming fragID 5 of 2.
    let mut plain = vec![0x00, 0x00, 0x00, 0x09];
    let mut ids = [0u8; 4];
    BigEndian::write_u16(&mut ids[..2], 5);
    BigEndian::write_u16(&mut ids[2..], 2);
    plain.extend_from_slice(&ids);
    plain.extend_from_slice(b"data");

    let frame = sess_a.encode_record(&plain, 0).unwrap();
    assert_eq!(
        recv.push(&mut sess_b, &frame).unwrap_err(),
        RecordError::FragmentOverflow,
    );
}

#[test]
fn pending_messages_capped() {
    let (mut sess_a, mut sess_b) = session_pair();
    let mut frag = Fragmenter::new();
    let mut recv = Reassembler::new();

    // Two-fragment messages left incomplete fill the buffer map.
    let msg = vec![0u8; FRAG_SIZE + 1];
    for _ in 0..MAX_PENDING {
        let frames = frag.encode(&mut sess_a, &msg).unwrap();
        assert!(recv.push(&mut sess_b, &frames[0]).unwrap().is_none());
    }
    assert_eq!(recv.pending(), MAX_PENDING);

    let frames = frag.encode(&mut sess_a, &msg).unwrap();
    assert_eq!(
        recv.push(&mut sess_b, &frames[0]).unwrap_err(),
        RecordError::PendingOverflow,
    );
}
