#![forbid(unsafe_code)]

//! BitSeal: end-to-end authenticated secure channels over a shared secp256k1
//! identity model. The member crates compose as follows: a handshake
//! ([`rtc`] peer-to-peer, or [`ws`] client/server over [`web`]-signed HTTP)
//! authenticates the peers and agrees on a salt pair; [`record`] turns that
//! agreement into an AES-256-GCM record stream with replay protection and
//! optional fragmentation; [`message`] supplies the primitive contracts
//! underneath all of them.

pub use message;
pub use record;
pub use rtc;
pub use web;
pub use ws;
