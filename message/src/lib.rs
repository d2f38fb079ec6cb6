#![forbid(unsafe_code)]

//! Primitive adapters consumed by the BitSeal protocol engines: recipient-bound
//! message signing, ECDH, AES-256-GCM with a detached tag, SHA-256, randomness
//! and the wall clock. Everything above this crate treats these operations as
//! opaque contracts.

mod aead;
mod clock;
mod ecdh;
mod entropy;
mod hash;
mod signed;

pub use self::aead::{decrypt, encrypt, TAG_SIZE};
pub use self::clock::{unix_ms, unix_s};
pub use self::ecdh::shared_point_compressed;
pub use self::entropy::{fill_random, generate_keypair, random_salt, random_seq};
pub use self::hash::{sha256, sha256_concat};
pub use self::signed::{sign, verify};
