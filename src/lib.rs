//! **streamcrypt** is a small toolkit for streaming AES-256-GCM
//! authenticated encryption, together with two protocols built on top of
//! it:
//!
//! - passphrase-based key derivation via PBKDF2-HMAC-SHA-512
//!   ([`keys::create_salted_key`], [`keys::get_salted_key`]), and
//! - a three-channel "flip" transmission scheme ([`flip::flip_encrypt`],
//!   [`flip::flip_decrypt`]) that splits a message into a ciphertext, a
//!   session descriptor, and a one-shot key so that no single
//!   transported artifact alone is useful to an observer.
//!
//! The streaming engine ([`stream::EncryptionSession`],
//! [`stream::DecryptionSession`]) is a pair of reusable state machines:
//! `start` opens a session over a fresh nonce, `encrypt`/`decrypt` pass
//! chunks through 1:1 in size (GCM is a stream cipher), and `finalize`
//! produces or checks the 16-byte tag. [`oneshot`] builds whole-buffer
//! and in-place file convenience functions on top of the same engine.
//!
//! A session is not safe to share across threads; callers that need
//! parallelism use one session per thread. The one-shot and file
//! functions are independent of one another and may run concurrently.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod buf;
mod error;
mod flip;
mod keys;
mod oneshot;
mod primitive;
mod stream;

pub use error::{Error, Result};
pub use flip::{flip_decrypt, flip_encrypt, FlipArtifacts, FlipOptions};
pub use keys::{create_salted_key, get_salted_key, get_salted_key_hex, PBKDF2_ITERATIONS, SALT_LEN};
pub use oneshot::{decrypt, decrypt_file, decrypt_with_tag_fn, encrypt, encrypt_file, encrypt_with_tag_fn};
pub use primitive::{KEY_LEN, NONCE_LEN, TAG_LEN};
pub use stream::{DecryptionSession, EncryptionSession};
