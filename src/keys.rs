//! Salted, passphrase-based key derivation.

use crate::{
    error::{Error, Result},
    primitive::{self, KEY_LEN},
};

/// Salt length in bytes. Fixed at 16 for the lifetime of the protocol.
pub const SALT_LEN: usize = 16;

/// PBKDF2 iteration count. This is a protocol constant: changing it
/// changes every key this crate ever derives, so it is versioned by crate
/// version rather than made runtime-configurable (see DESIGN.md).
pub const PBKDF2_ITERATIONS: u32 = 64_000;

/// Generates a fresh 16-byte salt and derives a 32-byte key from
/// `passphrase` under it, returning the key as lowercase hex alongside
/// the raw salt bytes.
///
/// Fails with [`Error::InvalidArgument`] if `passphrase` is empty.
pub fn create_salted_key(passphrase: &str) -> Result<(String, Vec<u8>)> {
    if passphrase.is_empty() {
        return Err(Error::InvalidArgument("passphrase must not be empty"));
    }
    let salt = primitive::random_bytes(SALT_LEN)?;
    let key = derive(passphrase, &salt);
    Ok((hex::encode(key), salt))
}

/// Deterministically derives a 32-byte key from `passphrase` and `salt`,
/// returned as lowercase hex. `salt` may be either 16 raw bytes or its
/// lowercase-hex encoding.
///
/// Fails with [`Error::InvalidArgument`] if `passphrase` is empty, or
/// [`Error::InvalidSalt`] if `salt` is not 16 bytes after decoding.
pub fn get_salted_key(passphrase: &str, salt: &[u8]) -> Result<String> {
    if passphrase.is_empty() {
        return Err(Error::InvalidArgument("passphrase must not be empty"));
    }
    let salt = decode_salt(salt)?;
    Ok(hex::encode(derive(passphrase, &salt)))
}

/// Same as [`get_salted_key`] but accepts the salt as a hex string, for
/// callers that only ever carry salts through text channels.
pub fn get_salted_key_hex(passphrase: &str, salt_hex: &str) -> Result<String> {
    let salt = hex::decode(salt_hex)?;
    get_salted_key(passphrase, &salt)
}

fn decode_salt(salt: &[u8]) -> Result<[u8; SALT_LEN]> {
    let salt = if salt.len() == SALT_LEN {
        salt.to_vec()
    } else {
        let text = std::str::from_utf8(salt).map_err(|_| Error::InvalidSalt)?;
        hex::decode(text).map_err(|_| Error::InvalidSalt)?
    };
    salt.try_into().map_err(|_| Error::InvalidSalt)
}

fn derive(passphrase: &str, salt: &[u8]) -> [u8; KEY_LEN] {
    let out = primitive::pbkdf2(passphrase.as_bytes(), salt, PBKDF2_ITERATIONS, KEY_LEN);
    out.try_into().expect("pbkdf2 out_len matches KEY_LEN")
}
