//! Thin binding over the AES-256-GCM primitive and the two supporting
//! primitives (PBKDF2-HMAC-SHA-512, CSPRNG) the rest of the crate is built
//! from. Nothing above this module touches `openssl` or `pbkdf2` directly;
//! everything else depends only on the contract exposed here.

use {
    crate::error::{Error, Result},
    openssl::symm::{Cipher, Crypter, Mode},
    pbkdf2::pbkdf2_hmac,
    rand_core::{OsRng, RngCore},
    sha2::Sha512,
    std::io,
    zeroize::Zeroize,
};

/// GCM nonce length in bytes.
pub(crate) const NONCE_LEN: usize = 12;
/// GCM tag length in bytes.
pub(crate) const TAG_LEN: usize = 16;
/// AES-256 key length in bytes.
pub(crate) const KEY_LEN: usize = 32;

/// Draws `n` bytes from the host CSPRNG.
pub(crate) fn random_bytes(n: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; n];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|err| Error::Io(io::Error::new(io::ErrorKind::Other, err)))?;
    Ok(buf)
}

/// PBKDF2-HMAC-SHA-512, the sole KDF this crate exposes.
pub(crate) fn pbkdf2(passphrase: &[u8], salt: &[u8], iterations: u32, out_len: usize) -> Vec<u8> {
    let mut out = vec![0u8; out_len];
    pbkdf2_hmac::<Sha512>(passphrase, salt, iterations, &mut out);
    out
}

/// Context returned by [`aead_encrypt_init`]. Call `set_aad`, then any
/// number of `update` calls, then `finalize`. Wraps a single
/// `openssl::symm::Crypter` in GCM mode so the AEAD math itself is
/// OpenSSL's, not a reimplementation of it.
pub(crate) struct EncryptCtx {
    crypter: Crypter,
    key: [u8; KEY_LEN],
}

impl EncryptCtx {
    fn new(key: &[u8; KEY_LEN], nonce: &[u8; NONCE_LEN]) -> Result<Self> {
        let crypter = Crypter::new(Cipher::aes_256_gcm(), Mode::Encrypt, key, Some(nonce))
            .map_err(|err| Error::Io(io::Error::new(io::ErrorKind::Other, err)))?;
        Ok(Self { crypter, key: *key })
    }

    pub fn set_aad(&mut self, aad: &[u8]) -> Result<()> {
        self.crypter
            .aad_update(aad)
            .map_err(|err| Error::Io(io::Error::new(io::ErrorKind::Other, err)))
    }

    /// Encrypts `chunk`, returning a ciphertext chunk of the same length
    /// (GCM is a stream cipher, so `Crypter` never buffers a partial
    /// block across calls).
    pub fn update(&mut self, chunk: &[u8]) -> Result<Vec<u8>> {
        let mut out = vec![0u8; chunk.len() + Cipher::aes_256_gcm().block_size()];
        let written = self
            .crypter
            .update(chunk, &mut out)
            .map_err(|err| Error::Io(io::Error::new(io::ErrorKind::Other, err)))?;
        out.truncate(written);
        Ok(out)
    }

    pub fn finalize(mut self) -> Result<[u8; TAG_LEN]> {
        let mut tail = [0u8; 16];
        self.crypter
            .finalize(&mut tail)
            .map_err(|err| Error::Io(io::Error::new(io::ErrorKind::Other, err)))?;
        let mut tag = [0u8; TAG_LEN];
        self.crypter
            .get_tag(&mut tag)
            .map_err(|err| Error::Io(io::Error::new(io::ErrorKind::Other, err)))?;
        Ok(tag)
    }
}

impl Drop for EncryptCtx {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// Context returned by [`aead_decrypt_init`].
pub(crate) struct DecryptCtx {
    crypter: Crypter,
    key: [u8; KEY_LEN],
}

impl DecryptCtx {
    fn new(key: &[u8; KEY_LEN], nonce: &[u8; NONCE_LEN]) -> Result<Self> {
        let crypter = Crypter::new(Cipher::aes_256_gcm(), Mode::Decrypt, key, Some(nonce))
            .map_err(|err| Error::Io(io::Error::new(io::ErrorKind::Other, err)))?;
        Ok(Self { crypter, key: *key })
    }

    pub fn set_aad(&mut self, aad: &[u8]) -> Result<()> {
        self.crypter
            .aad_update(aad)
            .map_err(|err| Error::Io(io::Error::new(io::ErrorKind::Other, err)))
    }

    pub fn update(&mut self, chunk: &[u8]) -> Result<Vec<u8>> {
        let mut out = vec![0u8; chunk.len() + Cipher::aes_256_gcm().block_size()];
        let written = self
            .crypter
            .update(chunk, &mut out)
            .map_err(|err| Error::Io(io::Error::new(io::ErrorKind::Other, err)))?;
        out.truncate(written);
        Ok(out)
    }

    /// Sets `expected_tag` and finalizes. OpenSSL itself performs the
    /// comparison against the computed tag during `finalize`; a mismatch
    /// surfaces as an `ErrorStack`, mapped here to
    /// [`Error::AuthenticationFailed`].
    pub fn finalize(mut self, expected_tag: &[u8]) -> Result<()> {
        self.crypter
            .set_tag(expected_tag)
            .map_err(|_| Error::AuthenticationFailed)?;
        let mut tail = [0u8; 16];
        self.crypter.finalize(&mut tail).map_err(|_| Error::AuthenticationFailed)?;
        Ok(())
    }
}

impl Drop for DecryptCtx {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

pub(crate) fn aead_encrypt_init(key: &[u8; KEY_LEN], nonce: &[u8; NONCE_LEN]) -> Result<EncryptCtx> {
    EncryptCtx::new(key, nonce)
}

pub(crate) fn aead_decrypt_init(key: &[u8; KEY_LEN], nonce: &[u8; NONCE_LEN]) -> Result<DecryptCtx> {
    DecryptCtx::new(key, nonce)
}
