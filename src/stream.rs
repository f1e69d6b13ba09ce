//! The streaming AEAD engine: a pair of reusable state machines that own
//! an AEAD context for the lifetime of one session and can be `start`ed
//! again for the next.

use {
    crate::{
        error::{Error, Result},
        primitive::{self, DecryptCtx, EncryptCtx, KEY_LEN, NONCE_LEN, TAG_LEN},
    },
    tracing::{debug, warn},
    zeroize::Zeroize,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Idle,
    Open,
    Closed,
}

/// Encryption side of the streaming engine. Holds an optional default key
/// and default AAD set at construction; `start` may override either for
/// one session without mutating the default.
pub struct EncryptionSession {
    default_key: Option<[u8; KEY_LEN]>,
    default_aad: Option<Vec<u8>>,
    state: SessionState,
    ctx: Option<EncryptCtx>,
}

impl EncryptionSession {
    pub fn new(default_key: Option<[u8; KEY_LEN]>, default_aad: Option<Vec<u8>>) -> Self {
        Self {
            default_key,
            default_aad,
            state: SessionState::Idle,
            ctx: None,
        }
    }

    /// Starts a new session, generating a fresh 12-byte nonce and
    /// returning it for the caller to transmit out-of-band. `key`
    /// overrides the default key for this session only; `marker`
    /// overrides the default AAD likewise.
    ///
    /// Fails with [`Error::MissingKey`] if neither a default key nor
    /// `key` is available.
    pub fn start(&mut self, key: Option<&[u8; KEY_LEN]>, marker: Option<&[u8]>) -> Result<Vec<u8>> {
        let key = key.or(self.default_key.as_ref()).ok_or(Error::MissingKey)?;
        let nonce_vec = primitive::random_bytes(NONCE_LEN)?;
        let nonce: [u8; NONCE_LEN] = nonce_vec.clone().try_into().expect("random_bytes(NONCE_LEN) is NONCE_LEN bytes");

        let mut ctx = primitive::aead_encrypt_init(key, &nonce)?;
        let aad = marker.or(self.default_aad.as_deref()).unwrap_or(&[]);
        ctx.set_aad(aad)?;

        self.ctx = Some(ctx);
        self.state = SessionState::Open;
        debug!(marker_len = aad.len(), "encryption session started");
        Ok(nonce_vec)
    }

    /// Encrypts one chunk, returning a ciphertext chunk of the same
    /// length. Valid only while the session is open.
    pub fn encrypt(&mut self, chunk: &[u8]) -> Result<Vec<u8>> {
        match (&mut self.ctx, self.state) {
            (Some(ctx), SessionState::Open) => ctx.update(chunk),
            _ => Err(Error::NotStarted),
        }
    }

    /// Finalizes the session, returning the 16-byte authentication tag
    /// and transitioning `Open -> Closed`.
    pub fn finalize(&mut self) -> Result<[u8; TAG_LEN]> {
        if self.state != SessionState::Open {
            return Err(Error::NotStarted);
        }
        let ctx = self.ctx.take().expect("Open state implies a context");
        self.state = SessionState::Closed;
        ctx.finalize()
    }
}

impl Drop for EncryptionSession {
    fn drop(&mut self) {
        self.default_key.zeroize();
        self.default_aad.zeroize();
    }
}

/// Decryption side of the streaming engine, symmetric to
/// [`EncryptionSession`].
pub struct DecryptionSession {
    default_key: Option<[u8; KEY_LEN]>,
    default_aad: Option<Vec<u8>>,
    state: SessionState,
    ctx: Option<DecryptCtx>,
}

impl DecryptionSession {
    pub fn new(default_key: Option<[u8; KEY_LEN]>, default_aad: Option<Vec<u8>>) -> Self {
        Self {
            default_key,
            default_aad,
            state: SessionState::Idle,
            ctx: None,
        }
    }

    /// Starts a new session against a nonce received out-of-band.
    ///
    /// Fails with [`Error::MissingKey`] if no key is available, or
    /// [`Error::MissingNonce`] if `nonce` is not exactly
    /// [`crate::primitive::NONCE_LEN`] bytes.
    pub fn start(&mut self, key: Option<&[u8; KEY_LEN]>, nonce: &[u8], marker: Option<&[u8]>) -> Result<()> {
        let key = key.or(self.default_key.as_ref()).ok_or(Error::MissingKey)?;
        let nonce: [u8; NONCE_LEN] = nonce.try_into().map_err(|_| Error::MissingNonce)?;

        let mut ctx = primitive::aead_decrypt_init(key, &nonce)?;
        let aad = marker.or(self.default_aad.as_deref()).unwrap_or(&[]);
        ctx.set_aad(aad)?;

        self.ctx = Some(ctx);
        self.state = SessionState::Open;
        debug!(marker_len = aad.len(), "decryption session started");
        Ok(())
    }

    /// Decrypts one chunk, returning a plaintext chunk of the same
    /// length. Valid only while the session is open.
    pub fn decrypt(&mut self, chunk: &[u8]) -> Result<Vec<u8>> {
        match (&mut self.ctx, self.state) {
            (Some(ctx), SessionState::Open) => ctx.update(chunk),
            _ => Err(Error::NotStarted),
        }
    }

    /// Checks `expected_tag` and transitions `Open -> Closed`. The
    /// already-emitted plaintext is not retracted on failure; wiping it
    /// is the caller's responsibility.
    pub fn finalize(&mut self, expected_tag: &[u8]) -> Result<()> {
        if self.state != SessionState::Open {
            return Err(Error::NotStarted);
        }
        let ctx = self.ctx.take().expect("Open state implies a context");
        self.state = SessionState::Closed;
        let result = ctx.finalize(expected_tag);
        if result.is_err() {
            warn!("streaming session failed authentication");
        }
        result
    }
}

impl Drop for DecryptionSession {
    fn drop(&mut self) {
        self.default_key.zeroize();
        self.default_aad.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_round_trip_varied_chunking() {
        let key = [5u8; KEY_LEN];
        let plaintext = vec![0xabu8; 1 << 20];

        let mut enc = EncryptionSession::new(Some(key), None);
        let nonce = enc.start(None, Some(b"v1")).unwrap();

        let mut ciphertext = Vec::new();
        for chunk in plaintext.chunks(4096) {
            ciphertext.extend(enc.encrypt(chunk).unwrap());
        }
        let tag = enc.finalize().unwrap();

        let mut dec = DecryptionSession::new(Some(key), None);
        dec.start(None, &nonce, Some(b"v1")).unwrap();
        let mut recovered = Vec::new();
        for chunk in ciphertext.chunks(1) {
            recovered.extend(dec.decrypt(chunk).unwrap());
        }
        dec.finalize(&tag).unwrap();

        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn test_session_reusable_across_starts() {
        let key = [1u8; KEY_LEN];
        let mut enc = EncryptionSession::new(Some(key), None);

        let nonce1 = enc.start(None, None).unwrap();
        let _ = enc.encrypt(b"first").unwrap();
        enc.finalize().unwrap();

        let nonce2 = enc.start(None, None).unwrap();
        assert_ne!(nonce1, nonce2);
        let _ = enc.encrypt(b"second").unwrap();
        enc.finalize().unwrap();
    }

    #[test]
    fn test_not_started_errors() {
        let mut enc = EncryptionSession::new(Some([0u8; KEY_LEN]), None);
        assert!(matches!(enc.encrypt(b"x"), Err(Error::NotStarted)));
        assert!(matches!(enc.finalize(), Err(Error::NotStarted)));

        let mut dec = DecryptionSession::new(Some([0u8; KEY_LEN]), None);
        assert!(matches!(dec.decrypt(b"x"), Err(Error::NotStarted)));
    }

    #[test]
    fn test_missing_key() {
        let mut enc = EncryptionSession::new(None, None);
        assert!(matches!(enc.start(None, None), Err(Error::MissingKey)));
    }

    #[test]
    fn test_missing_nonce() {
        let mut dec = DecryptionSession::new(Some([0u8; KEY_LEN]), None);
        assert!(matches!(dec.start(None, b"short", None), Err(Error::MissingNonce)));
    }

    #[test]
    fn test_marker_mismatch_fails_auth() {
        let key = [9u8; KEY_LEN];
        let mut enc = EncryptionSession::new(Some(key), None);
        let nonce = enc.start(None, Some(b"v1")).unwrap();
        let ciphertext = enc.encrypt(b"payload").unwrap();
        let tag = enc.finalize().unwrap();

        let mut dec = DecryptionSession::new(Some(key), None);
        dec.start(None, &nonce, Some(b"v2")).unwrap();
        let _ = dec.decrypt(&ciphertext).unwrap();
        assert!(matches!(dec.finalize(&tag), Err(Error::AuthenticationFailed)));
    }
}
